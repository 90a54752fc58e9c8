//! Class upgrade: member diffing, recursive member upgrade, and live
//! instance retagging.

use regraft_kernel::Entity;
use tracing::debug;

use super::{Strategies, UpgradeStrategy};

/// Upgrades classes in place.
///
/// Best-effort by design: once both operands are classes this strategy
/// always claims the pair. Members no inner strategy can upgrade are
/// replaced wholesale; stale members are deleted; new members are
/// copied across; and every live instance whose runtime type is
/// exactly the old class is retagged to the new one.
pub struct ClassUpgrade;

impl UpgradeStrategy for ClassUpgrade {
    fn name(&self) -> &'static str {
        "class"
    }

    fn upgrade(&self, old: &Entity, new: &Entity, all: &Strategies) -> bool {
        let (Entity::Class(old), Entity::Class(new)) = (old, new) else {
            return false;
        };

        // Diff the old class's own members against the new definition.
        let mut remove = Vec::new();
        let mut replace = Vec::new();
        for (name, old_member) in old.members() {
            let Some(new_member) = new.member(&name) else {
                remove.push(name);
                continue;
            };
            if old_member.same_identity(&new_member) {
                continue;
            }
            if !all.dispatch(&old_member, &new_member) {
                replace.push((name, new_member));
            }
        }

        for (name, member) in replace {
            debug!(class = %old.name(), member = %name, "member replaced wholesale");
            old.set_member(&name, member);
        }

        for name in remove {
            debug!(class = %old.name(), member = %name, "stale member removed");
            old.remove_member(&name);
        }

        // Members the new definition adds are copied, never upgraded.
        for (name, member) in new.members() {
            if old.member(&name).is_none() {
                old.set_member(&name, member);
            }
        }

        // Retag live instances whose runtime type is exactly the old
        // class. A previously retagged instance still sits in the old
        // class's live set; the exactness check leaves it alone, as it
        // does any subtype with its own upgrade pass.
        let mut retagged = 0usize;
        for instance in old.live_instances() {
            if instance.class().same_class(old) {
                instance.retag(new);
                retagged += 1;
            }
        }
        debug!(class = %old.name(), retagged, "class upgraded");

        true
    }
}
