//! Computed-attribute descriptor upgrade.

use regraft_kernel::{Entity, Function};

use super::function::copy_function_aspects;
use super::{Strategies, UpgradeStrategy};

/// Upgrades computed-attribute descriptors part by part.
///
/// For each of getter, setter and deleter independently: when both
/// sides have a function, the old function is upgraded in place;
/// otherwise the new side's part (present or absent) is installed
/// through the descriptor's own part-replacement operation.
pub struct PropertyUpgrade;

fn upgrade_part(
    old_part: Option<Function>,
    new_part: Option<Function>,
    install: impl FnOnce(Option<Function>),
) {
    match (old_part, new_part) {
        (Some(old_f), Some(new_f)) => copy_function_aspects(&old_f, &new_f),
        (_, new_part) => install(new_part),
    }
}

impl UpgradeStrategy for PropertyUpgrade {
    fn name(&self) -> &'static str {
        "property"
    }

    fn upgrade(&self, old: &Entity, new: &Entity, _all: &Strategies) -> bool {
        let (Entity::Property(old), Entity::Property(new)) = (old, new) else {
            return false;
        };

        upgrade_part(old.getter(), new.getter(), |p| old.set_getter(p));
        upgrade_part(old.setter(), new.setter(), |p| old.set_setter(p));
        upgrade_part(old.deleter(), new.deleter(), |p| old.set_deleter(p));
        true
    }
}
