//! Function and bound-method upgrade strategies.

use regraft_kernel::{Entity, Function};
use tracing::debug;

use super::{Strategies, UpgradeStrategy};

/// Copy every mutable aspect of `new` onto `old`, preserving `old`'s
/// identity. Each aspect is attempted independently; an aspect the
/// target refuses (host builtins have immutable code, closure,
/// defaults and globals) is skipped, never escalated.
pub(crate) fn copy_function_aspects(old: &Function, new: &Function) {
    let results = [
        ("closure", old.set_closure(new.closure())),
        ("code", old.set_body(new.body())),
        ("defaults", old.set_defaults(new.defaults())),
        ("attributes", old.set_attrs(new.attrs())),
        ("doc", old.set_doc(new.doc())),
        ("globals", old.set_globals(new.globals())),
    ];
    for (aspect, result) in results {
        if let Err(err) = result {
            debug!(function = %old.name(), aspect, %err, "aspect not copied");
        }
    }
}

/// Upgrades plain functions in place.
pub struct FunctionUpgrade;

impl UpgradeStrategy for FunctionUpgrade {
    fn name(&self) -> &'static str {
        "function"
    }

    fn upgrade(&self, old: &Entity, new: &Entity, _all: &Strategies) -> bool {
        let (Entity::Function(old), Entity::Function(new)) = (old, new) else {
            return false;
        };
        copy_function_aspects(old, new);
        true
    }
}

/// Upgrades bound methods by unwrapping to their underlying functions.
pub struct MethodUpgrade;

impl UpgradeStrategy for MethodUpgrade {
    fn name(&self) -> &'static str {
        "method"
    }

    fn upgrade(&self, old: &Entity, new: &Entity, _all: &Strategies) -> bool {
        let (Entity::Method(old), Entity::Method(new)) = (old, new) else {
            return false;
        };
        copy_function_aspects(&old.func(), &new.func());
        true
    }
}
