//! Upgrade strategies and the dispatcher.
//!
//! Each strategy claims one entity-kind pairing. The dispatcher tries
//! the strategies in order against an `(old, new)` pair; the first one
//! whose guards match both sides performs the upgrade and
//! short-circuits. No match means "not upgraded": the caller falls
//! back to wholesale replacement, which is never an error.

mod class;
mod function;
mod property;

pub use class::ClassUpgrade;
pub use function::{FunctionUpgrade, MethodUpgrade};
pub use property::PropertyUpgrade;

use std::rc::Rc;

use regraft_kernel::Entity;
use tracing::debug;

/// One kind-specific upgrade procedure, guarded by a type check on
/// both operands.
pub trait UpgradeStrategy {
    /// Strategy name, used in logs.
    fn name(&self) -> &'static str;

    /// Attempt the upgrade. Returns true iff this strategy claimed the
    /// pair and performed it; recursion into members goes back through
    /// `all`.
    fn upgrade(&self, old: &Entity, new: &Entity, all: &Strategies) -> bool;
}

/// The ordered strategy set.
///
/// The default order is class, function, computed attribute, method:
/// order only matters where guards overlap (a bound method wraps a
/// function), and this order resolves those overlaps the way the
/// defaults expect.
#[derive(Clone)]
pub struct Strategies {
    strategies: Vec<Rc<dyn UpgradeStrategy>>,
}

impl Default for Strategies {
    fn default() -> Self {
        Self {
            strategies: vec![
                Rc::new(ClassUpgrade),
                Rc::new(FunctionUpgrade),
                Rc::new(PropertyUpgrade),
                Rc::new(MethodUpgrade),
            ],
        }
    }
}

impl Strategies {
    /// The default strategy set.
    pub fn new() -> Self {
        Self::default()
    }

    /// A set with no strategies; every dispatch falls back to
    /// replacement.
    pub fn empty() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// Append a strategy behind the existing ones.
    pub fn with(mut self, strategy: Rc<dyn UpgradeStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// Number of strategies in the set.
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Try each strategy in order; the first to claim the pair wins.
    /// Returns false when no strategy matched.
    pub fn dispatch(&self, old: &Entity, new: &Entity) -> bool {
        self.strategies.iter().any(|strategy| {
            let claimed = strategy.upgrade(old, new, self);
            if claimed {
                debug!(strategy = strategy.name(), kind = old.kind(), "upgraded in place");
            }
            claimed
        })
    }
}
