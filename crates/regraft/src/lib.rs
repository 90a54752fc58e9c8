//! Regraft: a live-upgrade engine for dynamically loaded modules.
//!
//! A plain reimport creates new identities and leaves every reference
//! already held elsewhere (closures, stored callables, live instances)
//! pointing at stale code. Regraft instead re-executes the module
//! body and grafts the fresh definitions onto the *existing*
//! identities of its top-level entities:
//!
//! - [`reload`] snapshots a module's namespace, re-executes the body
//!   through the host loader, restores the snapshot on failure, and
//!   otherwise upgrades every still-live historical identity recorded
//!   for each top-level name.
//! - [`Strategies`] is the per-kind upgrade dispatch: classes are
//!   diffed member by member and their live instances retagged;
//!   functions, bound methods and computed attributes are rewritten in
//!   place; everything else is replaced wholesale.
//! - [`observe`] wraps the host's resolution chain so a callback fires
//!   once, synchronously, after each module load, with reentrancy
//!   protection for self-referential resolution.
//!
//! Single-threaded by design: the object graph is `Rc`-based and
//! callers serialize concurrent reloads externally.

mod error;
mod observer;
mod reload;
mod strategy;

pub use error::{ReloadError, ReloadResult};
pub use observer::{ModuleCallback, ObserverGuard, observe};
pub use reload::{ReloadReport, reload, reload_report, reload_with};
pub use strategy::{
    ClassUpgrade, FunctionUpgrade, MethodUpgrade, PropertyUpgrade, Strategies, UpgradeStrategy,
};

// Re-export the kernel object model and host surface.
pub use regraft_kernel::{
    BodyFn, CallCtx, Class, ClosureCell, Entity, Finder, FnBody, FnFinder, FnLoader, Function,
    HostError, HostResult, Instance, LoadUnit, Method, Module, ModuleLoader, ModuleSpec, Namespace,
    Property, Resolver, UpgradeRegistry, Value, WeakEntity,
};
