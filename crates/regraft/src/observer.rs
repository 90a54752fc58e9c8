//! Import observation.
//!
//! Wraps the host's resolution chain so a caller-supplied callback
//! fires once, synchronously, right after each module finishes loading
//! anywhere in the process, transitive dependency loads included.
//! The interception is scoped: dropping (or explicitly releasing) the
//! returned guard restores the chain with no further side effects.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use regraft_kernel::{Finder, HostResult, LoadUnit, Module, Resolver};

/// Post-load callback.
pub type ModuleCallback = Rc<dyn Fn(&Module)>;

struct ObserverFinder {
    callback: ModuleCallback,
    // Names currently being resolved on this logical stack. A stack,
    // not a flag: independent names nest while resolving.
    resolving: RefCell<Vec<String>>,
}

impl Finder for ObserverFinder {
    fn find_unit(&self, resolver: &Resolver, name: &str) -> Option<Box<dyn LoadUnit>> {
        // A resolution attempt for a name already in flight falls
        // through to the rest of the chain, never back into us.
        if self.resolving.borrow().iter().any(|n| n == name) {
            return None;
        }

        self.resolving.borrow_mut().push(name.to_string());
        let unit = resolver.find(name);
        self.resolving.borrow_mut().pop();

        let unit = unit?;
        debug!(module = name, "observing load");
        Some(Box::new(ObservedUnit {
            inner: unit,
            callback: self.callback.clone(),
        }))
    }
}

struct ObservedUnit {
    inner: Box<dyn LoadUnit>,
    callback: ModuleCallback,
}

impl LoadUnit for ObservedUnit {
    fn load(self: Box<Self>, resolver: &Resolver) -> HostResult<Module> {
        let module = self.inner.load(resolver)?;
        (self.callback)(&module);
        Ok(module)
    }
}

/// Scoped observation handle. Releasing removes the interception,
/// leaving every other installed finder in its original order.
pub struct ObserverGuard {
    resolver: Rc<Resolver>,
    finder: Option<Rc<dyn Finder>>,
}

impl ObserverGuard {
    /// Remove the interception now instead of at scope exit.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if let Some(finder) = self.finder.take() {
            self.resolver.remove(&finder);
            debug!("import observer released");
        }
    }
}

impl Drop for ObserverGuard {
    fn drop(&mut self) {
        self.release_inner();
    }
}

/// Observe every module load on `resolver` until the guard is
/// released. The last-registered observer intercepts first.
pub fn observe(resolver: &Rc<Resolver>, callback: impl Fn(&Module) + 'static) -> ObserverGuard {
    let finder: Rc<dyn Finder> = Rc::new(ObserverFinder {
        callback: Rc::new(callback),
        resolving: RefCell::new(Vec::new()),
    });
    resolver.install_front(finder.clone());
    debug!("import observer installed");
    ObserverGuard {
        resolver: resolver.clone(),
        finder: Some(finder),
    }
}
