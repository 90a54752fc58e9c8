//! Host collaborator surface: module loading and resolution.
//!
//! The engine does not parse or execute source. It asks the host to
//! (re-)execute a module body through [`ModuleLoader`], and it reaches
//! the host's resolution pipeline through the ordered [`Finder`] chain
//! of a [`Resolver`]. Import observation installs a finder at the
//! front of that chain; everything else here is the substrate it
//! wraps.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::error::{HostError, HostResult};
use crate::module::{Module, ModuleSpec};

/// The host's (re-)execution mechanism: runs a module body, rebuilding
/// every top-level definition into the module's namespace.
pub trait ModuleLoader {
    /// Execute the module body. Any failure must leave error reporting
    /// to the caller; the reload orchestrator handles rollback.
    fn exec_module(&self, module: &Module) -> HostResult<()>;
}

/// A loadable unit produced by resolution, one load per unit.
pub trait LoadUnit {
    /// Load the module, registering it with the resolver before the
    /// body runs so self-referential loads terminate.
    fn load(self: Box<Self>, resolver: &Resolver) -> HostResult<Module>;
}

/// One link in the resolution chain.
pub trait Finder {
    /// Resolve `name` to a loadable unit, or decline.
    fn find_unit(&self, resolver: &Resolver, name: &str) -> Option<Box<dyn LoadUnit>>;
}

/// The host's resolution pipeline: an ordered finder chain plus the
/// loaded-module cache.
#[derive(Default)]
pub struct Resolver {
    finders: RefCell<Vec<Rc<dyn Finder>>>,
    modules: RefCell<IndexMap<String, Module>>,
}

impl Resolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a finder ahead of every existing one. The newest
    /// installation intercepts first.
    pub fn install_front(&self, finder: Rc<dyn Finder>) {
        self.finders.borrow_mut().insert(0, finder);
    }

    /// Install a finder behind every existing one.
    pub fn install_back(&self, finder: Rc<dyn Finder>) {
        self.finders.borrow_mut().push(finder);
    }

    /// Remove the last-installed occurrence of `finder` by identity,
    /// leaving the order of every other finder untouched.
    pub fn remove(&self, finder: &Rc<dyn Finder>) -> bool {
        let mut finders = self.finders.borrow_mut();
        match finders.iter().rposition(|f| Rc::ptr_eq(f, finder)) {
            Some(idx) => {
                finders.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Number of installed finders.
    pub fn finder_count(&self) -> usize {
        self.finders.borrow().len()
    }

    /// Walk the chain front to back; the first finder to claim `name`
    /// wins.
    pub fn find(&self, name: &str) -> Option<Box<dyn LoadUnit>> {
        let finders: Vec<_> = self.finders.borrow().clone();
        for finder in finders {
            if let Some(unit) = finder.find_unit(self, name) {
                return Some(unit);
            }
        }
        None
    }

    /// Resolve and load `name`, returning the cached module when it
    /// was already loaded.
    pub fn load(&self, name: &str) -> HostResult<Module> {
        if let Some(module) = self.module(name) {
            return Ok(module);
        }
        let unit = self
            .find(name)
            .ok_or_else(|| HostError::NotFound(name.to_string()))?;
        let module = unit.load(self)?;
        info!(module = name, "module loaded");
        Ok(module)
    }

    /// A previously loaded module, if any.
    pub fn module(&self, name: &str) -> Option<Module> {
        self.modules.borrow().get(name).cloned()
    }

    /// Register a module in the cache. Load units call this before
    /// executing the body.
    pub fn register_module(&self, module: &Module) {
        self.modules
            .borrow_mut()
            .insert(module.name().to_string(), module.clone());
    }

    /// Drop a module from the cache, e.g. after a failed initial load.
    pub fn unregister_module(&self, name: &str) -> Option<Module> {
        self.modules.borrow_mut().shift_remove(name)
    }
}

/// Closure-backed module body.
pub type BodyFn = Rc<dyn Fn(&Module) -> HostResult<()>>;

/// A loader whose module body is a host-supplied closure. Swapping the
/// body stands in for an edited source file between reloads.
pub struct FnLoader {
    body: RefCell<BodyFn>,
}

impl FnLoader {
    /// Create a loader from a body closure.
    pub fn new(body: impl Fn(&Module) -> HostResult<()> + 'static) -> Self {
        Self {
            body: RefCell::new(Rc::new(body)),
        }
    }

    /// Replace the body the next execution will run.
    pub fn set_body(&self, body: impl Fn(&Module) -> HostResult<()> + 'static) {
        *self.body.borrow_mut() = Rc::new(body);
    }
}

impl ModuleLoader for FnLoader {
    fn exec_module(&self, module: &Module) -> HostResult<()> {
        let body = self.body.borrow().clone();
        debug!(module = module.name(), "executing module body");
        body(module)
    }
}

/// A finder over a fixed table of closure-backed module bodies.
#[derive(Default)]
pub struct FnFinder {
    sources: RefCell<IndexMap<String, Rc<FnLoader>>>,
}

impl FnFinder {
    /// Create an empty finder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a module body under `name`. Returns the loader handle so
    /// the body can be swapped later.
    pub fn define(
        &self,
        name: impl Into<String>,
        body: impl Fn(&Module) -> HostResult<()> + 'static,
    ) -> Rc<FnLoader> {
        let loader = Rc::new(FnLoader::new(body));
        self.sources.borrow_mut().insert(name.into(), loader.clone());
        loader
    }
}

impl Finder for FnFinder {
    fn find_unit(&self, _resolver: &Resolver, name: &str) -> Option<Box<dyn LoadUnit>> {
        let loader = self.sources.borrow().get(name)?.clone();
        Some(Box::new(FnUnit {
            name: name.to_string(),
            loader,
        }))
    }
}

struct FnUnit {
    name: String,
    loader: Rc<FnLoader>,
}

impl LoadUnit for FnUnit {
    fn load(self: Box<Self>, resolver: &Resolver) -> HostResult<Module> {
        let module = Module::new(self.name.clone()).with_spec(ModuleSpec::new(self.name.clone()));
        module.set_loader(self.loader.clone());

        // Visible to in-flight resolution before the body runs.
        resolver.register_module(&module);

        if let Err(err) = self.loader.exec_module(&module) {
            resolver.unregister_module(&self.name);
            return Err(err);
        }
        Ok(module)
    }
}
