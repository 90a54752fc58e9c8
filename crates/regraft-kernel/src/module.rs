//! Modules: named, mutable namespaces with stable identity.
//!
//! A module handle is created once by the host loader and lives for
//! the process lifetime; reloads rebuild its namespace in place. The
//! upgrade registry and the bootstrap markers (name, spec, loader) are
//! carried outside the namespace map, so clearing the namespace for
//! re-execution cannot lose them.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::host::ModuleLoader;
use crate::registry::UpgradeRegistry;

/// Namespace map: identifier to entity, in definition order.
pub type Namespace = IndexMap<String, Entity>;

/// Loader-facing module metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSpec {
    /// Fully qualified module name.
    pub name: String,
    /// Where the module came from, in host terms.
    pub origin: Option<String>,
}

impl ModuleSpec {
    /// Create a spec with no origin.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin: None,
        }
    }

    /// Set the origin.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }
}

struct ModuleInner {
    name: String,
    spec: RefCell<Option<ModuleSpec>>,
    loader: RefCell<Option<Rc<dyn ModuleLoader>>>,
    namespace: RefCell<Namespace>,
    registry: RefCell<UpgradeRegistry>,
    generation: Cell<u64>,
}

/// A module handle. Cloning preserves identity; the identity is stable
/// across any number of reloads.
#[derive(Clone)]
pub struct Module(Rc<ModuleInner>);

impl Module {
    /// Create an empty module.
    pub fn new(name: impl Into<String>) -> Self {
        Self(Rc::new(ModuleInner {
            name: name.into(),
            spec: RefCell::new(None),
            loader: RefCell::new(None),
            namespace: RefCell::new(Namespace::new()),
            registry: RefCell::new(UpgradeRegistry::new()),
            generation: Cell::new(0),
        }))
    }

    /// Attach loader-facing metadata.
    pub fn with_spec(self, spec: ModuleSpec) -> Self {
        *self.0.spec.borrow_mut() = Some(spec);
        self
    }

    /// The module name.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Loader-facing metadata, if attached.
    pub fn spec(&self) -> Option<ModuleSpec> {
        self.0.spec.borrow().clone()
    }

    /// Attach the loader responsible for (re-)executing this module.
    pub fn set_loader(&self, loader: Rc<dyn ModuleLoader>) {
        *self.0.loader.borrow_mut() = Some(loader);
    }

    /// The attached loader, if any.
    pub fn loader(&self) -> Option<Rc<dyn ModuleLoader>> {
        self.0.loader.borrow().clone()
    }

    /// Bind a top-level name.
    pub fn bind(&self, name: impl Into<String>, entity: Entity) {
        self.0.namespace.borrow_mut().insert(name.into(), entity);
    }

    /// Resolve a top-level name.
    pub fn get(&self, name: &str) -> Option<Entity> {
        self.0.namespace.borrow().get(name).cloned()
    }

    /// Top-level names in definition order.
    pub fn names(&self) -> Vec<String> {
        self.0.namespace.borrow().keys().cloned().collect()
    }

    /// Shallow copy of the current name-to-entity bindings.
    pub fn snapshot(&self) -> Namespace {
        self.0.namespace.borrow().clone()
    }

    /// Clear the namespace to the minimal bootstrap state. The name,
    /// spec, loader and upgrade registry live outside the map and
    /// survive by construction.
    pub fn clear_namespace(&self) {
        self.0.namespace.borrow_mut().clear();
    }

    /// Overwrite the namespace with a previously taken snapshot. Full
    /// replacement, not a merge.
    pub fn restore(&self, snapshot: Namespace) {
        *self.0.namespace.borrow_mut() = snapshot;
    }

    /// Read access to the upgrade registry.
    pub fn registry<R>(&self, f: impl FnOnce(&UpgradeRegistry) -> R) -> R {
        f(&self.0.registry.borrow())
    }

    /// Write access to the upgrade registry.
    pub fn registry_mut<R>(&self, f: impl FnOnce(&mut UpgradeRegistry) -> R) -> R {
        f(&mut self.0.registry.borrow_mut())
    }

    /// How many reloads have completed successfully.
    pub fn generation(&self) -> u64 {
        self.0.generation.get()
    }

    /// Advance the reload generation. Returns the new value.
    pub fn bump_generation(&self) -> u64 {
        let next = self.0.generation.get() + 1;
        self.0.generation.set(next);
        next
    }

    /// Whether two handles refer to the same module.
    pub fn same_module(&self, other: &Module) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<module {} gen={} names={}>",
            self.0.name,
            self.0.generation.get(),
            self.0.namespace.borrow().len()
        )
    }
}
