//! Classes and instances.
//!
//! A class carries an explicit, ordered member table built at
//! definition time, so two versions of a class can be diffed by name
//! without ambient reflection. Instances hold a mutable handle to
//! their current class; retagging swaps that handle in place.
//!
//! Every instance registers weakly with its class at construction.
//! That weak set is the live-object-graph query the class upgrade
//! needs: it never pins instances and is consulted once per upgrade.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::entity::Entity;
use crate::error::{HostError, HostResult};
use crate::value::Value;

/// Interior of a class.
pub struct ClassDef {
    name: String,
    module: String,
    doc: Option<String>,
    members: IndexMap<String, Entity>,
    instances: Vec<Weak<RefCell<InstanceData>>>,
}

/// A class entity. Cloning the handle preserves identity.
#[derive(Clone)]
pub struct Class(pub(crate) Rc<RefCell<ClassDef>>);

impl Class {
    /// Define a class owned by `module`.
    pub fn new(name: impl Into<String>, module: impl Into<String>) -> Self {
        Self(Rc::new(RefCell::new(ClassDef {
            name: name.into(),
            module: module.into(),
            doc: None,
            members: IndexMap::new(),
            instances: Vec::new(),
        })))
    }

    /// Add a named member at definition time.
    pub fn with_member(self, name: impl Into<String>, member: Entity) -> Self {
        self.0.borrow_mut().members.insert(name.into(), member);
        self
    }

    /// Attach a documentation string.
    pub fn with_doc(self, doc: impl Into<String>) -> Self {
        self.0.borrow_mut().doc = Some(doc.into());
        self
    }

    /// The class name as defined.
    pub fn name(&self) -> String {
        self.0.borrow().name.clone()
    }

    /// The module that defined this class.
    pub fn defined_in(&self) -> String {
        self.0.borrow().module.clone()
    }

    /// The documentation string, if any.
    pub fn doc(&self) -> Option<String> {
        self.0.borrow().doc.clone()
    }

    /// Resolve one member defined on this class (never inherited).
    pub fn member(&self, name: &str) -> Option<Entity> {
        self.0.borrow().members.get(name).cloned()
    }

    /// Member names in definition order.
    pub fn member_names(&self) -> Vec<String> {
        self.0.borrow().members.keys().cloned().collect()
    }

    /// The full member table in definition order.
    pub fn members(&self) -> Vec<(String, Entity)> {
        self.0
            .borrow()
            .members
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Bind or overwrite a member.
    pub fn set_member(&self, name: &str, member: Entity) {
        self.0.borrow_mut().members.insert(name.to_string(), member);
    }

    /// Remove a member, tolerating absence.
    pub fn remove_member(&self, name: &str) -> Option<Entity> {
        self.0.borrow_mut().members.shift_remove(name)
    }

    /// Record a live instance. Weak membership only; duplicates are
    /// skipped so retag round-trips do not grow the set.
    pub(crate) fn register_instance(&self, instance: &Instance) {
        let mut def = self.0.borrow_mut();
        let already = def
            .instances
            .iter()
            .any(|w| w.upgrade().is_some_and(|rc| Rc::ptr_eq(&rc, &instance.0)));
        if !already {
            def.instances.push(Rc::downgrade(&instance.0));
        }
    }

    /// Every instance currently alive that registered with this class.
    ///
    /// Dead entries are dropped as a side effect; the caller still has
    /// to check each instance's current class, since a previously
    /// retagged instance stays in its old class's set until it dies.
    pub fn live_instances(&self) -> Vec<Instance> {
        let mut def = self.0.borrow_mut();
        def.instances.retain(|w| w.upgrade().is_some());
        def.instances
            .iter()
            .filter_map(Weak::upgrade)
            .map(Instance)
            .collect()
    }

    /// Whether two handles refer to the same class.
    pub fn same_class(&self, other: &Class) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let def = self.0.borrow();
        write!(f, "<class {}.{}>", def.module, def.name)
    }
}

/// Interior of an instance.
pub struct InstanceData {
    class: Class,
    fields: IndexMap<String, Value>,
}

/// An object whose runtime type is a mutable class handle.
#[derive(Clone)]
pub struct Instance(pub(crate) Rc<RefCell<InstanceData>>);

impl Instance {
    /// Construct an instance of `class` and register it in the class's
    /// live set.
    pub fn new(class: &Class) -> Self {
        let instance = Self(Rc::new(RefCell::new(InstanceData {
            class: class.clone(),
            fields: IndexMap::new(),
        })));
        class.register_instance(&instance);
        instance
    }

    /// Construct with initial field values.
    pub fn with_fields(class: &Class, fields: impl IntoIterator<Item = (String, Value)>) -> Self {
        let instance = Self::new(class);
        {
            let mut data = instance.0.borrow_mut();
            for (k, v) in fields {
                data.fields.insert(k, v);
            }
        }
        instance
    }

    /// The instance's current class.
    pub fn class(&self) -> Class {
        self.0.borrow().class.clone()
    }

    /// Change the instance's runtime type to `new`, leaving its field
    /// contents untouched.
    pub fn retag(&self, new: &Class) {
        self.0.borrow_mut().class = new.clone();
        new.register_instance(self);
    }

    /// Read a stored field, bypassing class members.
    pub fn field(&self, name: &str) -> Option<Value> {
        self.0.borrow().fields.get(name).cloned()
    }

    /// Write a stored field, bypassing class members.
    pub fn set_field(&self, name: &str, value: Value) {
        self.0.borrow_mut().fields.insert(name.to_string(), value);
    }

    /// Stored fields in insertion order.
    pub fn fields(&self) -> IndexMap<String, Value> {
        self.0.borrow().fields.clone()
    }

    /// Resolve an attribute as an entity: fields first, then class
    /// members, binding functions into methods.
    pub fn attr(&self, name: &str) -> Option<Entity> {
        if let Some(value) = self.field(name) {
            return Some(Entity::Data(value));
        }
        match self.class().member(name)? {
            Entity::Function(f) => Some(Entity::Method(crate::entity::Method::bind(
                f,
                self.clone(),
            ))),
            other => Some(other),
        }
    }

    /// Read an attribute value: a stored field, a data member, or a
    /// computed attribute through its getter.
    pub fn get(&self, name: &str) -> HostResult<Value> {
        if let Some(value) = self.field(name) {
            return Ok(value);
        }
        match self.class().member(name) {
            Some(Entity::Data(value)) => Ok(value),
            Some(Entity::Property(p)) => p.get_on(self, name),
            Some(other) => Err(HostError::Other(format!(
                "attribute `{name}` on `{}` is a {}, not a data attribute",
                self.class().name(),
                other.kind()
            ))),
            None => Err(HostError::AttributeNotFound {
                owner: self.class().name(),
                attr: name.to_string(),
            }),
        }
    }

    /// Write an attribute: through a computed attribute's setter when
    /// one is defined, otherwise into a stored field.
    pub fn set(&self, name: &str, value: Value) -> HostResult<()> {
        if let Some(Entity::Property(p)) = self.class().member(name) {
            return p.set_on(self, name, value);
        }
        self.set_field(name, value);
        Ok(())
    }

    /// Invoke a member function on this instance.
    pub fn call_method(&self, name: &str, args: &[Value]) -> HostResult<Value> {
        match self.class().member(name) {
            Some(Entity::Function(f)) => f.call_with_receiver(Some(self.clone()), args),
            Some(Entity::Method(m)) => m.call(args),
            Some(other) => Err(HostError::NotCallable {
                owner: self.class().name(),
                attr: format!("{name} ({})", other.kind()),
            }),
            None => Err(HostError::AttributeNotFound {
                owner: self.class().name(),
                attr: name.to_string(),
            }),
        }
    }

    /// Whether two handles refer to the same instance.
    pub fn same_instance(&self, other: &Instance) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} instance>", self.class().name())
    }
}
