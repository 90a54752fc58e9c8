//! Entities: the upgradeable-or-opaque values bound at module top level
//! and as class members.
//!
//! Functions, bound methods, classes and computed-attribute descriptors
//! are shared handles whose identity is the handle pointer; an upgrade
//! mutates the interior while every holder keeps the same handle.
//! Everything else is opaque data, replaced wholesale and never
//! upgraded.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::class::{Class, ClassDef, Instance};
use crate::error::{HostError, HostResult};
use crate::module::Module;
use crate::value::{CallCtx, ClosureCell, FnBody, Value};

/// Interior of a plain function.
pub struct FunctionDef {
    name: String,
    module: String,
    body: FnBody,
    closure: Vec<ClosureCell>,
    defaults: Vec<Value>,
    attrs: IndexMap<String, Value>,
    doc: Option<String>,
    globals: Option<Module>,
    builtin: bool,
}

/// A plain function entity. Cloning the handle preserves identity.
#[derive(Clone)]
pub struct Function(pub(crate) Rc<RefCell<FunctionDef>>);

impl Function {
    /// Define a function owned by `module`.
    pub fn new(name: impl Into<String>, module: impl Into<String>, body: FnBody) -> Self {
        Self(Rc::new(RefCell::new(FunctionDef {
            name: name.into(),
            module: module.into(),
            body,
            closure: Vec::new(),
            defaults: Vec::new(),
            attrs: IndexMap::new(),
            doc: None,
            globals: None,
            builtin: false,
        })))
    }

    /// Define a host builtin. Builtins keep their handle semantics but
    /// refuse replacement of code, closure, defaults and globals.
    pub fn builtin(name: impl Into<String>, module: impl Into<String>, body: FnBody) -> Self {
        let f = Self::new(name, module, body);
        f.0.borrow_mut().builtin = true;
        f
    }

    /// Attach captured-variable cells.
    pub fn with_closure(self, closure: Vec<ClosureCell>) -> Self {
        self.0.borrow_mut().closure = closure;
        self
    }

    /// Attach default argument values.
    pub fn with_defaults(self, defaults: Vec<Value>) -> Self {
        self.0.borrow_mut().defaults = defaults;
        self
    }

    /// Attach a documentation string.
    pub fn with_doc(self, doc: impl Into<String>) -> Self {
        self.0.borrow_mut().doc = Some(doc.into());
        self
    }

    /// Attach an auxiliary attribute.
    pub fn with_attr(self, key: impl Into<String>, value: Value) -> Self {
        self.0.borrow_mut().attrs.insert(key.into(), value);
        self
    }

    /// Attach the enclosing global namespace.
    pub fn with_globals(self, globals: Module) -> Self {
        self.0.borrow_mut().globals = Some(globals);
        self
    }

    /// The function's name as defined.
    pub fn name(&self) -> String {
        self.0.borrow().name.clone()
    }

    /// The module that defined this function.
    pub fn defined_in(&self) -> String {
        self.0.borrow().module.clone()
    }

    /// Whether this is a host builtin.
    pub fn is_builtin(&self) -> bool {
        self.0.borrow().builtin
    }

    /// The documentation string, if any.
    pub fn doc(&self) -> Option<String> {
        self.0.borrow().doc.clone()
    }

    /// The compiled body.
    pub fn body(&self) -> FnBody {
        self.0.borrow().body.clone()
    }

    /// The captured-variable environment.
    pub fn closure(&self) -> Vec<ClosureCell> {
        self.0.borrow().closure.clone()
    }

    /// The default argument values.
    pub fn defaults(&self) -> Vec<Value> {
        self.0.borrow().defaults.clone()
    }

    /// The auxiliary attribute mapping.
    pub fn attrs(&self) -> IndexMap<String, Value> {
        self.0.borrow().attrs.clone()
    }

    /// One auxiliary attribute.
    pub fn attr(&self, key: &str) -> Option<Value> {
        self.0.borrow().attrs.get(key).cloned()
    }

    /// The enclosing global namespace, if attached.
    pub fn globals(&self) -> Option<Module> {
        self.0.borrow().globals.clone()
    }

    fn refuse_if_builtin(&self, aspect: &'static str) -> HostResult<()> {
        if self.0.borrow().builtin {
            return Err(HostError::Immutable {
                target: self.name(),
                aspect,
            });
        }
        Ok(())
    }

    /// Replace the compiled body.
    pub fn set_body(&self, body: FnBody) -> HostResult<()> {
        self.refuse_if_builtin("code")?;
        self.0.borrow_mut().body = body;
        Ok(())
    }

    /// Replace the captured-variable environment.
    pub fn set_closure(&self, closure: Vec<ClosureCell>) -> HostResult<()> {
        self.refuse_if_builtin("closure")?;
        self.0.borrow_mut().closure = closure;
        Ok(())
    }

    /// Replace the default argument values.
    pub fn set_defaults(&self, defaults: Vec<Value>) -> HostResult<()> {
        self.refuse_if_builtin("defaults")?;
        self.0.borrow_mut().defaults = defaults;
        Ok(())
    }

    /// Replace the auxiliary attribute mapping.
    pub fn set_attrs(&self, attrs: IndexMap<String, Value>) -> HostResult<()> {
        self.0.borrow_mut().attrs = attrs;
        Ok(())
    }

    /// Replace the documentation string.
    pub fn set_doc(&self, doc: Option<String>) -> HostResult<()> {
        self.0.borrow_mut().doc = doc;
        Ok(())
    }

    /// Replace the enclosing global namespace reference.
    pub fn set_globals(&self, globals: Option<Module>) -> HostResult<()> {
        self.refuse_if_builtin("globals")?;
        self.0.borrow_mut().globals = globals;
        Ok(())
    }

    /// Invoke the function.
    pub fn call(&self, args: &[Value]) -> HostResult<Value> {
        self.call_with_receiver(None, args)
    }

    /// Invoke the function with a bound receiver.
    ///
    /// The call context is rebuilt from the current definition on every
    /// call, so the body may itself trigger an upgrade of this function
    /// without deadlocking on the definition cell.
    pub fn call_with_receiver(
        &self,
        receiver: Option<Instance>,
        args: &[Value],
    ) -> HostResult<Value> {
        let (body, ctx) = {
            let def = self.0.borrow();
            (
                def.body.clone(),
                CallCtx {
                    globals: def.globals.clone(),
                    closure: def.closure.clone(),
                    defaults: def.defaults.clone(),
                    receiver,
                },
            )
        };
        body(&ctx, args)
    }

    /// Whether two handles refer to the same function.
    pub fn same_function(&self, other: &Function) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let def = self.0.borrow();
        write!(f, "<function {}.{}>", def.module, def.name)
    }
}

/// Interior of a bound method.
pub struct MethodDef {
    func: Function,
    receiver: Instance,
}

/// A bound method entity: a function paired with its receiver.
#[derive(Clone)]
pub struct Method(pub(crate) Rc<RefCell<MethodDef>>);

impl Method {
    /// Bind `func` to `receiver`.
    pub fn bind(func: Function, receiver: Instance) -> Self {
        Self(Rc::new(RefCell::new(MethodDef { func, receiver })))
    }

    /// The underlying function.
    pub fn func(&self) -> Function {
        self.0.borrow().func.clone()
    }

    /// The bound receiver.
    pub fn receiver(&self) -> Instance {
        self.0.borrow().receiver.clone()
    }

    /// Invoke the method on its bound receiver.
    pub fn call(&self, args: &[Value]) -> HostResult<Value> {
        let (func, receiver) = {
            let def = self.0.borrow();
            (def.func.clone(), def.receiver.clone())
        };
        func.call_with_receiver(Some(receiver), args)
    }

    /// Whether two handles refer to the same bound method.
    pub fn same_method(&self, other: &Method) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<bound method {:?}>", self.func())
    }
}

/// Interior of a computed-attribute descriptor.
#[derive(Default)]
pub struct PropertyDef {
    getter: Option<Function>,
    setter: Option<Function>,
    deleter: Option<Function>,
    doc: Option<String>,
}

/// A computed-attribute descriptor with independent getter, setter and
/// deleter parts.
#[derive(Clone)]
pub struct Property(pub(crate) Rc<RefCell<PropertyDef>>);

impl Property {
    /// Create a descriptor with no parts.
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(PropertyDef::default())))
    }

    /// Attach a getter.
    pub fn with_getter(self, getter: Function) -> Self {
        self.0.borrow_mut().getter = Some(getter);
        self
    }

    /// Attach a setter.
    pub fn with_setter(self, setter: Function) -> Self {
        self.0.borrow_mut().setter = Some(setter);
        self
    }

    /// Attach a deleter.
    pub fn with_deleter(self, deleter: Function) -> Self {
        self.0.borrow_mut().deleter = Some(deleter);
        self
    }

    /// Attach a documentation string.
    pub fn with_doc(self, doc: impl Into<String>) -> Self {
        self.0.borrow_mut().doc = Some(doc.into());
        self
    }

    /// The getter part.
    pub fn getter(&self) -> Option<Function> {
        self.0.borrow().getter.clone()
    }

    /// The setter part.
    pub fn setter(&self) -> Option<Function> {
        self.0.borrow().setter.clone()
    }

    /// The deleter part.
    pub fn deleter(&self) -> Option<Function> {
        self.0.borrow().deleter.clone()
    }

    /// The documentation string, if any.
    pub fn doc(&self) -> Option<String> {
        self.0.borrow().doc.clone()
    }

    /// Replace the getter part.
    pub fn set_getter(&self, getter: Option<Function>) {
        self.0.borrow_mut().getter = getter;
    }

    /// Replace the setter part.
    pub fn set_setter(&self, setter: Option<Function>) {
        self.0.borrow_mut().setter = setter;
    }

    /// Replace the deleter part.
    pub fn set_deleter(&self, deleter: Option<Function>) {
        self.0.borrow_mut().deleter = deleter;
    }

    /// Compute the attribute value for `receiver`.
    pub fn get_on(&self, receiver: &Instance, attr: &str) -> HostResult<Value> {
        match self.getter() {
            Some(getter) => getter.call_with_receiver(Some(receiver.clone()), &[]),
            None => Err(HostError::AttributeNotFound {
                owner: receiver.class().name(),
                attr: attr.to_string(),
            }),
        }
    }

    /// Store `value` through the setter for `receiver`.
    pub fn set_on(&self, receiver: &Instance, attr: &str, value: Value) -> HostResult<()> {
        match self.setter() {
            Some(setter) => {
                setter.call_with_receiver(Some(receiver.clone()), &[value])?;
                Ok(())
            }
            None => Err(HostError::Immutable {
                target: format!("{}.{attr}", receiver.class().name()),
                aspect: "setter",
            }),
        }
    }

    /// Whether two handles refer to the same descriptor.
    pub fn same_property(&self, other: &Property) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for Property {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let def = self.0.borrow();
        write!(
            f,
            "<property getter={} setter={} deleter={}>",
            def.getter.is_some(),
            def.setter.is_some(),
            def.deleter.is_some()
        )
    }
}

/// Tagged union over everything a name can be bound to.
#[derive(Clone, Debug)]
pub enum Entity {
    /// A plain function.
    Function(Function),
    /// A bound method.
    Method(Method),
    /// A class.
    Class(Class),
    /// A computed-attribute descriptor.
    Property(Property),
    /// Opaque data; replaced wholesale, never upgraded.
    Data(Value),
}

impl Entity {
    /// Short kind tag, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Entity::Function(_) => "function",
            Entity::Method(_) => "method",
            Entity::Class(_) => "class",
            Entity::Property(_) => "property",
            Entity::Data(_) => "data",
        }
    }

    /// Whether both handles refer to the identical object.
    ///
    /// Data values have no identity; two data bindings are never the
    /// identical object even when equal.
    pub fn same_identity(&self, other: &Entity) -> bool {
        match (self, other) {
            (Entity::Function(a), Entity::Function(b)) => a.same_function(b),
            (Entity::Method(a), Entity::Method(b)) => a.same_method(b),
            (Entity::Class(a), Entity::Class(b)) => a.same_class(b),
            (Entity::Property(a), Entity::Property(b)) => a.same_property(b),
            _ => false,
        }
    }

    /// The owning-module marker: the module that defined this entity.
    ///
    /// Methods and descriptors defer to their underlying functions;
    /// opaque data carries no marker.
    pub fn defined_in(&self) -> Option<String> {
        match self {
            Entity::Function(f) => Some(f.defined_in()),
            Entity::Method(m) => Some(m.func().defined_in()),
            Entity::Class(c) => Some(c.defined_in()),
            Entity::Property(p) => p
                .getter()
                .or_else(|| p.setter())
                .or_else(|| p.deleter())
                .map(|f| f.defined_in()),
            Entity::Data(_) => None,
        }
    }

    /// Weak counterpart for registry membership. Data has no identity
    /// to hold weakly.
    pub fn downgrade(&self) -> Option<WeakEntity> {
        match self {
            Entity::Function(f) => Some(WeakEntity::Function(Rc::downgrade(&f.0))),
            Entity::Method(m) => Some(WeakEntity::Method(Rc::downgrade(&m.0))),
            Entity::Class(c) => Some(WeakEntity::Class(Rc::downgrade(&c.0))),
            Entity::Property(p) => Some(WeakEntity::Property(Rc::downgrade(&p.0))),
            Entity::Data(_) => None,
        }
    }

    /// View as a function.
    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Entity::Function(f) => Some(f),
            _ => None,
        }
    }

    /// View as a class.
    pub fn as_class(&self) -> Option<&Class> {
        match self {
            Entity::Class(c) => Some(c),
            _ => None,
        }
    }

    /// View as opaque data.
    pub fn as_data(&self) -> Option<&Value> {
        match self {
            Entity::Data(v) => Some(v),
            _ => None,
        }
    }
}

/// Weakly-held entity identity, used by the upgrade registry so that
/// membership never keeps an otherwise-dead object alive.
#[derive(Clone)]
pub enum WeakEntity {
    /// Weak function identity.
    Function(Weak<RefCell<FunctionDef>>),
    /// Weak bound-method identity.
    Method(Weak<RefCell<MethodDef>>),
    /// Weak class identity.
    Class(Weak<RefCell<ClassDef>>),
    /// Weak descriptor identity.
    Property(Weak<RefCell<PropertyDef>>),
}

impl WeakEntity {
    /// Recover the entity if it is still alive.
    pub fn upgrade(&self) -> Option<Entity> {
        match self {
            WeakEntity::Function(w) => w.upgrade().map(|rc| Entity::Function(Function(rc))),
            WeakEntity::Method(w) => w.upgrade().map(|rc| Entity::Method(Method(rc))),
            WeakEntity::Class(w) => w.upgrade().map(|rc| Entity::Class(Class(rc))),
            WeakEntity::Property(w) => w.upgrade().map(|rc| Entity::Property(Property(rc))),
        }
    }
}
