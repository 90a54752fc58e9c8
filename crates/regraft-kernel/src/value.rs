//! Opaque values and callable bodies
//!
//! The engine never interprets data values; it only moves them around.
//! Callable bodies are host-supplied closures invoked through a call
//! context that carries the function's mutable aspects.

use std::cell::RefCell;
use std::rc::Rc;

use crate::class::Instance;
use crate::error::HostResult;
use crate::module::Module;

/// Opaque data value bound at module top level, as a class member, or
/// stored in an instance field. The engine treats these wholesale.
pub type Value = serde_json::Value;

/// A shared, mutable captured-variable slot.
///
/// Cells are shared between every function that closes over the same
/// variable, so replacing a function's captured environment means
/// replacing its cell handles, not the cell contents.
#[derive(Clone, Debug)]
pub struct ClosureCell(Rc<RefCell<Value>>);

impl ClosureCell {
    /// Create a cell holding an initial value.
    pub fn new(value: Value) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    /// Read the current cell contents.
    pub fn get(&self) -> Value {
        self.0.borrow().clone()
    }

    /// Overwrite the cell contents.
    pub fn set(&self, value: Value) {
        *self.0.borrow_mut() = value;
    }

    /// Whether two handles refer to the same cell.
    pub fn same_cell(&self, other: &ClosureCell) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Call-time view of a function's mutable aspects.
///
/// Built fresh for every invocation from the function's current
/// definition, so an upgraded function is observed immediately by
/// every holder of its handle.
pub struct CallCtx {
    /// The enclosing global namespace (the owning module), if any.
    pub globals: Option<Module>,
    /// Captured-variable environment.
    pub closure: Vec<ClosureCell>,
    /// Default argument values.
    pub defaults: Vec<Value>,
    /// Bound receiver when invoked as a method.
    pub receiver: Option<Instance>,
}

/// A compiled function body.
pub type FnBody = Rc<dyn Fn(&CallCtx, &[Value]) -> HostResult<Value>>;
