//! Regraft kernel: the object model a live-upgrade engine operates on,
//! plus the host collaborator surface (loading and resolution).
//!
//! The kernel knows nothing about upgrade policy; it provides stable
//! identities (functions, methods, classes, computed attributes,
//! modules), the per-module upgrade registry, and the traits the host
//! substrate implements. The `regraft` crate drives it.

// value module
pub mod value;
pub use value::{CallCtx, ClosureCell, FnBody, Value};

// entity module
pub mod entity;
pub use entity::{Entity, Function, Method, Property, WeakEntity};

// class module
pub mod class;
pub use class::{Class, Instance};

// module module
pub mod module;
pub use module::{Module, ModuleSpec, Namespace};

// registry module
pub mod registry;
pub use registry::UpgradeRegistry;

// host module
pub mod host;
pub use host::{BodyFn, Finder, FnFinder, FnLoader, LoadUnit, ModuleLoader, Resolver};

// error module
pub mod error;
pub use error::{HostError, HostResult};
