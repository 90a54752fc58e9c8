//! Typed errors for the kernel object model and host collaborators.

use thiserror::Error;

/// Result type for host-facing kernel operations.
pub type HostResult<T> = Result<T, HostError>;

/// Errors surfaced by the host substrate or the object model.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HostError {
    /// No finder in the resolution chain could locate the module.
    #[error("module `{0}` not found")]
    NotFound(String),

    /// Executing a module body failed (syntax or runtime error in the
    /// host's terms).
    #[error("module `{module}` failed to execute: {reason}")]
    ExecFailed {
        /// The module whose body was being executed.
        module: String,
        /// Host-reported failure description.
        reason: String,
    },

    /// A mutable aspect could not be written on this particular object
    /// (host builtins have immutable code, closure and defaults).
    #[error("`{target}` is immutable: {aspect} cannot be replaced")]
    Immutable {
        /// The object that refused the write.
        target: String,
        /// The aspect that was being replaced.
        aspect: &'static str,
    },

    /// Attribute lookup on an instance or class failed.
    #[error("`{owner}` has no attribute `{attr}`")]
    AttributeNotFound {
        /// The class or instance consulted.
        owner: String,
        /// The attribute that was requested.
        attr: String,
    },

    /// An attribute resolved to something that cannot be invoked.
    #[error("attribute `{attr}` on `{owner}` is not callable")]
    NotCallable {
        /// The class or instance consulted.
        owner: String,
        /// The attribute that was requested.
        attr: String,
    },

    /// Catch-all for host-specific failures.
    #[error("{0}")]
    Other(String),
}

impl HostError {
    /// Convenience constructor for execution failures.
    pub fn exec(module: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ExecFailed {
            module: module.into(),
            reason: reason.into(),
        }
    }
}
