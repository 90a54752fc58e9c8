//! Typed errors for the reload orchestrator.

use regraft_kernel::HostError;
use thiserror::Error;

/// Result type for reload operations.
pub type ReloadResult<T> = Result<T, ReloadError>;

/// Errors surfaced by [`reload`](crate::reload).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReloadError {
    /// The module has no loader attached, so it cannot be re-executed.
    #[error("module `{0}` has no loader attached")]
    NoLoader(String),

    /// Re-executing the module body failed. The namespace was restored
    /// to its pre-reload snapshot before this error was surfaced.
    #[error("module re-execution failed (namespace restored): {source}")]
    ExecFailed {
        /// The host-reported failure.
        #[from]
        source: HostError,
    },
}
