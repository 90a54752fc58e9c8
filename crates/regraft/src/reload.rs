//! Reload orchestration.
//!
//! Drives a safe re-execution of a module body and grafts the fresh
//! definitions onto every identity that was ever bound to the same
//! top-level name, including strays from earlier generations that
//! only some long-lived holder still references.

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use regraft_kernel::Module;

use crate::error::{ReloadError, ReloadResult};
use crate::strategy::Strategies;

/// Outcome summary of one successful reload.
#[derive(Debug, Clone, Serialize)]
pub struct ReloadReport {
    /// The reloaded module's name.
    pub module: String,
    /// Reload generation after this reload.
    pub generation: u64,
    /// Wall-clock time the reload took.
    pub duration: Duration,
    /// Names whose old identities were newly recorded in the registry.
    pub recorded: usize,
    /// Historical identities upgraded in place.
    pub upgraded: usize,
    /// Historical identities no strategy claimed (holders must
    /// re-fetch by name to observe the replacement).
    pub replaced: usize,
}

/// Reload `module` with the default strategy set.
///
/// Returns the module itself: its identity is stable, only the
/// namespace was rebuilt and old identities mutated in place.
pub fn reload(module: &Module) -> ReloadResult<Module> {
    reload_with(module, &Strategies::default())
}

/// Reload `module` with a caller-supplied strategy set.
pub fn reload_with(module: &Module, strategies: &Strategies) -> ReloadResult<Module> {
    reload_report(module, strategies)?;
    Ok(module.clone())
}

/// Reload `module` and return the outcome summary.
///
/// On re-execution failure the namespace is restored to the exact
/// pre-reload snapshot before the error is surfaced; the module is
/// never observed partially cleared.
pub fn reload_report(module: &Module, strategies: &Strategies) -> ReloadResult<ReloadReport> {
    let start = Instant::now();
    let loader = module
        .loader()
        .ok_or_else(|| ReloadError::NoLoader(module.name().to_string()))?;

    info!(module = module.name(), "reloading");

    // Snapshot, then clear down to the bootstrap state (name, spec,
    // loader and registry live outside the namespace) so re-execution
    // rebuilds every definition instead of seeing stale globals.
    let snapshot = module.snapshot();
    module.clear_namespace();

    if let Err(err) = loader.exec_module(module) {
        module.restore(snapshot);
        warn!(module = module.name(), %err, "re-execution failed; namespace restored");
        return Err(ReloadError::from(err));
    }

    // Remember every old identity this module defined, accumulating
    // across generations.
    let mut recorded = 0usize;
    for (name, old) in &snapshot {
        if old.defined_in().as_deref() == Some(module.name())
            && module.registry_mut(|r| r.record(name, old))
        {
            recorded += 1;
        }
    }
    // Drop the snapshot so entities nothing else holds can die instead
    // of being needlessly upgraded.
    drop(snapshot);

    // Upgrade every still-live historical identity against the current
    // binding of its name, the current namespace entry and strays
    // from earlier generations alike.
    let mut upgraded = 0usize;
    let mut replaced = 0usize;
    for name in module.registry(|r| r.names()) {
        let Some(new) = module.get(&name) else {
            continue;
        };
        for old in module.registry(|r| r.live(&name)) {
            if old.same_identity(&new) {
                continue;
            }
            if strategies.dispatch(&old, &new) {
                upgraded += 1;
            } else {
                debug!(module = module.name(), name, kind = old.kind(), "replaced wholesale");
                replaced += 1;
            }
        }
    }

    let generation = module.bump_generation();
    let report = ReloadReport {
        module: module.name().to_string(),
        generation,
        duration: start.elapsed(),
        recorded,
        upgraded,
        replaced,
    };
    info!(
        module = report.module,
        generation = report.generation,
        upgraded = report.upgraded,
        replaced = report.replaced,
        "reload complete"
    );
    Ok(report)
}
