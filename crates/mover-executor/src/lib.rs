use mover_core::{HostFault, PoolIndex};
use thiserror::Error;

mod binding;
mod host_plugin;
mod run_loop;
mod script_host;
mod script_pool;

pub use binding::{bind_and_invoke, Binding, ENTRY_POINT};
pub use run_loop::{run_all, RunReport};
pub use script_host::ScriptHost;
pub use script_pool::{LoadedScript, ScriptPool};

/// Everything that can go wrong while loading or running scripts.
///
/// Load-time variants are returned to the caller of the load. Per-slot variants produced
/// during a run are logged and collected in a [`RunReport`] instead of stopping the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    #[error("script limit reached ({capacity} scripts loaded)")]
    CapacityExceeded { capacity: usize },
    #[error("failed to load {source_id}: {message}")]
    Load { source_id: String, message: String },
    #[error("no script at pool index {index} ({len} loaded)")]
    InvalidIndex { index: PoolIndex, len: usize },
    #[error("{source_id} does not define `{}()` (slot {slot})", ENTRY_POINT)]
    MissingEntryPoint { slot: usize, source_id: String },
    #[error("{source_id} failed on slot {slot}: {message}")]
    Runtime {
        slot: usize,
        source_id: String,
        message: String,
    },
    #[error("slot index {slot} is outside the position table")]
    BoundsViolation { slot: i64 },
    #[error("host function called without an active position binding")]
    NoActiveBinding,
    #[error("slot {slot} is bound to script {script}, but only {pool_len} script(s) are loaded")]
    UnboundSlot {
        slot: usize,
        script: PoolIndex,
        pool_len: usize,
    },
    #[error("script {index} is still bound to {bindings} slot(s)")]
    ScriptInUse { index: PoolIndex, bindings: usize },
}

impl From<HostFault> for ScriptError {
    fn from(fault: HostFault) -> Self {
        match fault {
            HostFault::BoundsViolation { slot } => ScriptError::BoundsViolation { slot },
            HostFault::NoActiveBinding => ScriptError::NoActiveBinding,
        }
    }
}
