mod fault;
mod pool_index;
mod position;
mod table;

pub use fault::HostFault;
pub use pool_index::PoolIndex;
pub use position::PositionRecord;
pub use table::{DataHandle, PositionTable, Relocation, ScriptBinding};

/// Number of position slots in a [`PositionTable`].
pub const MAX_DATA: usize = 16;

/// Number of scripts that can be loaded at the same time.
pub const MAX_SCRIPTS: usize = 4;
