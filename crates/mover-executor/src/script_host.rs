use std::path::Path;

use mover_core::{PoolIndex, PositionRecord, PositionTable, Relocation};

use crate::{run_all, RunReport, ScriptError, ScriptPool};

/// Owns the script pool and the position table and keeps their bindings consistent.
///
/// Unloading is refused while any slot is still bound to the script, and slots bound to
/// the script that gets swapped into the freed pool slot follow it. So every binding keeps
/// pointing at the same script across an unload.
#[derive(Debug, Default)]
pub struct ScriptHost {
    pool: ScriptPool,
    table: PositionTable,
    latest_errors: Vec<ScriptError>,
}

impl ScriptHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pool(&self) -> &ScriptPool {
        &self.pool
    }

    pub fn table(&self) -> &PositionTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut PositionTable {
        &mut self.table
    }

    pub fn load_script(&mut self, path: impl AsRef<Path>) -> Result<PoolIndex, ScriptError> {
        self.pool.load(path)
    }

    pub fn load_source(&mut self, source_id: &str, source: &str) -> Result<PoolIndex, ScriptError> {
        self.pool.load_source(source_id, source)
    }

    pub fn unload_script(&mut self, index: PoolIndex) -> Result<Relocation, ScriptError> {
        self.pool.get(index)?;
        let bindings = self.table.bindings_to(index);
        if bindings > 0 {
            return Err(ScriptError::ScriptInUse { index, bindings });
        }

        let relocation = self.pool.unload(index)?;
        self.table.rehome(&relocation);
        Ok(relocation)
    }

    /// Bind a table slot to a loaded script.
    pub fn assign(&mut self, slot: usize, script: PoolIndex) -> Result<(), ScriptError> {
        self.pool.get(script)?;
        self.table.assign(slot, script)?;
        Ok(())
    }

    pub fn set_position(&mut self, slot: usize, record: PositionRecord) -> Result<(), ScriptError> {
        self.table.set(slot, record)?;
        Ok(())
    }

    /// Run every slot once. Failures are also kept for [`ScriptHost::take_errors`].
    pub fn run(&mut self) -> RunReport {
        let report = run_all(&self.table, &mut self.pool);
        self.latest_errors = report.failures.clone();
        report
    }

    /// Errors from the most recent run, leaving the list empty.
    pub fn take_errors(&mut self) -> Vec<ScriptError> {
        std::mem::take(&mut self.latest_errors)
    }
}
