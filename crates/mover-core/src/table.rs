use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::{HostFault, PoolIndex, PositionRecord, MAX_DATA};

type Records = [PositionRecord; MAX_DATA];

/// Ties a position slot to the pool index of the script that drives it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptBinding {
    pub script: PoolIndex,
}

/// Describes how a swap-remove in the script pool changed slot identities.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Relocation {
    /// The pool slot whose script was dropped.
    pub removed: PoolIndex,
    /// The pool slot whose script was moved into `removed`, if any.
    pub moved_from: Option<PoolIndex>,
}

/// Opaque capability to the record storage of one [`PositionTable`].
///
/// Every access goes through a bounds check on the slot index, so a handle can be given to
/// script-facing code without trusting the index that comes back with it.
#[derive(Clone, Debug)]
pub struct DataHandle {
    records: Arc<RwLock<Records>>,
}

impl DataHandle {
    fn check_slot(slot: i64) -> Result<usize, HostFault> {
        usize::try_from(slot)
            .ok()
            .filter(|s| *s < MAX_DATA)
            .ok_or(HostFault::BoundsViolation { slot })
    }

    pub fn with_record<R>(
        &self,
        slot: i64,
        f: impl FnOnce(&PositionRecord) -> R,
    ) -> Result<R, HostFault> {
        let slot = Self::check_slot(slot)?;
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        Ok(f(&records[slot]))
    }

    pub fn with_record_mut<R>(
        &self,
        slot: i64,
        f: impl FnOnce(&mut PositionRecord) -> R,
    ) -> Result<R, HostFault> {
        let slot = Self::check_slot(slot)?;
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        Ok(f(&mut records[slot]))
    }

    /// Whether both handles refer to the same table.
    pub fn same_table(&self, other: &DataHandle) -> bool {
        Arc::ptr_eq(&self.records, &other.records)
    }
}

/// Fixed-size table of positions, each owned by one loaded script.
///
/// Slot indices are stable for the lifetime of the table.
#[derive(Debug)]
pub struct PositionTable {
    records: Arc<RwLock<Records>>,
    bindings: [ScriptBinding; MAX_DATA],
}

impl Default for PositionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionTable {
    /// Create a table with all records at the origin and all slots bound to pool index 0.
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new([PositionRecord::default(); MAX_DATA])),
            bindings: [ScriptBinding::default(); MAX_DATA],
        }
    }

    pub fn capacity(&self) -> usize {
        MAX_DATA
    }

    pub fn data_handle(&self) -> DataHandle {
        DataHandle {
            records: self.records.clone(),
        }
    }

    pub fn get(&self, slot: usize) -> Result<PositionRecord, HostFault> {
        self.data_handle().with_record(slot as i64, |r| *r)
    }

    pub fn set(&mut self, slot: usize, record: PositionRecord) -> Result<(), HostFault> {
        self.data_handle()
            .with_record_mut(slot as i64, |r| *r = record)
    }

    pub fn binding(&self, slot: usize) -> Result<ScriptBinding, HostFault> {
        self.bindings
            .get(slot)
            .copied()
            .ok_or(HostFault::BoundsViolation { slot: slot as i64 })
    }

    /// Hand `slot` over to the script at `script`.
    ///
    /// The pool is not consulted here; a binding to an unloaded script is reported when the
    /// table is run.
    pub fn assign(&mut self, slot: usize, script: PoolIndex) -> Result<(), HostFault> {
        let binding = self
            .bindings
            .get_mut(slot)
            .ok_or(HostFault::BoundsViolation { slot: slot as i64 })?;
        binding.script = script;
        Ok(())
    }

    pub fn bindings(&self) -> &[ScriptBinding; MAX_DATA] {
        &self.bindings
    }

    /// Copy of all records, in slot order.
    pub fn records(&self) -> Records {
        *self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Iterate over `(slot, record, binding)` triples in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, PositionRecord, ScriptBinding)> + '_ {
        self.records()
            .into_iter()
            .zip(self.bindings.iter().copied())
            .enumerate()
            .map(|(slot, (record, binding))| (slot, record, binding))
    }

    /// Number of slots currently bound to `script`.
    pub fn bindings_to(&self, script: PoolIndex) -> usize {
        self.bindings.iter().filter(|b| b.script == script).count()
    }

    /// Follow a swap-remove in the pool: slots bound to the moved script now point at its
    /// new index.
    ///
    /// Slots that were bound to the removed script are left alone and end up referring to
    /// the moved script. Callers that want to keep identities stable must make sure no
    /// slot references the removed script before unloading it.
    pub fn rehome(&mut self, relocation: &Relocation) {
        let Some(moved_from) = relocation.moved_from else {
            return;
        };
        let mut count = 0;
        for binding in self.bindings.iter_mut() {
            if binding.script == moved_from {
                binding.script = relocation.removed;
                count += 1;
            }
        }
        if count > 0 {
            log::debug!(
                "Rehomed {} slot(s) from script {} to {}",
                count,
                moved_from,
                relocation.removed
            );
        }
    }
}
