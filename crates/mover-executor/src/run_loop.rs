use mover_core::PositionTable;

use crate::{bind_and_invoke, ScriptError, ScriptPool};

/// Outcome of one pass over the position table.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunReport {
    /// Slots whose entry function ran to completion.
    pub invoked: usize,
    /// Per-slot failures, in slot order.
    pub failures: Vec<ScriptError>,
}

impl RunReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Run every slot of the table through the script it is bound to, in ascending slot order.
///
/// A failing slot is logged and recorded in the report; the remaining slots still run.
pub fn run_all(table: &PositionTable, pool: &mut ScriptPool) -> RunReport {
    let mut report = RunReport::default();
    let handle = table.data_handle();

    for (slot, binding) in table.bindings().iter().enumerate() {
        let result = if binding.script.as_usize() >= pool.len() {
            Err(ScriptError::UnboundSlot {
                slot,
                script: binding.script,
                pool_len: pool.len(),
            })
        } else {
            pool.get_mut(binding.script)
                .and_then(|script| bind_and_invoke(script, handle.clone(), slot))
        };

        match result {
            Ok(()) => report.invoked += 1,
            Err(err) => {
                match &err {
                    ScriptError::MissingEntryPoint { .. } | ScriptError::UnboundSlot { .. } => {
                        log::warn!("Skipping slot {}: {}", slot, err)
                    }
                    _ => log::error!("Script error on slot {}: {}", slot, err),
                }
                report.failures.push(err);
            }
        }
    }

    log::debug!(
        "Processed {} slot(s), {} failure(s)",
        report.invoked,
        report.failures.len()
    );
    report
}
