use std::fmt;

use mover_executor::ScriptHost;

/// Console rendering of every slot: index, coordinates and owning script.
pub struct TableDump<'a>(pub &'a ScriptHost);

impl fmt::Display for TableDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let host = self.0;
        for (slot, record, binding) in host.table().iter() {
            let script = host
                .pool()
                .get_source_id(binding.script)
                .unwrap_or("<unbound>");
            writeln!(f, "----------")?;
            writeln!(f, "Index: {}", slot)?;
            writeln!(f, "X: {:.2}", record.x)?;
            writeln!(f, "Y: {:.2}", record.y)?;
            writeln!(f, "Script: {}", script)?;
            writeln!(f, "----------")?;
        }
        Ok(())
    }
}
