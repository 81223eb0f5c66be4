use anyhow::{bail, Result};
use mover_core::{PoolIndex, PositionRecord, MAX_DATA};
use mover_executor::ScriptHost;
use rand::Rng;

/// Scatter the records over `[0, 100)` and bind each slot to a script.
///
/// Explicit `assignments` must name a pool index for every slot. Without them each slot
/// picks one of the loaded scripts at random.
pub fn populate(
    host: &mut ScriptHost,
    assignments: Option<&[u8]>,
    rng: &mut impl Rng,
) -> Result<()> {
    let loaded = host.pool().len();
    if loaded == 0 {
        bail!("No scripts loaded");
    }
    if let Some(assignments) = assignments {
        if assignments.len() != MAX_DATA {
            bail!(
                "Expected {} slot assignments, got {}",
                MAX_DATA,
                assignments.len()
            );
        }
    }

    for slot in 0..MAX_DATA {
        let record = PositionRecord::new(rng.gen_range(0.0..100.0), rng.gen_range(0.0..100.0));
        host.set_position(slot, record)?;

        let script = match assignments {
            Some(assignments) => PoolIndex::new(assignments[slot]),
            None => PoolIndex::new(rng.gen_range(0..loaded) as u8),
        };
        host.assign(slot, script)?;
    }
    Ok(())
}
