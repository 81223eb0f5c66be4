use mover_core::{HostFault, PositionRecord};
use rhai::plugin::*;
use rhai::{Array, Dynamic, EvalAltResult, NativeCallContext, Position, FLOAT, INT};

use crate::Binding;

/// Functions scripts use to read and write the position they are bound to.
#[export_module]
pub mod host_rhai_plugin {
    use super::*;

    #[rhai_fn(name = "move", return_raw)]
    /// Shifts the bound position by `(dx, dy)`.
    pub fn move_by(
        context: NativeCallContext,
        dx: Dynamic,
        dy: Dynamic,
    ) -> Result<(), Box<EvalAltResult>> {
        let (dx, dy) = (to_coord(&dx)?, to_coord(&dy)?);
        with_bound_record(&context, |p| p.translate(dx, dy))
    }

    #[rhai_fn(name = "getpos", return_raw)]
    /// Returns the bound position as `[x, y]`.
    pub fn get_pos(context: NativeCallContext) -> Result<Array, Box<EvalAltResult>> {
        with_bound_record(&context, |p| {
            vec![
                Dynamic::from_float(p.x as FLOAT),
                Dynamic::from_float(p.y as FLOAT),
            ]
        })
    }

    #[rhai_fn(name = "setpos", return_raw)]
    /// Moves the bound position to `(x, y)`.
    pub fn set_pos(
        context: NativeCallContext,
        x: Dynamic,
        y: Dynamic,
    ) -> Result<(), Box<EvalAltResult>> {
        let (x, y) = (to_coord(&x)?, to_coord(&y)?);
        with_bound_record(&context, |p| p.set(x, y))
    }

    #[rhai_fn(name = "index", return_raw)]
    /// Returns the index of the bound position slot.
    pub fn bound_index(context: NativeCallContext) -> Result<INT, Box<EvalAltResult>> {
        current_binding(&context).map(|binding| binding.slot_index())
    }
}

/// Host faults terminate the script outright, so `try`/`catch` cannot swallow them.
fn fault(fault: HostFault, pos: Position) -> Box<EvalAltResult> {
    Box::new(EvalAltResult::ErrorTerminated(Dynamic::from(fault), pos))
}

fn current_binding(context: &NativeCallContext) -> Result<Binding, Box<EvalAltResult>> {
    context
        .tag()
        .and_then(|tag| tag.clone().try_cast::<Binding>())
        .ok_or_else(|| fault(HostFault::NoActiveBinding, context.call_position()))
}

fn with_bound_record<R>(
    context: &NativeCallContext,
    f: impl FnOnce(&mut PositionRecord) -> R,
) -> Result<R, Box<EvalAltResult>> {
    let binding = current_binding(context)?;
    binding
        .handle()
        .with_record_mut(binding.slot_index(), f)
        .map_err(|err| {
            log::error!("Host function `{}` failed: {}", context.fn_name(), err);
            fault(err, context.call_position())
        })
}

fn to_coord(value: &Dynamic) -> Result<f32, Box<EvalAltResult>> {
    if let Ok(v) = value.as_float() {
        Ok(v as f32)
    } else if let Ok(v) = value.as_int() {
        Ok(v as f32)
    } else {
        Err(Box::new(EvalAltResult::ErrorMismatchDataType(
            "number".to_string(),
            value.type_name().into(),
            Position::NONE,
        )))
    }
}

#[cfg(test)]
mod tests {
    use mover_core::{PositionTable, MAX_DATA};

    use crate::{bind_and_invoke, ScriptError, ScriptPool};

    use super::*;

    fn run_on_slot(source: &str, table: &PositionTable, slot: usize) -> Result<(), ScriptError> {
        let mut pool = ScriptPool::new();
        let index = pool.load_source("host-fns", source).unwrap();
        bind_and_invoke(pool.get_mut(index).unwrap(), table.data_handle(), slot)
    }

    #[test]
    fn test_getpos_returns_current_coordinates() {
        let mut table = PositionTable::new();
        table.set(2, PositionRecord::new(1.5, -4.25)).unwrap();

        run_on_slot(
            r#"
            fn process() {
                let p = getpos();
                if p.len() != 2 { throw "expected two values"; }
                if p[0] != 1.5 || p[1] != -4.25 { throw `unexpected ${p}`; }
            }
            "#,
            &table,
            2,
        )
        .unwrap();
        assert_eq!(table.get(2), Ok(PositionRecord::new(1.5, -4.25)));
    }

    #[test]
    fn test_getpos_sees_writes_from_same_invocation() {
        let table = PositionTable::new();
        run_on_slot(
            r#"
            fn process() {
                setpos(3.0, 4.0);
                let p = getpos();
                setpos(p[0] * 10.0, p[1] * 10.0);
            }
            "#,
            &table,
            0,
        )
        .unwrap();
        assert_eq!(table.get(0), Ok(PositionRecord::new(30.0, 40.0)));
    }

    #[test]
    fn test_setpos_then_move_is_exact() {
        let mut table = PositionTable::new();
        table.set(9, PositionRecord::new(123.0, 456.0)).unwrap();
        run_on_slot(
            "fn process() { setpos(2.5, -1.0); move(0.25, 3.0); }",
            &table,
            9,
        )
        .unwrap();
        assert_eq!(table.get(9), Ok(PositionRecord::new(2.75, 2.0)));
    }

    #[test]
    fn test_integer_arguments_are_accepted() {
        let table = PositionTable::new();
        run_on_slot("fn process() { setpos(1, 2); move(3, 4.5); }", &table, 5).unwrap();
        assert_eq!(table.get(5), Ok(PositionRecord::new(4.0, 6.5)));
    }

    #[test]
    fn test_non_numeric_argument_is_runtime_error() {
        let table = PositionTable::new();
        let err = run_on_slot("fn process() { move(\"left\", 1.0); }", &table, 1).unwrap_err();
        assert!(matches!(err, ScriptError::Runtime { slot: 1, .. }));
        assert_eq!(table.get(1), Ok(PositionRecord::default()));
    }

    #[test]
    fn test_index_reports_bound_slot() {
        let table = PositionTable::new();
        for slot in [0, 7, MAX_DATA - 1] {
            run_on_slot("fn process() { setpos(index(), 0.0); }", &table, slot).unwrap();
            assert_eq!(table.get(slot).unwrap().x, slot as f32);
        }
    }

    #[test]
    fn test_failed_call_keeps_earlier_writes() {
        let table = PositionTable::new();
        let err = run_on_slot(
            "fn process() { setpos(5.0, 5.0); throw \"halfway\"; }",
            &table,
            6,
        )
        .unwrap_err();
        assert!(matches!(err, ScriptError::Runtime { .. }));
        assert_eq!(table.get(6), Ok(PositionRecord::new(5.0, 5.0)));
    }
}
