use mover_core::{DataHandle, HostFault};
use rhai::{CallFnOptions, Dynamic, EvalAltResult, INT};

use crate::{LoadedScript, ScriptError};

/// Name of the function every script must define. It is called once per bound slot.
pub const ENTRY_POINT: &str = "process";

/// The position a script invocation is allowed to touch.
///
/// A binding is handed to the engine as the call's custom state and is only reachable from
/// host functions running inside that call. Scripts can neither read nor replace it.
#[derive(Clone, Debug)]
pub struct Binding {
    handle: DataHandle,
    slot_index: INT,
}

impl Binding {
    pub fn new(handle: DataHandle, slot_index: usize) -> Self {
        Self {
            handle,
            slot_index: slot_index as INT,
        }
    }

    pub fn slot_index(&self) -> INT {
        self.slot_index
    }

    pub fn handle(&self) -> &DataHandle {
        &self.handle
    }
}

/// Run the script's entry function against one position slot.
pub fn bind_and_invoke(
    script: &mut LoadedScript,
    data_handle: DataHandle,
    slot_index: usize,
) -> Result<(), ScriptError> {
    if !script.has_function(ENTRY_POINT) {
        return Err(ScriptError::MissingEntryPoint {
            slot: slot_index,
            source_id: script.source_id().to_string(),
        });
    }

    let source_id = script.source_id().to_string();
    let (engine, ast, scope) = script.parts_mut();
    let options = CallFnOptions::new()
        .eval_ast(false)
        .rewind_scope(true)
        .with_tag(Binding::new(data_handle, slot_index));

    match engine.call_fn_with_options::<Dynamic>(options, scope, ast, ENTRY_POINT, ()) {
        Ok(_) => Ok(()),
        Err(err) => match host_fault(&err) {
            Some(fault) => Err(fault.into()),
            None => Err(ScriptError::Runtime {
                slot: slot_index,
                source_id,
                message: err.to_string(),
            }),
        },
    }
}

/// Dig a [`HostFault`] raised by a host function out of the error chain.
pub(crate) fn host_fault(err: &EvalAltResult) -> Option<HostFault> {
    match err {
        EvalAltResult::ErrorTerminated(value, _) => value.clone().try_cast::<HostFault>(),
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _) => host_fault(inner),
        _ => None,
    }
}
