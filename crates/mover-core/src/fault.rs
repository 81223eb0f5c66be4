use thiserror::Error;

/// Failures raised while a host function touches position data on behalf of a script.
///
/// These travel through the interpreter as runtime error payloads, so they have to be
/// cheap to clone and `Send + Sync`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HostFault {
    #[error("slot index {slot} is outside the position table")]
    BoundsViolation { slot: i64 },
    #[error("no position binding is active for this call")]
    NoActiveBinding,
}
