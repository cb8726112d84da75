//! Bridge (Import Bindings)
//!
//! Everything the guest can call. Bindings live under the `"env"` import
//! module and operate on the [`HostState`] stored in the wasmtime `Store`.
//!
//! # Errors
//!
//! Host functions must return `anyhow::Result`, which traps the guest on
//! `Err`. Every failure a binding raises is a [`BridgeError`] so the runtime
//! can recover it by downcasting. Process exit travels the same path as a
//! [`TerminationSignal`], which is not an error but has to unwind the guest
//! stack all the same.

mod clock;
mod exports;
mod imports;
mod math;

pub use clock::{Clock, ClockKind};
pub use exports::{dispatch, ExportSlot, ExportTypeError, GuestExports};
pub use math::js_round;

use wasmtime::{Linker, Memory};

use crate::gamepad::{Gamepads, RumbleError};
use crate::handles::{HandleError, HandleTable, HostObject};
use crate::memory::MemoryError;
use crate::scheduler::Scheduler;
use crate::terminal::{ParseError, Terminal};

/// Import module name for every binding
pub const IMPORT_MODULE: &str = "env";

/// Raised by `_exit`/`JS_exit`; carries the guest's exit status
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("guest exited with status {status}")]
pub struct TerminationSignal {
    pub status: i32,
}

/// A guest/host ABI mismatch. Never expected in correct operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractViolation {
    #[error("export `{0}` was called before it was bound")]
    UnboundExport(&'static str),

    #[error("{0}: null callback pointer")]
    NullCallback(&'static str),

    #[error("{binding}: index {index} out of range")]
    IndexOutOfRange { binding: &'static str, index: i32 },

    #[error("{binding}: no gamepad connected at index {index}")]
    NoGamepad { binding: &'static str, index: i32 },

    #[error(transparent)]
    Handle(#[from] HandleError),

    #[error(transparent)]
    Rumble(#[from] RumbleError),

    #[error("guest linear memory is not available")]
    NoMemory,

    #[error("global `{0}` does not hold an i32")]
    GlobalType(&'static str),
}

/// Error type for binding calls
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    #[error("contract violation: {0}")]
    Contract(#[from] ContractViolation),

    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error("render failed: {0}")]
    Parse(#[from] ParseError),
}

impl BridgeError {
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, BridgeError::Contract(_))
    }
}

impl From<HandleError> for BridgeError {
    fn from(err: HandleError) -> Self {
        BridgeError::Contract(err.into())
    }
}

impl From<RumbleError> for BridgeError {
    fn from(err: RumbleError) -> Self {
        BridgeError::Contract(err.into())
    }
}

/// Result type for binding internals
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Convert a typed failure into the trap value handed back to wasmtime
pub(crate) trait IntoTrap<T> {
    fn or_trap(self) -> anyhow::Result<T>;
}

impl<T, E: Into<BridgeError>> IntoTrap<T> for Result<T, E> {
    fn or_trap(self) -> anyhow::Result<T> {
        self.map_err(|err| {
            let err: BridgeError = err.into();
            tracing::error!(error = %err, "binding failed");
            anyhow::Error::new(err)
        })
    }
}

/// Guest callbacks registered for gamepad connection changes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GamepadCallbacks {
    pub connected: Option<i32>,
    pub disconnected: Option<i32>,
}

/// Host state reachable from every binding
pub struct HostState {
    pub terminal: Terminal,
    pub handles: HandleTable<HostObject>,
    pub gamepads: Gamepads,
    pub gamepad_callbacks: GamepadCallbacks,
    pub scheduler: Scheduler,
    pub clock: Clock,
    pub(crate) exports: GuestExports,
    pub(crate) memory: Option<Memory>,
}

impl HostState {
    pub fn new(terminal: Terminal, clock: Clock) -> Self {
        Self {
            terminal,
            handles: HandleTable::new(),
            gamepads: Gamepads::new(),
            gamepad_callbacks: GamepadCallbacks::default(),
            scheduler: Scheduler::new(),
            clock,
            exports: GuestExports::default(),
            memory: None,
        }
    }
}

/// Register every binding with the linker
pub fn link(linker: &mut Linker<HostState>) -> anyhow::Result<()> {
    imports::link(linker)?;
    math::link(linker)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handles::Handle;

    #[test]
    fn test_trap_keeps_bridge_error() {
        let result: Result<(), HandleError> = Err(HandleError::Null);
        let err = result.or_trap().unwrap_err();
        let bridge = err.downcast_ref::<BridgeError>().unwrap();
        assert!(bridge.is_contract_violation());
        assert_eq!(
            bridge,
            &BridgeError::Contract(ContractViolation::Handle(HandleError::Null))
        );
    }

    #[test]
    fn test_termination_signal_downcasts() {
        let err = anyhow::Error::new(TerminationSignal { status: 2 });
        assert_eq!(
            err.downcast_ref::<TerminationSignal>(),
            Some(&TerminationSignal { status: 2 })
        );
        assert_eq!(err.to_string(), "guest exited with status 2");
    }

    #[test]
    fn test_error_messages() {
        let err = BridgeError::from(HandleError::Dangling(Handle::from_raw(4)));
        assert_eq!(
            err.to_string(),
            "contract violation: handle #4 does not refer to a live object"
        );
        let err = BridgeError::from(MemoryError::BufferTooSmall {
            needed: 9,
            capacity: 4,
        });
        assert!(err.to_string().contains("9 bytes needed"));
    }
}
