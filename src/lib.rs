//! Wasm Terminal Host Library
//!
//! Runs a WebAssembly guest behind a character-cell terminal. The guest
//! renders by writing text with colour escapes, reads keyboard input one
//! byte at a time, schedules its own frame callbacks and may poll gamepads
//! through opaque handles.
//!
//! - `runtime`: module loading, entry point, per-frame driving
//! - `bridge`: every function the guest imports, plus its error model
//! - `terminal`: escape parsing, line wrapping, frames and stdin
//! - `handles`: host objects named by small integers
//! - `memory`: bounds-checked views of guest linear memory
//! - `scheduler`, `gamepad`, `input`: host models of the browser primitives
//! - `gui`: winit front end (optional feature)

pub mod app;
pub mod bridge;
pub mod gamepad;
pub mod handles;
pub mod input;
pub mod memory;
pub mod runtime;
pub mod scheduler;
pub mod terminal;

#[cfg(feature = "gui")]
pub mod gui;

pub use app::HostConfig;
pub use runtime::{Host, HostStatus, LoadError, RunError};
