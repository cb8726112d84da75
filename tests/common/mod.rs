//! Helpers shared by the guest-driven tests

#![allow(dead_code)]

use wasm_terminal_host::bridge::ClockKind;
use wasm_terminal_host::runtime::Host;
use wasm_terminal_host::HostConfig;

/// Small memory, virtual time, 20x5 grid
pub fn config() -> HostConfig {
    HostConfig {
        memory_pages: 1,
        clock: ClockKind::Virtual,
        columns: 20,
        rows: 5,
        ..HostConfig::default()
    }
}

/// Wrap guest code in a module that imports memory and exports the plain
/// and integer callback trampolines. Table slot 1 onwards is free for the
/// guest's own `elem` segments.
pub fn guest(imports: &str, body: &str) -> String {
    format!(
        r#"(module
  (type $void (func))
  (type $int (func (param i32)))
  (import "env" "memory" (memory 1))
  {imports}
  (table 8 funcref)
  (func (export "run_callback") (param $f i32)
    (call_indirect (type $void) (local.get $f)))
  (func (export "run_callback_int") (param $f i32) (param $x i32)
    (call_indirect (type $int) (local.get $x) (local.get $f)))
  {body})"#
    )
}

pub fn load(wat: &str) -> Host {
    Host::from_bytes(config(), wat).unwrap()
}
