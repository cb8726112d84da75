//! Lifecycle tests
//!
//! Real guests, written in WAT, driven through load, run and frame ticks.

mod common;

use std::io::Write;

use common::{config, guest, load};
use wasm_terminal_host::bridge::{BridgeError, ContractViolation};
use wasm_terminal_host::runtime::{Host, HostStatus, LoadError, RunError};

const EXIT: &str = r#"(import "env" "_exit" (func $exit (param i32)))"#;

#[test]
fn test_exit_zero_with_nothing_scheduled_halts() {
    let mut host = load(&guest(
        EXIT,
        r#"(func (export "wasm_main") (call $exit (i32.const 0)))"#,
    ));
    assert_eq!(host.run().unwrap(), HostStatus::Halted(0));
    assert!(host.snapshot().spans.is_empty());
}

#[test]
fn test_nonzero_exit_shows_message() {
    let mut host = load(&guest(
        r#"(import "env" "JS_exit" (func $exit (param i32)))"#,
        r#"(func (export "wasm_main") (call $exit (i32.const 2)))"#,
    ));
    assert_eq!(host.run().unwrap(), HostStatus::Halted(2));

    let text = host.snapshot().to_text();
    let lines: Vec<&str> = text.lines().collect();
    // "Process exit with 2 code." wraps at 20 columns
    assert_eq!(
        lines,
        ["Process exit with 2", "code.", "", "Restart the host to", "start over."]
    );
}

#[test]
fn test_entry_returning_normally_is_an_error() {
    let mut host = load(&guest("", r#"(func (export "wasm_main"))"#));
    assert!(matches!(host.run(), Err(RunError::ReturnedNormally)));
    assert_eq!(host.status(), HostStatus::Failed);
    assert_eq!(host.advance_frame().unwrap(), HostStatus::Failed);
}

#[test]
fn test_run_twice() {
    let mut host = load(&guest(
        EXIT,
        r#"(func (export "wasm_main") (call $exit (i32.const 1)))"#,
    ));
    host.run().unwrap();
    assert!(matches!(host.run(), Err(RunError::AlreadyStarted)));
}

#[test]
fn test_missing_import_fails_to_load() {
    let wat = guest(
        r#"(import "env" "JS_not_a_binding" (func))"#,
        r#"(func (export "wasm_main"))"#,
    );
    let result = Host::from_bytes(config(), wat);
    assert!(matches!(result, Err(LoadError::Instantiate(_))));
}

#[test]
fn test_invalid_module_fails_to_compile() {
    let result = Host::from_bytes(config(), b"\0asm garbage");
    assert!(matches!(result, Err(LoadError::Compile(_))));
}

#[test]
fn test_entry_point_with_wrong_signature() {
    let result = Host::from_bytes(config(), r#"(module (func (export "wasm_main") (param i32)))"#);
    assert!(matches!(result, Err(LoadError::ExportType(err)) if err.name == "wasm_main"));
}

#[test]
fn test_load_from_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let wat = guest(EXIT, r#"(func (export "wasm_main") (call $exit (i32.const 5)))"#);
    file.write_all(wat.as_bytes()).unwrap();

    let config = wasm_terminal_host::HostConfig {
        module_url: file.path().to_str().unwrap().to_string(),
        ..config()
    };
    let mut host = Host::load(config).unwrap();
    assert_eq!(host.run().unwrap(), HostStatus::Halted(5));
}

#[test]
fn test_animation_frame_loop() {
    let mut host = load(&guest(
        r#"(import "env" "JS_requestAnimationFrame" (func $raf (param i32) (result i32)))
           (import "env" "JS_write" (func $write (param i32 i32)))
           (import "env" "_exit" (func $exit (param i32)))"#,
        r#"(global $frames (mut i32) (i32.const 0))
           (elem (i32.const 1) $frame)
           (data (i32.const 16) "tick")
           (func $frame
             (global.set $frames (i32.add (global.get $frames) (i32.const 1)))
             (call $write (i32.const 16) (global.get $frames))
             (if (i32.lt_u (global.get $frames) (i32.const 3))
               (then (drop (call $raf (i32.const 1))))
               (else (call $exit (i32.const 0)))))
           (func (export "wasm_main")
             (drop (call $raf (i32.const 1)))
             (call $exit (i32.const 0)))"#,
    ));

    assert_eq!(host.run().unwrap(), HostStatus::Running);
    assert_eq!(host.advance_frame().unwrap(), HostStatus::Running);
    assert_eq!(host.snapshot().to_text().lines().next(), Some("t"));
    assert_eq!(host.advance_frame().unwrap(), HostStatus::Running);
    assert_eq!(host.snapshot().to_text().lines().next(), Some("ti"));
    assert_eq!(host.advance_frame().unwrap(), HostStatus::Halted(0));
    assert_eq!(host.snapshot().to_text().lines().next(), Some("tic"));

    // Halted hosts ignore ticks
    assert_eq!(host.advance_frame().unwrap(), HostStatus::Halted(0));
}

#[test]
fn test_timer_fires_after_its_delay() {
    let mut host = load(&guest(
        r#"(import "env" "JS_setTimeout" (func $timeout (param i32 i32) (result i32)))
           (import "env" "_exit" (func $exit (param i32)))"#,
        r#"(elem (i32.const 1) $late)
           (func $late (call $exit (i32.const 7)))
           (func (export "wasm_main")
             (drop (call $timeout (i32.const 1) (i32.const 50)))
             (call $exit (i32.const 0)))"#,
    ));

    host.run().unwrap();
    // 60 frames per second: three ticks are just short of 50ms
    for _ in 0..3 {
        assert_eq!(host.advance_frame().unwrap(), HostStatus::Running);
    }
    assert_eq!(host.advance_frame().unwrap(), HostStatus::Halted(7));
}

#[test]
fn test_timer_set_by_frame_callback_waits_for_next_tick() {
    let mut host = load(&guest(
        r#"(import "env" "JS_requestAnimationFrame" (func $raf (param i32) (result i32)))
           (import "env" "JS_setTimeout" (func $timeout (param i32 i32) (result i32)))
           (import "env" "_exit" (func $exit (param i32)))"#,
        r#"(elem (i32.const 1) $frame $late)
           (func $frame (drop (call $timeout (i32.const 2) (i32.const 0))))
           (func $late (call $exit (i32.const 7)))
           (func (export "wasm_main")
             (drop (call $raf (i32.const 1)))
             (call $exit (i32.const 0)))"#,
    ));

    assert_eq!(host.run().unwrap(), HostStatus::Running);
    assert_eq!(host.advance_frame().unwrap(), HostStatus::Running);
    assert_eq!(host.advance_frame().unwrap(), HostStatus::Halted(7));
}

#[test]
fn test_cleared_timer_never_fires() {
    let mut host = load(&guest(
        r#"(import "env" "JS_setTimeout" (func $timeout (param i32 i32) (result i32)))
           (import "env" "JS_clearTimeout" (func $clear (param i32)))
           (import "env" "_exit" (func $exit (param i32)))"#,
        r#"(elem (i32.const 1) $late)
           (func $late (call $exit (i32.const 7)))
           (func (export "wasm_main")
             (call $clear (call $timeout (i32.const 1) (i32.const 0)))
             (call $exit (i32.const 0)))"#,
    ));
    assert_eq!(host.run().unwrap(), HostStatus::Halted(0));
}

#[test]
fn test_callback_cancelled_in_same_tick_does_not_fire() {
    // Frame 1 cancels frame 2, which was requested right after it
    let mut host = load(&guest(
        r#"(import "env" "JS_requestAnimationFrame" (func $raf (param i32) (result i32)))
           (import "env" "JS_cancelAnimationFrame" (func $cancel (param i32)))
           (import "env" "_exit" (func $exit (param i32)))"#,
        r#"(global $second (mut i32) (i32.const 0))
           (elem (i32.const 1) $first $boom)
           (func $first (call $cancel (global.get $second)))
           (func $boom (call $exit (i32.const 9)))
           (func (export "wasm_main")
             (drop (call $raf (i32.const 1)))
             (global.set $second (call $raf (i32.const 2)))
             (call $exit (i32.const 0)))"#,
    ));
    assert_eq!(host.run().unwrap(), HostStatus::Running);
    assert_eq!(host.advance_frame().unwrap(), HostStatus::Halted(0));
}

#[test]
fn test_exit_from_callback_with_failure_status() {
    let mut host = load(&guest(
        r#"(import "env" "JS_requestAnimationFrame" (func $raf (param i32) (result i32)))
           (import "env" "_exit" (func $exit (param i32)))"#,
        r#"(elem (i32.const 1) $frame)
           (func $frame (call $exit (i32.const 4)))
           (func (export "wasm_main")
             (drop (call $raf (i32.const 1)))
             (call $exit (i32.const 0)))"#,
    ));
    host.run().unwrap();
    assert_eq!(host.advance_frame().unwrap(), HostStatus::Halted(4));
    assert!(host.snapshot().to_text().starts_with("Process exit with 4"));
}

#[test]
fn test_unbound_callback_export_is_a_contract_violation() {
    let mut host = load(&guest(
        r#"(import "env" "JS_requestAnimationFrame_data" (func $raf (param i32 i32) (result i32)))
           (import "env" "_exit" (func $exit (param i32)))"#,
        r#"(func (export "wasm_main")
             (drop (call $raf (i32.const 1) (i32.const 64)))
             (call $exit (i32.const 0)))"#,
    ));
    host.run().unwrap();

    let err = host.advance_frame().unwrap_err();
    assert_eq!(
        err.bridge_error(),
        Some(&BridgeError::Contract(ContractViolation::UnboundExport(
            "run_callback_ptr"
        )))
    );
    assert_eq!(host.status(), HostStatus::Failed);
}

#[test]
fn test_advance_before_run() {
    let mut host = load(&guest(
        EXIT,
        r#"(func (export "wasm_main") (call $exit (i32.const 0)))"#,
    ));
    assert!(matches!(host.advance_frame(), Err(RunError::NotStarted)));
}
