//! Wasm Terminal Host
//!
//! Opens a window and runs a guest module in it. The module URL comes from
//! the first argument, or the build-time default.

use std::process::ExitCode;

use tracing::{error, info};
use wasm_terminal_host::app::{logging, HostConfig, DEFAULT_MODULE_URL};
use wasm_terminal_host::gui;
use wasm_terminal_host::runtime::Host;

fn main() -> ExitCode {
    logging::init("info");

    let module_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_MODULE_URL.to_string());
    info!(module = %module_url, "starting wasm terminal host");

    match run(HostConfig::for_module(module_url)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("fatal error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: HostConfig) -> Result<(), Box<dyn std::error::Error>> {
    let host = Host::load(config)?;
    gui::run(host)?;
    Ok(())
}
