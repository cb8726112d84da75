//! Headless Guest Runner
//!
//! Runs a guest module without a window for a fixed number of frames on a
//! virtual clock, then prints the terminal as text or JSON. Output is
//! deterministic for a given module, input and frame count.

use std::fs::File;
use std::io::{self, Write};
use std::process::ExitCode;

use tracing::{error, info};
use wasm_terminal_host::app::{logging, HostConfig, DEFAULT_MODULE_URL};
use wasm_terminal_host::bridge::ClockKind;
use wasm_terminal_host::gamepad::GamepadLayout;
use wasm_terminal_host::runtime::{Host, HostStatus, RunError};

/// Command-line arguments
struct Args {
    module: String,
    /// Frames to run after the entry point
    frames: u32,
    cols: usize,
    rows: usize,
    /// Bytes queued on the guest's stdin before it starts
    input: Vec<u8>,
    /// Ids of gamepads connected before the guest starts
    gamepads: Vec<String>,
    output: Option<String>,
    json: bool,
    help: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            module: DEFAULT_MODULE_URL.to_string(),
            frames: 60,
            cols: 80,
            rows: 24,
            input: Vec::new(),
            gamepads: Vec::new(),
            output: None,
            json: false,
            help: false,
        }
    }
}

fn parse_args(argv: &[String]) -> Result<Args, String> {
    let mut args = Args::default();
    let mut i = 0;
    let value = |i: &mut usize, flag: &str| -> Result<String, String> {
        *i += 1;
        argv.get(*i)
            .cloned()
            .ok_or_else(|| format!("{flag} needs a value"))
    };

    while i < argv.len() {
        match argv[i].as_str() {
            "-h" | "--help" => args.help = true,
            "-n" | "--frames" => {
                let raw = value(&mut i, "--frames")?;
                args.frames = raw.parse().map_err(|_| format!("bad frame count `{raw}`"))?;
            }
            "-c" | "--cols" => {
                let raw = value(&mut i, "--cols")?;
                args.cols = raw.parse().map_err(|_| format!("bad column count `{raw}`"))?;
            }
            "-r" | "--rows" => {
                let raw = value(&mut i, "--rows")?;
                args.rows = raw.parse().map_err(|_| format!("bad row count `{raw}`"))?;
            }
            "-k" | "--keys" => args.input.extend(value(&mut i, "--keys")?.bytes()),
            "-i" | "--input" => {
                let path = value(&mut i, "--input")?;
                let bytes = std::fs::read(&path)
                    .map_err(|err| format!("cannot read `{path}`: {err}"))?;
                args.input.extend(bytes);
            }
            "-g" | "--gamepad" => args.gamepads.push(value(&mut i, "--gamepad")?),
            "-o" | "--output" => args.output = Some(value(&mut i, "--output")?),
            "-j" | "--json" => args.json = true,
            "-t" | "--text" => args.json = false,
            flag if flag.starts_with('-') => return Err(format!("unknown option `{flag}`")),
            module => args.module = module.to_string(),
        }
        i += 1;
    }

    Ok(args)
}

fn print_help() {
    eprintln!(
        r#"wasm-terminal-headless - run a terminal guest without a window

USAGE:
    wasm-terminal-headless [OPTIONS] [MODULE]

OPTIONS:
    -h, --help              Show this help message
    -n, --frames <N>        Frames to run after the entry point (default: 60)
    -c, --cols <N>          Terminal columns (default: 80)
    -r, --rows <N>          Terminal rows (default: 24)
    -k, --keys <TEXT>       Queue TEXT on the guest's stdin
    -i, --input <FILE>      Queue the bytes of FILE on the guest's stdin
    -g, --gamepad <ID>      Connect a standard gamepad before starting
    -o, --output <FILE>     Write the snapshot to FILE instead of stdout
    -j, --json              Print the snapshot as JSON
    -t, --text              Print the snapshot as text (default)

MODULE is a path, file:// URL or http(s):// URL (default: {DEFAULT_MODULE_URL}).
The process exits with the guest's exit status.
"#
    );
}

fn main() -> ExitCode {
    logging::init("warn");

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let args = match parse_args(&argv) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("error: {message}");
            print_help();
            return ExitCode::FAILURE;
        }
    };
    if args.help {
        print_help();
        return ExitCode::SUCCESS;
    }

    match run(&args) {
        Ok(status) => exit_code(status),
        Err(message) => {
            error!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<HostStatus, String> {
    let config = HostConfig {
        module_url: args.module.clone(),
        clock: ClockKind::Virtual,
        columns: args.cols,
        rows: args.rows,
        ..HostConfig::default()
    };
    let mut host = Host::load(config).map_err(|err| format!("{err}: {}", source_chain(&err)))?;

    for id in &args.gamepads {
        host.gamepads_mut().connect(id.as_str(), GamepadLayout::STANDARD);
    }
    for &byte in &args.input {
        host.terminal_mut().push_input(byte);
    }

    let mut status = host.run().map_err(|err| describe(&err))?;
    let mut frames = 0;
    while status.is_running() && frames < args.frames {
        status = host.advance_frame().map_err(|err| describe(&err))?;
        frames += 1;
    }
    info!(frames, ?status, "headless run finished");

    let snapshot = host.snapshot();
    let output = if args.json {
        snapshot.to_json().map_err(|err| err.to_string())?
    } else {
        snapshot.to_text()
    };
    write_output(args.output.as_deref(), &output).map_err(|err| err.to_string())?;

    Ok(status)
}

fn write_output(path: Option<&str>, output: &str) -> io::Result<()> {
    match path {
        Some(path) => File::create(path)?.write_all(output.as_bytes()),
        None => io::stdout().write_all(output.as_bytes()),
    }
}

fn describe(err: &RunError) -> String {
    match err.bridge_error() {
        Some(bridge) => format!("{err} ({bridge})"),
        None => err.to_string(),
    }
}

fn source_chain(err: &dyn std::error::Error) -> String {
    let mut chain = Vec::new();
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push(cause.to_string());
        source = cause.source();
    }
    chain.join(": ")
}

fn exit_code(status: HostStatus) -> ExitCode {
    ExitCode::from(process_status(status))
}

/// Process exit status for a host status. Guest statuses that do not fit
/// in 1..=255 become 1 so a failure never reads as success.
fn process_status(status: HostStatus) -> u8 {
    match status {
        HostStatus::Halted(0) | HostStatus::Loaded | HostStatus::Running => 0,
        HostStatus::Halted(code) => u8::try_from(code).unwrap_or(1),
        HostStatus::Failed => 1,
    }
}
