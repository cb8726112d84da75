//! Host Runtime
//!
//! Loads a guest module, links the bridge, runs the entry point and then
//! drives the guest one display refresh at a time.
//!
//! # Lifecycle
//!
//! A host starts [`HostStatus::Loaded`]. [`Host::run`] calls the entry point,
//! which is expected to schedule its frame callbacks and exit with status 0;
//! the host then keeps [`HostStatus::Running`] while the guest has anything
//! left to react to. Any nonzero exit, or an exit from inside a callback,
//! halts the host for good.

mod fetch;

pub use fetch::fetch_module;

use tracing::{debug, error, info, warn};
use wasmtime::{Engine, Memory, MemoryType, Module, Store, TypedFunc};

use crate::app::HostConfig;
use crate::bridge::{
    self, dispatch, BridgeError, Clock, ClockKind, ExportTypeError, GuestExports, HostState,
    TerminationSignal, IMPORT_MODULE,
};
use crate::gamepad::{GamepadEvent, Gamepads};
use crate::input::{encode_key, Key, Modifiers};
use crate::scheduler::GuestCallback;
use crate::terminal::{FrameSnapshot, Grid, Terminal};

/// Failure to bring a guest module up
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to fetch guest module `{url}`")]
    Fetch {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("unsupported module URL `{0}`")]
    UnsupportedScheme(String),

    #[error("failed to compile guest module")]
    Compile(#[source] anyhow::Error),

    #[error("failed to allocate {pages} pages of linear memory")]
    Memory {
        pages: u32,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to register host bindings")]
    Link(#[source] anyhow::Error),

    #[error("failed to instantiate guest module")]
    Instantiate(#[source] anyhow::Error),

    #[error("guest module does not export `{0}`")]
    MissingExport(String),

    #[error(transparent)]
    ExportType(#[from] ExportTypeError),
}

/// Failure while driving a loaded guest
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("guest has already been started")]
    AlreadyStarted,

    #[error("guest has not been started")]
    NotStarted,

    #[error("entry point returned without calling exit")]
    ReturnedNormally,

    #[error("guest failed: {0}")]
    Guest(#[source] anyhow::Error),
}

impl RunError {
    /// The typed bridge failure behind a guest trap, if there is one
    pub fn bridge_error(&self) -> Option<&BridgeError> {
        match self {
            RunError::Guest(err) => err.downcast_ref::<BridgeError>(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostStatus {
    Loaded,
    Running,
    /// The guest exited with this status
    Halted(i32),
    /// The guest trapped or broke the lifecycle contract
    Failed,
}

impl HostStatus {
    pub fn is_running(self) -> bool {
        self == HostStatus::Running
    }

    pub fn is_finished(self) -> bool {
        matches!(self, HostStatus::Halted(_) | HostStatus::Failed)
    }

    pub fn exit_status(self) -> Option<i32> {
        match self {
            HostStatus::Halted(status) => Some(status),
            _ => None,
        }
    }
}

/// Message drawn on the terminal when the guest exits with a failure status
pub fn exit_message(status: i32) -> String {
    format!("Process exit with {status} code.\n\nRestart the host to start over.")
}

/// A loaded guest and everything it can see
pub struct Host {
    store: Store<HostState>,
    entry: TypedFunc<(), ()>,
    config: HostConfig,
    status: HostStatus,
}

impl Host {
    /// Fetch, compile and instantiate the module named by `config.module_url`
    pub fn load(config: HostConfig) -> Result<Self, LoadError> {
        let bytes = fetch_module(&config.module_url)?;
        Self::from_bytes(config, &bytes)
    }

    /// Compile and instantiate a module from memory (binary or text format)
    pub fn from_bytes(config: HostConfig, bytes: impl AsRef<[u8]>) -> Result<Self, LoadError> {
        let engine = Engine::default();
        let module = Module::new(&engine, bytes).map_err(LoadError::Compile)?;

        let state = HostState::new(Terminal::new(config.grid()), Clock::new(config.clock));
        let mut store = Store::new(&engine, state);
        let mut linker = wasmtime::Linker::new(&engine);
        bridge::link(&mut linker).map_err(LoadError::Link)?;

        let imports_memory = module
            .imports()
            .any(|import| import.module() == IMPORT_MODULE && import.name() == "memory");
        if imports_memory {
            let pages = config.memory_pages;
            let memory = Memory::new(&mut store, MemoryType::new(pages, Some(pages)))
                .map_err(|source| LoadError::Memory { pages, source })?;
            linker
                .define(&store, IMPORT_MODULE, "memory", memory)
                .map_err(LoadError::Link)?;
            store.data_mut().memory = Some(memory);
            debug!(pages, "linear memory provided by host");
        }

        let instance = linker
            .instantiate(&mut store, &module)
            .map_err(LoadError::Instantiate)?;

        if let Some(memory) = instance.get_memory(&mut store, "memory") {
            store.data_mut().memory = Some(memory);
        }

        let entry = instance
            .get_func(&mut store, &config.entry_point)
            .ok_or_else(|| LoadError::MissingExport(config.entry_point.clone()))?
            .typed::<(), ()>(&store)
            .map_err(|source| ExportTypeError {
                name: config.entry_point.clone(),
                source,
            })?;

        let exports = GuestExports::resolve(&instance, &mut store)?;
        info!(
            entry = %config.entry_point,
            exports = ?exports.bound_names(),
            memory = store.data().memory.is_some(),
            "guest module loaded"
        );
        store.data_mut().exports = exports;

        Ok(Self {
            store,
            entry,
            config,
            status: HostStatus::Loaded,
        })
    }

    /// Call the entry point. Allowed once.
    pub fn run(&mut self) -> Result<HostStatus, RunError> {
        if self.status != HostStatus::Loaded {
            return Err(RunError::AlreadyStarted);
        }
        self.status = HostStatus::Running;
        info!(entry = %self.config.entry_point, "starting guest");

        match self.entry.call(&mut self.store, ()) {
            Ok(()) => {
                warn!("entry point returned without calling exit");
                self.fail();
                Err(RunError::ReturnedNormally)
            }
            Err(err) => self.recover(err, true),
        }
    }

    /// One display refresh: gamepad notifications, then animation frames,
    /// then expired timers.
    pub fn advance_frame(&mut self) -> Result<HostStatus, RunError> {
        match self.status {
            HostStatus::Loaded => return Err(RunError::NotStarted),
            HostStatus::Halted(_) | HostStatus::Failed => return Ok(self.status),
            HostStatus::Running => {}
        }

        if self.store.data().clock.kind() == ClockKind::Virtual {
            let step = self.config.frame_interval();
            self.store.data_mut().clock.advance(step);
        }

        match self.tick() {
            Ok(()) => {
                if self.is_idle() {
                    info!("guest has nothing left to run");
                    self.halt(0);
                }
                Ok(self.status)
            }
            Err(err) => self.recover(err, false),
        }
    }

    fn tick(&mut self) -> anyhow::Result<()> {
        // Work requested by a callback in this tick waits for the next one
        let now = self.store.data().clock.elapsed();
        let timers = self.store.data().scheduler.due_timers(now);
        let frames = self.store.data().scheduler.pending_frames();

        let events = self.store.data_mut().gamepads.drain_events();
        for event in events {
            let callbacks = self.store.data().gamepad_callbacks;
            let (callback, index) = match event {
                GamepadEvent::Connected(index) => (callbacks.connected, index),
                GamepadEvent::Disconnected(index) => (callbacks.disconnected, index),
            };
            if let Some(func) = callback {
                let param = i32::try_from(index).unwrap_or(i32::MAX);
                dispatch(&mut self.store, GuestCallback::WithInt { func, param })?;
            }
        }

        for id in frames {
            // cancelled by an earlier callback in this tick
            let Some(callback) = self.store.data_mut().scheduler.take_frame(id) else {
                continue;
            };
            dispatch(&mut self.store, callback)?;
        }

        for id in timers {
            let Some(callback) = self.store.data_mut().scheduler.take_timer(id) else {
                continue;
            };
            dispatch(&mut self.store, callback)?;
        }

        Ok(())
    }

    fn recover(&mut self, err: anyhow::Error, from_entry: bool) -> Result<HostStatus, RunError> {
        let Some(signal) = err.downcast_ref::<TerminationSignal>().copied() else {
            error!(error = %err, "guest trapped");
            self.fail();
            return Err(RunError::Guest(err));
        };

        if signal.status != 0 {
            let message = exit_message(signal.status);
            self.store.data_mut().terminal.print_message(&message);
        }

        if signal.status == 0 && from_entry && !self.is_idle() {
            info!("entry point finished, running scheduled callbacks");
        } else {
            self.halt(signal.status);
        }
        Ok(self.status)
    }

    fn is_idle(&self) -> bool {
        let state = self.store.data();
        let callbacks = state.gamepad_callbacks;
        !state.scheduler.has_pending()
            && callbacks.connected.is_none()
            && callbacks.disconnected.is_none()
    }

    fn halt(&mut self, status: i32) {
        info!(status, "guest halted");
        self.status = HostStatus::Halted(status);
        self.store.data_mut().scheduler.clear();
    }

    fn fail(&mut self) {
        self.status = HostStatus::Failed;
        self.store.data_mut().scheduler.clear();
    }

    pub fn status(&self) -> HostStatus {
        self.status
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn state(&self) -> &HostState {
        self.store.data()
    }

    pub fn terminal(&self) -> &Terminal {
        &self.store.data().terminal
    }

    pub fn terminal_mut(&mut self) -> &mut Terminal {
        &mut self.store.data_mut().terminal
    }

    pub fn gamepads_mut(&mut self) -> &mut Gamepads {
        &mut self.store.data_mut().gamepads
    }

    pub fn resize(&mut self, grid: Grid) {
        self.terminal_mut().resize(grid);
    }

    /// Forward a key press to the guest's stdin. Returns false for keys
    /// that have no byte encoding.
    pub fn push_key(&mut self, key: &Key, modifiers: Modifiers) -> bool {
        match encode_key(key, modifiers) {
            Some(byte) => {
                self.terminal_mut().push_input(byte);
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self) -> FrameSnapshot {
        self.terminal().snapshot()
    }

}
