//! GUI Module
//!
//! A winit window presenting the guest's terminal through a softbuffer
//! surface. The window drives the host: one [`Host::advance_frame`] per
//! display refresh, key presses pushed into the guest's stdin, and a new
//! grid measured on every resize. Physical controllers reach the guest
//! through [`GamepadBackend`].

mod font;
mod gamepad;
mod input;
mod renderer;

use std::rc::Rc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget};
use winit::keyboard::ModifiersState;
use winit::window::{Window, WindowBuilder};

use crate::runtime::{Host, RunError};

pub use font::{FontError, Glyph, GlyphCache};
pub use gamepad::GamepadBackend;
pub use renderer::{RenderError, Renderer};

#[derive(Debug, thiserror::Error)]
pub enum GuiError {
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Open a window and run `host` in it until the window is closed
pub fn run(host: Host) -> Result<(), GuiError> {
    let event_loop = EventLoop::new()?;

    let window_config = &host.config().window;
    let window = WindowBuilder::new()
        .with_title(window_config.title.as_str())
        .with_inner_size(LogicalSize::new(window_config.width, window_config.height))
        .build(&event_loop)?;
    let window = Rc::new(window);

    let mut app = App::new(host, window)?;
    app.start();

    event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { event, .. } => app.handle_window_event(event, elwt),
        Event::AboutToWait => app.tick(elwt),
        _ => {}
    })?;

    Ok(())
}

struct App {
    host: Host,
    window: Rc<Window>,
    renderer: Renderer,
    gamepads: Option<GamepadBackend>,
    modifiers: ModifiersState,
    frame_interval: Duration,
    next_frame: Instant,
    /// Generation of the frame currently on screen
    drawn_generation: Option<u64>,
}

impl App {
    fn new(mut host: Host, window: Rc<Window>) -> Result<Self, GuiError> {
        let renderer = Renderer::new(window.clone(), &host.config().font)?;
        let grid = renderer.grid();
        info!(columns = grid.columns, rows = grid.rows, "terminal size");
        host.resize(grid);

        // Before `run`, so the guest hears about pads already plugged in
        let mut gamepads = GamepadBackend::new();
        if let Some(backend) = gamepads.as_mut() {
            backend.connect_present(host.gamepads_mut());
        }

        let frame_interval = host.config().frame_interval();
        Ok(Self {
            host,
            window,
            renderer,
            gamepads,
            modifiers: ModifiersState::empty(),
            frame_interval,
            next_frame: Instant::now(),
            drawn_generation: None,
        })
    }

    fn start(&mut self) {
        if let Err(err) = self.host.run() {
            report(&err);
        }
        self.play_rumbles();
        self.window.request_redraw();
    }

    fn tick(&mut self, elwt: &EventLoopWindowTarget<()>) {
        if let Some(backend) = self.gamepads.as_mut() {
            backend.poll(self.host.gamepads_mut());
        }

        let now = Instant::now();
        if now >= self.next_frame {
            self.next_frame = now + self.frame_interval;
            if let Err(err) = self.host.advance_frame() {
                report(&err);
            }
            self.play_rumbles();
            if self.drawn_generation != Some(self.host.terminal().frame().generation()) {
                self.window.request_redraw();
            }
        }

        if self.host.status().is_running() {
            elwt.set_control_flow(ControlFlow::WaitUntil(self.next_frame));
        } else {
            elwt.set_control_flow(ControlFlow::Wait);
        }
    }

    fn play_rumbles(&mut self) {
        if let Some(backend) = self.gamepads.as_mut() {
            backend.play_rumbles(self.host.gamepads_mut());
        }
    }

    fn handle_window_event(&mut self, event: WindowEvent, elwt: &EventLoopWindowTarget<()>) {
        match event {
            WindowEvent::CloseRequested => {
                info!("window close requested");
                elwt.exit();
            }
            WindowEvent::Resized(size) => self.handle_resize(size),
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                debug!(scale_factor, "scale factor changed");
                self.renderer.set_scale_factor(scale_factor as f32);
                self.handle_resize(self.window.inner_size());
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = modifiers.state();
            }
            WindowEvent::KeyboardInput { event, .. } => self.handle_key_input(&event),
            WindowEvent::RedrawRequested => self.render(),
            _ => {}
        }
    }

    fn handle_resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.renderer.resize(size.width, size.height);
        self.host.resize(self.renderer.grid());
        self.window.request_redraw();
    }

    fn handle_key_input(&mut self, event: &KeyEvent) {
        if event.state != ElementState::Pressed {
            return;
        }
        let Some(key) = input::key(&event.logical_key) else {
            return;
        };
        if !self.host.push_key(&key, input::modifiers(self.modifiers)) {
            debug!(?key, "key not forwarded");
        }
    }

    fn render(&mut self) {
        let terminal = self.host.terminal();
        let frame = terminal.frame();
        match self
            .renderer
            .render(frame, terminal.grid(), &self.host.config().colors)
        {
            Ok(()) => self.drawn_generation = Some(frame.generation()),
            Err(err) => warn!(error = %err, "render failed"),
        }
    }
}

fn report(err: &RunError) {
    match err.bridge_error() {
        Some(bridge) => error!(error = %bridge, "guest broke the host contract"),
        None => error!(error = %err, "guest stopped"),
    }
}
