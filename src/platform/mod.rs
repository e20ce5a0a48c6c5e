//=========================================================================
// Window Host
//
// Drives an `Engine` from the Winit event loop.
//
// Architecture:
// ```text
//  Main Thread:                         Any Thread:
//  ┌──────────────────────────────┐    ┌──────────────────┐
//  │  Winit Event Loop            │    │  HostHandle      │
//  │   ↓                          │    │   request_exit() │
//  │  RedrawRequested             │    └────────┬─────────┘
//  │   ↓ advance(now)             │             │
//  │   ├─ drain HostCommand ◄─────┼─────────────┘
//  │   ├─ delta = now - last      │   crossbeam channel
//  │   └─ Engine::tick(delta)     │
//  │   ↓                          │
//  │  request_redraw()            │
//  │                              │
//  │  CloseRequested / Exit       │
//  │   └─ Engine::destroy()       │
//  └──────────────────────────────┘
// ```
//
// Key Design Decisions:
// - **RedrawRequested = frame boundary**: one engine tick per redraw,
//   paced by the display like a browser animation callback
// - **Main thread requirement**: Winit mandates main thread on macOS/iOS,
//   so the host runs on the thread that called `Engine::run()`
// - **Tick failures are logged**: an aborted tick does not stop the loop;
//   the next redraw ticks again
//
//=========================================================================

//=== External Crates =====================================================

use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use log::*;
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowAttributes},
};

//=== Internal Imports ====================================================

use crate::engine::Engine;

//=== HostCommand =========================================================

/// Commands sent to a running [`WindowHost`] from outside the event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    /// Destroy the engine and leave the event loop at the next frame.
    Exit,
}

//=== HostHandle ==========================================================

/// Cloneable, thread-safe sender of [`HostCommand`]s.
#[derive(Debug, Clone)]
pub struct HostHandle {
    sender: Sender<HostCommand>,
}

impl HostHandle {
    /// Asks the host to shut down. Returns false if the host is gone.
    pub fn request_exit(&self) -> bool {
        self.sender.send(HostCommand::Exit).is_ok()
    }
}

//=== HostError ===========================================================

/// Event loop failures.
///
/// These are fatal: without an event loop the engine cannot be driven.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Failed to create event loop (rare, indicates OS-level issue).
    #[error("event loop creation failed: {0}")]
    EventLoopCreation(#[source] winit::error::EventLoopError),

    /// Event loop execution error.
    #[error("event loop error: {0}")]
    EventLoopExecution(#[source] winit::error::EventLoopError),
}

//=== WindowHost ==========================================================

/// Owns a started [`Engine`] and ticks it once per redraw.
///
/// # Lifecycle
///
/// 1. **Construction**: `WindowHost::new(engine)`
/// 2. **Execution**: `host.run()` blocks in the Winit event loop
/// 3. **Frames**: every `RedrawRequested` ticks the engine with the time
///    elapsed since the previous redraw
/// 4. **Shutdown**: window close or [`HostHandle::request_exit`] destroys
///    the engine and exits the loop
///
/// # Examples
///
/// ```no_run
/// use std::thread;
/// use std::time::Duration;
/// use aetheric_runtime::prelude::*;
///
/// let mut engine = EngineBuilder::new().with_window("Demo", 640, 480).build();
/// engine.start(&toml::Table::new())?;
///
/// let host = WindowHost::new(engine);
/// let handle = host.handle();
/// thread::spawn(move || {
///     thread::sleep(Duration::from_secs(5));
///     handle.request_exit();
/// });
///
/// host.run()?;
/// # Ok::<(), EngineError>(())
/// ```
pub struct WindowHost {
    engine: Engine,

    /// OS window handle (None until `resumed()` called).
    window: Option<Window>,

    /// Timestamp of the previous frame (None before the first one).
    last_frame: Option<Instant>,

    commands: Receiver<HostCommand>,
    sender: Sender<HostCommand>,
}

impl WindowHost {
    //--- Construction -----------------------------------------------------

    /// Wraps an engine. The window is created lazily in `resumed()`.
    pub fn new(engine: Engine) -> Self {
        let (sender, commands) = unbounded();
        info!(target: "host", "Window host initialized");
        Self {
            engine,
            window: None,
            last_frame: None,
            commands,
            sender,
        }
    }

    /// Returns a handle that can stop the host from any thread.
    pub fn handle(&self) -> HostHandle {
        HostHandle {
            sender: self.sender.clone(),
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    //--- Execution --------------------------------------------------------

    /// Runs the Winit event loop until the window closes.
    ///
    /// # Errors
    ///
    /// Returns [`HostError`] if the event loop cannot be created or fails.
    ///
    /// # Panics
    ///
    /// Panics if called off the main thread (macOS/iOS Winit requirement).
    pub fn run(mut self) -> Result<(), HostError> {
        debug!(target: "host", "Starting Winit event loop");

        let event_loop = EventLoop::new().map_err(HostError::EventLoopCreation)?;
        let result = event_loop.run_app(&mut self).map_err(HostError::EventLoopExecution);

        self.engine.destroy();
        info!(target: "host", "Event loop exited");
        result
    }

    /// Runs one frame at `now`.
    ///
    /// Pending commands are handled first. Returns false once the engine
    /// is no longer running and the loop should exit.
    pub(crate) fn advance(&mut self, now: Instant) -> bool {
        if self.drain_commands() {
            self.shutdown();
            return false;
        }
        if !self.engine.is_running() {
            return false;
        }

        let delta = self
            .last_frame
            .map_or(Duration::ZERO, |last| now.saturating_duration_since(last));
        self.last_frame = Some(now);

        if let Err(e) = self.engine.tick(delta) {
            warn!(target: "host", "Frame {} aborted: {}", self.engine.frame(), e);
        }
        self.engine.is_running()
    }

    //--- Internal Helpers -------------------------------------------------

    /// Returns true if an exit was requested.
    fn drain_commands(&mut self) -> bool {
        let mut exit = false;
        loop {
            match self.commands.try_recv() {
                Ok(HostCommand::Exit) => exit = true,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        exit
    }

    fn shutdown(&mut self) {
        info!(target: "host", "Shutting down after {} frames", self.engine.frame());
        self.engine.destroy();
        self.window = None;
    }
}

//=== Winit Integration ===================================================

impl ApplicationHandler for WindowHost {
    /// Creates the window if it doesn't exist yet. On mobile, this may be
    /// called multiple times (suspend/resume cycle).
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            debug!(target: "host", "Window already exists (mobile resume?)");
            return;
        }

        let config = self.engine.config();
        let attrs = WindowAttributes::default()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(config.window_width, config.window_height));

        match event_loop.create_window(attrs) {
            Ok(window) => {
                info!(
                    target: "host",
                    "Window created: {}x{} @ {}x DPI",
                    window.inner_size().width,
                    window.inner_size().height,
                    window.scale_factor()
                );
                window.request_redraw();
                self.window = Some(window);
            }
            Err(e) => {
                error!(target: "host", "Window creation failed: {}", e);
                self.shutdown();
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                info!(target: "host", "Window close requested");
                self.shutdown();
                event_loop.exit();
            }

            WindowEvent::RedrawRequested => {
                if !self.advance(Instant::now()) {
                    event_loop.exit();
                    return;
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }

            _ => {}
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
