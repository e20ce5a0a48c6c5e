//=========================================================================
// Aetheric Engine
//
// Main entry point and frame scheduler.
//
// Architecture:
// ```text
//     EngineBuilder  ──build()──>  Engine  ──start()──>  Running
//         │                          │                     │
//         ├─ with_config()           ├─ init(|injector|)   ├─ tick(delta) × N
//         ├─ with_fault_policy()     └─ injector_mut()     └─ destroy()
//         └─ with_baseline_toml()                                │
//                                                            Destroyed
// ```
//
// Lifecycle:
//   NotStarted ──start()──> Running ──destroy()──> Destroyed (terminal)
//
// A tick runs the six phases in order. Each phase visits every enabled
// manager in resolution order. The signals manager delivers queued
// signals during `update`, so signals dispatched in `pre_update` arrive
// in the same tick and signals dispatched later arrive in the next one.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::HashSet;
use std::time::{Duration, Instant};

use log::{debug, error, info, trace, warn};

//=== Internal Dependencies ===============================================

use crate::core::config::{ConfigError, EngineConfig, FaultPolicy};
use crate::core::injector::{Injector, InjectorError};
use crate::core::manager::{FrameContext, ManagerError, ManagerHandle, Phase};
use crate::core::profiler::FrameProfiler;
use crate::core::signals::SignalsManager;
use crate::core::{BoxError, Shared};
use crate::platform::{HostError, WindowHost};

//=== EngineBuilder =======================================================

/// Builder for configuring and constructing an [`Engine`].
///
/// The built engine owns an [`Injector`] that already contains a
/// [`SignalsManager`] under [`SignalsManager::ID`].
///
/// # Default Values
///
/// - **Max frame delta**: 250 ms
/// - **Fault policy**: [`FaultPolicy::Abort`]
/// - **Profiling**: enabled, summary every 300 frames
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use aetheric_runtime::prelude::*;
///
/// let engine = EngineBuilder::new()
///     .with_max_frame_delta(Duration::from_millis(100))
///     .with_fault_policy(FaultPolicy::Isolate)
///     .build();
///
/// assert_eq!(engine.state(), EngineState::NotStarted);
/// ```
pub struct EngineBuilder {
    config: EngineConfig,
}

impl EngineBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    /// Replaces the whole baseline configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Parses a TOML document as the baseline configuration.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] if the document is not valid.
    pub fn with_baseline_toml(mut self, source: &str) -> Result<Self, ConfigError> {
        self.config = EngineConfig::from_toml_str(source)?;
        Ok(self)
    }

    /// Sets the upper bound applied to every tick's delta.
    pub fn with_max_frame_delta(mut self, max: Duration) -> Self {
        self.config.max_frame_delta_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets how a tick reacts to a failing manager hook.
    pub fn with_fault_policy(mut self, policy: FaultPolicy) -> Self {
        self.config.fault_policy = policy;
        self
    }

    /// Enables or disables per-phase timing.
    pub fn with_profiling(mut self, enabled: bool) -> Self {
        self.config.profiling = enabled;
        self
    }

    /// Sets the title and logical size of the window opened by
    /// [`Engine::run`].
    pub fn with_window(mut self, title: impl Into<String>, width: u32, height: u32) -> Self {
        self.config.window_title = title.into();
        self.config.window_width = width;
        self.config.window_height = height;
        self
    }

    /// Builds the engine instance.
    pub fn build(self) -> Engine {
        info!(
            target: "engine",
            "Building engine (max delta: {} ms, faults: {:?}, profiling: {})",
            self.config.max_frame_delta_ms,
            self.config.fault_policy,
            self.config.profiling
        );

        Engine {
            injector: Injector::with_signals(),
            config: self.config.clone(),
            baseline: self.config,
            state: EngineState::NotStarted,
            managers: Vec::new(),
            set_up: HashSet::new(),
            profiler: None,
            frame: 0,
            elapsed: Duration::ZERO,
        }
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//=== EngineState =========================================================

/// Position of an [`Engine`] in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    NotStarted,
    Running,
    /// Terminal. `start()` no longer has any effect.
    Destroyed,
}

//=== EngineError =========================================================

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Injector(#[from] InjectorError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Manager(#[from] ManagerError),

    #[error("service '{id}' failed during setup: {source}")]
    Service {
        id: String,
        #[source]
        source: BoxError,
    },

    #[error(transparent)]
    Host(#[from] HostError),
}

//=== Engine ==============================================================

/// Aetheric Engine runtime.
///
/// Owns the [`Injector`] and drives every constructed manager through the
/// frame phases. Create via [`EngineBuilder`].
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use aetheric_runtime::prelude::*;
///
/// #[derive(Default)]
/// struct Ticker {
///     frames: u64,
/// }
///
/// impl Manager for Ticker {
///     fn update(&mut self, frame: &FrameContext) -> PhaseResult {
///         self.frames = frame.frame;
///         Ok(())
///     }
/// }
///
/// let mut engine = EngineBuilder::new()
///     .build()
///     .init(|injector| injector.register_manager("ticker", |_| Ok(Ticker::default())))?;
///
/// engine.start(&toml::Table::new())?;
/// engine.tick(Duration::from_millis(16))?;
/// engine.tick(Duration::from_millis(16))?;
///
/// let ticker = engine.injector().resolve::<Ticker>("ticker")?;
/// assert_eq!(ticker.borrow().frames, 2);
///
/// engine.destroy();
/// # Ok::<(), EngineError>(())
/// ```
pub struct Engine {
    injector: Injector,
    baseline: EngineConfig,
    config: EngineConfig,
    state: EngineState,
    managers: Vec<ManagerHandle>,
    /// Ids whose boot-time setup has completed.
    set_up: HashSet<String>,
    profiler: Option<Shared<FrameProfiler>>,
    frame: u64,
    elapsed: Duration,
}

impl Engine {
    //--- Initialization ---------------------------------------------------

    /// Registers the application's objects before the engine starts.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use aetheric_runtime::prelude::*;
    /// struct Audio;
    /// impl Service for Audio {}
    ///
    /// let engine = EngineBuilder::new().build().init(|injector| {
    ///     injector.register_service("audio", |_| Ok(Audio))?;
    ///     injector.register_instance("difficulty", 3u8)
    /// })?;
    ///
    /// assert!(engine.injector().contains("audio"));
    /// # Ok::<(), InjectorError>(())
    /// ```
    pub fn init<F>(mut self, init_fn: F) -> Result<Self, InjectorError>
    where
        F: FnOnce(&mut Injector) -> Result<(), InjectorError>,
    {
        info!(target: "engine", "Initializing engine registrations");
        init_fn(&mut self.injector)?;
        Ok(self)
    }

    //--- Lifecycle --------------------------------------------------------

    /// Boots the engine.
    ///
    /// 1. Merges `overrides` into the baseline configuration
    /// 2. Registers the configuration under `"config"` and the frame
    ///    profiler under `"profiler"` unless the application already did
    /// 3. Builds the injector in registration order
    /// 4. Sets up managers, then services, then signals
    ///
    /// Calling `start` on a running or destroyed engine does nothing.
    ///
    /// # Errors
    ///
    /// Any configuration, construction or setup failure. The engine stays
    /// [`EngineState::NotStarted`] and `start` may be called again; objects
    /// whose setup already succeeded are not set up a second time.
    pub fn start(&mut self, overrides: &toml::Table) -> Result<(), EngineError> {
        match self.state {
            EngineState::Running => {
                debug!(target: "engine", "start() ignored: engine already running");
                return Ok(());
            }
            EngineState::Destroyed => {
                warn!(target: "engine", "start() ignored: engine has been destroyed");
                return Ok(());
            }
            EngineState::NotStarted => {}
        }

        info!(target: "engine", "Starting engine ({} registrations)", self.injector.len());

        //--- 1. Configuration ---------------------------------------------
        if !self.injector.contains(EngineConfig::ID) {
            self.injector.register_instance(EngineConfig::ID, self.baseline.clone())?;
        }
        let config = self.injector.resolve::<EngineConfig>(EngineConfig::ID)?;
        let merged = config.borrow().with_overrides(overrides)?;
        *config.borrow_mut() = merged.clone();
        self.config = merged;

        //--- 2. Profiler --------------------------------------------------
        if !self.injector.contains(FrameProfiler::ID) {
            let (enabled, period) = (self.config.profiling, self.config.profile_log_period);
            self.injector.register_service(FrameProfiler::ID, move |_| {
                Ok(FrameProfiler::new(enabled, period))
            })?;
        }
        let profiler = self.injector.resolve::<FrameProfiler>(FrameProfiler::ID)?;

        //--- 3. Construction ----------------------------------------------
        self.injector.build()?;

        //--- 4. Setup -----------------------------------------------------
        // Objects set up by an earlier, failed attempt are skipped.
        let managers = self.injector.managers();
        for handle in &managers {
            if !self.set_up.contains(handle.id()) {
                handle.setup()?;
                self.set_up.insert(handle.id().to_string());
            }
        }
        for entry in self.injector.service_entries() {
            if self.set_up.contains(&entry.id) {
                continue;
            }
            entry.setup().map_err(|source| {
                error!(target: "engine", "Service '{}' failed during setup: {}", entry.id, source);
                EngineError::Service { id: entry.id.clone(), source }
            })?;
            self.set_up.insert(entry.id);
        }
        for entry in self.injector.signal_entries() {
            if self.set_up.insert(entry.id.clone()) {
                entry.setup();
            }
        }

        self.managers = managers;
        self.profiler = Some(profiler);
        self.state = EngineState::Running;
        info!(target: "engine", "Engine running ({} managers)", self.managers.len());
        Ok(())
    }

    /// Advances one frame.
    ///
    /// `delta` is clamped to the configured maximum. Outside
    /// [`EngineState::Running`] the call does nothing.
    ///
    /// # Errors
    ///
    /// Under [`FaultPolicy::Abort`], the first failing hook stops the tick
    /// and its [`ManagerError`] is returned. Under [`FaultPolicy::Isolate`]
    /// failures are logged and the tick always succeeds.
    pub fn tick(&mut self, delta: Duration) -> Result<(), EngineError> {
        if self.state != EngineState::Running {
            trace!(target: "engine", "tick() ignored in state {:?}", self.state);
            return Ok(());
        }

        let delta = delta.min(self.config.max_frame_delta());
        self.frame += 1;
        self.elapsed += delta;
        let frame = FrameContext {
            frame: self.frame,
            delta,
            elapsed: self.elapsed,
        };

        for phase in Phase::ALL {
            let started = Instant::now();
            for handle in &self.managers {
                if let Err(err) = handle.run_phase(phase, &frame) {
                    error!(target: "engine", "Frame {}: {}", frame.frame, err);
                    match self.config.fault_policy {
                        FaultPolicy::Abort => return Err(err.into()),
                        FaultPolicy::Isolate => continue,
                    }
                }
            }
            self.record_phase(phase, started.elapsed());
        }

        self.end_profiled_frame();
        Ok(())
    }

    /// Tears down every constructed object and moves to
    /// [`EngineState::Destroyed`]. Later calls do nothing.
    pub fn destroy(&mut self) {
        if self.state == EngineState::Destroyed {
            return;
        }
        info!(target: "engine", "Destroying engine after {} frames", self.frame);

        self.managers.clear();
        self.profiler = None;
        self.injector.destroy();
        self.state = EngineState::Destroyed;
    }

    /// Starts the engine and hands it to a [`WindowHost`], blocking until
    /// the window closes.
    ///
    /// # Errors
    ///
    /// Boot failures from [`Engine::start`], or [`HostError`] if the event
    /// loop cannot be created.
    pub fn run(mut self, overrides: &toml::Table) -> Result<(), EngineError> {
        self.start(overrides)?;
        WindowHost::new(self).run()?;
        Ok(())
    }

    //--- Accessors --------------------------------------------------------

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == EngineState::Running
    }

    pub fn injector(&self) -> &Injector {
        &self.injector
    }

    /// Mutable access for registrations. Registering fails once the engine
    /// has started.
    pub fn injector_mut(&mut self) -> &mut Injector {
        &mut self.injector
    }

    /// Effective configuration: the baseline before `start()`, the merged
    /// configuration afterwards.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of ticks run so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn profiler(&self) -> Option<Shared<FrameProfiler>> {
        self.profiler.clone()
    }

    /// The signals manager owned by this engine's injector.
    pub fn signals(&self) -> Result<Shared<SignalsManager>, InjectorError> {
        self.injector.resolve::<SignalsManager>(SignalsManager::ID)
    }

    //--- Internal Helpers -------------------------------------------------

    fn record_phase(&self, phase: Phase, elapsed: Duration) {
        if let Some(mut profiler) = self.profiler.as_ref().and_then(|p| p.try_borrow_mut().ok()) {
            profiler.record(phase, elapsed);
        }
    }

    fn end_profiled_frame(&self) {
        if let Some(mut profiler) = self.profiler.as_ref().and_then(|p| p.try_borrow_mut().ok()) {
            profiler.end_frame();
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("state", &self.state)
            .field("frame", &self.frame)
            .field("managers", &self.managers)
            .field("injector", &self.injector)
            .finish()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
