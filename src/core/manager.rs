//=========================================================================
// Manager Contract
//=========================================================================
//
// Uniform lifecycle every per-frame subsystem exposes to the engine.
//
// Architecture:
//   Injector ──constructs──> Rc<RefCell<M>>
//                                 │ (unsized to dyn Manager)
//                                 ▼
//   ManagerHandle { enabled, destroyed, manager }
//                                 ▲
//   Engine::tick() ── Phase::ALL ─┘
//
// A manager never owns its enabled flag: the handle does, so toggling
// works the same for every implementation and the engine can skip a
// disabled manager without borrowing it.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use log::{debug, trace, warn};

//=== Internal Dependencies ===============================================

use crate::core::BoxError;

//=== Phase ===============================================================

/// One of the six ordered per-frame phases.
///
/// Every tick runs all phases in [`Phase::ALL`] order, and every phase
/// iterates all enabled managers in resolution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    PreUpdate,
    Update,
    PostUpdate,
    PreDraw,
    Draw,
    PostDraw,
}

impl Phase {
    /// All phases in tick order.
    pub const ALL: [Phase; 6] = [
        Phase::PreUpdate,
        Phase::Update,
        Phase::PostUpdate,
        Phase::PreDraw,
        Phase::Draw,
        Phase::PostDraw,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::PreUpdate => "pre_update",
            Phase::Update => "update",
            Phase::PostUpdate => "post_update",
            Phase::PreDraw => "pre_draw",
            Phase::Draw => "draw",
            Phase::PostDraw => "post_draw",
        }
    }

    /// Position of the phase inside [`Phase::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//=== FrameContext ========================================================

/// Per-tick timing data handed to every phase hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameContext {
    /// Index of the current tick, starting at 1 for the first tick.
    pub frame: u64,

    /// Time since the previous tick, clamped to the configured maximum.
    pub delta: Duration,

    /// Sum of all clamped deltas since the engine started.
    pub elapsed: Duration,
}

/// Result type of every phase hook.
pub type PhaseResult = Result<(), BoxError>;

//=== Manager Trait =======================================================

/// A per-frame ticked subsystem.
///
/// All hooks have empty default implementations, so a manager only
/// overrides the phases it participates in.
///
/// ```rust
/// # use aetheric_runtime::prelude::*;
/// #[derive(Default)]
/// struct Clock {
///     ticks: u64,
/// }
///
/// impl Manager for Clock {
///     fn update(&mut self, _frame: &FrameContext) -> PhaseResult {
///         self.ticks += 1;
///         Ok(())
///     }
/// }
/// ```
pub trait Manager: 'static {
    /// Called once at boot and again every time the manager is re-enabled.
    fn setup(&mut self) -> Result<(), BoxError> {
        Ok(())
    }

    /// Called when the manager is disabled and when it is destroyed.
    fn tear_down(&mut self) {}

    fn pre_update(&mut self, _frame: &FrameContext) -> PhaseResult {
        Ok(())
    }

    fn update(&mut self, _frame: &FrameContext) -> PhaseResult {
        Ok(())
    }

    fn post_update(&mut self, _frame: &FrameContext) -> PhaseResult {
        Ok(())
    }

    fn pre_draw(&mut self, _frame: &FrameContext) -> PhaseResult {
        Ok(())
    }

    /// Render pass. Managers wrapping a display backend issue their draw
    /// calls here.
    fn draw(&mut self, _frame: &FrameContext) -> PhaseResult {
        Ok(())
    }

    fn post_draw(&mut self, _frame: &FrameContext) -> PhaseResult {
        Ok(())
    }
}

fn run_hook(manager: &mut dyn Manager, phase: Phase, frame: &FrameContext) -> PhaseResult {
    match phase {
        Phase::PreUpdate => manager.pre_update(frame),
        Phase::Update => manager.update(frame),
        Phase::PostUpdate => manager.post_update(frame),
        Phase::PreDraw => manager.pre_draw(frame),
        Phase::Draw => manager.draw(frame),
        Phase::PostDraw => manager.post_draw(frame),
    }
}

//=== ManagerError ========================================================

/// Failures raised while driving a manager's lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    /// The manager is already executing one of its own hooks.
    #[error("manager '{id}' is busy running a hook")]
    Busy { id: String },

    /// `setup()` returned an error.
    #[error("manager '{id}' failed during setup: {source}")]
    Setup {
        id: String,
        #[source]
        source: BoxError,
    },

    /// A phase hook returned an error.
    #[error("manager '{id}' failed during {phase}: {source}")]
    Phase {
        id: String,
        phase: Phase,
        #[source]
        source: BoxError,
    },
}

//=== ManagerHandle =======================================================

/// Shared handle to a constructed manager and its lifecycle state.
///
/// Handles are cheap to clone; every clone refers to the same manager.
#[derive(Clone)]
pub struct ManagerHandle {
    inner: Rc<ManagerCell>,
}

struct ManagerCell {
    id: String,
    enabled: Cell<bool>,
    destroyed: Cell<bool>,
    manager: Rc<RefCell<dyn Manager>>,
}

impl ManagerHandle {
    //--- Construction -----------------------------------------------------

    pub(crate) fn new(id: impl Into<String>, manager: Rc<RefCell<dyn Manager>>) -> Self {
        Self {
            inner: Rc::new(ManagerCell {
                id: id.into(),
                enabled: Cell::new(true),
                destroyed: Cell::new(false),
                manager,
            }),
        }
    }

    //--- Queries ----------------------------------------------------------

    /// The id this manager was registered under.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Whether the manager takes part in ticks.
    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.get()
    }

    /// True once `destroy` has run; a destroyed manager stays disabled.
    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.get()
    }

    /// Returns true if both handles refer to the same manager.
    pub fn ptr_eq(&self, other: &ManagerHandle) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    //--- Lifecycle --------------------------------------------------------

    /// Toggles participation in the frame loop.
    ///
    /// `false → true` runs `setup()`, `true → false` runs `tear_down()`,
    /// and setting the current value does nothing. A failed `setup()`
    /// leaves the manager disabled. Destroyed managers ignore the call.
    ///
    /// # Errors
    ///
    /// [`ManagerError::Busy`] when called from inside one of the manager's
    /// own hooks, [`ManagerError::Setup`] when re-enabling fails.
    pub fn set_enabled(&self, enabled: bool) -> Result<(), ManagerError> {
        if self.is_destroyed() {
            warn!(target: "engine", "Ignoring enable toggle on destroyed manager '{}'", self.id());
            return Ok(());
        }
        if self.is_enabled() == enabled {
            return Ok(());
        }

        let mut manager = self.borrow_manager()?;
        self.inner.enabled.set(enabled);

        if enabled {
            debug!(target: "engine", "Enabling manager '{}'", self.id());
            if let Err(source) = manager.setup() {
                self.inner.enabled.set(false);
                return Err(ManagerError::Setup { id: self.id().to_string(), source });
            }
        } else {
            debug!(target: "engine", "Disabling manager '{}'", self.id());
            manager.tear_down();
        }
        Ok(())
    }

    /// Boot-time setup. Skipped for disabled or destroyed managers.
    pub(crate) fn setup(&self) -> Result<(), ManagerError> {
        if !self.is_enabled() || self.is_destroyed() {
            return Ok(());
        }
        let mut manager = self.borrow_manager()?;
        manager
            .setup()
            .map_err(|source| ManagerError::Setup { id: self.id().to_string(), source })
    }

    /// Runs one phase hook. Disabled and destroyed managers are skipped.
    pub(crate) fn run_phase(&self, phase: Phase, frame: &FrameContext) -> Result<(), ManagerError> {
        if !self.is_enabled() || self.is_destroyed() {
            return Ok(());
        }
        trace!(target: "engine", "{} '{}'", phase, self.id());

        let mut manager = self.borrow_manager()?;
        run_hook(&mut *manager, phase, frame).map_err(|source| ManagerError::Phase {
            id: self.id().to_string(),
            phase,
            source,
        })
    }

    /// Releases the manager's resources.
    ///
    /// Invokes `tear_down()` exactly once whatever the enabled state is.
    /// Later calls are no-ops.
    pub fn destroy(&self) {
        if self.inner.destroyed.replace(true) {
            return;
        }
        match self.inner.manager.try_borrow_mut() {
            Ok(mut manager) => {
                debug!(target: "engine", "Destroying manager '{}'", self.id());
                manager.tear_down();
            }
            Err(_) => {
                warn!(
                    target: "engine",
                    "Manager '{}' destroyed while busy; tear_down skipped",
                    self.id()
                );
            }
        }
        self.inner.enabled.set(false);
    }

    //--- Internal Helpers -------------------------------------------------

    fn borrow_manager(&self) -> Result<std::cell::RefMut<'_, dyn Manager>, ManagerError> {
        self.inner
            .manager
            .try_borrow_mut()
            .map_err(|_| ManagerError::Busy { id: self.id().to_string() })
    }
}

impl fmt::Debug for ManagerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagerHandle")
            .field("id", &self.inner.id)
            .field("enabled", &self.inner.enabled.get())
            .field("destroyed", &self.inner.destroyed.get())
            .finish()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
