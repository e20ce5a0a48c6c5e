//=========================================================================
// Core Runtime
//
// Composition layer shared by every engine subsystem.
//
// Responsibilities:
// - Register and construct the engine's object graph (`Injector`)
// - Define the per-frame contract for managers and the phase order
// - Queue and deliver signals between managers (`SignalsManager`)
// - Hold engine configuration and frame timing statistics
//
// Notes:
// Everything here runs on the thread that owns the `Engine`. Objects are
// shared as `Rc<RefCell<T>>`; nothing in this module is `Send`.
//
//=========================================================================

//=== Module Declarations =================================================

pub mod config;
pub mod injector;
pub mod manager;
pub mod profiler;
pub mod service;
pub mod signals;

//=== Shared Types ========================================================

/// Error type returned by constructors and lifecycle hooks.
pub type BoxError = Box<dyn std::error::Error + 'static>;

/// Shared, interior-mutable handle to a resolved object.
pub type Shared<T> = std::rc::Rc<std::cell::RefCell<T>>;

//=== Re-exports ==========================================================

pub use config::{ConfigError, EngineConfig, FaultPolicy};
pub use injector::{Injector, InjectorError, Kind};
pub use manager::{FrameContext, Manager, ManagerError, ManagerHandle, Phase, PhaseResult};
pub use profiler::FrameProfiler;
pub use service::Service;
pub use signals::{listener, Listener, Signal, SignalError, SignalQueue, SignalType, SignalsManager};
