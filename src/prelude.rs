//=========================================================================
// Prelude
//=========================================================================
//
// Convenience module that re-exports commonly used types and traits.
//
// Usage:
//   use aetheric_runtime::prelude::*;
//
//=========================================================================

//=== Public API ==========================================================

// Engine core
pub use crate::engine::{Engine, EngineBuilder, EngineError, EngineState};
pub use crate::core::config::{EngineConfig, FaultPolicy};
pub use crate::core::profiler::FrameProfiler;

// Injector
pub use crate::core::injector::{Injector, InjectorError, Kind};
pub use crate::core::{BoxError, Shared};

// Lifecycle contracts
pub use crate::core::manager::{FrameContext, Manager, ManagerHandle, Phase, PhaseResult};
pub use crate::core::service::Service;

// Signals
pub use crate::core::signals::{
    listener, Listener, Signal, SignalError, SignalQueue, SignalType, SignalsManager,
};

// Host and logging
pub use crate::logging::{init_logging, LoggingConfig};
pub use crate::platform::{HostHandle, WindowHost};
