//=========================================================================
// Signals
//=========================================================================
//
// Deferred publish/subscribe event bus.
//
// Architecture:
//   Signal<A>::dispatch(args) ──push──> SignalQueue (FIFO of emissions)
//                                            │
//   Engine "update" phase ──> SignalsManager::flush()
//                                            │ (entry-time length only)
//                                            ▼
//                              durable listeners → one-shot listeners
//
// Pattern: dispatch → queue → flush next update → deliver
//
//=========================================================================

//=== Module Declarations =================================================

mod queue;
mod signal;
mod signals_manager;

//=== Public API ==========================================================

pub use queue::{ErasedSignal, SignalQueue};
pub use signal::{listener, Listener, Signal, SignalType};
pub use signals_manager::SignalsManager;

//=== SignalError =========================================================

/// Failures raised by signals and the signal queue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignalError {
    /// The same listener reference is already registered on the signal.
    #[error("listener is already registered on this signal")]
    DuplicateListener,

    /// The scheduled arguments do not match the signal's payload type.
    #[error("signal expects payload of type `{expected}`")]
    PayloadType { expected: &'static str },
}
