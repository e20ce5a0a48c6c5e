//=========================================================================
// Signals Manager
//=========================================================================
//
// Owns the single deferred-dispatch queue and flushes it once per frame
// inside the "update" phase.
//
// A flush is bounded by the queue length observed when it starts:
// emissions scheduled by listeners during the flush land behind that
// boundary and are delivered by the next flush. Signal cascades therefore
// advance one hop per frame instead of recursing.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::any::Any;
use std::rc::Rc;

use log::trace;

//=== Internal Dependencies ===============================================

use super::queue::{ErasedSignal, SignalQueue};
use super::SignalError;
use crate::core::manager::{FrameContext, Manager, PhaseResult};

//=== SignalsManager ======================================================

/// Manager that delivers queued signal emissions during `update`.
///
/// The engine registers one under [`SignalsManager::ID`]; every signal
/// registered in the same injector schedules on its queue.
#[derive(Debug, Default)]
pub struct SignalsManager {
    queue: SignalQueue,
}

impl SignalsManager {
    /// Reserved injector id.
    pub const ID: &'static str = "signals";

    /// Creates a manager with an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the queue, shared with every signal built from it.
    pub fn queue(&self) -> SignalQueue {
        self.queue.clone()
    }

    //--- Scheduling -------------------------------------------------------

    /// Appends an emission to the queue.
    ///
    /// The same signal may be scheduled any number of times before a
    /// flush; every entry keeps its own arguments.
    ///
    /// # Errors
    ///
    /// [`SignalError::PayloadType`] if `args` does not match the signal.
    pub fn schedule(
        &self,
        signal: Rc<dyn ErasedSignal>,
        args: Box<dyn Any>,
    ) -> Result<(), SignalError> {
        self.queue.schedule(signal, args)
    }

    /// Number of emissions waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    //--- Flush ------------------------------------------------------------

    /// Delivers exactly the emissions queued before this call, in FIFO
    /// order, and returns how many were delivered.
    ///
    /// # Errors
    ///
    /// Stops at the first emission whose payload fails to downcast. Later
    /// entries stay queued.
    pub fn flush(&self) -> Result<usize, SignalError> {
        let budget = self.queue.len();
        if budget == 0 {
            return Ok(0);
        }
        trace!(target: "signals", "Flushing {} emissions", budget);

        let mut delivered = 0;
        while delivered < budget {
            let Some(emission) = self.queue.pop() else {
                break;
            };
            emission.signal.emit(emission.args.as_ref())?;
            delivered += 1;
        }

        let deferred = self.queue.len();
        if deferred > 0 {
            trace!(target: "signals", "{} emissions deferred to next flush", deferred);
        }
        Ok(delivered)
    }
}

impl Manager for SignalsManager {
    fn update(&mut self, _frame: &FrameContext) -> PhaseResult {
        self.flush()?;
        Ok(())
    }

    fn tear_down(&mut self) {
        self.queue.clear();
    }
}

//=========================================================================
// Tests
//=========================================================================
