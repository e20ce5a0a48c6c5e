//=========================================================================
// Signal Queue
//=========================================================================
//
// Type-erased FIFO of pending emissions.
//
// Every signal keeps a clone of the queue it was created with, so
// dispatching never needs a global accessor. The queue stores each
// emission as (signal, boxed args) and the args are only downcast back
// to the signal's payload type at delivery.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::any::Any;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use log::trace;

//=== Internal Dependencies ===============================================

use super::SignalError;

//=== ErasedSignal ========================================================

/// Object-safe view of a signal used by the queue.
///
/// Implemented for every [`super::Signal`]; obtain one through
/// [`super::Signal::erased`].
pub trait ErasedSignal {
    /// Returns true if `args` is this signal's payload type.
    fn accepts(&self, args: &dyn Any) -> bool;

    /// Name of the payload type, for diagnostics.
    fn payload_type(&self) -> &'static str;

    /// Delivers `args` to the listeners.
    fn emit(&self, args: &dyn Any) -> Result<(), SignalError>;
}

//=== Emission ============================================================

pub(crate) struct Emission {
    pub(crate) signal: Rc<dyn ErasedSignal>,
    pub(crate) args: Box<dyn Any>,
}

//=== SignalQueue =========================================================

/// Shared FIFO of `(signal, args)` pairs awaiting delivery.
///
/// Clones share the same underlying queue.
#[derive(Clone, Default)]
pub struct SignalQueue {
    pending: Rc<RefCell<VecDeque<Emission>>>,
}

impl SignalQueue {
    /// Creates a new empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    //--- Scheduling -------------------------------------------------------

    /// Appends an emission after checking the payload type.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::PayloadType`] if `args` is not the payload
    /// type of `signal`. Nothing is queued in that case.
    pub fn schedule(
        &self,
        signal: Rc<dyn ErasedSignal>,
        args: Box<dyn Any>,
    ) -> Result<(), SignalError> {
        if !signal.accepts(args.as_ref()) {
            return Err(SignalError::PayloadType { expected: signal.payload_type() });
        }
        self.push(signal, args);
        Ok(())
    }

    /// Appends an emission whose payload type is already known to match.
    pub(crate) fn push(&self, signal: Rc<dyn ErasedSignal>, args: Box<dyn Any>) {
        trace!(target: "signals", "Scheduling `{}` emission", signal.payload_type());
        self.pending.borrow_mut().push_back(Emission { signal, args });
    }

    /// Removes the oldest emission.
    ///
    /// The borrow is released before returning so listeners can schedule
    /// while the emission is delivered.
    pub(crate) fn pop(&self) -> Option<Emission> {
        self.pending.borrow_mut().pop_front()
    }

    //--- Query API --------------------------------------------------------

    /// Number of emissions awaiting delivery.
    pub fn len(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if both handles share the same queue.
    pub fn ptr_eq(&self, other: &SignalQueue) -> bool {
        Rc::ptr_eq(&self.pending, &other.pending)
    }

    /// Drops every pending emission.
    pub fn clear(&self) {
        self.pending.borrow_mut().clear();
    }
}

impl fmt::Debug for SignalQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalQueue").field("pending", &self.len()).finish()
    }
}

//=========================================================================
// Tests
//=========================================================================
