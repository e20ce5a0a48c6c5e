//=========================================================================
// Signal
//=========================================================================
//
// Typed, ordered event with durable and one-shot listener lists.
//
// Listeners are compared by reference identity (Rc::ptr_eq), so the same
// closure instance can never be registered twice on one signal.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::any::{type_name, Any};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

//=== Internal Dependencies ===============================================

use super::queue::{ErasedSignal, SignalQueue};
use super::SignalError;

//=== Listener ============================================================

/// Shared callback registered on a [`Signal`].
///
/// Keep a clone of the `Rc` to later `remove` the listener or check it
/// with `has`.
pub type Listener<A> = Rc<dyn Fn(&A)>;

/// Wraps a closure into a [`Listener`].
pub fn listener<A, F>(callback: F) -> Listener<A>
where
    F: Fn(&A) + 'static,
{
    Rc::new(callback)
}

//=== SignalType Trait ====================================================

/// Capability contract for signals that can be registered in the injector.
///
/// [`Signal`] implements it directly. Typed wrappers implement it by
/// wrapping a `Signal` and exposing a `dispatch` with their own
/// parameter list that delegates to the inner signal:
///
/// ```rust
/// # use aetheric_runtime::prelude::*;
/// struct ScoreChanged(Signal<u32>);
///
/// impl ScoreChanged {
///     fn dispatch(&self, score: u32) {
///         self.0.dispatch(score);
///     }
/// }
///
/// impl SignalType for ScoreChanged {
///     fn create(queue: &SignalQueue) -> Self {
///         Self(Signal::new(queue))
///     }
///
///     fn destroy(&mut self) {
///         self.0.remove_all();
///     }
/// }
/// ```
pub trait SignalType: 'static {
    /// Builds the signal around the queue owned by the signals manager.
    fn create(queue: &SignalQueue) -> Self
    where
        Self: Sized;

    /// Called once at boot, after every manager and service.
    fn setup(&mut self) {}

    /// Called once when the owning injector is destroyed.
    fn destroy(&mut self) {}
}

//=== Signal ==============================================================

/// Typed event whose `dispatch` is deferred to the next flush.
///
/// Clones share listeners and queue.
pub struct Signal<A: 'static> {
    core: Rc<SignalCore<A>>,
}

struct SignalCore<A: 'static> {
    durable: RefCell<Vec<Listener<A>>>,
    once: RefCell<Vec<Listener<A>>>,
    queue: SignalQueue,
}

impl<A: 'static> Signal<A> {
    //--- Construction -----------------------------------------------------

    /// Creates a signal that schedules its emissions on `queue`.
    pub fn new(queue: &SignalQueue) -> Self {
        Self {
            core: Rc::new(SignalCore {
                durable: RefCell::new(Vec::new()),
                once: RefCell::new(Vec::new()),
                queue: queue.clone(),
            }),
        }
    }

    //--- Listener Management ----------------------------------------------

    /// Returns true if `listener` is in either list.
    pub fn has(&self, listener: &Listener<A>) -> bool {
        contains(&self.core.durable.borrow(), listener)
            || contains(&self.core.once.borrow(), listener)
    }

    /// Registers a listener called on every emission.
    ///
    /// # Errors
    ///
    /// [`SignalError::DuplicateListener`] if the listener is already
    /// registered, durable or one-shot.
    pub fn add(&self, listener: Listener<A>) -> Result<(), SignalError> {
        if self.has(&listener) {
            return Err(SignalError::DuplicateListener);
        }
        self.core.durable.borrow_mut().push(listener);
        Ok(())
    }

    /// Registers a listener called on the next emission only.
    ///
    /// # Errors
    ///
    /// [`SignalError::DuplicateListener`] if the listener is already
    /// registered, durable or one-shot.
    pub fn once(&self, listener: Listener<A>) -> Result<(), SignalError> {
        if self.has(&listener) {
            return Err(SignalError::DuplicateListener);
        }
        self.core.once.borrow_mut().push(listener);
        Ok(())
    }

    /// Removes the listener from whichever list holds it.
    ///
    /// Returns false if it was not registered.
    pub fn remove(&self, listener: &Listener<A>) -> bool {
        remove_from(&mut self.core.durable.borrow_mut(), listener)
            || remove_from(&mut self.core.once.borrow_mut(), listener)
    }

    /// Removes every listener.
    pub fn remove_all(&self) {
        self.core.durable.borrow_mut().clear();
        self.core.once.borrow_mut().clear();
    }

    /// Number of registered listeners across both lists.
    pub fn listener_count(&self) -> usize {
        self.core.durable.borrow().len() + self.core.once.borrow().len()
    }

    //--- Emission ---------------------------------------------------------

    /// Queues an emission for the next flush. Listeners are never called
    /// from here.
    pub fn dispatch(&self, args: A) {
        let signal: Rc<dyn ErasedSignal> = self.core.clone();
        self.core.queue.push(signal, Box::new(args));
    }

    /// Type-erased handle for [`SignalQueue::schedule`].
    pub fn erased(&self) -> Rc<dyn ErasedSignal> {
        self.core.clone()
    }

    /// Returns true if both handles refer to the same signal.
    pub fn ptr_eq(&self, other: &Signal<A>) -> bool {
        Rc::ptr_eq(&self.core, &other.core)
    }
}

impl<A: 'static> SignalCore<A> {
    /// Calls durable listeners, then one-shot listeners, in registration
    /// order.
    ///
    /// Both lists are snapshotted first: listeners added or removed during
    /// delivery take effect from the next emission. The one-shot list is
    /// emptied on every emission.
    fn deliver(&self, args: &A) {
        let durable = self.durable.borrow().clone();
        let once = std::mem::take(&mut *self.once.borrow_mut());

        for listener in durable.iter().chain(once.iter()) {
            listener(args);
        }
    }
}

impl<A: 'static> ErasedSignal for SignalCore<A> {
    fn accepts(&self, args: &dyn Any) -> bool {
        args.is::<A>()
    }

    fn payload_type(&self) -> &'static str {
        type_name::<A>()
    }

    fn emit(&self, args: &dyn Any) -> Result<(), SignalError> {
        let args = args
            .downcast_ref::<A>()
            .ok_or(SignalError::PayloadType { expected: type_name::<A>() })?;
        self.deliver(args);
        Ok(())
    }
}

impl<A: 'static> Clone for Signal<A> {
    fn clone(&self) -> Self {
        Self { core: Rc::clone(&self.core) }
    }
}

impl<A: 'static> fmt::Debug for Signal<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("payload", &type_name::<A>())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl<A: 'static> SignalType for Signal<A> {
    fn create(queue: &SignalQueue) -> Self {
        Signal::new(queue)
    }

    fn destroy(&mut self) {
        self.remove_all();
    }
}

//--- List Helpers --------------------------------------------------------

fn contains<A>(list: &[Listener<A>], listener: &Listener<A>) -> bool {
    list.iter().any(|l| Rc::ptr_eq(l, listener))
}

fn remove_from<A>(list: &mut Vec<Listener<A>>, listener: &Listener<A>) -> bool {
    match list.iter().position(|l| Rc::ptr_eq(l, listener)) {
        Some(pos) => {
            list.remove(pos);
            true
        }
        None => false,
    }
}

//=========================================================================
// Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Delivers everything currently queued, the way a flush does.
    fn drain(queue: &SignalQueue) {
        while let Some(emission) = queue.pop() {
            emission.signal.emit(emission.args.as_ref()).unwrap();
        }
    }

    fn recorder<A: Clone + 'static>() -> (Listener<A>, Rc<RefCell<Vec<A>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let sink = calls.clone();
        (listener(move |args: &A| sink.borrow_mut().push(args.clone())), calls)
    }

    //=====================================================================
    // Listener Management Tests
    //=====================================================================

    #[test]
    fn add_twice_is_rejected() {
        let signal = Signal::<u32>::new(&SignalQueue::new());
        let (cb, _) = recorder();

        signal.add(cb.clone()).unwrap();

        assert_eq!(signal.add(cb), Err(SignalError::DuplicateListener));
        assert_eq!(signal.listener_count(), 1);
    }

    #[test]
    fn once_after_add_is_rejected() {
        let signal = Signal::<u32>::new(&SignalQueue::new());
        let (cb, _) = recorder();

        signal.add(cb.clone()).unwrap();

        assert_eq!(signal.once(cb), Err(SignalError::DuplicateListener));
    }

    #[test]
    fn distinct_closures_with_same_body_are_distinct_listeners() {
        let signal = Signal::<u32>::new(&SignalQueue::new());

        signal.add(listener(|_: &u32| {})).unwrap();
        signal.add(listener(|_: &u32| {})).unwrap();

        assert_eq!(signal.listener_count(), 2);
    }

    #[test]
    fn has_checks_both_lists() {
        let signal = Signal::<u32>::new(&SignalQueue::new());
        let (durable, _) = recorder();
        let (one_shot, _) = recorder();
        let (absent, _) = recorder();

        signal.add(durable.clone()).unwrap();
        signal.once(one_shot.clone()).unwrap();

        assert!(signal.has(&durable));
        assert!(signal.has(&one_shot));
        assert!(!signal.has(&absent));
    }

    #[test]
    fn remove_and_remove_all() {
        let signal = Signal::<u32>::new(&SignalQueue::new());
        let (a, _) = recorder();
        let (b, _) = recorder();

        signal.add(a.clone()).unwrap();
        signal.once(b.clone()).unwrap();

        assert!(signal.remove(&b));
        assert!(!signal.remove(&b));
        assert!(!signal.has(&b));

        signal.remove_all();
        assert_eq!(signal.listener_count(), 0);
    }

    //=====================================================================
    // Emission Tests
    //=====================================================================

    #[test]
    fn dispatch_only_queues() {
        let queue = SignalQueue::new();
        let signal = Signal::<u32>::new(&queue);
        let (cb, calls) = recorder();
        signal.add(cb).unwrap();

        signal.dispatch(7);

        assert!(calls.borrow().is_empty(), "Listener must not run during dispatch");
        assert_eq!(queue.len(), 1);

        drain(&queue);
        assert_eq!(*calls.borrow(), vec![7]);
    }

    #[test]
    fn durable_before_once_in_registration_order() {
        let queue = SignalQueue::new();
        let signal = Signal::<u32>::new(&queue);
        let order = Rc::new(RefCell::new(Vec::new()));

        for name in ["once-1", "durable-1", "once-2", "durable-2"] {
            let sink = order.clone();
            let cb = listener(move |_: &u32| sink.borrow_mut().push(name));
            if name.starts_with("once") {
                signal.once(cb).unwrap();
            } else {
                signal.add(cb).unwrap();
            }
        }

        signal.dispatch(0);
        drain(&queue);

        assert_eq!(*order.borrow(), vec!["durable-1", "durable-2", "once-1", "once-2"]);
    }

    #[test]
    fn once_listener_fires_once_across_pending_emissions() {
        let queue = SignalQueue::new();
        let signal = Signal::<u32>::new(&queue);
        let (cb, calls) = recorder();
        signal.once(cb.clone()).unwrap();

        signal.dispatch(1);
        signal.dispatch(2);
        drain(&queue);

        assert_eq!(*calls.borrow(), vec![1]);
        assert!(!signal.has(&cb));
    }

    #[test]
    fn listener_added_during_delivery_waits_for_next_emission() {
        let queue = SignalQueue::new();
        let signal = Signal::<u32>::new(&queue);
        let (late, late_calls) = recorder();

        let target = signal.clone();
        let pending = RefCell::new(Some(late));
        signal
            .add(listener(move |_: &u32| {
                if let Some(cb) = pending.borrow_mut().take() {
                    target.add(cb).unwrap();
                }
            }))
            .unwrap();

        signal.dispatch(1);
        drain(&queue);
        assert!(late_calls.borrow().is_empty());

        signal.dispatch(2);
        drain(&queue);
        assert_eq!(*late_calls.borrow(), vec![2]);
    }

    #[test]
    fn erased_emit_rejects_foreign_payload() {
        let signal = Signal::<u32>::new(&SignalQueue::new());
        let erased = signal.erased();

        assert!(erased.accepts(&5u32));
        assert!(!erased.accepts(&"five"));
        assert!(matches!(erased.emit(&"five"), Err(SignalError::PayloadType { .. })));
    }
}
