//=========================================================================
// Registrations
//=========================================================================
//
// A registration is the recipe for one id: its kind, whether its result
// is cached, and a type-erased constructor. Constructors produce both the
// `Rc<dyn Any>` handed out by `resolve` and, for lifecycle kinds, the
// trait-object view of the same allocation the engine drives.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

//=== Internal Dependencies ===============================================

use super::Injector;
use crate::core::manager::Manager;
use crate::core::service::Service;
use crate::core::signals::{SignalType, SignalsManager};
use crate::core::BoxError;

//=== Kind ================================================================

/// Registration kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Manager,
    Service,
    Signal,
    Factory,
    Provider,
    Instance,
}

impl Kind {
    pub const ALL: [Kind; 6] = [
        Kind::Manager,
        Kind::Service,
        Kind::Signal,
        Kind::Factory,
        Kind::Provider,
        Kind::Instance,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Manager => "manager",
            Kind::Service => "service",
            Kind::Signal => "signal",
            Kind::Factory => "factory",
            Kind::Provider => "provider",
            Kind::Instance => "instance",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//=== Constructed =========================================================

/// Output of a constructor.
pub(crate) enum Constructed {
    Manager {
        object: Rc<dyn Any>,
        hooks: Rc<RefCell<dyn Manager>>,
    },
    Service {
        object: Rc<dyn Any>,
        hooks: Rc<RefCell<dyn Service>>,
    },
    Signal {
        object: Rc<dyn Any>,
        hooks: Rc<RefCell<dyn SignalType>>,
    },
    Value(Rc<dyn Any>),
}

impl Constructed {
    pub(crate) fn object(&self) -> Rc<dyn Any> {
        match self {
            Constructed::Manager { object, .. }
            | Constructed::Service { object, .. }
            | Constructed::Signal { object, .. }
            | Constructed::Value(object) => Rc::clone(object),
        }
    }
}

//=== Registration ========================================================

pub(crate) type ConstructResult = Result<Constructed, BoxError>;

pub(crate) type Constructor = Rc<dyn Fn(&Injector) -> ConstructResult>;

pub(crate) struct Registration {
    pub(crate) kind: Kind,
    pub(crate) stateless: bool,
    pub(crate) construct: Constructor,
}

impl Registration {
    pub(crate) fn manager<M, F>(ctor: F) -> Self
    where
        M: Manager,
        F: Fn(&Injector) -> Result<M, BoxError> + 'static,
    {
        let construct: Constructor = Rc::new(move |injector: &Injector| -> ConstructResult {
            let manager = Rc::new(RefCell::new(ctor(injector)?));
            Ok(Constructed::Manager { object: manager.clone(), hooks: manager })
        });
        Self { kind: Kind::Manager, stateless: false, construct }
    }

    pub(crate) fn service<S, F>(ctor: F) -> Self
    where
        S: Service,
        F: Fn(&Injector) -> Result<S, BoxError> + 'static,
    {
        let construct: Constructor = Rc::new(move |injector: &Injector| -> ConstructResult {
            let service = Rc::new(RefCell::new(ctor(injector)?));
            Ok(Constructed::Service { object: service.clone(), hooks: service })
        });
        Self { kind: Kind::Service, stateless: false, construct }
    }

    /// Signals are built around the queue of the registered signals
    /// manager, which is resolved (and so constructed) first.
    pub(crate) fn signal<S: SignalType>(signals_id: &'static str) -> Self {
        let construct: Constructor = Rc::new(move |injector: &Injector| -> ConstructResult {
            let manager = injector.resolve::<SignalsManager>(signals_id)?;
            let queue = manager.try_borrow().map(|m| m.queue()).map_err(|_| {
                BoxError::from(format!("signals manager '{}' is busy", signals_id))
            })?;
            let signal = Rc::new(RefCell::new(S::create(&queue)));
            Ok(Constructed::Signal { object: signal.clone(), hooks: signal })
        });
        Self { kind: Kind::Signal, stateless: false, construct }
    }

    pub(crate) fn factory<T, F>(ctor: F, stateless: bool) -> Self
    where
        T: 'static,
        F: Fn(&Injector) -> Result<T, BoxError> + 'static,
    {
        let construct: Constructor = Rc::new(move |injector: &Injector| -> ConstructResult {
            let value: Rc<dyn Any> = Rc::new(RefCell::new(ctor(injector)?));
            Ok(Constructed::Value(value))
        });
        Self { kind: Kind::Factory, stateless, construct }
    }

    pub(crate) fn provider<T, F>(provide: F, stateless: bool) -> Self
    where
        T: 'static,
        F: Fn() -> Result<T, BoxError> + 'static,
    {
        let construct: Constructor = Rc::new(move |_: &Injector| -> ConstructResult {
            let value: Rc<dyn Any> = Rc::new(RefCell::new(provide()?));
            Ok(Constructed::Value(value))
        });
        Self { kind: Kind::Provider, stateless, construct }
    }

    pub(crate) fn instance<T: 'static>(value: T) -> Self {
        let value: Rc<dyn Any> = Rc::new(RefCell::new(value));
        let construct: Constructor = Rc::new(move |_: &Injector| -> ConstructResult {
            Ok(Constructed::Value(Rc::clone(&value)))
        });
        Self { kind: Kind::Instance, stateless: false, construct }
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("kind", &self.kind)
            .field("stateless", &self.stateless)
            .finish_non_exhaustive()
    }
}
