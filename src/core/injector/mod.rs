//=========================================================================
// Injector
//=========================================================================
//
// Registry and resolver for the engine's object graph.
//
// Architecture:
//   register_*(id, ctor) ──> registrations: IndexMap<id, Registration>
//                                    │  (registration order)
//   build() / resolve(id) ───────────┘
//        │
//        ├─ container hit?  → cached Rc
//        ├─ ResolveStack::enter(id)   (cycle check, scoped guard)
//        ├─ ctor(&Injector)           (may resolve other ids)
//        └─ Container::record(id)     (unless stateless)
//
// Every id lives in one global namespace shared by all kinds. Objects
// are handed out as `Shared<T>` (`Rc<RefCell<T>>`), whatever their kind.
//
//=========================================================================

//=== Module Declarations =================================================

mod container;
mod error;
mod registration;
mod resolve_stack;

//=== External Dependencies ===============================================

use std::any::{type_name, Any};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use indexmap::IndexMap;
use log::{error, info, trace};

//=== Internal Dependencies ===============================================

use crate::core::manager::{Manager, ManagerHandle};
use crate::core::service::Service;
use crate::core::signals::{SignalType, SignalsManager};
use crate::core::{BoxError, Shared};
use container::Container;
use registration::Registration;
use resolve_stack::ResolveStack;

//=== Public API ==========================================================

pub use error::InjectorError;
pub use registration::Kind;

pub(crate) use container::{ServiceEntry, SignalEntry};

//=== Injector ============================================================

/// Dependency-injection container.
///
/// Ids are registered before boot; objects are constructed lazily on
/// first [`Injector::resolve`] or eagerly, in registration order, by
/// [`Injector::build`]. Constructors receive the injector and may resolve
/// their own dependencies.
///
/// ```rust
/// # use aetheric_runtime::prelude::*;
/// struct Greeting(String);
///
/// let mut injector = Injector::new();
/// injector.register_instance("name", String::from("world"))?;
/// injector.register_factory(
///     "greeting",
///     |injector: &Injector| {
///         let name = injector.resolve::<String>("name")?;
///         let text = format!("hello {}", name.borrow());
///         Ok(Greeting(text))
///     },
///     false,
/// )?;
///
/// let greeting = injector.resolve::<Greeting>("greeting")?;
/// assert_eq!(greeting.borrow().0, "hello world");
/// # Ok::<(), InjectorError>(())
/// ```
#[derive(Default)]
pub struct Injector {
    registrations: IndexMap<String, Registration>,
    container: RefCell<Container>,
    stack: ResolveStack,
    sealed: Cell<bool>,
}

impl Injector {
    //--- Construction -----------------------------------------------------

    /// Creates an empty injector.
    ///
    /// Register a [`SignalsManager`] under [`SignalsManager::ID`] before
    /// registering signals; [`Injector::with_signals`] does both.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an injector with a [`SignalsManager`] already registered
    /// under [`SignalsManager::ID`].
    pub fn with_signals() -> Self {
        let mut injector = Self::new();
        injector.registrations.insert(
            SignalsManager::ID.to_string(),
            Registration::manager(|_| Ok(SignalsManager::new())),
        );
        injector
    }

    //--- Registration -----------------------------------------------------

    /// Registers a per-frame manager.
    ///
    /// # Errors
    ///
    /// [`InjectorError::Registration`] if `id` is taken or the injector
    /// has been built.
    pub fn register_manager<M, F>(
        &mut self,
        id: impl Into<String>,
        ctor: F,
    ) -> Result<(), InjectorError>
    where
        M: Manager,
        F: Fn(&Injector) -> Result<M, BoxError> + 'static,
    {
        self.insert(id.into(), Registration::manager(ctor))
    }

    /// Registers a service.
    ///
    /// # Errors
    ///
    /// [`InjectorError::Registration`] if `id` is taken or the injector
    /// has been built.
    pub fn register_service<S, F>(
        &mut self,
        id: impl Into<String>,
        ctor: F,
    ) -> Result<(), InjectorError>
    where
        S: Service,
        F: Fn(&Injector) -> Result<S, BoxError> + 'static,
    {
        self.insert(id.into(), Registration::service(ctor))
    }

    /// Registers a signal type. It is built around the queue of the
    /// signals manager registered under [`SignalsManager::ID`].
    ///
    /// # Errors
    ///
    /// [`InjectorError::Registration`] if `id` is taken or the injector
    /// has been built.
    pub fn register_signal<S: SignalType>(
        &mut self,
        id: impl Into<String>,
    ) -> Result<(), InjectorError> {
        self.insert(id.into(), Registration::signal::<S>(SignalsManager::ID))
    }

    /// Registers a constructor with access to the injector.
    ///
    /// With `stateless` set, every resolution runs `ctor` again and
    /// nothing is cached.
    ///
    /// # Errors
    ///
    /// [`InjectorError::Registration`] if `id` is taken or the injector
    /// has been built.
    pub fn register_factory<T, F>(
        &mut self,
        id: impl Into<String>,
        ctor: F,
        stateless: bool,
    ) -> Result<(), InjectorError>
    where
        T: 'static,
        F: Fn(&Injector) -> Result<T, BoxError> + 'static,
    {
        self.insert(id.into(), Registration::factory(ctor, stateless))
    }

    /// Registers a zero-argument provider.
    ///
    /// With `stateless` set, every resolution calls `provide` again and
    /// nothing is cached.
    ///
    /// # Errors
    ///
    /// [`InjectorError::Registration`] if `id` is taken or the injector
    /// has been built.
    pub fn register_provider<T, F>(
        &mut self,
        id: impl Into<String>,
        provide: F,
        stateless: bool,
    ) -> Result<(), InjectorError>
    where
        T: 'static,
        F: Fn() -> Result<T, BoxError> + 'static,
    {
        self.insert(id.into(), Registration::provider(provide, stateless))
    }

    /// Registers a ready-made value.
    ///
    /// # Errors
    ///
    /// [`InjectorError::Registration`] if `id` is taken or the injector
    /// has been built.
    pub fn register_instance<T: 'static>(
        &mut self,
        id: impl Into<String>,
        value: T,
    ) -> Result<(), InjectorError> {
        self.insert(id.into(), Registration::instance(value))
    }

    fn insert(&mut self, id: String, registration: Registration) -> Result<(), InjectorError> {
        if self.sealed.get() {
            return Err(InjectorError::sealed(&id));
        }
        if self.registrations.contains_key(&id) {
            return Err(InjectorError::duplicate(&id));
        }
        trace!(target: "injector", "Registered {} '{}'", registration.kind, id);
        self.registrations.insert(id, registration);
        Ok(())
    }

    //--- Registry Queries -------------------------------------------------

    /// Returns true if `id` is registered, whatever its kind.
    pub fn contains(&self, id: &str) -> bool {
        self.registrations.contains_key(id)
    }

    /// Kind of the registration for `id`.
    pub fn kind_of(&self, id: &str) -> Option<Kind> {
        self.registrations.get(id).map(|r| r.kind)
    }

    /// Registered ids in registration order.
    pub fn registered_ids(&self) -> impl Iterator<Item = &str> {
        self.registrations.keys().map(String::as_str)
    }

    /// Number of registrations.
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Returns true once `build()` has been called. Registration is closed
    /// from then on.
    pub fn is_sealed(&self) -> bool {
        self.sealed.get()
    }

    //--- Build ------------------------------------------------------------

    /// Resolves every registration once, in registration order.
    ///
    /// Stops at the first failure; objects constructed before it stay
    /// cached. Registration is closed afterwards.
    pub fn build(&self) -> Result<(), InjectorError> {
        self.sealed.set(true);
        info!(target: "injector", "Building {} registrations", self.registrations.len());

        for id in self.registrations.keys() {
            self.resolve_any(id)?;
        }

        let cached = self.container.borrow().len();
        info!(target: "injector", "Build complete ({} objects cached)", cached);
        Ok(())
    }

    //--- Resolution -------------------------------------------------------

    /// Resolves `id` and downcasts it to `T`.
    ///
    /// # Errors
    ///
    /// Every error of [`Injector::resolve_any`], plus
    /// [`InjectorError::TypeMismatch`] if the object is not a `T`.
    pub fn resolve<T: 'static>(&self, id: &str) -> Result<Shared<T>, InjectorError> {
        self.resolve_any(id)?
            .downcast::<RefCell<T>>()
            .map_err(|_| InjectorError::TypeMismatch {
                id: id.to_string(),
                expected: type_name::<T>(),
            })
    }

    /// Resolves `id` without a type check.
    ///
    /// Cached objects are returned as-is. Otherwise the constructor runs,
    /// and unless the registration is stateless the result is cached and
    /// appended to its kind's collection.
    ///
    /// # Errors
    ///
    /// - [`InjectorError::Resolution`]: `id` is not registered
    /// - [`InjectorError::CyclicReference`]: `id` is already mid-construction
    /// - [`InjectorError::Construction`]: the constructor failed
    ///
    /// Errors from nested resolutions inside a constructor propagate
    /// unchanged.
    pub fn resolve_any(&self, id: &str) -> Result<Rc<dyn Any>, InjectorError> {
        if let Some(object) = self.container.borrow().object(id) {
            return Ok(object);
        }

        let registration = self
            .registrations
            .get(id)
            .ok_or_else(|| InjectorError::Resolution { id: id.to_string() })?;
        let construct = Rc::clone(&registration.construct);
        let (kind, stateless) = (registration.kind, registration.stateless);

        let guard = self.stack.enter(id)?;
        trace!(target: "injector", "Constructing {} '{}'", kind, id);
        let constructed = construct(self).map_err(|err| Self::construction_failure(id, err))?;
        drop(guard);

        let object = constructed.object();
        if !stateless {
            self.container.borrow_mut().record(id, kind, constructed);
        }
        Ok(object)
    }

    /// Unwraps injector errors raised by nested resolutions; wraps anything
    /// else as a construction failure of `id`.
    fn construction_failure(id: &str, err: BoxError) -> InjectorError {
        match err.downcast::<InjectorError>() {
            Ok(inner) => *inner,
            Err(source) => {
                error!(target: "injector", "Construction of '{}' failed: {}", id, source);
                InjectorError::Construction { id: id.to_string(), source }
            }
        }
    }

    //--- Container Queries ------------------------------------------------

    /// Returns true if `id` has a cached object.
    pub fn is_resolved(&self, id: &str) -> bool {
        self.container.borrow().contains(id)
    }

    /// Ids of `kind` in first-resolution order. Stateless registrations
    /// never appear.
    pub fn resolution_order(&self, kind: Kind) -> Vec<String> {
        self.container.borrow().order(kind)
    }

    /// Constructed managers in resolution order, which is also the
    /// frame-iteration order.
    pub fn managers(&self) -> Vec<ManagerHandle> {
        self.container.borrow().managers().to_vec()
    }

    /// Handle of the constructed manager registered under `id`.
    pub fn manager(&self, id: &str) -> Option<ManagerHandle> {
        self.container.borrow().managers().iter().find(|h| h.id() == id).cloned()
    }

    /// Ids of constructed services in setup order.
    pub fn services(&self) -> Vec<String> {
        self.container.borrow().services().iter().map(|e| e.id.clone()).collect()
    }

    /// Ids of constructed signals in setup order.
    pub fn signals(&self) -> Vec<String> {
        self.container.borrow().signals().iter().map(|e| e.id.clone()).collect()
    }

    pub(crate) fn service_entries(&self) -> Vec<ServiceEntry> {
        self.container.borrow().services().to_vec()
    }

    pub(crate) fn signal_entries(&self) -> Vec<SignalEntry> {
        self.container.borrow().signals().to_vec()
    }

    /// Ids currently mid-construction, outermost first.
    pub fn resolving(&self) -> Vec<String> {
        self.stack.snapshot()
    }

    //--- Teardown ---------------------------------------------------------

    /// Destroys every constructed object and discards the container.
    ///
    /// Managers are torn down first, then services, then signals, each in
    /// reverse resolution order. Registrations are kept, so ids resolved
    /// afterwards are constructed again.
    pub fn destroy(&mut self) {
        let container = std::mem::take(self.container.get_mut());
        info!(target: "injector", "Destroying {} objects", container.len());
        container.tear_down();
    }
}

impl std::fmt::Debug for Injector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Injector")
            .field("registrations", &self.registrations.len())
            .field("resolved", &self.container.borrow().len())
            .field("sealed", &self.sealed.get())
            .finish()
    }
}

//=========================================================================
// Tests
//=========================================================================
