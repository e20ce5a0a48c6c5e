//=========================================================================
// Container
//=========================================================================
//
// Constructed objects plus the per-kind ordered collections.
//
// Architecture:
//   objects:  IndexMap<id, (Kind, Rc<dyn Any>)>   first-resolution order
//   managers: Vec<ManagerHandle>                  frame-iteration order
//   services: Vec<ServiceEntry>                   setup order
//   signals:  Vec<SignalEntry>                    setup order
//
// `record` is the only writer. It runs once per id, after the id's
// constructor returned, so dependencies always precede their dependents.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use log::{debug, warn};

//=== Internal Dependencies ===============================================

use super::registration::{Constructed, Kind};
use crate::core::manager::ManagerHandle;
use crate::core::service::Service;
use crate::core::signals::SignalType;
use crate::core::BoxError;

//=== Entries =============================================================

/// A constructed service and its id.
#[derive(Clone)]
pub(crate) struct ServiceEntry {
    pub(crate) id: String,
    pub(crate) hooks: Rc<RefCell<dyn Service>>,
}

impl ServiceEntry {
    pub(crate) fn setup(&self) -> Result<(), BoxError> {
        let mut service = self
            .hooks
            .try_borrow_mut()
            .map_err(|_| BoxError::from(format!("service '{}' is busy", self.id)))?;
        service.setup()
    }
}

/// A constructed signal and its id.
#[derive(Clone)]
pub(crate) struct SignalEntry {
    pub(crate) id: String,
    pub(crate) hooks: Rc<RefCell<dyn SignalType>>,
}

impl SignalEntry {
    pub(crate) fn setup(&self) {
        match self.hooks.try_borrow_mut() {
            Ok(mut signal) => signal.setup(),
            Err(_) => warn!(target: "injector", "Signal '{}' is busy; setup skipped", self.id),
        }
    }
}

//=== Container ===========================================================

#[derive(Default)]
pub(crate) struct Container {
    objects: IndexMap<String, (Kind, Rc<dyn Any>)>,
    managers: Vec<ManagerHandle>,
    services: Vec<ServiceEntry>,
    signals: Vec<SignalEntry>,
}

impl Container {
    //--- Recording --------------------------------------------------------

    /// Memoises a constructed object and appends it to its kind's
    /// collection. Recording an id twice keeps the first object.
    pub(crate) fn record(&mut self, id: &str, kind: Kind, constructed: Constructed) {
        if self.objects.contains_key(id) {
            warn!(target: "injector", "'{}' already recorded; keeping the first instance", id);
            return;
        }
        self.objects.insert(id.to_string(), (kind, constructed.object()));

        match constructed {
            Constructed::Manager { hooks, .. } => self.managers.push(ManagerHandle::new(id, hooks)),
            Constructed::Service { hooks, .. } => {
                self.services.push(ServiceEntry { id: id.to_string(), hooks })
            }
            Constructed::Signal { hooks, .. } => {
                self.signals.push(SignalEntry { id: id.to_string(), hooks })
            }
            Constructed::Value(_) => {}
        }
        debug!(target: "injector", "Recorded {} '{}'", kind, id);
    }

    //--- Queries ----------------------------------------------------------

    pub(crate) fn object(&self, id: &str) -> Option<Rc<dyn Any>> {
        self.objects.get(id).map(|(_, object)| Rc::clone(object))
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.objects.contains_key(id)
    }

    pub(crate) fn len(&self) -> usize {
        self.objects.len()
    }

    /// Ids of `kind` in first-resolution order.
    pub(crate) fn order(&self, kind: Kind) -> Vec<String> {
        self.objects
            .iter()
            .filter(|(_, (k, _))| *k == kind)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub(crate) fn managers(&self) -> &[ManagerHandle] {
        &self.managers
    }

    pub(crate) fn services(&self) -> &[ServiceEntry] {
        &self.services
    }

    pub(crate) fn signals(&self) -> &[SignalEntry] {
        &self.signals
    }

    //--- Teardown ---------------------------------------------------------

    /// Destroys managers, then services, then signals, each in reverse
    /// resolution order, and drops every object.
    pub(crate) fn tear_down(self) {
        for handle in self.managers.iter().rev() {
            handle.destroy();
        }

        for entry in self.services.iter().rev() {
            match entry.hooks.try_borrow_mut() {
                Ok(mut service) => service.destroy(),
                Err(_) => {
                    warn!(target: "injector", "Service '{}' is busy; destroy skipped", entry.id)
                }
            }
        }

        for entry in self.signals.iter().rev() {
            match entry.hooks.try_borrow_mut() {
                Ok(mut signal) => signal.destroy(),
                Err(_) => {
                    warn!(target: "injector", "Signal '{}' is busy; destroy skipped", entry.id)
                }
            }
        }

        debug!(target: "injector", "Container discarded ({} objects)", self.objects.len());
    }
}

//=========================================================================
// Tests
//=========================================================================
