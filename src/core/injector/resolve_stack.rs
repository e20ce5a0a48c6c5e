//=========================================================================
// Resolve Stack
//=========================================================================
//
// Ids currently mid-construction, used only for cycle detection.
//
// Each level is owned by a ResolveGuard that truncates the stack back to
// its own depth when dropped, on success and on every error path alike.
// A failed top-level resolution therefore always leaves the stack empty.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::RefCell;

use log::error;

//=== Internal Dependencies ===============================================

use super::InjectorError;

//=== ResolveStack ========================================================

#[derive(Debug, Default)]
pub(crate) struct ResolveStack {
    ids: RefCell<Vec<String>>,
}

impl ResolveStack {
    /// Pushes `id`, failing if it is already being resolved.
    pub(crate) fn enter(&self, id: &str) -> Result<ResolveGuard<'_>, InjectorError> {
        let mut ids = self.ids.borrow_mut();

        if ids.iter().any(|active| active == id) {
            let mut chain = ids.clone();
            chain.push(id.to_string());
            error!(target: "injector", "Cyclic reference: {}", chain.join(" -> "));
            return Err(InjectorError::CyclicReference { id: id.to_string(), chain });
        }

        let depth = ids.len();
        ids.push(id.to_string());
        Ok(ResolveGuard { stack: self, depth })
    }

    pub(crate) fn snapshot(&self) -> Vec<String> {
        self.ids.borrow().clone()
    }
}

//=== ResolveGuard ========================================================

/// Scope of one in-progress resolution.
pub(crate) struct ResolveGuard<'a> {
    stack: &'a ResolveStack,
    depth: usize,
}

impl Drop for ResolveGuard<'_> {
    fn drop(&mut self) {
        self.stack.ids.borrow_mut().truncate(self.depth);
    }
}

//=========================================================================
// Tests
//=========================================================================
