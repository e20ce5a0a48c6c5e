//=========================================================================
// Service Contract
//=========================================================================
//
// Services are registered objects without per-frame phases. They are set
// up after every manager and destroyed after every manager on shutdown.
//
//=========================================================================

//=== Internal Dependencies ===============================================

use crate::core::BoxError;

//=== Service Trait =======================================================

/// A registered object with a setup hook and no per-frame work.
pub trait Service: 'static {
    /// Called once at boot, after every manager has been set up.
    fn setup(&mut self) -> Result<(), BoxError> {
        Ok(())
    }

    /// Called once when the owning injector is destroyed.
    fn destroy(&mut self) {}
}
