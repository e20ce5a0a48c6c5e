//=========================================================================
// Injector Errors
//=========================================================================

//=== Internal Dependencies ===============================================

use crate::core::BoxError;

//=== InjectorError =======================================================

/// Registration and resolution failures.
///
/// None of them are retried; they propagate synchronously to the caller
/// of `register_*`, `resolve` or `build`.
#[derive(Debug, thiserror::Error)]
pub enum InjectorError {
    /// Duplicate id, or a registration attempted after `build()`.
    #[error("cannot register '{id}': {reason}")]
    Registration { id: String, reason: String },

    /// No registration exists for the requested id.
    #[error("no registration for '{id}'")]
    Resolution { id: String },

    /// The id resolved to a different type than the one requested.
    #[error("'{id}' is not a `{expected}`")]
    TypeMismatch { id: String, expected: &'static str },

    /// The id is already being constructed further up the resolve stack.
    #[error("cyclic reference while resolving '{id}': {}", chain.join(" -> "))]
    CyclicReference { id: String, chain: Vec<String> },

    /// The constructor, factory or provider for the id failed.
    #[error("failed to construct '{id}': {source}")]
    Construction {
        id: String,
        #[source]
        source: BoxError,
    },
}

impl InjectorError {
    pub(crate) fn duplicate(id: &str) -> Self {
        Self::Registration {
            id: id.to_string(),
            reason: "id is already registered".to_string(),
        }
    }

    pub(crate) fn sealed(id: &str) -> Self {
        Self::Registration {
            id: id.to_string(),
            reason: "the injector has already been built".to_string(),
        }
    }

    /// The id the error is about.
    pub fn id(&self) -> &str {
        match self {
            Self::Registration { id, .. }
            | Self::Resolution { id }
            | Self::TypeMismatch { id, .. }
            | Self::CyclicReference { id, .. }
            | Self::Construction { id, .. } => id,
        }
    }
}
