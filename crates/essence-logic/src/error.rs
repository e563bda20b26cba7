//! Error kinds surfaced by the simulation rules.

use thiserror::Error;

use crate::resources::Resource;

/// Every recoverable or fatal failure a rule can report.
///
/// `InvalidDefinition` is fatal at load time. `NotAvailable` and
/// `InsufficientResource` are recoverable and guarantee the state was not
/// touched. `CorruptedSaveState` is raised when persisted or in-memory state
/// fails validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("invalid definition `{id}`: {reason}")]
    InvalidDefinition { id: String, reason: String },

    #[error("`{id}` is not available: {reason}")]
    NotAvailable { id: String, reason: String },

    #[error("insufficient {resource}: need {required}, have {available} (short {shortfall})")]
    InsufficientResource {
        resource: Resource,
        required: f64,
        available: f64,
        shortfall: f64,
    },

    #[error("corrupted save state: {0}")]
    CorruptedSaveState(String),
}

impl SimError {
    pub fn invalid(id: impl Into<String>, reason: impl Into<String>) -> Self {
        SimError::InvalidDefinition {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn not_available(id: impl Into<String>, reason: impl Into<String>) -> Self {
        SimError::NotAvailable {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn corrupted(reason: impl Into<String>) -> Self {
        SimError::CorruptedSaveState(reason.into())
    }

    /// Whether the caller can continue with the unchanged state.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SimError::NotAvailable { .. } | SimError::InsufficientResource { .. }
        )
    }
}
