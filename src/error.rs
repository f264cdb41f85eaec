//! Engine error taxonomy.
//!
//! Errors are classified by how the caller should react:
//! - Rejected transitions: the requested state change is not legal for
//!   the lead's current state. Surface to the operator, nothing broke.
//! - Store errors: the local cache write failed. Remote failures never
//!   reach here — they are logged and swallowed by the gateway.
//! - Config errors: the config file is missing or unreadable.
//!
//! Collaborator failures (drafting, reply detection) are handled inline
//! with deterministic fallbacks and never escape the engine.

use thiserror::Error;

use crate::store::StoreError;
use crate::types::LeadStatus;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Lead not found: {0}")]
    LeadNotFound(String),

    #[error("Lead {0} is already at the final step")]
    SequenceExhausted(String),

    #[error("Lead {0} has never been contacted")]
    NeverContacted(String),

    #[error("Lead {id} cannot be marked replied from status {from:?}")]
    InvalidTransition { id: String, from: LeadStatus },

    #[error("No template configured for lead {0}")]
    TemplateMissing(String),

    #[error("Compose hand-off failed: {0}")]
    Compose(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl EngineError {
    /// True when the operation was rejected by the state machine rather
    /// than failing in I/O — the in-memory model is untouched.
    pub fn is_rejected_transition(&self) -> bool {
        matches!(
            self,
            EngineError::SequenceExhausted(_)
                | EngineError::NeverContacted(_)
                | EngineError::InvalidTransition { .. }
        )
    }
}

/// Configuration loading/saving errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not find home directory")]
    NoHome,

    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}
