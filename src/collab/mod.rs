//! External collaborators, consumed through narrow trait seams.
//!
//! The engine never depends on these succeeding: every collaborator
//! failure has a deterministic fallback (raw template instead of an AI
//! draft, "no reply found" instead of a detection result). Concrete
//! implementations talk to Gmail, Gemini, and the system browser; tests
//! substitute in-memory doubles.

pub mod compose;
pub mod draft;
pub mod gmail;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::{Lead, RenderedMessage};

#[derive(Debug, Error)]
pub enum CollabError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Token expired or revoked")]
    AuthExpired,

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Empty response from drafting model")]
    EmptyDraft,

    #[error("Failed to open compose surface: {0}")]
    Launch(String),
}

/// Answers "has any message arrived from this address since `after`?".
#[async_trait]
pub trait ReplyDetector: Send + Sync {
    async fn has_reply_since(
        &self,
        email: &str,
        after: DateTime<Utc>,
    ) -> Result<bool, CollabError>;
}

/// Produces an alternative message body from a rendered template draft.
#[async_trait]
pub trait MessageDrafter: Send + Sync {
    async fn draft(
        &self,
        lead: &Lead,
        base_body: &str,
        sender_name: &str,
    ) -> Result<String, CollabError>;
}

/// Hands a fully rendered message to an external compose surface. The
/// engine only verifies the hand-off happened, never delivery.
#[async_trait]
pub trait ComposeSurface: Send + Sync {
    async fn open_compose(&self, to: &str, message: &RenderedMessage) -> Result<(), CollabError>;
}
