//! Core entity types — the persisted wire contract.
//!
//! Every struct here round-trips through both persistence backends
//! (local JSON cache and the remote document store), so field names are
//! camelCase and shapes must stay stable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which template track a lead follows. Immutable after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeadType {
    /// Key decision maker — direct value-proposition track.
    #[serde(rename = "KDM")]
    Kdm,
    /// Referrer / partnership track.
    Referrer,
}

/// Lifecycle status of a lead.
///
/// `Paused` and `Lost` are terminal states set by the operator outside
/// this engine; the engine only excludes them from due-date computations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeadStatus {
    Active,
    Paused,
    Converted,
    Lost,
    Replied,
}

/// A prospect tracked through the four-step outreach cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub name: String,
    pub email: String,
    pub company: String,
    #[serde(rename = "type")]
    pub lead_type: LeadType,
    pub status: LeadStatus,
    /// 0 = never contacted, 4 = sequence exhausted. Monotonically
    /// non-decreasing over the lead's lifetime.
    pub current_step: u8,
    /// Timestamp of the most recent outbound action, if any.
    #[serde(default)]
    pub last_action_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Tagged classification of a ledger entry.
///
/// The free-text `action` label on [`ActivityLogEntry`] is for display
/// only; all bucketing logic keys off this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    ManualSend,
    AiSend,
    ReplyDetected,
    Created,
}

impl ActionKind {
    /// True for the two variants that represent an outbound send.
    pub fn is_send(self) -> bool {
        matches!(self, ActionKind::ManualSend | ActionKind::AiSend)
    }

    /// Human-readable label stored alongside the tag.
    pub fn label(self) -> &'static str {
        match self {
            ActionKind::ManualSend => "Email sent (Manual)",
            ActionKind::AiSend => "Email sent (AI)",
            ActionKind::ReplyDetected => "Reply detected (Gmail)",
            ActionKind::Created => "Lead created",
        }
    }
}

/// Immutable record of one action taken on a lead.
///
/// Created only by the ledger append path; never mutated or deleted
/// individually. `lead_name` is a denormalized snapshot — deleting the
/// lead does not rewrite its history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogEntry {
    pub id: String,
    pub lead_id: String,
    pub lead_name: String,
    pub kind: ActionKind,
    /// Display label, derived from `kind` at creation time.
    pub action: String,
    /// The lead's `current_step` at the time of the event.
    pub step: u8,
    pub timestamp: DateTime<Utc>,
}

impl ActivityLogEntry {
    /// Build an entry recording `kind` against `lead` at `now`.
    pub fn record(lead: &Lead, kind: ActionKind, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            lead_id: lead.id.clone(),
            lead_name: lead.name.clone(),
            kind,
            action: kind.label().to_string(),
            step: lead.current_step,
            timestamp: now,
        }
    }
}

/// One outreach message template, tied to a 1-based cadence step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub step: u8,
    pub title: String,
    pub subject: String,
    pub body: String,
}

/// A fully substituted subject/body pair ready for the compose surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedMessage {
    pub subject: String,
    pub body: String,
}
