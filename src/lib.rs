//! Cadence — an outreach sequencing engine for tracking sales leads
//! through a fixed four-step email cadence.
//!
//! The engine owns three pieces of state: the lead collection, a capped
//! append-only activity ledger, and the operator's message templates.
//! Around them it provides:
//!
//! - a cadence schedule (fixed step waits) and due-date computation,
//! - an on-demand dashboard that classifies leads into action buckets,
//! - a token-substitution template renderer,
//! - a lead state machine (advance on send, mark replied on detection),
//! - a dual-backend persistence gateway (synchronous local cache plus
//!   best-effort remote document store),
//! - optional external collaborators behind trait seams: Gmail reply
//!   detection, AI message drafting, and a browser compose hand-off.
//!
//! The [`engine::Engine`] facade ties these together; each layer is also
//! usable on its own.

pub mod cadence;
pub mod collab;
pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod services;
pub mod store;
pub mod template;
pub mod types;

pub use config::{load_config, Config, FirestoreConfig};
pub use engine::{Collaborators, Engine};
pub use error::{ConfigError, EngineError};
pub use ledger::{ActivityLedger, MAX_ENTRIES};
pub use services::dashboard::{DashboardSnapshot, UpcomingLead};
pub use store::{PersistenceGateway, StoreError};
pub use template::TemplateConfig;
pub use types::{ActionKind, ActivityLogEntry, Lead, LeadStatus, LeadType, RenderedMessage, Template};
