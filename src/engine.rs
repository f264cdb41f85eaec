//! The outreach engine facade.
//!
//! Owns the in-memory model (leads, ledger, templates) and applies every
//! mutation between awaits, so there is no shared-memory race to guard
//! against: all operations take `&mut self` and run on a single task.
//! Each state transition is followed by a gateway write and, where the
//! contract requires it, exactly one ledger append.

use std::path::PathBuf;

use chrono::Utc;

use crate::cadence::SEQUENCE_LENGTH;
use crate::collab::compose::GmailCompose;
use crate::collab::draft::GeminiDrafter;
use crate::collab::gmail::GmailReplyDetector;
use crate::collab::{ComposeSurface, MessageDrafter, ReplyDetector};
use crate::config::Config;
use crate::error::EngineError;
use crate::ledger::ActivityLedger;
use crate::services::dashboard::{self, DashboardSnapshot};
use crate::services::leads;
use crate::store::{PersistenceGateway, StoreError};
use crate::template::{self, TemplateConfig};
use crate::types::{ActionKind, ActivityLogEntry, Lead, LeadStatus, LeadType, RenderedMessage};

/// The engine's external collaborators. Reply detection and drafting
/// are optional — absent credentials degrade those features, never the
/// core.
pub struct Collaborators {
    pub reply_detector: Option<Box<dyn ReplyDetector>>,
    pub drafter: Option<Box<dyn MessageDrafter>>,
    pub compose: Box<dyn ComposeSurface>,
}

impl Collaborators {
    /// Wire up the concrete collaborators available from config.
    pub fn from_config(config: &Config) -> Self {
        let reply_detector: Option<Box<dyn ReplyDetector>> = config
            .google_access_token
            .clone()
            .map(|token| Box::new(GmailReplyDetector::new(token)) as Box<dyn ReplyDetector>);
        let drafter: Option<Box<dyn MessageDrafter>> = config
            .gemini_api_key
            .clone()
            .map(|key| Box::new(GeminiDrafter::new(key)) as Box<dyn MessageDrafter>);
        Self {
            reply_detector,
            drafter,
            compose: Box::new(GmailCompose),
        }
    }
}

pub struct Engine {
    config: Config,
    /// Where config mutations are persisted; `None` keeps them in memory.
    config_path: Option<PathBuf>,
    gateway: PersistenceGateway,
    collab: Collaborators,
    templates: TemplateConfig,
    leads: Vec<Lead>,
    ledger: ActivityLedger,
}

impl Engine {
    pub fn new(config: Config, gateway: PersistenceGateway, collab: Collaborators) -> Self {
        Self {
            config,
            config_path: None,
            gateway,
            collab,
            templates: TemplateConfig::default(),
            leads: Vec::new(),
            ledger: ActivityLedger::new(),
        }
    }

    /// Build gateway and collaborators straight from config, persisting
    /// config mutations to the canonical config file.
    pub fn from_config(config: Config) -> Result<Self, StoreError> {
        let gateway = PersistenceGateway::from_config(&config)?;
        let collab = Collaborators::from_config(&config);
        let mut engine = Self::new(config, gateway, collab);
        engine.config_path = crate::config::config_path().ok();
        Ok(engine)
    }

    pub fn set_config_path(&mut self, path: PathBuf) {
        self.config_path = Some(path);
    }

    /// Startup read through the gateway's precedence policy. Nothing
    /// here is fatal — worst case the engine starts empty.
    pub async fn load(&mut self) {
        let state = self.gateway.load().await;
        self.leads = state.leads;
        self.ledger = ActivityLedger::from_entries(state.entries);
        self.templates = state.templates.unwrap_or_default();
        log::info!(
            "Loaded {} leads, {} ledger entries (remote: {})",
            self.leads.len(),
            self.ledger.len(),
            self.gateway.has_remote()
        );
    }

    /// Wait for in-flight remote writes before shutdown.
    pub async fn close(self) {
        self.gateway.close().await;
    }

    // ------------------------------------------------------------------
    // Read side
    // ------------------------------------------------------------------

    pub fn leads(&self) -> &[Lead] {
        &self.leads
    }

    pub fn ledger(&self) -> &[ActivityLogEntry] {
        self.ledger.entries()
    }

    pub fn templates(&self) -> &TemplateConfig {
        &self.templates
    }

    pub fn sender_name(&self) -> &str {
        &self.config.sender_name
    }

    /// Recompute the dashboard buckets from the current model.
    pub fn dashboard(&self) -> DashboardSnapshot {
        dashboard::snapshot(&self.leads, self.ledger.entries(), Utc::now())
    }

    /// Case-insensitive filter over name and company.
    pub fn filter_leads(&self, query: &str) -> Vec<&Lead> {
        let needle = query.to_lowercase();
        self.leads
            .iter()
            .filter(|l| {
                l.name.to_lowercase().contains(&needle)
                    || l.company.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Render the next-step message for a lead without sending it.
    pub fn preview(&self, id: &str) -> Result<RenderedMessage, EngineError> {
        let lead = self.get(id)?;
        let template = self
            .templates
            .next_step_template(lead)
            .ok_or_else(|| EngineError::TemplateMissing(id.to_string()))?;
        Ok(template::render(template, lead, &self.config.sender_name))
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Create a lead and record it in the ledger.
    pub async fn create_lead(
        &mut self,
        name: &str,
        email: &str,
        company: &str,
        lead_type: LeadType,
    ) -> Result<Lead, EngineError> {
        let now = Utc::now();
        let lead = leads::new_lead(name, email, company, lead_type, now);
        self.leads.insert(0, lead.clone());
        self.gateway.upsert_lead(&lead, &self.leads)?;
        self.log_action(&lead, ActionKind::Created, now)?;
        Ok(lead)
    }

    /// Remove a lead from both backends. Its ledger history stays — the
    /// entries are immutable facts.
    pub async fn delete_lead(&mut self, id: &str) -> Result<(), EngineError> {
        let idx = self.index_of(id)?;
        self.leads.remove(idx);
        self.gateway.delete_lead(id, &self.leads)?;
        Ok(())
    }

    /// Manual send: render, hand off to the compose surface, advance.
    pub async fn send_manual(&mut self, id: &str) -> Result<Lead, EngineError> {
        let idx = self.index_of(id)?;
        let lead = self.leads[idx].clone();
        if lead.current_step >= SEQUENCE_LENGTH {
            return Err(EngineError::SequenceExhausted(lead.id));
        }
        let message = self.preview(id)?;
        self.hand_off(&lead, &message).await?;
        self.advance_and_log(idx, ActionKind::ManualSend)
    }

    /// AI-assisted send: ask the drafter for an alternative body, fall
    /// back to the raw template on any failure, then hand off and
    /// advance exactly like a manual send.
    pub async fn send_ai(&mut self, id: &str) -> Result<Lead, EngineError> {
        let idx = self.index_of(id)?;
        let lead = self.leads[idx].clone();
        if lead.current_step >= SEQUENCE_LENGTH {
            return Err(EngineError::SequenceExhausted(lead.id));
        }
        let base = self.preview(id)?;
        let body = match &self.collab.drafter {
            Some(drafter) => {
                match drafter.draft(&lead, &base.body, &self.config.sender_name).await {
                    Ok(text) => text,
                    Err(e) => {
                        log::warn!("AI draft failed for {id}, using raw template: {e}");
                        base.body.clone()
                    }
                }
            }
            None => {
                log::debug!("No drafter configured, using raw template");
                base.body.clone()
            }
        };
        let message = RenderedMessage {
            subject: base.subject,
            body,
        };
        self.hand_off(&lead, &message).await?;
        self.advance_and_log(idx, ActionKind::AiSend)
    }

    /// Sweep active, already-contacted leads for replies — strictly
    /// sequentially, one probe at a time. Detector failures log and
    /// continue as "no reply found". Returns how many replies were
    /// marked.
    pub async fn check_replies(&mut self) -> usize {
        if self.collab.reply_detector.is_none() {
            log::debug!("No reply detector configured, skipping sweep");
            return 0;
        }
        let candidates: Vec<String> = self
            .leads
            .iter()
            .filter(|l| l.status == LeadStatus::Active && l.current_step > 0)
            .map(|l| l.id.clone())
            .collect();

        let mut found = 0;
        for id in candidates {
            let Ok(idx) = self.index_of(&id) else {
                continue;
            };
            let lead = self.leads[idx].clone();
            let after = crate::cadence::origin_date(&lead);
            let has_reply = {
                let Some(detector) = &self.collab.reply_detector else {
                    break;
                };
                match detector.has_reply_since(&lead.email, after).await {
                    Ok(result) => result,
                    Err(e) => {
                        log::warn!("Reply check failed for {id}, treating as no reply: {e}");
                        false
                    }
                }
            };
            if !has_reply {
                continue;
            }
            match leads::mark_replied(&lead) {
                Ok(updated) => {
                    self.leads[idx] = updated.clone();
                    if let Err(e) = self.gateway.upsert_lead(&updated, &self.leads) {
                        log::warn!("Failed to persist replied lead {id}: {e}");
                    }
                    if let Err(e) = self.log_action(&updated, ActionKind::ReplyDetected, Utc::now())
                    {
                        log::warn!("Failed to persist reply entry for {id}: {e}");
                    }
                    found += 1;
                }
                Err(e) => log::warn!("Skipping reply mark for {id}: {e}"),
            }
        }
        found
    }

    /// Edit one template's subject and body in memory. Persist with
    /// [`Engine::save_templates`].
    pub fn update_template(&mut self, track: LeadType, step: u8, subject: &str, body: &str) {
        if let Some(template) = self.templates.track_mut(track).get_mut(&step) {
            template.subject = subject.to_string();
            template.body = body.to_string();
        }
    }

    /// Replace the whole template configuration.
    pub fn set_templates(&mut self, templates: TemplateConfig) {
        self.templates = templates;
    }

    /// Persist the current template configuration to both backends.
    pub async fn save_templates(&mut self) -> Result<(), EngineError> {
        self.gateway.save_templates(&self.templates)?;
        Ok(())
    }

    /// Update the signature used for the `[MyName]` token, writing the
    /// config file when a path is configured.
    pub fn set_sender_name(&mut self, name: &str) -> Result<(), EngineError> {
        self.config.sender_name = name.to_string();
        if let Some(path) = &self.config_path {
            crate::config::create_or_update_config(path, &self.config, |_| {})?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn get(&self, id: &str) -> Result<&Lead, EngineError> {
        self.leads
            .iter()
            .find(|l| l.id == id)
            .ok_or_else(|| EngineError::LeadNotFound(id.to_string()))
    }

    fn index_of(&self, id: &str) -> Result<usize, EngineError> {
        self.leads
            .iter()
            .position(|l| l.id == id)
            .ok_or_else(|| EngineError::LeadNotFound(id.to_string()))
    }

    async fn hand_off(&self, lead: &Lead, message: &RenderedMessage) -> Result<(), EngineError> {
        self.collab
            .compose
            .open_compose(&lead.email, message)
            .await
            .map_err(|e| {
                log::warn!("Compose hand-off failed for {}: {e}", lead.id);
                EngineError::Compose(e.to_string())
            })
    }

    /// Advance one step and record the send — the paired transition +
    /// append the contract requires.
    fn advance_and_log(&mut self, idx: usize, kind: ActionKind) -> Result<Lead, EngineError> {
        let now = Utc::now();
        let updated = leads::advance(&self.leads[idx], now)?;
        self.leads[idx] = updated.clone();
        self.gateway.upsert_lead(&updated, &self.leads)?;
        self.log_action(&updated, kind, now)?;
        Ok(updated)
    }

    fn log_action(
        &mut self,
        lead: &Lead,
        kind: ActionKind,
        now: chrono::DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let entry = ActivityLogEntry::record(lead, kind, now);
        self.ledger.append(entry.clone());
        self.gateway.append_entry(&entry, self.ledger.entries())?;
        Ok(())
    }
}
