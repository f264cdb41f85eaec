//! Dual-backend persistence gateway.
//!
//! Two write targets: a synchronous local JSON cache (always available)
//! and an optional remote document store. Policy:
//! - Startup read prefers the remote store; a non-empty remote
//!   collection wins, otherwise the local cache — independently for
//!   leads, the activity ledger, and templates.
//! - Every mutation writes the local cache synchronously first, then
//!   attempts the remote write on a spawned task. Remote failures are
//!   logged and swallowed, never retried: the backends stay inconsistent
//!   until the next successful write reconciles them. This is an
//!   accepted consistency gap, not a bug to fix here.
//!
//! The gateway is an explicitly constructed instance handed to the
//! engine — no global store handle.

pub mod local;
pub mod remote;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::ledger::MAX_ENTRIES;
use crate::template::TemplateConfig;
use crate::types::{ActivityLogEntry, Lead};

use local::LocalCache;
use remote::FirestoreStore;

pub const COLLECTION_LEADS: &str = "leads";
pub const COLLECTION_LOGS: &str = "activity_logs";
pub const COLLECTION_CONFIG: &str = "config";
pub const TEMPLATES_DOC_ID: &str = "templates";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Token expired or revoked")]
    AuthExpired,

    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cache directory unavailable: {0}")]
    CacheDir(String),

    #[error("Malformed record: {0}")]
    Shape(String),
}

/// Remote key-value document store: three logical collections of
/// documents keyed by entity id.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn upsert(&self, collection: &str, id: &str, record: Value) -> Result<(), StoreError>;
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;
    /// Ordered, limited full-collection read.
    async fn list(
        &self,
        collection: &str,
        order_by: &str,
        limit: u32,
    ) -> Result<Vec<Value>, StoreError>;
}

/// The three collections as read at startup.
#[derive(Debug, Default)]
pub struct LoadedState {
    pub leads: Vec<Lead>,
    pub entries: Vec<ActivityLogEntry>,
    pub templates: Option<TemplateConfig>,
}

pub struct PersistenceGateway {
    cache: LocalCache,
    remote: Option<Arc<dyn DocumentStore>>,
    /// In-flight remote write tasks, awaited on close (best effort).
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl PersistenceGateway {
    pub fn new(cache: LocalCache, remote: Option<Arc<dyn DocumentStore>>) -> Self {
        Self {
            cache,
            remote,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Build a gateway from config: cache dir plus an optional Firestore
    /// backend. Missing remote config degrades to local-only mode.
    pub fn from_config(config: &Config) -> Result<Self, StoreError> {
        let dir = crate::config::cache_dir(config).map_err(|e| StoreError::CacheDir(e.to_string()))?;
        let cache = LocalCache::new(dir)?;
        let remote: Option<Arc<dyn DocumentStore>> = match &config.firestore {
            Some(fs_config) => Some(Arc::new(FirestoreStore::new(fs_config))),
            None => {
                log::info!("No remote store configured — running local-cache-only");
                None
            }
        };
        Ok(Self::new(cache, remote))
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Startup read with remote-preferred precedence, applied
    /// independently per collection. Remote failures degrade to the
    /// cache; nothing here is fatal.
    pub async fn load(&self) -> LoadedState {
        let mut state = LoadedState {
            leads: self.cache.load_leads(),
            entries: self.cache.load_entries(),
            templates: self.cache.load_templates(),
        };

        let remote = match &self.remote {
            Some(r) => r,
            None => return state,
        };

        match remote.list(COLLECTION_LEADS, "createdAt desc", 500).await {
            Ok(docs) if !docs.is_empty() => {
                let leads = decode_records::<Lead>(docs, COLLECTION_LEADS);
                if !leads.is_empty() {
                    state.leads = leads;
                }
            }
            Ok(_) => log::debug!("Remote leads collection empty, keeping cache"),
            Err(e) => log::warn!("Remote leads read failed, keeping cache: {e}"),
        }

        match remote
            .list(COLLECTION_LOGS, "timestamp desc", MAX_ENTRIES as u32)
            .await
        {
            Ok(docs) if !docs.is_empty() => {
                let entries = decode_records::<ActivityLogEntry>(docs, COLLECTION_LOGS);
                if !entries.is_empty() {
                    state.entries = entries;
                }
            }
            Ok(_) => log::debug!("Remote activity log empty, keeping cache"),
            Err(e) => log::warn!("Remote activity log read failed, keeping cache: {e}"),
        }

        match remote.get(COLLECTION_CONFIG, TEMPLATES_DOC_ID).await {
            Ok(Some(doc)) => match doc.get("value").and_then(|v| v.as_str()) {
                Some(raw) => match serde_json::from_str::<TemplateConfig>(raw) {
                    Ok(templates) => {
                        // Mirror the remote copy into the cache, as the
                        // original client did on fetch.
                        if let Err(e) = self.cache.save_templates(&templates) {
                            log::warn!("Failed to mirror templates to cache: {e}");
                        }
                        state.templates = Some(templates);
                    }
                    Err(e) => log::warn!("Malformed remote templates, keeping cache: {e}"),
                },
                None => log::warn!("Remote templates doc has no value field"),
            },
            Ok(None) => log::debug!("No remote templates doc, keeping cache"),
            Err(e) => log::warn!("Remote templates read failed, keeping cache: {e}"),
        }

        state
    }

    /// Upsert one lead: whole collection to the cache synchronously,
    /// then the single document to the remote store, fire-and-forget.
    /// Writing an identical lead twice is a no-op for observable state.
    pub fn upsert_lead(&self, lead: &Lead, all: &[Lead]) -> Result<(), StoreError> {
        self.cache.save_leads(all)?;
        if let Some(remote) = &self.remote {
            let remote = Arc::clone(remote);
            let id = lead.id.clone();
            let record = serde_json::to_value(lead)?;
            self.spawn_remote(async move {
                if let Err(e) = remote.upsert(COLLECTION_LEADS, &id, record).await {
                    log::warn!("Remote lead sync failed for {id}: {e}");
                }
            });
        }
        Ok(())
    }

    /// Delete a lead from both backends. Ledger history is untouched —
    /// entries are immutable facts, not foreign-keyed.
    pub fn delete_lead(&self, id: &str, remaining: &[Lead]) -> Result<(), StoreError> {
        self.cache.save_leads(remaining)?;
        if let Some(remote) = &self.remote {
            let remote = Arc::clone(remote);
            let id = id.to_string();
            self.spawn_remote(async move {
                if let Err(e) = remote.delete(COLLECTION_LEADS, &id).await {
                    log::warn!("Remote lead delete failed for {id}: {e}");
                }
            });
        }
        Ok(())
    }

    /// Persist a freshly appended ledger entry (and the capped
    /// collection it belongs to).
    pub fn append_entry(
        &self,
        entry: &ActivityLogEntry,
        all: &[ActivityLogEntry],
    ) -> Result<(), StoreError> {
        self.cache.save_entries(all)?;
        if let Some(remote) = &self.remote {
            let remote = Arc::clone(remote);
            let id = entry.id.clone();
            let record = serde_json::to_value(entry)?;
            self.spawn_remote(async move {
                if let Err(e) = remote.upsert(COLLECTION_LOGS, &id, record).await {
                    log::warn!("Remote activity log sync failed for {id}: {e}");
                }
            });
        }
        Ok(())
    }

    /// Persist the operator's template configuration. The remote copy is
    /// a single config document carrying the whole set as a JSON string.
    pub fn save_templates(&self, templates: &TemplateConfig) -> Result<(), StoreError> {
        self.cache.save_templates(templates)?;
        if let Some(remote) = &self.remote {
            let remote = Arc::clone(remote);
            let value = serde_json::to_string(templates)?;
            let record = serde_json::json!({
                "value": value,
                "updatedAt": chrono::Utc::now().to_rfc3339(),
            });
            self.spawn_remote(async move {
                if let Err(e) = remote.upsert(COLLECTION_CONFIG, TEMPLATES_DOC_ID, record).await {
                    log::warn!("Remote template sync failed: {e}");
                }
            });
        }
        Ok(())
    }

    /// Remote writes ride the current Tokio runtime. Outside a runtime
    /// the remote side is skipped with a warning; the local write has
    /// already succeeded.
    fn spawn_remote(&self, fut: impl std::future::Future<Output = ()> + Send + 'static) {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                log::warn!("No async runtime available, skipping remote sync");
                return;
            }
        };
        let handle = runtime.spawn(fut);
        if let Ok(mut pending) = self.pending.lock() {
            pending.retain(|h| !h.is_finished());
            pending.push(handle);
        }
    }

    /// Wait for in-flight remote writes. Best effort — errors were
    /// already logged by the tasks themselves.
    pub async fn close(&self) {
        let handles: Vec<JoinHandle<()>> = self
            .pending
            .lock()
            .map(|mut g| g.drain(..).collect())
            .unwrap_or_default();
        for handle in handles {
            let _ = handle.await;
        }
    }
}

/// Decode a list of raw documents, skipping malformed records.
fn decode_records<T: serde::de::DeserializeOwned>(docs: Vec<Value>, collection: &str) -> Vec<T> {
    let mut records = Vec::with_capacity(docs.len());
    for doc in docs {
        match serde_json::from_value::<T>(doc) {
            Ok(record) => records.push(record),
            Err(e) => log::warn!("Skipping malformed {collection} record: {e}"),
        }
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::leads::new_lead;
    use crate::types::{ActionKind, LeadType};
    use chrono::Utc;
    use std::collections::HashMap;

    fn local_only_gateway() -> (PersistenceGateway, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::new(dir.path().to_path_buf()).unwrap();
        (PersistenceGateway::new(cache, None), dir)
    }

    /// In-memory document store standing in for the remote backend.
    #[derive(Default)]
    struct MemoryStore {
        docs: Mutex<HashMap<String, HashMap<String, Value>>>,
    }

    impl MemoryStore {
        fn count(&self, collection: &str) -> usize {
            self.docs
                .lock()
                .unwrap()
                .get(collection)
                .map_or(0, |c| c.len())
        }
    }

    #[async_trait]
    impl DocumentStore for MemoryStore {
        async fn upsert(&self, collection: &str, id: &str, record: Value) -> Result<(), StoreError> {
            self.docs
                .lock()
                .unwrap()
                .entry(collection.to_string())
                .or_default()
                .insert(id.to_string(), record);
            Ok(())
        }

        async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
            if let Some(col) = self.docs.lock().unwrap().get_mut(collection) {
                col.remove(id);
            }
            Ok(())
        }

        async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
            Ok(self
                .docs
                .lock()
                .unwrap()
                .get(collection)
                .and_then(|c| c.get(id))
                .cloned())
        }

        async fn list(
            &self,
            collection: &str,
            _order_by: &str,
            limit: u32,
        ) -> Result<Vec<Value>, StoreError> {
            Ok(self
                .docs
                .lock()
                .unwrap()
                .get(collection)
                .map(|c| c.values().take(limit as usize).cloned().collect())
                .unwrap_or_default())
        }
    }

    /// A remote backend where every call fails.
    struct FailingStore;

    fn unavailable() -> StoreError {
        StoreError::Api {
            status: 503,
            message: "unavailable".to_string(),
        }
    }

    #[async_trait]
    impl DocumentStore for FailingStore {
        async fn upsert(&self, _: &str, _: &str, _: Value) -> Result<(), StoreError> {
            Err(unavailable())
        }

        async fn delete(&self, _: &str, _: &str) -> Result<(), StoreError> {
            Err(unavailable())
        }

        async fn get(&self, _: &str, _: &str) -> Result<Option<Value>, StoreError> {
            Err(unavailable())
        }

        async fn list(&self, _: &str, _: &str, _: u32) -> Result<Vec<Value>, StoreError> {
            Err(unavailable())
        }
    }

    fn gateway_with_remote(
        remote: Arc<dyn DocumentStore>,
    ) -> (PersistenceGateway, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::new(dir.path().to_path_buf()).unwrap();
        (PersistenceGateway::new(cache, Some(remote)), dir)
    }

    #[tokio::test]
    async fn test_load_empty_local_only() {
        let (gateway, _dir) = local_only_gateway();
        let state = gateway.load().await;
        assert!(state.leads.is_empty());
        assert!(state.entries.is_empty());
        assert!(state.templates.is_none());
    }

    #[tokio::test]
    async fn test_upsert_then_load_round_trip() {
        let (gateway, _dir) = local_only_gateway();
        let lead = new_lead("Joe", "joe@big.io", "Big", LeadType::Kdm, Utc::now());
        let all = vec![lead.clone()];
        gateway.upsert_lead(&lead, &all).unwrap();

        let state = gateway.load().await;
        assert_eq!(state.leads.len(), 1);
        assert_eq!(state.leads[0].id, lead.id);
    }

    #[tokio::test]
    async fn test_upsert_idempotent() {
        let (gateway, _dir) = local_only_gateway();
        let lead = new_lead("Joe", "joe@big.io", "Big", LeadType::Kdm, Utc::now());
        let all = vec![lead.clone()];
        gateway.upsert_lead(&lead, &all).unwrap();
        gateway.upsert_lead(&lead, &all).unwrap();

        let state = gateway.load().await;
        assert_eq!(state.leads.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_keeps_ledger_history() {
        let (gateway, _dir) = local_only_gateway();
        let lead = new_lead("Joe", "joe@big.io", "Big", LeadType::Kdm, Utc::now());
        let entry = crate::types::ActivityLogEntry::record(&lead, ActionKind::Created, Utc::now());
        gateway.upsert_lead(&lead, &[lead.clone()]).unwrap();
        gateway.append_entry(&entry, &[entry.clone()]).unwrap();

        gateway.delete_lead(&lead.id, &[]).unwrap();
        let state = gateway.load().await;
        assert!(state.leads.is_empty());
        assert_eq!(state.entries.len(), 1);
        assert_eq!(state.entries[0].lead_id, lead.id);
    }

    #[tokio::test]
    async fn test_templates_round_trip() {
        let (gateway, _dir) = local_only_gateway();
        let mut templates = TemplateConfig::default();
        templates.kdm.get_mut(&1).unwrap().subject = "Changed".to_string();
        gateway.save_templates(&templates).unwrap();

        let state = gateway.load().await;
        assert_eq!(state.templates.unwrap().kdm[&1].subject, "Changed");
        gateway.close().await;
    }

    #[tokio::test]
    async fn test_nonempty_remote_wins_over_cache() {
        let mem = Arc::new(MemoryStore::default());
        let remote: Arc<dyn DocumentStore> = Arc::clone(&mem) as Arc<dyn DocumentStore>;
        let (gateway, _dir) = gateway_with_remote(remote);

        let local = new_lead("Local", "local@acme.com", "Acme", LeadType::Kdm, Utc::now());
        gateway.cache.save_leads(&[local]).unwrap();
        let synced = new_lead("Synced", "synced@big.io", "Big", LeadType::Referrer, Utc::now());
        mem.upsert(
            COLLECTION_LEADS,
            &synced.id,
            serde_json::to_value(&synced).unwrap(),
        )
        .await
        .unwrap();

        let state = gateway.load().await;
        assert_eq!(state.leads.len(), 1);
        assert_eq!(state.leads[0].name, "Synced");
    }

    #[tokio::test]
    async fn test_empty_remote_keeps_cache() {
        let remote: Arc<dyn DocumentStore> = Arc::new(MemoryStore::default());
        let (gateway, _dir) = gateway_with_remote(remote);

        let local = new_lead("Local", "local@acme.com", "Acme", LeadType::Kdm, Utc::now());
        let entry = ActivityLogEntry::record(&local, ActionKind::Created, Utc::now());
        gateway.cache.save_leads(&[local.clone()]).unwrap();
        gateway.cache.save_entries(&[entry]).unwrap();

        let state = gateway.load().await;
        assert_eq!(state.leads.len(), 1);
        assert_eq!(state.leads[0].id, local.id);
        assert_eq!(state.entries.len(), 1);
    }

    #[tokio::test]
    async fn test_remote_templates_doc_wins_and_mirrors() {
        let mem = Arc::new(MemoryStore::default());
        let remote: Arc<dyn DocumentStore> = Arc::clone(&mem) as Arc<dyn DocumentStore>;
        let (gateway, _dir) = gateway_with_remote(remote);

        let mut templates = TemplateConfig::default();
        templates.kdm.get_mut(&1).unwrap().subject = "Synced subject".to_string();
        mem.upsert(
            COLLECTION_CONFIG,
            TEMPLATES_DOC_ID,
            serde_json::json!({ "value": serde_json::to_string(&templates).unwrap() }),
        )
        .await
        .unwrap();

        let state = gateway.load().await;
        assert_eq!(state.templates.unwrap().kdm[&1].subject, "Synced subject");
        // The remote copy was mirrored into the cache on fetch.
        assert_eq!(
            gateway.cache.load_templates().unwrap().kdm[&1].subject,
            "Synced subject"
        );
    }

    #[tokio::test]
    async fn test_remote_write_propagates() {
        let mem = Arc::new(MemoryStore::default());
        let remote: Arc<dyn DocumentStore> = Arc::clone(&mem) as Arc<dyn DocumentStore>;
        let (gateway, _dir) = gateway_with_remote(remote);

        let lead = new_lead("Joe", "joe@big.io", "Big", LeadType::Kdm, Utc::now());
        gateway.upsert_lead(&lead, &[lead.clone()]).unwrap();
        gateway.close().await;
        assert_eq!(mem.count(COLLECTION_LEADS), 1);

        gateway.delete_lead(&lead.id, &[]).unwrap();
        gateway.close().await;
        assert_eq!(mem.count(COLLECTION_LEADS), 0);
    }

    #[tokio::test]
    async fn test_failed_remote_write_keeps_local_cache() {
        let remote: Arc<dyn DocumentStore> = Arc::new(FailingStore);
        let (gateway, _dir) = gateway_with_remote(remote);

        // The write surfaces no error even though the remote side fails.
        let lead = new_lead("Joe", "joe@big.io", "Big", LeadType::Kdm, Utc::now());
        gateway.upsert_lead(&lead, &[lead.clone()]).unwrap();
        gateway.close().await;

        // Startup degrades to the cache, which holds the advance.
        let state = gateway.load().await;
        assert_eq!(state.leads.len(), 1);
        assert_eq!(state.leads[0].id, lead.id);
    }

    #[test]
    fn test_write_outside_runtime_skips_remote() {
        let mem = Arc::new(MemoryStore::default());
        let remote: Arc<dyn DocumentStore> = Arc::clone(&mem) as Arc<dyn DocumentStore>;
        let (gateway, _dir) = gateway_with_remote(remote);

        // No async runtime here: the local write still lands, the remote
        // side is skipped instead of panicking.
        let lead = new_lead("Joe", "joe@big.io", "Big", LeadType::Kdm, Utc::now());
        gateway.upsert_lead(&lead, &[lead.clone()]).unwrap();
        assert_eq!(mem.count(COLLECTION_LEADS), 0);
        assert_eq!(gateway.cache.load_leads().len(), 1);
    }
}
