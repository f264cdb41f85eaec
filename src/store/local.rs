//! Local cache: a synchronous string-keyed JSON-file store.
//!
//! One file per key under the cache directory. Survives restarts, does
//! not survive the directory being cleared. Malformed content fails
//! closed to the empty collection — a corrupt cache must never crash
//! the engine.

use std::fs;
use std::path::PathBuf;

use serde::de::DeserializeOwned;

use super::StoreError;
use crate::template::TemplateConfig;
use crate::types::{ActivityLogEntry, Lead};

pub const KEY_LEADS: &str = "leads";
pub const KEY_ACTIVITY_LOG: &str = "activity_log";
pub const KEY_TEMPLATES: &str = "templates";

#[derive(Debug)]
pub struct LocalCache {
    dir: PathBuf,
}

impl LocalCache {
    pub fn new(dir: PathBuf) -> Result<Self, StoreError> {
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }
        Ok(Self { dir })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Raw read: `None` when the key has never been written.
    pub fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path(key)).ok()
    }

    /// Raw write, synchronous.
    pub fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        fs::write(self.path(key), value)?;
        Ok(())
    }

    fn load_or_empty<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.get(key) {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(value) => value,
                Err(e) => {
                    log::warn!("Malformed cache entry {key}, starting empty: {e}");
                    T::default()
                }
            },
            None => T::default(),
        }
    }

    pub fn load_leads(&self) -> Vec<Lead> {
        self.load_or_empty(KEY_LEADS)
    }

    pub fn save_leads(&self, leads: &[Lead]) -> Result<(), StoreError> {
        self.set(KEY_LEADS, &serde_json::to_string(leads)?)
    }

    pub fn load_entries(&self) -> Vec<ActivityLogEntry> {
        self.load_or_empty(KEY_ACTIVITY_LOG)
    }

    pub fn save_entries(&self, entries: &[ActivityLogEntry]) -> Result<(), StoreError> {
        self.set(KEY_ACTIVITY_LOG, &serde_json::to_string(entries)?)
    }

    /// Templates are optional — `None` means the caller keeps its
    /// built-in defaults.
    pub fn load_templates(&self) -> Option<TemplateConfig> {
        let raw = self.get(KEY_TEMPLATES)?;
        match serde_json::from_str(&raw) {
            Ok(templates) => Some(templates),
            Err(e) => {
                log::warn!("Malformed cached templates, using defaults: {e}");
                None
            }
        }
    }

    pub fn save_templates(&self, templates: &TemplateConfig) -> Result<(), StoreError> {
        self.set(KEY_TEMPLATES, &serde_json::to_string(templates)?)
    }
}
