//! Append-only activity ledger, capped to the most recent entries.
//!
//! The ledger is the audit trail behind the dashboard's "sent today"
//! bucket, so entries must be appended in the order their triggering
//! events occurred. No update or delete of individual entries exists.

use crate::types::ActivityLogEntry;

/// Maximum number of entries retained; oldest dropped first.
pub const MAX_ENTRIES: usize = 50;

#[derive(Debug, Default)]
pub struct ActivityLedger {
    /// Newest first.
    entries: Vec<ActivityLogEntry>,
}

impl ActivityLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the ledger from a loaded collection (newest first),
    /// enforcing the cap.
    pub fn from_entries(mut entries: Vec<ActivityLogEntry>) -> Self {
        entries.truncate(MAX_ENTRIES);
        Self { entries }
    }

    /// Head insert, then truncate to the cap.
    pub fn append(&mut self, entry: ActivityLogEntry) {
        self.entries.insert(0, entry);
        if self.entries.len() > MAX_ENTRIES {
            self.entries.truncate(MAX_ENTRIES);
        }
    }

    /// All retained entries, newest first.
    pub fn entries(&self) -> &[ActivityLogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ActionKind, Lead, LeadStatus, LeadType};
    use chrono::{Duration, Utc};

    fn lead() -> Lead {
        Lead {
            id: "l1".to_string(),
            name: "Joe".to_string(),
            email: "joe@big.io".to_string(),
            company: "Big".to_string(),
            lead_type: LeadType::Kdm,
            status: LeadStatus::Active,
            current_step: 1,
            last_action_date: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_append_newest_first() {
        let mut ledger = ActivityLedger::new();
        let t0 = Utc::now();
        ledger.append(ActivityLogEntry::record(&lead(), ActionKind::Created, t0));
        ledger.append(ActivityLogEntry::record(
            &lead(),
            ActionKind::ManualSend,
            t0 + Duration::minutes(1),
        ));
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.entries()[0].kind, ActionKind::ManualSend);
        assert_eq!(ledger.entries()[1].kind, ActionKind::Created);
    }

    #[test]
    fn test_cap_drops_oldest() {
        let mut ledger = ActivityLedger::new();
        let t0 = Utc::now();
        for i in 0..60 {
            let mut entry =
                ActivityLogEntry::record(&lead(), ActionKind::ManualSend, t0 + Duration::seconds(i));
            entry.id = format!("entry-{i}");
            ledger.append(entry);
        }
        assert_eq!(ledger.len(), MAX_ENTRIES);
        // Newest entry is the last appended; the first ten were dropped.
        assert_eq!(ledger.entries()[0].id, "entry-59");
        assert_eq!(ledger.entries()[MAX_ENTRIES - 1].id, "entry-10");
    }

    #[test]
    fn test_from_entries_enforces_cap() {
        let t0 = Utc::now();
        let entries: Vec<_> = (0..80)
            .map(|i| ActivityLogEntry::record(&lead(), ActionKind::Created, t0 + Duration::seconds(i)))
            .collect();
        let ledger = ActivityLedger::from_entries(entries);
        assert_eq!(ledger.len(), MAX_ENTRIES);
    }
}
