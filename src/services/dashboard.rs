//! Dashboard aggregation — derives the operator's classified lead
//! buckets on demand.
//!
//! The aggregator holds no state of its own: every call recomputes the
//! buckets fresh from the lead collection and the activity ledger, which
//! makes it idempotent and side-effect free. "Today" boundaries use the
//! local calendar day; the due check itself compares full timestamps.

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::collections::HashSet;

use crate::cadence::{days_remaining, next_due_date, SEQUENCE_LENGTH};
use crate::types::{ActivityLogEntry, Lead, LeadStatus};

/// An in-sequence lead that is not yet due, with display metadata.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingLead {
    #[serde(flatten)]
    pub lead: Lead,
    pub due_date: DateTime<Utc>,
    pub days_remaining: i64,
}

/// The classified view of the full lead collection at one instant.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub total: usize,
    /// Active leads never contacted — immediately eligible, no due check.
    pub new_prospects: Vec<Lead>,
    /// Active, mid-sequence leads whose next step is due now.
    pub due_today: Vec<Lead>,
    /// Active, mid-sequence leads whose next step is not yet due.
    pub upcoming: Vec<UpcomingLead>,
    /// Leads with a send-kind ledger entry on the current calendar day.
    pub sent_today: Vec<Lead>,
    /// Replied leads, regardless of due date.
    pub replied: Vec<Lead>,
    /// replied / total, 0 when there are no leads.
    pub conversion_rate: f64,
}

/// Compute the dashboard buckets from the two source collections.
pub fn snapshot(
    leads: &[Lead],
    entries: &[ActivityLogEntry],
    now: DateTime<Utc>,
) -> DashboardSnapshot {
    let today = now.with_timezone(&Local).date_naive();

    let mut new_prospects = Vec::new();
    let mut due_today = Vec::new();
    let mut upcoming = Vec::new();
    let mut replied = Vec::new();

    for lead in leads {
        match lead.status {
            LeadStatus::Replied => replied.push(lead.clone()),
            LeadStatus::Active if lead.current_step == 0 => new_prospects.push(lead.clone()),
            LeadStatus::Active if lead.current_step < SEQUENCE_LENGTH => {
                // Mid-sequence: due and upcoming are a disjoint partition.
                if let Some(due) = next_due_date(lead) {
                    if due <= now {
                        due_today.push(lead.clone());
                    } else {
                        upcoming.push(UpcomingLead {
                            lead: lead.clone(),
                            due_date: due,
                            days_remaining: days_remaining(due, now),
                        });
                    }
                }
            }
            _ => {}
        }
    }

    // "Sent today" is derived purely from the ledger, not a lead flag.
    let sent_today_ids: HashSet<&str> = entries
        .iter()
        .filter(|e| e.kind.is_send() && e.timestamp.with_timezone(&Local).date_naive() == today)
        .map(|e| e.lead_id.as_str())
        .collect();
    let sent_today = leads
        .iter()
        .filter(|l| sent_today_ids.contains(l.id.as_str()))
        .cloned()
        .collect();

    let total = leads.len();
    let conversion_rate = if total == 0 {
        0.0
    } else {
        replied.len() as f64 / total as f64
    };

    DashboardSnapshot {
        total,
        new_prospects,
        due_today,
        upcoming,
        sent_today,
        replied,
        conversion_rate,
    }
}
