//! The fixed four-step cadence table and due-date math.
//!
//! `waitDays` is the minimum number of calendar days that must elapse
//! after the previous action before a step becomes due. The table is
//! read-only at runtime and shared by both lead types.

use chrono::{DateTime, Duration, Utc};

use crate::types::{Lead, LeadStatus};

/// One row of the cadence table.
#[derive(Debug, Clone, Copy)]
pub struct CadenceStep {
    /// 1-based step number.
    pub step: u8,
    pub label: &'static str,
    pub wait_days: i64,
}

/// Number of steps in the sequence; `current_step == SEQUENCE_LENGTH`
/// means exhausted.
pub const SEQUENCE_LENGTH: u8 = 4;

pub const CADENCE: [CadenceStep; 4] = [
    CadenceStep { step: 1, label: "First touch", wait_days: 0 },
    CadenceStep { step: 2, label: "Follow-up 1", wait_days: 2 },
    CadenceStep { step: 3, label: "Follow-up 2", wait_days: 4 },
    CadenceStep { step: 4, label: "Breakup", wait_days: 7 },
];

/// Look up the cadence row for a 1-based step number.
pub fn step_config(step: u8) -> Option<&'static CadenceStep> {
    CADENCE.iter().find(|s| s.step == step)
}

/// The date a lead's wait period counts from: the last outbound action,
/// or creation when the lead has never been contacted.
pub fn origin_date(lead: &Lead) -> DateTime<Utc> {
    lead.last_action_date.unwrap_or(lead.created_at)
}

/// Earliest moment the lead's next step may be sent.
///
/// `None` when the sequence is exhausted or the lead is not in an
/// actionable state (Paused/Lost/Converted/Replied leads have no due
/// date).
pub fn next_due_date(lead: &Lead) -> Option<DateTime<Utc>> {
    if lead.status != LeadStatus::Active || lead.current_step >= SEQUENCE_LENGTH {
        return None;
    }
    let next = step_config(lead.current_step + 1)?;
    Some(origin_date(lead) + Duration::days(next.wait_days))
}

const DAY_MS: i64 = 86_400_000;

/// Whole days until `due`, rounded up. Zero or negative means due now.
pub fn days_remaining(due: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let ms = (due - now).num_milliseconds();
    if ms > 0 && ms % DAY_MS != 0 {
        ms / DAY_MS + 1
    } else {
        ms / DAY_MS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::types::LeadType;

    fn lead_at_step(step: u8) -> Lead {
        let t0 = Utc.with_ymd_and_hms(2026, 8, 10, 9, 0, 0).unwrap();
        Lead {
            id: "l1".to_string(),
            name: "Joe".to_string(),
            email: "joe@big.io".to_string(),
            company: "Big".to_string(),
            lead_type: LeadType::Kdm,
            status: LeadStatus::Active,
            current_step: step,
            last_action_date: if step > 0 { Some(t0) } else { None },
            created_at: t0,
        }
    }

    #[test]
    fn test_cadence_waits() {
        assert_eq!(step_config(1).unwrap().wait_days, 0);
        assert_eq!(step_config(2).unwrap().wait_days, 2);
        assert_eq!(step_config(3).unwrap().wait_days, 4);
        assert_eq!(step_config(4).unwrap().wait_days, 7);
        assert!(step_config(5).is_none());
        assert!(step_config(0).is_none());
    }

    #[test]
    fn test_origin_prefers_last_action() {
        let mut lead = lead_at_step(1);
        let later = Utc.with_ymd_and_hms(2026, 8, 15, 9, 0, 0).unwrap();
        lead.last_action_date = Some(later);
        assert_eq!(origin_date(&lead), later);
        lead.last_action_date = None;
        assert_eq!(origin_date(&lead), lead.created_at);
    }

    #[test]
    fn test_due_date_step_two_wait() {
        // Step 1 done at T0 → step 2 due at T0 + 2 days
        let lead = lead_at_step(1);
        let due = next_due_date(&lead).unwrap();
        assert_eq!(due, lead.last_action_date.unwrap() + Duration::days(2));
    }

    #[test]
    fn test_no_due_date_when_exhausted() {
        let mut lead = lead_at_step(4);
        lead.status = LeadStatus::Converted;
        assert!(next_due_date(&lead).is_none());
        // Even with an inconsistent Active status at step 4, nothing is due.
        lead.status = LeadStatus::Active;
        assert!(next_due_date(&lead).is_none());
    }

    #[test]
    fn test_no_due_date_for_terminal_states() {
        for status in [LeadStatus::Paused, LeadStatus::Lost, LeadStatus::Replied] {
            let mut lead = lead_at_step(2);
            lead.status = status;
            assert!(next_due_date(&lead).is_none(), "{status:?} should have no due date");
        }
    }

    #[test]
    fn test_days_remaining_ceil() {
        let now = Utc.with_ymd_and_hms(2026, 8, 10, 9, 0, 0).unwrap();
        assert_eq!(days_remaining(now + Duration::days(1), now), 1);
        assert_eq!(days_remaining(now + Duration::hours(1), now), 1);
        assert_eq!(days_remaining(now + Duration::days(2) - Duration::seconds(1), now), 2);
        assert_eq!(days_remaining(now, now), 0);
        assert_eq!(days_remaining(now - Duration::hours(3), now), 0);
    }
}
