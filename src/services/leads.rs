//! Lead state machine — pure transition functions.
//!
//! `advance` is the only transition that increments `current_step`, and
//! the caller must follow every successful transition with exactly one
//! ledger append. Persistence and side effects live in the engine.

use chrono::{DateTime, Utc};

use crate::cadence::SEQUENCE_LENGTH;
use crate::error::EngineError;
use crate::types::{Lead, LeadStatus, LeadType};

/// Build a fresh lead: step 0, Active, never contacted.
pub fn new_lead(
    name: &str,
    email: &str,
    company: &str,
    lead_type: LeadType,
    now: DateTime<Utc>,
) -> Lead {
    Lead {
        id: uuid::Uuid::new_v4().to_string(),
        name: name.to_string(),
        email: email.to_string(),
        company: company.to_string(),
        lead_type,
        status: LeadStatus::Active,
        current_step: 0,
        last_action_date: None,
        created_at: now,
    }
}

/// Advance a lead one cadence step after an outbound send.
///
/// The final step converts the lead. Rejects leads already at the end of
/// the sequence so `current_step` can never leave `[0, 4]`.
pub fn advance(lead: &Lead, now: DateTime<Utc>) -> Result<Lead, EngineError> {
    if lead.current_step >= SEQUENCE_LENGTH {
        return Err(EngineError::SequenceExhausted(lead.id.clone()));
    }
    let next_step = lead.current_step + 1;
    let mut updated = lead.clone();
    updated.current_step = next_step;
    updated.last_action_date = Some(now);
    updated.status = if next_step >= SEQUENCE_LENGTH {
        LeadStatus::Converted
    } else {
        LeadStatus::Active
    };
    Ok(updated)
}

/// Mark a lead as replied. Step and last action date are left untouched.
///
/// Only legal for an Active lead that has been contacted at least once —
/// a lead that was never emailed cannot "reply".
pub fn mark_replied(lead: &Lead) -> Result<Lead, EngineError> {
    if lead.status != LeadStatus::Active {
        return Err(EngineError::InvalidTransition {
            id: lead.id.clone(),
            from: lead.status,
        });
    }
    if lead.current_step == 0 {
        return Err(EngineError::NeverContacted(lead.id.clone()));
    }
    let mut updated = lead.clone();
    updated.status = LeadStatus::Replied;
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 10, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_new_lead_shape() {
        let lead = new_lead("Joe", "joe@big.io", "Big", LeadType::Referrer, t0());
        assert_eq!(lead.current_step, 0);
        assert_eq!(lead.status, LeadStatus::Active);
        assert!(lead.last_action_date.is_none());
        assert_eq!(lead.created_at, t0());
        assert!(!lead.id.is_empty());
    }

    #[test]
    fn test_advance_increments_and_stamps() {
        let lead = new_lead("Joe", "joe@big.io", "Big", LeadType::Kdm, t0());
        let updated = advance(&lead, t0()).unwrap();
        assert_eq!(updated.current_step, 1);
        assert_eq!(updated.status, LeadStatus::Active);
        assert_eq!(updated.last_action_date, Some(t0()));
    }

    #[test]
    fn test_step_monotone_across_sequence() {
        let mut lead = new_lead("Joe", "joe@big.io", "Big", LeadType::Kdm, t0());
        let mut prev = lead.current_step;
        for _ in 0..4 {
            lead = advance(&lead, Utc::now()).unwrap();
            assert!(lead.current_step > prev);
            prev = lead.current_step;
        }
    }

    #[test]
    fn test_final_advance_converts() {
        let mut lead = new_lead("Joe", "joe@big.io", "Big", LeadType::Kdm, t0());
        lead.current_step = 3;
        let updated = advance(&lead, Utc::now()).unwrap();
        assert_eq!(updated.current_step, 4);
        assert_eq!(updated.status, LeadStatus::Converted);
    }

    #[test]
    fn test_advance_rejected_when_exhausted() {
        let mut lead = new_lead("Joe", "joe@big.io", "Big", LeadType::Kdm, t0());
        lead.current_step = 4;
        lead.status = LeadStatus::Converted;
        assert!(matches!(
            advance(&lead, Utc::now()),
            Err(EngineError::SequenceExhausted(_))
        ));
    }

    #[test]
    fn test_mark_replied_keeps_step_and_date() {
        let mut lead = new_lead("Joe", "joe@big.io", "Big", LeadType::Kdm, t0());
        lead = advance(&lead, t0()).unwrap();
        lead = advance(&lead, t0()).unwrap();
        let replied = mark_replied(&lead).unwrap();
        assert_eq!(replied.status, LeadStatus::Replied);
        assert_eq!(replied.current_step, 2);
        assert_eq!(replied.last_action_date, Some(t0()));
    }

    #[test]
    fn test_mark_replied_rejected_before_first_contact() {
        let lead = new_lead("Joe", "joe@big.io", "Big", LeadType::Kdm, t0());
        assert!(matches!(
            mark_replied(&lead),
            Err(EngineError::NeverContacted(_))
        ));
    }

    #[test]
    fn test_mark_replied_rejected_for_non_active() {
        let mut lead = new_lead("Joe", "joe@big.io", "Big", LeadType::Kdm, t0());
        lead.current_step = 2;
        for status in [LeadStatus::Paused, LeadStatus::Lost, LeadStatus::Converted] {
            lead.status = status;
            assert!(matches!(
                mark_replied(&lead),
                Err(EngineError::InvalidTransition { .. })
            ));
        }
    }
}
