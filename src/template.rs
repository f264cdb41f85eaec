//! Message templates and the token-substitution renderer.
//!
//! Each lead type has its own track of four templates, keyed by the
//! 1-based cadence step. Rendering substitutes the first occurrence only
//! of each placeholder token and leaves absent tokens untouched, so
//! re-rendering an already rendered string is a no-op.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{Lead, LeadType, RenderedMessage, Template};

pub const TOKEN_CONTACT_NAME: &str = "[ContactName]";
pub const TOKEN_COMPANY: &str = "[Company]";
pub const TOKEN_MY_NAME: &str = "[MyName]";

/// Operator-editable template configuration: one ordered track per lead
/// type, keyed by step number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateConfig {
    #[serde(rename = "KDM")]
    pub kdm: BTreeMap<u8, Template>,
    #[serde(rename = "Referrer")]
    pub referrer: BTreeMap<u8, Template>,
}

impl TemplateConfig {
    pub fn track(&self, lead_type: LeadType) -> &BTreeMap<u8, Template> {
        match lead_type {
            LeadType::Kdm => &self.kdm,
            LeadType::Referrer => &self.referrer,
        }
    }

    pub fn track_mut(&mut self, lead_type: LeadType) -> &mut BTreeMap<u8, Template> {
        match lead_type {
            LeadType::Kdm => &mut self.kdm,
            LeadType::Referrer => &mut self.referrer,
        }
    }

    /// Template for the lead's next step (`current_step + 1`).
    ///
    /// Falls back to the track's step-1 template when the step has no
    /// template — the only guard once a lead's sequence is exhausted.
    /// Returns `None` only for an empty track.
    pub fn next_step_template(&self, lead: &Lead) -> Option<&Template> {
        let track = self.track(lead.lead_type);
        track
            .get(&(lead.current_step + 1))
            .or_else(|| track.get(&1))
    }
}

impl Default for TemplateConfig {
    fn default() -> Self {
        let kdm = [
            Template {
                step: 1,
                title: "Introduction".to_string(),
                subject: "A technology value proposition for [Company]".to_string(),
                body: "Hi [ContactName],\n\nI've been following [Company]'s growth and believe our experience building high-scale software could help you streamline your current processes.\n\nWould you have 10 minutes this week?\n\nBest,\n[MyName]".to_string(),
            },
            Template {
                step: 2,
                title: "Short follow-up".to_string(),
                subject: "Re: A technology value proposition for [Company]".to_string(),
                body: "Hi [ContactName],\n\nJust following up on my previous note. I understand you must be busy leading [Company].\n\nIf now isn't the right time, is there someone else on your team I should talk to about technical innovation?\n\nThanks,\n[MyName]".to_string(),
            },
            Template {
                step: 3,
                title: "Added value".to_string(),
                subject: "Ideas for [Company]'s technical roadmap".to_string(),
                body: "Hi [ContactName],\n\nStill thinking about the challenges at [Company]. Sharing a short case study that I think resonates with what you're building.\n\nWould next Tuesday work for a quick chat?\n\nBest,\n[MyName]".to_string(),
            },
            Template {
                step: 4,
                title: "Breakup".to_string(),
                subject: "Closing the loop".to_string(),
                body: "Hi [ContactName],\n\nThis is my last note for now — I don't want to clutter your inbox.\n\nWishing you success,\n[MyName]".to_string(),
            },
        ];
        let referrer = [
            Template {
                step: 1,
                title: "Strategic alliance".to_string(),
                subject: "Quick question: a strategic partnership".to_string(),
                body: "Hi [ContactName],\n\nHope all is well. I really value your network.\n\nWe're expanding and looking to reach companies that need a serious technology partner.\n\nShall we talk?\n\nCheers,\n[MyName]".to_string(),
            },
            Template {
                step: 2,
                title: "Referral follow-up".to_string(),
                subject: "Following up: referral network".to_string(),
                body: "Hi [ContactName],\n\nDid you get a chance to see my previous note about our referral network?\n\nBest,\n[MyName]".to_string(),
            },
            Template {
                step: 3,
                title: "Updates".to_string(),
                subject: "A few updates for your network".to_string(),
                body: "Hi [ContactName],\n\nSharing our latest updates for your network.\n\nLet's keep in touch,\n[MyName]".to_string(),
            },
            Template {
                step: 4,
                title: "Network close".to_string(),
                subject: "Thanks for your time".to_string(),
                body: "Hi [ContactName],\n\nThanks for being part of my network.\n\nRegards,\n[MyName]".to_string(),
            },
        ];

        Self {
            kdm: kdm.into_iter().map(|t| (t.step, t)).collect(),
            referrer: referrer.into_iter().map(|t| (t.step, t)).collect(),
        }
    }
}

/// Substitute template tokens with the lead's identity and the sender's
/// signature. First occurrence only; tokens not present are left as-is.
pub fn render(template: &Template, lead: &Lead, sender_name: &str) -> RenderedMessage {
    let subject = template.subject.replacen(TOKEN_COMPANY, &lead.company, 1);
    let body = template
        .body
        .replacen(TOKEN_CONTACT_NAME, &lead.name, 1)
        .replacen(TOKEN_COMPANY, &lead.company, 1)
        .replacen(TOKEN_MY_NAME, sender_name, 1);
    RenderedMessage { subject, body }
}
