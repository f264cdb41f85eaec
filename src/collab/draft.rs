//! AI message drafting via the Gemini generateContent API.
//!
//! Takes the rendered template body as the base draft and asks the model
//! for a shorter, more human variant. Any failure here maps to
//! `CollabError`; the engine falls back to the raw template rather than
//! blocking the send.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{CollabError, MessageDrafter};
use crate::cadence::SEQUENCE_LENGTH;
use crate::types::Lead;

pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

pub struct GeminiDrafter {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiDrafter {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_model(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        }
    }
}

/// The sales-drafting prompt; the model returns only the email body.
fn build_prompt(lead: &Lead, base_body: &str, sender_name: &str) -> String {
    format!(
        "Act as a B2B sales expert. I am {sender_name}. Write an email to {name} of {company}. \
Sequence: step {step} of {total}. Base draft: \"{base_body}\". \
Make it sound very human, short, and direct. Return only the email body. \
Keep bracketed tokens if you don't know the information.",
        name = lead.name,
        company = lead.company,
        step = lead.current_step + 1,
        total = SEQUENCE_LENGTH,
    )
}

// ============================================================================
// API response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

fn extract_text(resp: &GenerateContentResponse) -> Option<String> {
    let text = resp
        .candidates
        .first()?
        .content
        .as_ref()?
        .parts
        .first()?
        .text
        .trim()
        .to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[async_trait]
impl MessageDrafter for GeminiDrafter {
    async fn draft(
        &self,
        lead: &Lead,
        base_body: &str,
        sender_name: &str,
    ) -> Result<String, CollabError> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": build_prompt(lead, base_body, sender_name) }] }]
        });

        let resp = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(CollabError::AuthExpired);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CollabError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let parsed: GenerateContentResponse = resp.json().await?;
        extract_text(&parsed).ok_or(CollabError::EmptyDraft)
    }
}
