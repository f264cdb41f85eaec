//! Gmail compose-URL hand-off.
//!
//! The engine's only concrete "send" effect: build a prefilled compose
//! URL and open it in the default browser. Delivery is the operator's
//! business from there.

use async_trait::async_trait;
use url::Url;

use super::{CollabError, ComposeSurface};
use crate::types::RenderedMessage;

const GMAIL_COMPOSE_BASE: &str = "https://mail.google.com/mail/";

/// Build the prefilled Gmail compose URL for a rendered message.
pub fn compose_url(to: &str, message: &RenderedMessage) -> Result<Url, CollabError> {
    let mut url =
        Url::parse(GMAIL_COMPOSE_BASE).map_err(|e| CollabError::Launch(e.to_string()))?;
    url.query_pairs_mut()
        .append_pair("view", "cm")
        .append_pair("fs", "1")
        .append_pair("to", to)
        .append_pair("su", &message.subject)
        .append_pair("body", &message.body);
    Ok(url)
}

/// Opens the compose URL with the system default browser.
pub struct GmailCompose;

#[async_trait]
impl ComposeSurface for GmailCompose {
    async fn open_compose(&self, to: &str, message: &RenderedMessage) -> Result<(), CollabError> {
        let url = compose_url(to, message)?;
        open::that(url.as_str()).map_err(|e| CollabError::Launch(e.to_string()))
    }
}
