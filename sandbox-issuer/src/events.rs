//! # Event Topic Relay
//!
//! The VC service reports the progress of an `OpenID4CI` interaction to a
//! webhook. [`EventsTopic`] keeps the latest event per transaction so the demo
//! pages can poll for it and render a status line.
//!
//! The relay holds one event per transaction: a newer event replaces an older
//! one and a check consumes it. There is no fan-out to multiple subscribers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::instrument;

use crate::{Error, Result};

/// Display text for the known interaction event types.
pub const STATUS_TEXT: [(&str, &str); 7] = [
    ("oidc_interaction_initiated", "awaiting QR code scan"),
    ("oidc_interaction_qr_scanned", "QR code scanned"),
    ("oidc_interaction_authorization_request_prepared", "authorization request prepared"),
    ("oidc_interaction_authorization_code_stored", "authorization code stored"),
    (
        "oidc_interaction_authorization_code_exchanged",
        "authorization code exchanged for access token",
    ),
    ("oidc_interaction_succeeded", "issued successfully"),
    ("oidc_interaction_failed", "issuance failed"),
];

/// An interaction event, as posted by the VC service.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Event {
    /// Event id.
    #[serde(default)]
    pub id: String,

    /// Event source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Event type, e.g. `oidc_interaction_qr_scanned`.
    #[serde(rename = "type")]
    pub type_: String,

    /// When the event occurred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,

    /// Event payload.
    #[serde(default)]
    pub data: EventData,
}

impl Event {
    /// Human-readable status for the event. Unknown types are returned
    /// verbatim.
    #[must_use]
    pub fn status_text(&self) -> &str {
        status_text(&self.type_)
    }
}

/// Event payload: the transaction the event belongs to, plus whatever else
/// the VC service sent.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct EventData {
    /// Transaction id.
    #[serde(rename = "txID", default)]
    pub tx_id: String,

    /// Remaining payload.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Returns the display text for an event type, or the type itself when it is
/// not one of [`STATUS_TEXT`].
#[must_use]
pub fn status_text(type_: &str) -> &str {
    STATUS_TEXT.iter().find(|(t, _)| *t == type_).map_or(type_, |(_, text)| *text)
}

/// Request for the latest event of a transaction.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct CheckRequest {
    /// Transaction id.
    pub tx: String,
}

/// `EventsTopic` relays interaction events from the webhook to pollers.
/// Cloning shares the underlying topic.
#[derive(Clone, Debug, Default)]
pub struct EventsTopic {
    events: Arc<Mutex<HashMap<String, Event>>>,
}

impl EventsTopic {
    /// Create an empty topic.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `event` as the latest for its transaction.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` when the event carries no transaction id.
    #[instrument(level = "debug", skip(self))]
    pub fn receive(&self, event: Event) -> Result<()> {
        tracing::debug!("events::receive");

        if event.data.tx_id.is_empty() {
            return Err(Error::InvalidRequest("missing txID".into()));
        }
        tracing::info!("{}: {}", event.data.tx_id, event.status_text());

        self.events
            .lock()
            .map_err(|_| Error::ServerError("events topic is unavailable".into()))?
            .insert(event.data.tx_id.clone(), event);
        Ok(())
    }

    /// Take the latest event for a transaction, if any.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` when no transaction id is given.
    #[instrument(level = "debug", skip(self))]
    pub fn check(&self, request: &CheckRequest) -> Result<Option<Event>> {
        tracing::debug!("events::check");

        if request.tx.is_empty() {
            return Err(Error::InvalidRequest("missing tx".into()));
        }

        let event = self
            .events
            .lock()
            .map_err(|_| Error::ServerError("events topic is unavailable".into()))?
            .remove(&request.tx);
        Ok(event)
    }
}
