use std::fmt;

use async_trait::async_trait;
use indexmap::IndexMap;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;

use crate::form::CardId;

/// Characters left as-is in an `application/x-www-form-urlencoded` body.
const FORM_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'*');

/// A full form payload ready to be submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveSignal {
    /// Monotonic per builder.
    pub sequence: u64,
    pub fields: Vec<(String, String)>,
    /// Card ids in payload order; index `i` was emitted as `<prefix>-i`.
    pub cards: Vec<CardId>,
}

impl SaveSignal {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|(key, _)| key == name)
    }

    /// The payload as a urlencoded request body.
    pub fn to_form_body(&self) -> String {
        self.fields
            .iter()
            .map(|(key, value)| {
                format!(
                    "{}={}",
                    utf8_percent_encode(key, FORM_ENCODE_SET),
                    utf8_percent_encode(value, FORM_ENCODE_SET)
                )
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Server verdict on a save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Accepted. New records report their ids keyed by card prefix.
    Saved { assigned_ids: IndexMap<String, i64> },
    /// Rejected with field-level errors, rendered by the server.
    Rejected { status: u16, body: String },
}

#[derive(Debug)]
pub enum PersistenceError {
    Transport(String),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::Transport(message) => write!(f, "save request failed: {message}"),
        }
    }
}

impl std::error::Error for PersistenceError {}

#[async_trait]
pub trait Persistence: Send + Sync {
    async fn save(&self, signal: &SaveSignal) -> Result<SaveOutcome, PersistenceError>;
}

#[derive(Debug, Default, Deserialize)]
struct TriggerHeader {
    #[serde(default, rename = "syncIds")]
    sync_ids: IndexMap<String, i64>,
}

/// Reads the `syncIds` event out of an `HX-Trigger` response header. Anything
/// unreadable yields no ids.
pub fn parse_sync_ids(header: &str) -> IndexMap<String, i64> {
    match serde_json::from_str::<TriggerHeader>(header) {
        Ok(trigger) => trigger.sync_ids,
        Err(err) => {
            log::warn!("ignoring unreadable trigger header ({err})");
            IndexMap::new()
        }
    }
}

#[cfg(feature = "http")]
pub use http::HttpPersistence;

#[cfg(feature = "http")]
mod http {
    use async_trait::async_trait;
    use indexmap::IndexMap;

    use super::{Persistence, PersistenceError, SaveOutcome, SaveSignal, parse_sync_ids};

    /// Posts the payload the way the builder page does: urlencoded, flagged
    /// as a partial-page request so success comes back as `204` plus a
    /// trigger header. Any other status, `200` included, carries the
    /// re-rendered form with its errors and counts as a rejection.
    #[derive(Debug, Clone)]
    pub struct HttpPersistence {
        client: reqwest::Client,
        url: String,
    }

    impl HttpPersistence {
        pub fn new(url: impl Into<String>) -> Self {
            Self::with_client(reqwest::Client::new(), url)
        }

        pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
            Self {
                client,
                url: url.into(),
            }
        }
    }

    #[async_trait]
    impl Persistence for HttpPersistence {
        async fn save(&self, signal: &SaveSignal) -> Result<SaveOutcome, PersistenceError> {
            log::debug!("save #{} POST {}", signal.sequence, self.url);
            let response = self
                .client
                .post(&self.url)
                .header("HX-Request", "true")
                .header(
                    reqwest::header::CONTENT_TYPE,
                    "application/x-www-form-urlencoded",
                )
                .body(signal.to_form_body())
                .send()
                .await
                .map_err(|err| PersistenceError::Transport(err.to_string()))?;

            let status = response.status();
            if status == reqwest::StatusCode::NO_CONTENT {
                let assigned_ids = response
                    .headers()
                    .get("HX-Trigger")
                    .and_then(|value| value.to_str().ok())
                    .map(parse_sync_ids)
                    .unwrap_or_else(IndexMap::new);
                return Ok(SaveOutcome::Saved { assigned_ids });
            }
            let body = response
                .text()
                .await
                .map_err(|err| PersistenceError::Transport(err.to_string()))?;
            Ok(SaveOutcome::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}
