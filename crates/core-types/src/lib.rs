//! Shared primitives for the iframe resizer workspace.
//!
//! The [`SelectionRecord`] is the single persisted description of the selected
//! frame. It crosses the page/UI boundary as JSON text, so everything here is
//! plain data with serde derives.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Session-storage key holding the serialized [`SelectionRecord`].
pub const RECORD_KEY: &str = "iframeResizerDB";

/// Data attribute carrying an element's original inline style.
pub const MEMENTO_ATTRIBUTE: &str = "data-og-style";

/// Tag of the elements a selection session may pick.
pub const FRAME_TAG: &str = "iframe";

/// Label used when a frame exposes nothing better.
pub const FALLBACK_NAME: &str = "selected iframe";

/// Shared error type for the resizer crates.
#[derive(Debug, Error, Clone)]
pub enum ResizerError {
    #[error("{message}")]
    Message { message: String },
    #[error("invalid page url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("no frame at index {0}")]
    NoFrameAt(usize),
    #[error("page has no body")]
    MissingBody,
}

impl ResizerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

/// Durable `{query, index}` handle to one element among the matches of a selector.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    pub query: String,
    pub index: usize,
}

impl Locator {
    pub fn new(query: impl Into<String>, index: usize) -> Self {
        Self {
            query: query.into(),
            index,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.query, self.index)
    }
}

/// The persisted "DB": what is selected and how it should be displayed.
///
/// `width`/`height` are percentages of the viewport and only drive the
/// windowed mode; full-view ignores them and leaves them untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionRecord {
    #[serde(rename = "iframeName")]
    pub name: String,
    #[serde(rename = "selection")]
    pub locator: Locator,
    pub width: f64,
    pub height: f64,
    pub z_index: i64,
    pub full_view_on: bool,
}

impl SelectionRecord {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// Rounds a percentage to the two decimals kept in the record.
pub fn round_percent(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
