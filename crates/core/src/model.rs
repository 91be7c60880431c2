//! Result model shared by the engine, the stores and the formatter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Last known title for a URL, as persisted in the durable store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleRecord {
    pub url: String,
    pub title: String,
    /// Set by the store on every write.
    pub last_fetched: DateTime<Utc>,
}

/// Reasons a lookup can fail, with the codes clients see on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ApplicationError {
    /// Origin could not be reached, or did not answer in time.
    #[error("ApplicationError: 1")]
    FetchError,

    /// Origin answered with something other than 200.
    #[error("ApplicationError: 2")]
    BadStatus(u16),

    /// Origin content is not HTML or XHTML.
    #[error("ApplicationError: 3")]
    NotHtml,
}

/// Outcome of resolving one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Title found, possibly empty when the page has none.
    Success { title: String },
    FetchFailed,
    BadStatus { code: u16 },
    NotHtml,
}

impl Resolution {
    pub fn success(title: impl Into<String>) -> Self {
        Resolution::Success { title: title.into() }
    }

    pub fn error(&self) -> Option<ApplicationError> {
        match self {
            Resolution::Success { .. } => None,
            Resolution::FetchFailed => Some(ApplicationError::FetchError),
            Resolution::BadStatus { code } => Some(ApplicationError::BadStatus(*code)),
            Resolution::NotHtml => Some(ApplicationError::NotHtml),
        }
    }

    pub fn into_payload(self) -> ResultPayload {
        ResultPayload::from(self)
    }
}

/// JSON body returned to clients.
///
/// Fields are declared in lexicographic order so the serialized form has
/// sorted keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,

    #[serde(default)]
    pub title: String,
}

impl ResultPayload {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Serialize with sorted keys and four-space indentation.
    ///
    /// The output is byte-stable for equal payloads.
    pub fn to_canonical_json(&self) -> Result<String, Error> {
        let mut out = Vec::with_capacity(64);
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.serialize(&mut ser)?;
        String::from_utf8(out).map_err(|e| Error::Decode(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }
}

impl From<Resolution> for ResultPayload {
    fn from(resolution: Resolution) -> Self {
        let error = resolution.error().map(|e| e.to_string());
        match resolution {
            Resolution::Success { title } => Self { error: None, status_code: None, title },
            Resolution::BadStatus { code } => Self { error, status_code: Some(code), title: String::new() },
            Resolution::FetchFailed | Resolution::NotHtml => Self { error, status_code: None, title: String::new() },
        }
    }
}
