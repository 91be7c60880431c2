//! Response shaping: JSON body, optional JSONP wrapper, cache headers.

use std::sync::LazyLock;
use std::time::Duration;

use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use pagetitle_core::{Error, ResultPayload};
use regex::Regex;

use crate::http_date::format_http_date;

pub const JAVASCRIPT_UTF8: &str = "application/javascript; charset=utf-8";

static CALLBACK_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9._$]*$").expect("invalid callback pattern"));

/// Whether `name` may be used as a JSONP wrapper.
pub fn is_valid_callback(name: &str) -> bool {
    CALLBACK_NAME.is_match(name)
}

/// A rendered lookup response, always served with status 200.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub body: String,
    pub headers: HeaderMap,
}

impl IntoResponse for Rendered {
    fn into_response(self) -> Response {
        (StatusCode::OK, self.headers, self.body).into_response()
    }
}

/// Render `payload` for the wire.
///
/// An invalid `callback` is ignored and plain JSON is returned. Error-free
/// payloads get an `Expires` header `ttl` after `now`; failures get none.
pub fn render(payload: &ResultPayload, callback: Option<&str>, now: DateTime<Utc>, ttl: Duration) -> Result<Rendered, Error> {
    let json = payload.to_canonical_json()?;

    let body = match callback {
        Some(name) if is_valid_callback(name) => {
            tracing::debug!(callback = name, "wrapping JSON in callback");
            format!("{name}({json})")
        }
        Some(name) => {
            tracing::debug!(callback = name, "ignoring invalid callback");
            json
        }
        None => json,
    };

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(JAVASCRIPT_UTF8));

    if !payload.is_error() {
        let ttl = chrono::Duration::from_std(ttl).map_err(|e| Error::Decode(e.to_string()))?;
        let expires = format_http_date(now + ttl);
        let value = HeaderValue::from_str(&expires).map_err(|e| Error::Decode(e.to_string()))?;
        headers.insert(header::EXPIRES, value);
    }

    Ok(Rendered { body, headers })
}
