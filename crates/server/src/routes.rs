//! HTTP surface.
//!
//! `GET /?url=...[&callback=...]` answers with JSON (or JSONP) describing the
//! page title. Without `url` the info page is served. Lookups always answer
//! 200; failures are described inside the body. When a parameter is
//! repeated, its first value is used.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};

use crate::render::render;
use crate::resolve::Resolver;

const INFO_PAGE: &str = include_str!("info.html");

/// Shared state for request handlers.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<Resolver>,
    /// Horizon of the `Expires` header on successful lookups.
    pub expires_after: Duration,
}

impl AppState {
    pub fn new(resolver: Arc<Resolver>) -> Self {
        let expires_after = resolver.settings().cache_ttl;
        Self { resolver, expires_after }
    }
}

/// Query string of a lookup.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct LookupParams {
    pub url: Option<String>,
    pub callback: Option<String>,
}

impl LookupParams {
    /// Pick the first `url` and `callback` out of decoded query pairs.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "url" => &mut params.url,
                "callback" => &mut params.callback,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        params
    }
}

pub fn router(state: AppState) -> Router {
    Router::new().route("/", get(lookup)).with_state(state)
}

#[tracing::instrument(skip_all)]
async fn lookup(State(state): State<AppState>, Query(pairs): Query<Vec<(String, String)>>) -> Response {
    let params = LookupParams::from_pairs(pairs);
    let Some(url) = params.url.filter(|u| !u.is_empty()) else {
        return Html(INFO_PAGE).into_response();
    };

    let payload = state.resolver.resolve(&url).await;
    let callback = params.callback.as_deref().filter(|c| !c.is_empty());

    match render(&payload, callback, chrono::Utc::now(), state.expires_after) {
        Ok(rendered) => rendered.into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to render payload");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
