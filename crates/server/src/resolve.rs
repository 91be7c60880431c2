//! Title lookup with two-tier caching and origin revalidation.
//!
//! Each lookup picks one [`Plan`]:
//!
//! - **CacheHit**: the fast cache holds a rendered payload; nothing else is touched.
//! - **RevalidateViaConditionalGet**: the title store knows the URL; ask the
//!   origin with `If-Modified-Since`. A 304 reuses the stored title, anything
//!   else falls through to a full fetch.
//! - **FullFetch**: unconditional GET, extract, store non-empty titles.
//!
//! Only error-free results enter the fast cache. Store and cache failures are
//! logged and never change the answer.

use std::sync::Arc;
use std::time::Duration;

use pagetitle_client::header::{self, HeaderValue};
use pagetitle_client::{FetchRequest, OriginFetcher, OriginResponse, StatusCode, TitleExtractor, decode_body};
use pagetitle_core::{AppConfig, FastCache, Resolution, ResultPayload, TitleRecord, TitleStore};
use tracing::{debug, error, info, warn};

use crate::http_date::format_http_date;

const HTML_TYPES: [&str; 2] = ["text/html", "application/xhtml+xml"];

/// Settings the engine needs from the application config.
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    /// Lifetime of fast cache entries.
    pub cache_ttl: Duration,
    /// Addresses of this service; never fetched.
    pub self_urls: Vec<String>,
    /// Title answered for `self_urls`.
    pub self_title: String,
    /// Cap on decoded body size handed to the extractor.
    pub max_body_bytes: usize,
}

impl ResolverSettings {
    /// Whether `url` is one of this service's own published addresses.
    ///
    /// Exact string comparison, like every other URL key.
    pub fn is_self_url(&self, url: &str) -> bool {
        self.self_urls.iter().any(|u| u == url)
    }
}

impl From<&AppConfig> for ResolverSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            cache_ttl: config.cache_ttl(),
            self_urls: config.self_urls.clone(),
            self_title: config.self_title.clone(),
            max_body_bytes: config.max_bytes,
        }
    }
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

/// How a lookup will be answered, decided once per request.
#[derive(Debug)]
enum Plan {
    CacheHit(ResultPayload),
    RevalidateViaConditionalGet(TitleRecord),
    FullFetch,
}

/// Whether a Content-Type names an HTML or XHTML document.
///
/// Case-sensitive prefix match, so parameters like `; charset=utf-8` pass.
pub fn is_html(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| HTML_TYPES.iter().any(|t| ct.starts_with(t)))
}

/// The revalidation engine.
pub struct Resolver {
    fetcher: Arc<dyn OriginFetcher>,
    store: Arc<dyn TitleStore>,
    cache: Arc<dyn FastCache>,
    extractor: Arc<dyn TitleExtractor>,
    settings: ResolverSettings,
}

impl Resolver {
    pub fn new(
        fetcher: Arc<dyn OriginFetcher>, store: Arc<dyn TitleStore>, cache: Arc<dyn FastCache>,
        extractor: Arc<dyn TitleExtractor>, settings: ResolverSettings,
    ) -> Self {
        Self { fetcher, store, cache, extractor, settings }
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    /// Resolve the title of `url`.
    ///
    /// Never fails: every outcome, including origin errors, is a payload.
    #[tracing::instrument(skip(self))]
    pub async fn resolve(&self, url: &str) -> ResultPayload {
        if self.settings.is_self_url(url) {
            info!("lookup of own address; answering without fetch");
            return Resolution::success(self.settings.self_title.clone()).into_payload();
        }

        let resolution = match self.plan(url).await {
            Plan::CacheHit(payload) => return payload,
            Plan::RevalidateViaConditionalGet(record) => match self.revalidate(url, &record).await {
                Some(resolution) => resolution,
                None => self.full_fetch(url).await,
            },
            Plan::FullFetch => self.full_fetch(url).await,
        };

        let payload = resolution.into_payload();
        if !payload.is_error() {
            self.remember(url, &payload).await;
        }
        payload
    }

    async fn plan(&self, url: &str) -> Plan {
        if let Some(json) = self.cache.get(url).await {
            match ResultPayload::from_json(&json) {
                Ok(payload) => {
                    info!("url is in fast cache");
                    return Plan::CacheHit(payload);
                }
                // Inserts are add-only, so the entry is bypassed, not replaced,
                // until its TTL runs out.
                Err(e) => warn!(error = %e, "unreadable fast cache entry; bypassing it until it expires"),
            }
        }
        info!("url is not in fast cache");

        match self.store.find_by_url(url).await {
            Ok(Some(record)) => {
                info!("url is in title store");
                Plan::RevalidateViaConditionalGet(record)
            }
            Ok(None) => {
                info!("url is not in title store");
                Plan::FullFetch
            }
            Err(e) => {
                warn!(error = %e, "title store lookup failed; fetching");
                Plan::FullFetch
            }
        }
    }

    /// Conditional GET against the stored record.
    ///
    /// `Some` only when the origin confirms the stored title is current.
    async fn revalidate(&self, url: &str, record: &TitleRecord) -> Option<Resolution> {
        let since = format_http_date(record.last_fetched);
        let mut request = FetchRequest::new(url);
        match HeaderValue::from_str(&since) {
            Ok(value) => request = request.header(header::IF_MODIFIED_SINCE, value),
            Err(e) => {
                warn!(error = %e, "could not build If-Modified-Since");
                return None;
            }
        }

        match self.fetcher.fetch(&request).await {
            Ok(response) if response.status == StatusCode::NOT_MODIFIED => {
                info!(since = %since, "page is not modified");
                Some(Resolution::success(record.title.clone()))
            }
            Ok(response) => {
                info!(status = response.status.as_u16(), "page is modified");
                None
            }
            Err(e) => {
                warn!(error = %e, "conditional fetch failed; trying full fetch");
                None
            }
        }
    }

    async fn full_fetch(&self, url: &str) -> Resolution {
        let request = FetchRequest::new(url).header(header::ACCEPT_ENCODING, HeaderValue::from_static("gzip"));

        let response = match self.fetcher.fetch(&request).await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "origin fetch failed");
                return Resolution::FetchFailed;
            }
        };

        if response.status != StatusCode::OK {
            info!(status = response.status.as_u16(), "page does not exist");
            return Resolution::BadStatus { code: response.status.as_u16() };
        }

        if !is_html(response.content_type()) {
            info!(content_type = ?response.content_type(), "page is not (X)HTML");
            return Resolution::NotHtml;
        }

        if response.truncated {
            info!(bytes = response.body.len(), "page body truncated; extracting from prefix");
        }

        let title = match self.extract(&response) {
            Ok(title) => title,
            Err(e) => {
                error!(error = %e, "could not decode page body");
                return Resolution::FetchFailed;
            }
        };

        if title.is_empty() {
            debug!("no title to store");
        } else if let Err(e) = self.store.save(url, &title).await {
            warn!(error = %e, "failed to store title");
        } else {
            debug!("stored title");
        }

        Resolution::Success { title }
    }

    fn extract(&self, response: &OriginResponse) -> Result<String, pagetitle_core::Error> {
        let body = decode_body(&response.headers, &response.body, self.settings.max_body_bytes)?;
        Ok(self.extractor.extract(&body, response.content_type()))
    }

    async fn remember(&self, url: &str, payload: &ResultPayload) {
        let json = match payload.to_canonical_json() {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "could not serialize payload for fast cache");
                return;
            }
        };

        if self.cache.add_if_absent(url, json, self.settings.cache_ttl).await {
            debug!("added payload to fast cache");
        } else {
            debug!("fast cache already had an entry");
        }
    }
}
