//! pagetitle HTTP service.
//!
//! Looks up page titles behind an in-process fast cache and a durable
//! SQLite title store, revalidating against the origin with conditional
//! requests.

pub mod http_date;
pub mod render;
pub mod resolve;
pub mod routes;

use std::sync::Arc;

use pagetitle_client::{FetchClient, FetchConfig, HtmlTitleExtractor};
use pagetitle_core::{AppConfig, Error, MemoryCache, TitleDb};

pub use render::{Rendered, render};
pub use resolve::{Resolver, ResolverSettings};
pub use routes::{AppState, router};

/// Wire the production collaborators described by `config`.
pub async fn build_state(config: &AppConfig) -> Result<AppState, Error> {
    let store = TitleDb::open(&config.db_path).await?;
    build_state_with_store(config, store)
}

/// Like [`build_state`], with an already opened title store.
pub fn build_state_with_store(config: &AppConfig, store: TitleDb) -> Result<AppState, Error> {
    let fetcher = FetchClient::new(FetchConfig::from(config))?;
    let cache = MemoryCache::new(config.cache_max_entries);

    let resolver = Resolver::new(
        Arc::new(fetcher),
        Arc::new(store),
        Arc::new(cache),
        Arc::new(HtmlTitleExtractor::new()),
        ResolverSettings::from(config),
    );

    Ok(AppState::new(Arc::new(resolver)))
}
