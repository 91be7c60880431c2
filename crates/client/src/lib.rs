//! Client code for pagetitle.
//!
//! This crate provides the origin fetch pipeline and title extraction
//! used by the lookup engine.

pub mod extract;
pub mod fetch;

pub use extract::{HtmlTitleExtractor, TitleExtractor, extract_title};

pub use fetch::{FetchClient, FetchConfig, FetchRequest, OriginFetcher, OriginResponse, decode_body};

pub use reqwest::{StatusCode, header};
