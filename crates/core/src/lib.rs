//! Core types and shared functionality for pagetitle.
//!
//! This crate provides:
//! - Durable title store with SQLite backend
//! - In-process fast cache
//! - Result model and error taxonomy
//! - Configuration structures

pub mod config;
pub mod error;
pub mod fast_cache;
pub mod model;
pub mod store;

pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use fast_cache::{FastCache, MemoryCache};
pub use model::{ApplicationError, Resolution, ResultPayload, TitleRecord};
pub use store::{TitleDb, TitleStore};
