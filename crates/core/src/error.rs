//! Unified error types for pagetitle.
//!
//! These are infrastructure failures. The domain outcomes reported to
//! callers live in [`crate::model::ApplicationError`].

use tokio_rusqlite::rusqlite;

/// Unified error types for the pagetitle service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database operation failed.
    #[error("STORE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("STORE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Invalid URL handed to the origin fetcher.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Origin could not be reached (DNS, connect, TLS, reset).
    #[error("FETCH_FAILED: {0}")]
    Transport(String),

    /// Origin did not answer within the configured bound.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Response body larger than allowed and truncation was not requested.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// Response body could not be decoded.
    #[error("DECODE_FAILED: {0}")]
    Decode(String),

    /// Result payload could not be (de)serialized.
    #[error("SERIALIZE_FAILED: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Transport("connection refused".to_string());
        assert!(err.to_string().contains("FETCH_FAILED"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_from_rusqlite_error() {
        let err: Error = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, Error::Database(_)));
        assert!(err.to_string().starts_with("STORE_ERROR"));
    }
}
