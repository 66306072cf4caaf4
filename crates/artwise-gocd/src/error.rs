//! Error types for the GoCD client

use artwise_core::ArtwiseError;
use thiserror::Error;

/// Source name reported in transport errors.
pub const SOURCE_NAME: &str = "gocd";

#[derive(Error, Debug)]
pub enum GocdError {
    /// Request could not be sent or the body could not be read
    #[error("HTTP error: {0}")]
    Http(String),

    /// Server answered with a non-success status
    #[error("GoCD returned {status} for {url}")]
    Status { status: u16, url: String },

    /// Response body did not match the expected shape
    #[error("Unexpected response from {url}: {message}")]
    Decode { url: String, message: String },

    /// Client configuration is incomplete
    #[error("GoCD is not configured: {0}")]
    NotConfigured(String),
}

impl From<reqwest::Error> for GocdError {
    fn from(err: reqwest::Error) -> Self {
        GocdError::Http(err.to_string())
    }
}

impl From<GocdError> for ArtwiseError {
    fn from(err: GocdError) -> Self {
        ArtwiseError::transport(SOURCE_NAME, err)
    }
}

pub type Result<T> = std::result::Result<T, GocdError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converts_into_transport_failure() {
        let err: ArtwiseError = GocdError::Status {
            status: 502,
            url: "http://ci/go".to_string(),
        }
        .into();
        assert!(err.is_transport());
        assert!(err.to_string().contains("502"));
    }
}
