//! Error taxonomy for the Artwise core.

/// Errors produced while reconstructing pipeline history or serving boards.
#[derive(Debug, thiserror::Error)]
pub enum ArtwiseError {
    /// A feed page, stage detail, material or activity fetch failed.
    #[error("transport failure from {source_name}: {message}")]
    Transport {
        source_name: String,
        message: String,
    },

    #[error("invalid build number: {0:?}")]
    InvalidBuildNumber(String),

    /// The data cache has not completed its first backfill yet.
    #[error("pipeline history cache is still warming up")]
    CacheNotReady,

    /// A scheduled board poll could not be computed.
    #[error("poll failed: {0}")]
    Poll(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ArtwiseError {
    /// Build a transport failure for the named source.
    pub fn transport(source_name: impl Into<String>, message: impl std::fmt::Display) -> Self {
        ArtwiseError::Transport {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error came from a remote fetch.
    pub fn is_transport(&self) -> bool {
        matches!(self, ArtwiseError::Transport { .. })
    }
}

/// Result type for Artwise core operations.
pub type Result<T> = std::result::Result<T, ArtwiseError>;
