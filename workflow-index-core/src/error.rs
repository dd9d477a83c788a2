//! Error taxonomy for the fetch-normalize-cache pipeline.
//!
//! Which of these errors reach a caller and which are degraded into data is
//! decided in one place, see [`crate::policy`].

use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexError>;

#[derive(Error, Debug, Clone)]
pub enum IndexError {
    /// Network failure, timeout or an undecodable body while talking to upstream.
    #[error("transport error fetching {url}: {message}")]
    Transport { url: String, message: String },

    /// Upstream answered with a non-2xx status.
    #[error("upstream returned {status} for {url}")]
    UpstreamStatus {
        url: String,
        status: u16,
        body: String,
    },

    /// Upstream JSON did not match any recognised shape.
    #[error("unrecognised upstream shape: {0}")]
    Shape(String),

    #[error("workflow not found: {0}")]
    NotFound(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl IndexError {
    pub fn transport(url: impl Into<String>, err: impl std::fmt::Display) -> Self {
        IndexError::Transport {
            url: url.into(),
            message: err.to_string(),
        }
    }

    /// True for a 404 from upstream, the signal to fall back to another discovery path.
    pub fn is_not_found_status(&self) -> bool {
        matches!(self, IndexError::UpstreamStatus { status: 404, .. })
    }

    /// Message safe to hand to HTTP clients. Upstream bodies are not echoed.
    pub fn external_message(&self) -> String {
        match self {
            IndexError::Transport { .. } => "Failed to reach the upstream repository".to_string(),
            IndexError::UpstreamStatus { status, .. } => {
                format!("Upstream request failed with status {status}")
            }
            IndexError::Shape(_) => "Upstream returned an unexpected format".to_string(),
            IndexError::NotFound(_) => "Workflow not found".to_string(),
            IndexError::Config(msg) => format!("Configuration error: {msg}"),
        }
    }
}
