//! # contract: seams between the pipeline and the outside world
//!
//! Two traits separate the pipeline from its network collaborators:
//!
//! - [`RemoteClient`]: one JSON GET against upstream. Implemented by
//!   [`crate::client::GithubClient`] over `reqwest`.
//! - [`Explorer`]: one discovery pass over the repository. Implemented by
//!   [`crate::explore::RepositoryExplorer`].
//!
//! Both are annotated for `mockall`; with the `test-export-mocks` feature
//! (on by default) `MockRemoteClient` and `MockExplorer` are public so
//! integration tests and downstream crates can script upstream behaviour.

use async_trait::async_trait;
use mockall::automock;
use serde_json::Value;
use std::time::Duration;

use crate::error::IndexError;
use crate::model::Exploration;

/// Per-request settings for [`RemoteClient::get_json`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
    pub timeout: Duration,
}

impl RequestOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        RequestOptions { timeout }
    }
}

#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// GET `url` and decode the body as JSON.
    ///
    /// Fails with [`IndexError::Transport`] on network errors, timeouts and
    /// undecodable bodies, and with [`IndexError::UpstreamStatus`] on non-2xx.
    async fn get_json(&self, url: &str, options: RequestOptions) -> Result<Value, IndexError>;
}

#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Explorer: Send + Sync {
    /// Discover every candidate workflow in the repository.
    async fn explore(&self) -> Result<Exploration, IndexError>;
}
