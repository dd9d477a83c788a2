use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

/// How candidate workflow files are discovered in the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryStrategy {
    /// List the root, then every subdirectory one level deep.
    DirectoryWalk,
    /// Fetch one JSON document that contains all records inline.
    AggregateDocument,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub owner: String,
    pub repo: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default = "default_strategy")]
    pub strategy: DiscoveryStrategy,
    /// Subdirectory listed directly before falling back to a root walk.
    #[serde(default)]
    pub target_folder: Option<String>,
    /// Path of the aggregate document, relative to the repository root.
    #[serde(default = "default_aggregate_path")]
    pub aggregate_path: String,
    #[serde(default = "default_suffix")]
    pub suffix: String,
}

impl RepositoryConfig {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        RepositoryConfig {
            owner: owner.into(),
            repo: repo.into(),
            branch: default_branch(),
            strategy: default_strategy(),
            target_folder: None,
            aggregate_path: default_aggregate_path(),
            suffix: default_suffix(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            ttl_seconds: default_ttl_seconds(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_raw_base")]
    pub raw_base: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Injected from the environment, never read from the config file.
    #[serde(skip)]
    pub token: Option<String>,
    #[serde(default = "default_content_timeout_ms")]
    pub content_timeout_ms: u64,
    #[serde(default = "default_listing_timeout_ms")]
    pub listing_timeout_ms: u64,
    #[serde(default = "default_aggregate_timeout_ms")]
    pub aggregate_timeout_ms: u64,
    /// Fetch full content for every item as part of a refresh.
    #[serde(default)]
    pub enrich_on_refresh: bool,
    #[serde(default = "default_enrich_chunk_size")]
    pub enrich_chunk_size: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            api_base: default_api_base(),
            raw_base: default_raw_base(),
            user_agent: default_user_agent(),
            token: None,
            content_timeout_ms: default_content_timeout_ms(),
            listing_timeout_ms: default_listing_timeout_ms(),
            aggregate_timeout_ms: default_aggregate_timeout_ms(),
            enrich_on_refresh: false,
            enrich_chunk_size: default_enrich_chunk_size(),
        }
    }
}

impl FetchConfig {
    pub fn content_timeout(&self) -> Duration {
        Duration::from_millis(self.content_timeout_ms)
    }

    pub fn listing_timeout(&self) -> Duration {
        Duration::from_millis(self.listing_timeout_ms)
    }

    pub fn aggregate_timeout(&self) -> Duration {
        Duration::from_millis(self.aggregate_timeout_ms)
    }
}

/// Additions to the built-in acronym and brand tables used for display names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamingConfig {
    #[serde(default)]
    pub acronyms: Vec<String>,
    /// Lowercase token → display form, e.g. `hubspot: HubSpot`.
    #[serde(default)]
    pub brands: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    pub repository: RepositoryConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub naming: NamingConfig,
}

impl IndexConfig {
    pub fn new(repository: RepositoryConfig) -> Self {
        IndexConfig {
            repository,
            cache: CacheConfig::default(),
            fetch: FetchConfig::default(),
            naming: NamingConfig::default(),
        }
    }

    /// Contents API URL for `path` ("" lists the root).
    pub fn contents_url(&self, path: &str) -> String {
        let base = self.fetch.api_base.trim_end_matches('/');
        let path = path.trim_matches('/');
        format!(
            "{}/repos/{}/{}/contents/{}?ref={}",
            base, self.repository.owner, self.repository.repo, path, self.repository.branch
        )
    }

    pub fn raw_url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.fetch.raw_base.trim_end_matches('/'),
            self.repository.owner,
            self.repository.repo,
            self.repository.branch,
            path.trim_start_matches('/')
        )
    }

    pub fn repo_url(&self) -> String {
        format!(
            "{}/repos/{}/{}",
            self.fetch.api_base.trim_end_matches('/'),
            self.repository.owner,
            self.repository.repo
        )
    }

    pub fn trace_loaded(&self) {
        info!(
            repository = %self.repository.full_name(),
            branch = %self.repository.branch,
            strategy = ?self.repository.strategy,
            ttl_seconds = self.cache.ttl_seconds,
            token_set = self.fetch.token.is_some(),
            "Loaded index config"
        );
        debug!(
            target_folder = ?self.repository.target_folder,
            aggregate_path = %self.repository.aggregate_path,
            enrich_on_refresh = self.fetch.enrich_on_refresh,
            "Index config details"
        );
    }
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_strategy() -> DiscoveryStrategy {
    DiscoveryStrategy::DirectoryWalk
}

fn default_aggregate_path() -> String {
    "workflows.json".to_string()
}

fn default_suffix() -> String {
    ".json".to_string()
}

fn default_ttl_seconds() -> u64 {
    300
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_raw_base() -> String {
    "https://raw.githubusercontent.com".to_string()
}

fn default_user_agent() -> String {
    concat!("workflow-index/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_content_timeout_ms() -> u64 {
    5_000
}

fn default_listing_timeout_ms() -> u64 {
    10_000
}

fn default_aggregate_timeout_ms() -> u64 {
    30_000
}

fn default_enrich_chunk_size() -> usize {
    10
}
