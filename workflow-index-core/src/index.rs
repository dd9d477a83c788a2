//! The query side of the pipeline: everything the HTTP layer calls.
//!
//! [`WorkflowIndex`] ties together the explorer, the remote client and the
//! content cache:
//!
//! ```text
//! request → WorkflowIndex → ContentCache ── hit ──────────────────────────→ response
//!                                   └─ miss → Explorer → normalize → replace ┘
//! ```
//!
//! # Failure handling
//! Failures are resolved through [`crate::policy`]. A failed refresh never
//! fails the listing: the previous snapshot is served if there is one,
//! otherwise an empty listing carrying the error message. Repository info
//! and the structure report propagate errors, having nothing to degrade to.
//!
//! # Concurrency
//! Misses go through the cache's refresh guard; a request that waited on
//! another request's refresh re-checks freshness and is served from it.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::cache::{CacheSnapshot, CacheStatus, ContentCache};
use crate::client::GithubClient;
use crate::config::IndexConfig;
use crate::contract::{Explorer, RemoteClient, RequestOptions};
use crate::error::IndexError;
use crate::explore::RepositoryExplorer;
use crate::model::{CategoryCounts, FolderCounts, RepositoryInfo, WorkflowSummary};
use crate::naming::NamingRules;
use crate::normalize::{apply_document, mark_degraded, normalize};
use crate::policy::{recovery_for, FailureSite, Recovery};

/// Categories offered to the UI regardless of what the repository contains.
pub const CATEGORY_TAXONOMY: &[&str] = &[
    "AI & Machine Learning",
    "Communication",
    "CRM & Sales",
    "Data Processing",
    "Development",
    "E-commerce",
    "Finance",
    "Marketing",
    "Productivity",
    "Social Media",
    "Uncategorized",
];

/// Number of entries shown in a structure report sample.
const STRUCTURE_SAMPLE_SIZE: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    pub workflows: Vec<WorkflowSummary>,
    /// Size of the whole snapshot, before filtering.
    pub total: usize,
    /// Served from a snapshot without refreshing it in this call.
    pub cached: bool,
    /// Served from a snapshot past its TTL because the refresh failed.
    pub stale: bool,
    pub cache_age_seconds: Option<u64>,
    pub structure: FolderCounts,
    pub categories: CategoryCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StructureReport {
    pub repository: String,
    pub structure: FolderCounts,
    pub total_files: usize,
    pub sample_files: Vec<String>,
    pub failed_folders: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryReport {
    pub categories: CategoryCounts,
    pub available: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub cache_status: CacheStatus,
    pub cache_age_seconds: Option<u64>,
    pub cached_workflows: usize,
    pub ttl_seconds: u64,
    pub repository: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DebugReport {
    pub config: IndexConfig,
    pub token_configured: bool,
    pub cache_status: CacheStatus,
    pub populated_at: Option<DateTime<Utc>>,
    pub cached_workflows: usize,
    pub cached_filenames: Vec<String>,
    pub structure: FolderCounts,
}

/// Outcome of making sure the cache is fresh.
enum Served {
    /// Snapshot was already fresh (possibly refreshed by a concurrent caller).
    Cached(CacheSnapshot),
    Refreshed(CacheSnapshot),
    Failed {
        stale: Option<CacheSnapshot>,
        error: IndexError,
    },
}

pub struct WorkflowIndex {
    explorer: Arc<dyn Explorer>,
    client: Arc<dyn RemoteClient>,
    cache: Arc<ContentCache>,
    rules: NamingRules,
    config: IndexConfig,
}

impl WorkflowIndex {
    pub fn new(
        explorer: Arc<dyn Explorer>,
        client: Arc<dyn RemoteClient>,
        cache: Arc<ContentCache>,
        config: IndexConfig,
    ) -> Self {
        let rules = NamingRules::from_config(&config.naming);
        WorkflowIndex {
            explorer,
            client,
            cache,
            rules,
            config,
        }
    }

    /// Wires the GitHub client, repository explorer and cache from `config`.
    pub fn from_config(config: IndexConfig) -> Result<Self, IndexError> {
        config.trace_loaded();
        let client: Arc<dyn RemoteClient> = Arc::new(GithubClient::new(&config.fetch)?);
        let explorer = Arc::new(RepositoryExplorer::new(client.clone(), config.clone()));
        let cache = Arc::new(ContentCache::new(config.cache.ttl()));
        Ok(WorkflowIndex::new(explorer, client, cache, config))
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<ContentCache> {
        &self.cache
    }

    /// Normalizes every candidate, dropping invalid records and later
    /// duplicates of an already seen filename.
    fn normalize_all(&self, exploration: &crate::model::Exploration) -> Vec<WorkflowSummary> {
        let suffix = &self.config.repository.suffix;
        let mut seen: HashMap<String, String> = HashMap::new();
        let mut workflows = Vec::with_capacity(exploration.entries.len());
        for item in &exploration.entries {
            let Some(summary) = normalize(item, &self.rules, suffix) else {
                warn!(path = %item.display_path(), "Skipping structurally invalid record");
                continue;
            };
            if let Some(first_path) = seen.get(&summary.filename) {
                warn!(
                    filename = %summary.filename,
                    kept = %first_path,
                    dropped = %summary.path,
                    "Duplicate filename, keeping first occurrence"
                );
                continue;
            }
            seen.insert(summary.filename.clone(), summary.path.clone());
            workflows.push(summary);
        }
        workflows
    }

    async fn fetch_document(&self, url: &str) -> Result<Value, IndexError> {
        let options = RequestOptions::with_timeout(self.config.fetch.content_timeout());
        self.client.get_json(url, options).await
    }

    /// Fetches full content for every summary that lacks it. Chunks run one
    /// after another; fetches within a chunk run concurrently.
    async fn enrich(&self, workflows: &mut [WorkflowSummary]) {
        let chunk_size = self.config.fetch.enrich_chunk_size.max(1);
        for chunk in workflows.chunks_mut(chunk_size) {
            let fetches = chunk.iter().map(|summary| async move {
                match (&summary.workflow, summary.download_url.as_deref()) {
                    (None, Some(url)) => Some(self.fetch_document(url).await),
                    _ => None,
                }
            });
            let results = join_all(fetches).await;

            for (summary, result) in chunk.iter_mut().zip(results) {
                match result {
                    Some(Ok(doc)) => apply_document(summary, doc, &self.rules),
                    Some(Err(e)) => match recovery_for(FailureSite::ItemEnrichment) {
                        Recovery::Placeholder => {
                            warn!(error = %e, filename = %summary.filename, "Enrichment failed, keeping degraded summary");
                            mark_degraded(summary, &e.external_message());
                        }
                        _ => {
                            warn!(error = %e, filename = %summary.filename, "Enrichment failed");
                        }
                    },
                    None => {}
                }
            }
        }
    }

    /// Explore, normalize and swap the result into the cache.
    async fn refresh(&self) -> Result<CacheSnapshot, IndexError> {
        info!(repository = %self.config.repository.full_name(), "Refreshing workflow index");
        let exploration = self.explorer.explore().await?;
        let mut workflows = self.normalize_all(&exploration);
        if self.config.fetch.enrich_on_refresh {
            self.enrich(&mut workflows).await;
        }
        let categories = category_counts(&workflows);
        let snapshot = self
            .cache
            .replace(workflows, exploration.folder_counts(), categories)
            .await;
        Ok(snapshot)
    }

    async fn ensure_fresh(&self) -> Served {
        if let Some(snapshot) = self.cache.get_fresh().await {
            return Served::Cached(snapshot);
        }

        let attempts_seen = self.cache.refresh_attempts();
        let _guard = self.cache.refresh_guard().await;
        if let Some(snapshot) = self.cache.get_fresh().await {
            debug!("Cache refreshed by a concurrent request");
            return Served::Cached(snapshot);
        }
        // Someone else's refresh finished while we queued and left no fresh
        // snapshot, so it failed. Share its outcome rather than retrying.
        if self.cache.refresh_attempts() != attempts_seen {
            if let Some(error) = self.cache.last_failure().await {
                debug!(error = %error, "Concurrent refresh failed, sharing its error");
                return Served::Failed {
                    stale: self.cache.get().await,
                    error,
                };
            }
        }

        match self.refresh().await {
            Ok(snapshot) => Served::Refreshed(snapshot),
            Err(error) => {
                error!(error = %error, "Workflow index refresh failed");
                self.cache.record_failure(&error).await;
                Served::Failed {
                    stale: self.cache.get().await,
                    error,
                }
            }
        }
    }

    /// Current listing, refreshed if the cache is empty or expired, optionally
    /// filtered by a case-insensitive substring.
    pub async fn list_workflows(&self, filter: Option<&str>) -> Result<Listing, IndexError> {
        let (snapshot, cached, stale, error) = match self.ensure_fresh().await {
            Served::Cached(s) => (Some(s), true, false, None),
            Served::Refreshed(s) => (Some(s), false, false, None),
            Served::Failed { stale, error } => {
                match recovery_for(FailureSite::TopLevelExploration) {
                    Recovery::Propagate => return Err(error),
                    Recovery::ServeStaleOrEmpty => {
                        let has_stale = stale.is_some();
                        (stale, has_stale, has_stale, Some(error.external_message()))
                    }
                    _ => (None, false, false, Some(error.external_message())),
                }
            }
        };

        let Some(snapshot) = snapshot else {
            return Ok(Listing {
                workflows: Vec::new(),
                total: 0,
                cached,
                stale,
                cache_age_seconds: None,
                structure: FolderCounts::new(),
                categories: CategoryCounts::new(),
                error,
            });
        };

        let total = snapshot.workflows.len();
        let cache_age_seconds = Some(snapshot.age().as_secs());
        let workflows = match filter.map(str::trim).filter(|f| !f.is_empty()) {
            Some(needle) => snapshot
                .workflows
                .into_iter()
                .filter(|w| w.matches(needle))
                .collect(),
            None => snapshot.workflows,
        };
        Ok(Listing {
            workflows,
            total,
            cached,
            stale,
            cache_age_seconds,
            structure: snapshot.structure,
            categories: snapshot.categories,
            error,
        })
    }

    /// One workflow by exact filename, with its full document fetched on first
    /// access and kept in the cache for the rest of the TTL window.
    pub async fn get_workflow(&self, filename: &str) -> Result<WorkflowSummary, IndexError> {
        if let Served::Failed { stale, error } = self.ensure_fresh().await {
            match recovery_for(FailureSite::WorkflowLookup) {
                Recovery::ServeStaleOrPropagate if stale.is_some() => {
                    warn!(error = %error, filename, "Refresh failed, looking up in stale snapshot");
                }
                _ => return Err(error),
            }
        }
        let mut summary = self
            .cache
            .find(filename)
            .await
            .ok_or_else(|| IndexError::NotFound(filename.to_string()))?;

        let url = match (&summary.workflow, summary.download_url.clone()) {
            (None, Some(url)) => url,
            _ => return Ok(summary),
        };

        match self.fetch_document(&url).await {
            Ok(doc) => {
                info!(filename, "Fetched workflow content");
                let rules = &self.rules;
                let stored = self
                    .cache
                    .update_workflow(filename, |cached| apply_document(cached, doc.clone(), rules))
                    .await;
                match stored {
                    Some(updated) => Ok(updated),
                    None => {
                        apply_document(&mut summary, doc, rules);
                        Ok(summary)
                    }
                }
            }
            Err(e) => match recovery_for(FailureSite::LazyContentFetch) {
                Recovery::Propagate => Err(e),
                _ => {
                    warn!(error = %e, filename, "Content fetch failed, serving summary without document");
                    mark_degraded(&mut summary, &e.external_message());
                    Ok(summary)
                }
            },
        }
    }

    /// Repository metadata straight from upstream. Not cached.
    pub async fn get_repository_info(&self) -> Result<RepositoryInfo, IndexError> {
        let options = RequestOptions::with_timeout(self.config.fetch.listing_timeout());
        match self.client.get_json(&self.config.repo_url(), options).await {
            Ok(value) => Ok(RepositoryInfo::from_github(&value)),
            Err(e) => {
                error!(error = %e, "Repository info fetch failed");
                Err(e)
            }
        }
    }

    /// Fresh exploration that bypasses and leaves untouched the cache.
    pub async fn get_structure_report(&self) -> Result<StructureReport, IndexError> {
        let exploration = match self.explorer.explore().await {
            Ok(exploration) => exploration,
            Err(e) => match recovery_for(FailureSite::StructureReport) {
                Recovery::Propagate => return Err(e),
                _ => Default::default(),
            },
        };
        Ok(StructureReport {
            repository: self.config.repository.full_name(),
            structure: exploration.folder_counts(),
            total_files: exploration.entries.len(),
            sample_files: exploration
                .entries
                .iter()
                .take(STRUCTURE_SAMPLE_SIZE)
                .map(|e| e.display_path())
                .collect(),
            failed_folders: exploration.failed_folders,
        })
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    pub async fn categories(&self) -> Result<CategoryReport, IndexError> {
        let listing = self.list_workflows(None).await?;
        Ok(CategoryReport {
            categories: listing.categories,
            available: CATEGORY_TAXONOMY.iter().map(|c| c.to_string()).collect(),
        })
    }

    pub async fn health(&self) -> HealthReport {
        HealthReport {
            status: "ok",
            timestamp: Utc::now(),
            cache_status: self.cache.status().await,
            cache_age_seconds: self.cache.age().await.map(|a| a.as_secs()),
            cached_workflows: self.cache.len().await,
            ttl_seconds: self.cache.ttl().as_secs(),
            repository: self.config.repository.full_name(),
        }
    }

    pub async fn debug_report(&self) -> DebugReport {
        let snapshot = self.cache.get().await;
        DebugReport {
            config: self.config.clone(),
            token_configured: self.config.fetch.token.is_some(),
            cache_status: self.cache.status().await,
            populated_at: snapshot.as_ref().map(|s| s.populated_wall),
            cached_workflows: snapshot.as_ref().map(|s| s.workflows.len()).unwrap_or(0),
            cached_filenames: snapshot
                .as_ref()
                .map(|s| s.workflows.iter().map(|w| w.filename.clone()).collect())
                .unwrap_or_default(),
            structure: snapshot.map(|s| s.structure).unwrap_or_default(),
        }
    }
}

pub fn category_counts(workflows: &[WorkflowSummary]) -> CategoryCounts {
    let mut counts = CategoryCounts::new();
    for workflow in workflows {
        *counts.entry(workflow.category.clone()).or_insert(0) += 1;
    }
    counts
}
