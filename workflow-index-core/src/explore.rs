//! Repository exploration: find every candidate workflow file.
//!
//! Two strategies, chosen by [`DiscoveryStrategy`]:
//!
//! - **Directory walk**: list a base folder (the configured target folder, or
//!   the root), keep matching files, then list each subdirectory one level
//!   deep. Subdirectories are listed concurrently; one failing listing is
//!   skipped and recorded, the rest still count.
//! - **Aggregate document**: fetch a single JSON document from the raw host
//!   and decode it through [`DocumentShape`].

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::{DiscoveryStrategy, IndexConfig};
use crate::contract::{Explorer, RemoteClient, RequestOptions};
use crate::error::IndexError;
use crate::model::{DirectoryEntry, EntryKind, Exploration, RawItem, ROOT_FOLDER};
use crate::policy::{recovery_for, FailureSite, Recovery};
use crate::shape::DocumentShape;

pub struct RepositoryExplorer {
    client: Arc<dyn RemoteClient>,
    config: IndexConfig,
}

impl RepositoryExplorer {
    pub fn new(client: Arc<dyn RemoteClient>, config: IndexConfig) -> Self {
        RepositoryExplorer { client, config }
    }

    fn matches_suffix(&self, entry: &DirectoryEntry) -> bool {
        entry.kind == EntryKind::File
            && entry
                .name
                .to_lowercase()
                .ends_with(&self.config.repository.suffix.to_lowercase())
    }

    /// Lists one folder of the contents API. Entries that do not decode are
    /// dropped with a warning rather than failing the listing.
    async fn list(&self, path: &str) -> Result<Vec<DirectoryEntry>, IndexError> {
        let url = self.config.contents_url(path);
        let options = RequestOptions::with_timeout(self.config.fetch.listing_timeout());
        let body = self.client.get_json(&url, options).await?;
        let Value::Array(raw_entries) = body else {
            return Err(IndexError::Shape(format!(
                "expected a directory listing at {url}"
            )));
        };
        let entries = raw_entries
            .into_iter()
            .filter_map(|raw| match serde_json::from_value::<DirectoryEntry>(raw) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, url = %url, "Skipping undecodable listing entry");
                    None
                }
            })
            .collect();
        Ok(entries)
    }

    async fn walk(&self) -> Result<Exploration, IndexError> {
        if let Some(target) = self.config.repository.target_folder.as_deref() {
            match self.walk_from(target).await {
                Ok(exploration) => return Ok(exploration),
                Err(e) if e.is_not_found_status() => {
                    warn!(
                        target_folder = target,
                        "Target folder not found, falling back to full root walk"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        self.walk_from("").await
    }

    /// Lists `base`, then every subdirectory of it one level deep. Files
    /// directly in `base` are recorded under [`ROOT_FOLDER`].
    async fn walk_from(&self, base: &str) -> Result<Exploration, IndexError> {
        let base_label = ROOT_FOLDER.to_string();
        let listing = self.list(base).await?;
        let (dirs, files): (Vec<_>, Vec<_>) = listing
            .into_iter()
            .partition(|entry| entry.kind == EntryKind::Dir);

        let mut exploration = Exploration {
            folders: vec![base_label.clone()],
            ..Default::default()
        };
        exploration.entries.extend(
            files
                .into_iter()
                .filter(|entry| self.matches_suffix(entry))
                .map(|entry| RawItem::listing(base_label.clone(), entry)),
        );

        let listings = join_all(dirs.iter().map(|dir| async move {
            let result = self.list(&dir.path).await;
            (dir, result)
        }))
        .await;

        for (dir, result) in listings {
            exploration.folders.push(dir.name.clone());
            match result {
                Ok(entries) => {
                    let before = exploration.entries.len();
                    exploration.entries.extend(
                        entries
                            .into_iter()
                            .filter(|entry| self.matches_suffix(entry))
                            .map(|entry| RawItem::listing(dir.name.clone(), entry)),
                    );
                    info!(
                        folder = %dir.name,
                        found = exploration.entries.len() - before,
                        "Listed folder"
                    );
                }
                Err(e) => match recovery_for(FailureSite::SubdirectoryListing) {
                    Recovery::Propagate => return Err(e),
                    _ => {
                        error!(error = %e, folder = %dir.name, "Folder listing failed, skipping");
                        exploration.failed_folders.push(dir.name.clone());
                    }
                },
            }
        }

        info!(
            base = if base.is_empty() { "/" } else { base },
            folders = exploration.folders.len(),
            failed = exploration.failed_folders.len(),
            candidates = exploration.entries.len(),
            "Directory walk complete"
        );
        Ok(exploration)
    }

    async fn fetch_aggregate(&self) -> Result<Exploration, IndexError> {
        let url = self.config.raw_url(&self.config.repository.aggregate_path);
        let options = RequestOptions::with_timeout(self.config.fetch.aggregate_timeout());
        let doc = self.client.get_json(&url, options).await?;

        let shape = DocumentShape::decode(doc);
        info!(url = %url, shape = shape.label(), "Decoded aggregate document");
        if matches!(shape, DocumentShape::Unrecognized) {
            let err = IndexError::Shape(format!("aggregate document at {url}"));
            match recovery_for(FailureSite::AggregateShape) {
                Recovery::Propagate => return Err(err),
                _ => warn!(error = %err, "Treating unrecognised aggregate document as empty"),
            }
        }

        let entries = shape.into_items();
        let mut folders: Vec<String> = vec![ROOT_FOLDER.to_string()];
        for entry in &entries {
            if !folders.contains(&entry.folder) {
                folders.push(entry.folder.clone());
            }
        }
        Ok(Exploration {
            entries,
            folders,
            failed_folders: Vec::new(),
        })
    }
}

#[async_trait]
impl Explorer for RepositoryExplorer {
    async fn explore(&self) -> Result<Exploration, IndexError> {
        match self.config.repository.strategy {
            DiscoveryStrategy::DirectoryWalk => self.walk().await,
            DiscoveryStrategy::AggregateDocument => self.fetch_aggregate().await,
        }
    }
}
