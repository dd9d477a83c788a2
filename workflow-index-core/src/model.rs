//! Data carried through the pipeline: raw upstream candidates on the way in,
//! [`WorkflowSummary`] on the way out.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Folder name recorded for items discovered at the top level of the repository.
pub const ROOT_FOLDER: &str = "root";

/// Category used when neither upstream nor the folder supplies one.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Trigger type used when nothing better is known.
pub const UNKNOWN_TRIGGER: &str = "Unknown";

/// Folder name → number of candidate workflows found in it.
pub type FolderCounts = BTreeMap<String, usize>;

/// Category → number of workflows in it.
pub type CategoryCounts = BTreeMap<String, usize>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Complexity {
    Low,
    Medium,
    High,
}

impl Complexity {
    pub fn from_node_count(nodes: usize) -> Self {
        match nodes {
            0..=5 => Complexity::Low,
            6..=15 => Complexity::Medium,
            _ => Complexity::High,
        }
    }

    /// Accepts upstream spellings such as "low", "MEDIUM" or "High".
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" | "simple" => Some(Complexity::Low),
            "medium" | "moderate" => Some(Complexity::Medium),
            "high" | "complex" => Some(Complexity::High),
            _ => None,
        }
    }
}

/// The display-ready record served for one workflow file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub name: String,
    pub filename: String,
    pub folder: String,
    pub path: String,
    pub size: u64,
    pub url: Option<String>,
    pub download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow: Option<Value>,
    pub nodes_count: usize,
    pub connections_count: usize,
    pub description: String,
    pub tags: Vec<String>,
    pub category: String,
    pub trigger_type: String,
    pub complexity: Complexity,
    /// False when upstream stated the complexity; fetched content then leaves it alone.
    #[serde(skip)]
    pub complexity_inferred: bool,
    pub integrations: Vec<String>,
    pub active: bool,
}

impl WorkflowSummary {
    /// Case-insensitive substring match over name, description and category.
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [&self.name, &self.description, &self.category]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// Kind of a GitHub contents API entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    #[serde(other)]
    Other,
}

/// One entry from a GitHub `/repos/{owner}/{repo}/contents/{path}` listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
}

/// Where a raw candidate came from.
#[derive(Debug, Clone, PartialEq)]
pub enum RawSource {
    /// A file entry from a directory listing; content not yet fetched.
    Listing(DirectoryEntry),
    /// A record from an aggregate document. `id` is set when the record was
    /// keyed by a numeric identifier.
    Record { id: Option<String>, value: Value },
}

/// A candidate discovered by exploration, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawItem {
    pub folder: String,
    pub source: RawSource,
}

impl RawItem {
    pub fn listing(folder: impl Into<String>, entry: DirectoryEntry) -> Self {
        RawItem {
            folder: folder.into(),
            source: RawSource::Listing(entry),
        }
    }

    /// Records carry their own `folder` when the document provides one.
    pub fn record(id: Option<String>, value: Value) -> Self {
        let folder = value
            .get("folder")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .unwrap_or(ROOT_FOLDER)
            .to_string();
        RawItem {
            folder,
            source: RawSource::Record { id, value },
        }
    }

    /// Best-effort path used in logs and structure samples.
    pub fn display_path(&self) -> String {
        match &self.source {
            RawSource::Listing(entry) => entry.path.clone(),
            RawSource::Record { id, value } => value
                .get("filename")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| id.clone())
                .unwrap_or_else(|| "<record>".to_string()),
        }
    }
}

/// Result of one exploration pass over the repository.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Exploration {
    pub entries: Vec<RawItem>,
    /// Every folder inspected, including ones that yielded nothing.
    pub folders: Vec<String>,
    /// Folders whose listing failed and were skipped.
    pub failed_folders: Vec<String>,
}

impl Exploration {
    pub fn folder_counts(&self) -> FolderCounts {
        let mut counts: FolderCounts = self.folders.iter().map(|f| (f.clone(), 0)).collect();
        for entry in &self.entries {
            *counts.entry(entry.folder.clone()).or_insert(0) += 1;
        }
        counts
    }
}

/// Repository metadata passed through from the GitHub repos endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub stars: u64,
    pub forks: u64,
    pub updated_at: Option<String>,
    pub html_url: Option<String>,
    pub private: bool,
}

impl RepositoryInfo {
    pub fn from_github(value: &Value) -> Self {
        let str_field = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
        let num_field = |key: &str| value.get(key).and_then(Value::as_u64).unwrap_or(0);
        RepositoryInfo {
            name: str_field("name").unwrap_or_default(),
            full_name: str_field("full_name").unwrap_or_default(),
            description: str_field("description"),
            stars: num_field("stargazers_count"),
            forks: num_field("forks_count"),
            updated_at: str_field("updated_at"),
            html_url: str_field("html_url"),
            private: value.get("private").and_then(Value::as_bool).unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn complexity_thresholds() {
        let got: Vec<Complexity> = [0, 5, 6, 15, 16]
            .into_iter()
            .map(Complexity::from_node_count)
            .collect();
        assert_eq!(
            got,
            vec![
                Complexity::Low,
                Complexity::Low,
                Complexity::Medium,
                Complexity::Medium,
                Complexity::High
            ]
        );
    }

    #[test]
    fn directory_entry_decodes_github_listing() {
        let raw = json!({
            "name": "slack", "path": "slack", "sha": "abc", "size": 0,
            "url": "https://api.github.com/repos/o/r/contents/slack",
            "download_url": null, "type": "dir"
        });
        let entry: DirectoryEntry = serde_json::from_value(raw).unwrap();
        assert_eq!(entry.kind, EntryKind::Dir);
        assert!(entry.download_url.is_none());

        let symlink: DirectoryEntry =
            serde_json::from_value(json!({"name": "l", "path": "l", "type": "symlink"})).unwrap();
        assert_eq!(symlink.kind, EntryKind::Other);
    }

    #[test]
    fn folder_counts_include_empty_folders() {
        let exploration = Exploration {
            entries: vec![RawItem::record(None, json!({}))],
            folders: vec!["empty".into()],
            failed_folders: vec![],
        };
        let counts = exploration.folder_counts();
        assert_eq!(counts.get("empty"), Some(&0));
        assert_eq!(counts.get(ROOT_FOLDER), Some(&1));
    }

    #[test]
    fn repository_info_maps_github_field_names() {
        let info = RepositoryInfo::from_github(&json!({
            "name": "workflows", "full_name": "acme/workflows",
            "stargazers_count": 42, "forks_count": 7, "private": false,
            "html_url": "https://github.com/acme/workflows"
        }));
        assert_eq!(info.stars, 42);
        assert_eq!(info.forks, 7);
        assert_eq!(info.description, None);
    }
}
