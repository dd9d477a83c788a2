//! Turns one raw candidate into a [`WorkflowSummary`].
//!
//! Listing entries carry only file metadata; aggregate records may carry any
//! subset of the summary fields, and sometimes the full workflow document.
//! Missing fields fall back to defaults, and whatever can be read from an
//! attached document (node counts, trigger, integrations) is derived from it.

use serde_json::{Map, Value};
use std::collections::BTreeSet;

use crate::model::{
    Complexity, DirectoryEntry, RawItem, RawSource, WorkflowSummary, ROOT_FOLDER, UNCATEGORIZED,
    UNKNOWN_TRIGGER,
};
use crate::naming::{ensure_suffix, strip_suffix, NamingRules};

/// Prefix of descriptions written for summaries whose content could not be fetched.
pub const DEGRADED_PREFIX: &str = "Content unavailable";

/// Node types that are plumbing rather than an external service.
const CORE_NODE_TYPES: &[&str] = &[
    "aggregate",
    "code",
    "comparedatasets",
    "cron",
    "crypto",
    "datetime",
    "executeworkflow",
    "filter",
    "function",
    "functionitem",
    "html",
    "if",
    "interval",
    "itemlists",
    "limit",
    "manual",
    "markdown",
    "merge",
    "movebinarydata",
    "noop",
    "readbinaryfile",
    "removeduplicates",
    "renamekeys",
    "respondtowebhook",
    "schedule",
    "set",
    "sort",
    "splitinbatches",
    "splitout",
    "start",
    "stickynote",
    "summarize",
    "switch",
    "wait",
    "webhook",
    "writebinaryfile",
    "xml",
];

/// Facts read from a full workflow document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentStats {
    pub nodes: usize,
    pub connections: usize,
    pub trigger: Option<String>,
    pub integrations: Vec<String>,
    pub description: Option<String>,
}

impl DocumentStats {
    pub fn generated_description(&self) -> String {
        format!("{} nodes, {} connections", self.nodes, self.connections)
    }
}

/// Reads counts, trigger kind, integrations and description from a document.
pub fn inspect_document(doc: &Value, rules: &NamingRules) -> DocumentStats {
    let nodes = doc.get("nodes").and_then(Value::as_array);
    let node_types: Vec<&str> = nodes
        .map(|n| {
            n.iter()
                .filter_map(|node| node.get("type").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();

    let description = doc
        .get("meta")
        .and_then(|m| m.get("description"))
        .or_else(|| doc.get("description"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string);

    DocumentStats {
        nodes: nodes.map(Vec::len).unwrap_or(0),
        connections: count_connections(doc.get("connections")),
        trigger: infer_trigger(&node_types, nodes.is_some_and(|n| !n.is_empty())),
        integrations: infer_integrations(&node_types, rules),
        description,
    }
}

/// Counts outgoing connection targets.
///
/// n8n stores `{source: {output_kind: [[target, ...], ...]}}`; a flat array
/// counts one per element.
fn count_connections(connections: Option<&Value>) -> usize {
    match connections {
        Some(Value::Object(sources)) => sources
            .values()
            .filter_map(Value::as_object)
            .flat_map(|outputs| outputs.values())
            .filter_map(Value::as_array)
            .flatten()
            .map(|targets| targets.as_array().map(Vec::len).unwrap_or(1))
            .sum(),
        Some(Value::Array(items)) => items.len(),
        _ => 0,
    }
}

fn infer_trigger(node_types: &[&str], has_nodes: bool) -> Option<String> {
    let lowered: Vec<String> = node_types.iter().map(|t| t.to_lowercase()).collect();
    let any = |needles: &[&str]| {
        lowered
            .iter()
            .any(|t| needles.iter().any(|needle| t.contains(needle)))
    };
    let kind = if lowered
        .iter()
        .any(|t| t.contains("webhook") && !t.contains("respondtowebhook"))
    {
        "Webhook"
    } else if any(&["scheduletrigger", "cron", "interval"]) {
        "Scheduled"
    } else if any(&["manualtrigger"]) {
        "Manual"
    } else if lowered.iter().any(|t| t.ends_with("trigger")) {
        "Event"
    } else if has_nodes {
        "Manual"
    } else {
        return None;
    };
    Some(kind.to_string())
}

fn infer_integrations(node_types: &[&str], rules: &NamingRules) -> Vec<String> {
    let mut found = BTreeSet::new();
    for &node_type in node_types {
        let short = node_type.rsplit('.').next().unwrap_or(node_type);
        let short = strip_suffix(short, "Trigger");
        if short.is_empty() {
            continue;
        }
        let key = short.to_lowercase();
        if CORE_NODE_TYPES.contains(&key.as_str()) {
            continue;
        }
        found.insert(rules.display_name(&split_camel_case(short), ""));
    }
    found.into_iter().collect()
}

/// `googleSheets` → `google Sheets`.
fn split_camel_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 4);
    let mut prev_lower = false;
    for c in raw.chars() {
        if c.is_uppercase() && prev_lower {
            out.push(' ');
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        out.push(c);
    }
    out
}

fn category_for_folder(folder: &str, rules: &NamingRules) -> String {
    if folder.is_empty() || folder == ROOT_FOLDER {
        UNCATEGORIZED.to_string()
    } else {
        rules.display_name(folder, "")
    }
}

/// Normalizes one raw candidate. Returns `None` only for records that are not
/// JSON objects.
pub fn normalize(item: &RawItem, rules: &NamingRules, suffix: &str) -> Option<WorkflowSummary> {
    match &item.source {
        RawSource::Listing(entry) => Some(from_listing(&item.folder, entry, rules, suffix)),
        RawSource::Record { id, value } => {
            let record = value.as_object()?;
            Some(from_record(&item.folder, id.as_deref(), record, rules, suffix))
        }
    }
}

fn from_listing(
    folder: &str,
    entry: &DirectoryEntry,
    rules: &NamingRules,
    suffix: &str,
) -> WorkflowSummary {
    WorkflowSummary {
        name: rules.display_name(&entry.name, suffix),
        filename: ensure_suffix(&entry.name, suffix),
        folder: folder.to_string(),
        path: entry.path.clone(),
        size: entry.size,
        url: entry.html_url.clone().or_else(|| entry.url.clone()),
        download_url: entry.download_url.clone(),
        workflow: None,
        nodes_count: 0,
        connections_count: 0,
        description: String::new(),
        tags: Vec::new(),
        category: category_for_folder(folder, rules),
        trigger_type: UNKNOWN_TRIGGER.to_string(),
        complexity: Complexity::from_node_count(0),
        complexity_inferred: true,
        integrations: Vec::new(),
        active: true,
    }
}

fn str_field<'a>(record: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| record.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
}

fn u64_field(record: &Map<String, Value>, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|k| record.get(*k).and_then(Value::as_u64))
}

fn string_list(value: Option<&Value>) -> Option<Vec<String>> {
    let items = value?.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Object(o) => o.get("name").and_then(Value::as_str).map(str::to_string),
                _ => None,
            })
            .collect(),
    )
}

fn from_record(
    folder: &str,
    id: Option<&str>,
    record: &Map<String, Value>,
    rules: &NamingRules,
    suffix: &str,
) -> WorkflowSummary {
    let title = str_field(record, &["name", "title"]);
    let raw_filename = str_field(record, &["filename", "file", "file_name"]);

    let filename = match (raw_filename, id, title) {
        (Some(f), _, _) => ensure_suffix(f, suffix),
        (None, Some(id), _) => ensure_suffix(id, suffix),
        (None, None, Some(t)) => ensure_suffix(&t.to_lowercase().replace(' ', "_"), suffix),
        (None, None, None) => ensure_suffix("untitled", suffix),
    };
    let name = rules.display_name(title.unwrap_or(&filename), suffix);

    let folder = folder.to_string();
    let path = str_field(record, &["path"])
        .map(str::to_string)
        .unwrap_or_else(|| filename.clone());

    // The record is the document itself when it has `nodes`.
    let workflow = match record.get("workflow") {
        Some(doc @ Value::Object(_)) => Some(doc.clone()),
        _ if record.get("nodes").is_some_and(Value::is_array) => {
            Some(Value::Object(record.clone()))
        }
        _ => None,
    };
    let stats = workflow.as_ref().map(|doc| inspect_document(doc, rules));

    let nodes_count = stats
        .as_ref()
        .map(|s| s.nodes)
        .or_else(|| u64_field(record, &["nodes_count", "nodeCount", "node_count"]).map(|n| n as usize))
        .unwrap_or(0);
    let connections_count = stats
        .as_ref()
        .map(|s| s.connections)
        .or_else(|| {
            u64_field(record, &["connections_count", "connectionCount"]).map(|n| n as usize)
        })
        .unwrap_or(0);

    let description = str_field(record, &["description"])
        .map(str::to_string)
        .or_else(|| stats.as_ref().and_then(|s| s.description.clone()))
        .unwrap_or_default();

    let category = str_field(record, &["category"])
        .map(str::to_string)
        .unwrap_or_else(|| category_for_folder(&folder, rules));

    let trigger_type = str_field(record, &["trigger_type", "triggerType", "trigger"])
        .map(str::to_string)
        .or_else(|| stats.as_ref().and_then(|s| s.trigger.clone()))
        .unwrap_or_else(|| UNKNOWN_TRIGGER.to_string());

    let stated_complexity = str_field(record, &["complexity"]).and_then(Complexity::parse);
    let complexity_inferred = stated_complexity.is_none();
    let complexity =
        stated_complexity.unwrap_or_else(|| Complexity::from_node_count(nodes_count));

    let integrations = string_list(record.get("integrations"))
        .filter(|list| !list.is_empty())
        .or_else(|| stats.as_ref().map(|s| s.integrations.clone()))
        .unwrap_or_default();

    WorkflowSummary {
        name,
        filename,
        folder,
        path,
        size: u64_field(record, &["size"]).unwrap_or(0),
        url: str_field(record, &["url", "html_url"]).map(str::to_string),
        download_url: str_field(record, &["download_url", "downloadUrl", "raw_url"])
            .map(str::to_string),
        workflow,
        nodes_count,
        connections_count,
        description,
        tags: string_list(record.get("tags")).unwrap_or_default(),
        category,
        trigger_type,
        complexity,
        complexity_inferred,
        integrations,
        active: record.get("active").and_then(Value::as_bool).unwrap_or(true),
    }
}

/// Attaches a freshly fetched document to a summary and recomputes the
/// fields derived from it.
pub fn apply_document(summary: &mut WorkflowSummary, doc: Value, rules: &NamingRules) {
    let stats = inspect_document(&doc, rules);
    summary.nodes_count = stats.nodes;
    summary.connections_count = stats.connections;
    if summary.complexity_inferred {
        summary.complexity = Complexity::from_node_count(stats.nodes);
    }
    if let Some(description) = &stats.description {
        summary.description = description.clone();
    } else if summary.description.is_empty() || summary.description.starts_with(DEGRADED_PREFIX) {
        summary.description = stats.generated_description();
    }
    if summary.trigger_type == UNKNOWN_TRIGGER {
        if let Some(trigger) = stats.trigger {
            summary.trigger_type = trigger;
        }
    }
    if summary.integrations.is_empty() {
        summary.integrations = stats.integrations;
    }
    summary.workflow = Some(doc);
}

/// Marks a summary whose content fetch failed; the summary itself is kept.
pub fn mark_degraded(summary: &mut WorkflowSummary, reason: &str) {
    summary.description = format!("{DEGRADED_PREFIX}: {reason}");
}
