use serde_json::{json, Value};
use std::sync::Arc;

use workflow_index_core::config::{DiscoveryStrategy, IndexConfig, RepositoryConfig};
use workflow_index_core::contract::{Explorer, MockRemoteClient, RequestOptions};
use workflow_index_core::error::IndexError;
use workflow_index_core::explore::RepositoryExplorer;
use workflow_index_core::model::{RawSource, ROOT_FOLDER};

const CONTENTS: &str = "https://api.github.com/repos/acme/flows/contents";
const RAW: &str = "https://raw.githubusercontent.com/acme/flows/main";

fn config(strategy: DiscoveryStrategy, target_folder: Option<&str>) -> IndexConfig {
    IndexConfig::new(RepositoryConfig {
        owner: "acme".into(),
        repo: "flows".into(),
        branch: "main".into(),
        strategy,
        target_folder: target_folder.map(str::to_string),
        aggregate_path: "workflows.json".into(),
        suffix: ".json".into(),
    })
}

fn file(path: &str) -> Value {
    let name = path.rsplit('/').next().unwrap_or(path);
    json!({
        "name": name,
        "path": path,
        "type": "file",
        "size": 128,
        "html_url": format!("https://github.com/acme/flows/blob/main/{path}"),
        "download_url": format!("{RAW}/{path}"),
    })
}

fn dir(path: &str) -> Value {
    let name = path.rsplit('/').next().unwrap_or(path);
    json!({ "name": name, "path": path, "type": "dir", "size": 0, "download_url": null })
}

fn status(url: &str, code: u16) -> IndexError {
    IndexError::UpstreamStatus {
        url: url.to_string(),
        status: code,
        body: String::new(),
    }
}

fn explorer_with<F>(config: IndexConfig, route: F) -> RepositoryExplorer
where
    F: Fn(&str) -> Result<Value, IndexError> + Send + 'static,
{
    let mut client = MockRemoteClient::new();
    client
        .expect_get_json()
        .returning(move |url: &str, _: RequestOptions| route(url));
    RepositoryExplorer::new(Arc::new(client), config)
}

#[tokio::test]
async fn test_walk_skips_failing_folder_and_keeps_the_rest() {
    let explorer = explorer_with(config(DiscoveryStrategy::DirectoryWalk, None), |url| {
        match url {
            u if u == format!("{CONTENTS}/?ref=main") => Ok(json!([
                file("intro.json"),
                file("README.md"),
                dir("slack"),
                dir("broken"),
                dir("email"),
            ])),
            u if u == format!("{CONTENTS}/slack?ref=main") => {
                Ok(json!([file("slack/notify.json"), file("slack/digest.json")]))
            }
            u if u == format!("{CONTENTS}/broken?ref=main") => Err(status(u, 500)),
            u if u == format!("{CONTENTS}/email?ref=main") => {
                Ok(json!([file("email/welcome.json"), file("email/notes.txt")]))
            }
            other => panic!("unexpected request to {other}"),
        }
    });

    let exploration = explorer.explore().await.expect("walk should succeed");

    assert_eq!(exploration.entries.len(), 4);
    assert_eq!(exploration.failed_folders, vec!["broken".to_string()]);

    let counts = exploration.folder_counts();
    assert_eq!(counts.get(ROOT_FOLDER), Some(&1));
    assert_eq!(counts.get("slack"), Some(&2));
    assert_eq!(counts.get("email"), Some(&1));
    assert_eq!(counts.get("broken"), Some(&0));

    for entry in &exploration.entries {
        assert!(matches!(entry.source, RawSource::Listing(_)));
    }
}

#[tokio::test]
async fn test_missing_target_folder_falls_back_to_root_walk() {
    let explorer = explorer_with(
        config(DiscoveryStrategy::DirectoryWalk, Some("workflows")),
        |url| match url {
            u if u == format!("{CONTENTS}/workflows?ref=main") => Err(status(u, 404)),
            u if u == format!("{CONTENTS}/?ref=main") => Ok(json!([file("only.json")])),
            other => panic!("unexpected request to {other}"),
        },
    );

    let exploration = explorer.explore().await.expect("fallback walk should succeed");
    assert_eq!(exploration.entries.len(), 1);
    assert_eq!(exploration.entries[0].display_path(), "only.json");
}

#[tokio::test]
async fn test_target_folder_files_are_recorded_under_root() {
    let explorer = explorer_with(
        config(DiscoveryStrategy::DirectoryWalk, Some("workflows")),
        |url| match url {
            u if u == format!("{CONTENTS}/workflows?ref=main") => Ok(json!([
                file("workflows/a.json"),
                dir("workflows/crm"),
            ])),
            u if u == format!("{CONTENTS}/workflows/crm?ref=main") => {
                Ok(json!([file("workflows/crm/lead.json")]))
            }
            other => panic!("unexpected request to {other}"),
        },
    );

    let exploration = explorer.explore().await.expect("walk should succeed");
    let folders: Vec<&str> = exploration.entries.iter().map(|e| e.folder.as_str()).collect();
    assert_eq!(folders, vec![ROOT_FOLDER, "crm"]);
}

#[tokio::test]
async fn test_target_folder_server_error_is_not_masked() {
    let explorer = explorer_with(
        config(DiscoveryStrategy::DirectoryWalk, Some("workflows")),
        |url| Err(status(url, 502)),
    );

    let err = explorer.explore().await.unwrap_err();
    assert!(matches!(err, IndexError::UpstreamStatus { status: 502, .. }));
}

#[tokio::test]
async fn test_root_listing_failure_propagates() {
    let explorer = explorer_with(config(DiscoveryStrategy::DirectoryWalk, None), |url| {
        Err(IndexError::transport(url, "connection reset"))
    });

    let err = explorer.explore().await.unwrap_err();
    assert!(matches!(err, IndexError::Transport { .. }));
}

#[tokio::test]
async fn test_aggregate_with_workflows_property() {
    let explorer = explorer_with(
        config(DiscoveryStrategy::AggregateDocument, None),
        |url| {
            assert_eq!(url, format!("{RAW}/workflows.json"));
            Ok(json!({
                "workflows": [
                    { "filename": "a.json", "name": "A", "folder": "sales" },
                    { "filename": "b.json", "name": "B" },
                ]
            }))
        },
    );

    let exploration = explorer.explore().await.expect("aggregate should decode");
    assert_eq!(exploration.entries.len(), 2);
    assert_eq!(
        exploration.folders,
        vec![ROOT_FOLDER.to_string(), "sales".to_string()]
    );
}

#[tokio::test]
async fn test_aggregate_keyed_by_numeric_id() {
    let explorer = explorer_with(
        config(DiscoveryStrategy::AggregateDocument, None),
        |_| {
            let map: serde_json::Map<String, Value> = (1..=120)
                .map(|i| (i.to_string(), json!({ "name": format!("Flow {i}") })))
                .collect();
            Ok(Value::Object(map))
        },
    );

    let exploration = explorer.explore().await.expect("aggregate should decode");
    assert_eq!(exploration.entries.len(), 120);
    assert!(exploration.entries.iter().all(|e| matches!(
        &e.source,
        RawSource::Record { id: Some(_), .. }
    )));
}

#[tokio::test]
async fn test_unrecognised_aggregate_is_empty_not_an_error() {
    let explorer = explorer_with(
        config(DiscoveryStrategy::AggregateDocument, None),
        |_| Ok(json!({ "message": "nothing here" })),
    );

    let exploration = explorer.explore().await.expect("unrecognised shape degrades");
    assert!(exploration.entries.is_empty());
}
