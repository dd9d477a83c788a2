use assert_cmd::Command;
use predicates::prelude::*;
use serial_test::serial;
use std::fs::write;
use tempfile::NamedTempFile;

/// Config whose upstream points at a closed local port, so commands fail fast
/// without touching the network.
fn create_unreachable_config() -> NamedTempFile {
    let config = NamedTempFile::new().expect("Creating temp config file failed");
    write(
        config.path(),
        b"repository:\n  owner: acme\n  repo: flows\nfetch:\n  api_base: \"http://127.0.0.1:9\"\n  raw_base: \"http://127.0.0.1:9\"\n  listing_timeout_ms: 500\n",
    )
    .expect("Writing temp config failed");
    config
}

#[test]
fn help_lists_all_subcommands() {
    let mut cmd = Command::cargo_bin("workflow-index").expect("Binary exists");
    cmd.arg("--help");
    cmd.assert().success().stdout(
        predicate::str::contains("serve")
            .and(predicate::str::contains("list"))
            .and(predicate::str::contains("structure"))
            .and(predicate::str::contains("show")),
    );
}

#[test]
#[serial]
fn missing_repository_is_reported() {
    let mut cmd = Command::cargo_bin("workflow-index").expect("Binary exists");
    cmd.arg("list")
        .env_remove("GITHUB_OWNER")
        .env_remove("GITHUB_REPO");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("No repository configured"));
}

#[test]
#[serial]
fn list_degrades_to_empty_listing_when_upstream_is_down() {
    let config = create_unreachable_config();
    let mut cmd = Command::cargo_bin("workflow-index").expect("Binary exists");
    cmd.arg("list").arg("--config").arg(config.path());
    cmd.assert().success().stdout(
        predicate::str::contains("\"workflows\": []")
            .and(predicate::str::contains("\"error\"")),
    );
}

#[test]
#[serial]
fn structure_fails_when_upstream_is_down() {
    let config = create_unreachable_config();
    let mut cmd = Command::cargo_bin("workflow-index").expect("Binary exists");
    cmd.arg("structure").arg("--config").arg(config.path());
    cmd.assert().failure();
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{:?}", event));
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use workflow_index::cli::{run, Cli, Commands};

    // The config path does not exist; run still emits the event before failing.
    let cli = Cli {
        config: Some(std::path::PathBuf::from("does-not-exist.yaml")),
        command: Commands::Structure,
    };

    let result = run(cli).await;
    assert!(result.is_err());

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
