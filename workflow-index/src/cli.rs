/// # workflow-index CLI
///
/// Command parsing and dispatch. `serve` runs the HTTP API; `list`, `structure`
/// and `show` run one index query and print the result as JSON on stdout,
/// which makes them handy for checking a repository before deploying.
///
/// All pipeline logic lives in `workflow-index-core`; this module only loads
/// configuration and wires the index together.
use crate::load_config::{load_config, AppConfig};
use crate::server;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use workflow_index_core::WorkflowIndex;

/// CLI for workflow-index: browse JSON workflow files hosted in a GitHub repository.
#[derive(Parser)]
#[clap(
    name = "workflow-index",
    version,
    about = "Serve a cached, searchable index of workflow files from a GitHub repository"
)]
pub struct Cli {
    /// Path to the YAML config file
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API
    Serve {
        /// Override the configured listen host
        #[clap(long)]
        host: Option<String>,
        /// Override the configured listen port
        #[clap(long)]
        port: Option<u16>,
    },
    /// Print the workflow listing, optionally filtered
    List {
        /// Case-insensitive substring matched against name, description and category
        #[clap(long, short)]
        query: Option<String>,
    },
    /// Explore the repository and print per-folder counts
    Structure,
    /// Print one workflow with its full content
    Show {
        /// Exact filename, e.g. `slack_notify.json`
        filename: String,
    },
}

fn build_index(config: AppConfig) -> Result<WorkflowIndex> {
    WorkflowIndex::from_config(config.index).context("Failed to build workflow index")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to render JSON output")?;
    println!("{rendered}");
    Ok(())
}

/// Async entrypoint shared by `main` and the integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            tracing::info!(command = "serve", "Starting HTTP server");
            server::serve(config).await
        }
        Commands::List { query } => {
            tracing::info!(command = "list", query = ?query, "Listing workflows");
            let index = build_index(config)?;
            let listing = index.list_workflows(query.as_deref()).await?;
            if let Some(error) = &listing.error {
                tracing::warn!(command = "list", error = %error, "Listing degraded");
            }
            print_json(&listing)
        }
        Commands::Structure => {
            tracing::info!(command = "structure", "Exploring repository");
            let report = build_index(config)?.get_structure_report().await?;
            print_json(&report)
        }
        Commands::Show { filename } => {
            tracing::info!(command = "show", filename = %filename, "Fetching workflow");
            let workflow = build_index(config)?.get_workflow(&filename).await?;
            print_json(&workflow)
        }
    }
}
