/// `load_config` module: reads the YAML service config and layers environment overrides on top.
///
/// The file is optional. Without one, the repository comes from `GITHUB_OWNER` and
/// `GITHUB_REPO` and every other section takes its defaults.
///
/// # Environment
/// - `GITHUB_TOKEN`: bearer credential for upstream requests, never read from the file
/// - `GITHUB_OWNER`, `GITHUB_REPO`, `GITHUB_BRANCH`: repository coordinates when the file has none
/// - `PORT`, `APP_ENV`: override `server.port` and `server.environment`
///
/// # Errors
/// All errors are `anyhow::Error` with the offending path or variable in the message.
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use workflow_index_core::config::{
    CacheConfig, FetchConfig, IndexConfig, NamingConfig, RepositoryConfig,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory of static UI assets served for non-API paths.
    #[serde(default)]
    pub public_dir: Option<PathBuf>,
    #[serde(default = "default_environment")]
    pub environment: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: default_host(),
            port: default_port(),
            public_dir: None,
            environment: default_environment(),
        }
    }
}

impl ServerConfig {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_environment() -> String {
    "development".to_string()
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub index: IndexConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    repository: Option<RepositoryConfig>,
    #[serde(default)]
    cache: CacheConfig,
    #[serde(default)]
    fetch: FetchConfig,
    #[serde(default)]
    naming: NamingConfig,
    #[serde(default)]
    server: ServerConfig,
}

fn read_file(path: &Path) -> Result<RawConfig> {
    info!(config_path = ?path, "Loading configuration from file");

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path, "Failed to read config file");
            return Err(anyhow!("Failed to read config file {:?}: {}", path, e));
        }
    };

    match serde_yaml::from_str::<RawConfig>(&content) {
        Ok(raw) => {
            info!(config_path = ?path, "Parsed config YAML successfully");
            Ok(raw)
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path, "Failed to parse config YAML");
            Err(anyhow!("Failed to parse config YAML: {e}"))
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn repository_from_env() -> Result<RepositoryConfig> {
    let owner = non_empty_var("GITHUB_OWNER");
    let repo = non_empty_var("GITHUB_REPO");
    match (owner, repo) {
        (Some(owner), Some(repo)) => {
            let mut repository = RepositoryConfig::new(owner, repo);
            if let Some(branch) = non_empty_var("GITHUB_BRANCH") {
                repository.branch = branch;
            }
            Ok(repository)
        }
        _ => Err(anyhow!(
            "No repository configured: set a `repository` section or GITHUB_OWNER and GITHUB_REPO"
        )),
    }
}

/// Loads the config file when given, then applies environment overrides.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let raw = match path {
        Some(path) => read_file(path)?,
        None => {
            info!("No config file given, using defaults and environment");
            RawConfig::default()
        }
    };

    let repository = match raw.repository {
        Some(repository) => repository,
        None => repository_from_env()?,
    };

    let mut index = IndexConfig {
        repository,
        cache: raw.cache,
        fetch: raw.fetch,
        naming: raw.naming,
    };
    index.fetch.token = non_empty_var("GITHUB_TOKEN");
    if index.fetch.token.is_none() {
        warn!("GITHUB_TOKEN not set, upstream requests are unauthenticated and rate limited");
    }

    let mut server = raw.server;
    if let Some(port) = non_empty_var("PORT") {
        server.port = port
            .parse()
            .with_context(|| format!("PORT must be a valid port number, got {port:?}"))?;
    }
    if let Some(environment) = non_empty_var("APP_ENV") {
        server.environment = environment;
    }

    info!(
        repository = %index.repository.full_name(),
        port = server.port,
        environment = %server.environment,
        "Configuration loaded"
    );
    Ok(AppConfig { index, server })
}
