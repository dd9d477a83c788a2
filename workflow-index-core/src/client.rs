//! `reqwest`-backed [`RemoteClient`] for the GitHub contents API and the
//! raw-content host.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::config::FetchConfig;
use crate::contract::{RemoteClient, RequestOptions};
use crate::error::IndexError;

/// Upstream bodies are truncated to this many bytes before being kept in errors.
const MAX_ERROR_BODY: usize = 512;

pub struct GithubClient {
    http: Client,
    headers: HeaderMap,
}

impl GithubClient {
    pub fn new(config: &FetchConfig) -> Result<Self, IndexError> {
        let headers = build_headers(&config.user_agent, config.token.as_deref())?;
        let http = Client::builder()
            .build()
            .map_err(|e| IndexError::Config(format!("failed to build HTTP client: {e}")))?;
        info!(
            user_agent = %config.user_agent,
            token_set = config.token.is_some(),
            "Initialized GitHub client"
        );
        Ok(GithubClient { http, headers })
    }
}

/// The identifying `User-Agent` is always sent; `Authorization` only with a token.
fn build_headers(user_agent: &str, token: Option<&str>) -> Result<HeaderMap, IndexError> {
    let mut headers = HeaderMap::new();
    let ua = HeaderValue::from_str(user_agent)
        .map_err(|e| IndexError::Config(format!("invalid user agent: {e}")))?;
    headers.insert(USER_AGENT, ua);
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/vnd.github+json"),
    );
    if let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| IndexError::Config(format!("invalid token: {e}")))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }
    Ok(headers)
}

fn truncate_body(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    body
}

#[async_trait]
impl RemoteClient for GithubClient {
    async fn get_json(&self, url: &str, options: RequestOptions) -> Result<Value, IndexError> {
        debug!(url, timeout_ms = options.timeout.as_millis() as u64, "GET upstream");
        let response = self
            .http
            .get(url)
            .headers(self.headers.clone())
            .timeout(options.timeout)
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, url, timed_out = e.is_timeout(), "Upstream request failed");
                IndexError::transport(url, e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<failed to decode response body>"));
            error!(status = %status, url, "Upstream returned error status");
            return Err(IndexError::UpstreamStatus {
                url: url.to_string(),
                status: status.as_u16(),
                body: truncate_body(body),
            });
        }

        response.json::<Value>().await.map_err(|e| {
            error!(error = ?e, url, "Failed to decode upstream JSON");
            IndexError::transport(url, e)
        })
    }
}
