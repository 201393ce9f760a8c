//! GitHub REST client for the kit repository.

use crate::error::{PmKitError, Result};
use crate::metadata::CLI_VERSION;
use crate::remote::{Release, RemoteEntry, RemoteRepository};
use base64::Engine;
use rand::Rng;
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, ACCEPT, RETRY_AFTER};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_REPOSITORY: &str = "kv0906/pm-kit";
pub const DEFAULT_BRANCH: &str = "main";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_PER_PAGE: usize = 100;

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Upper bound of the random delay added to each backoff.
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_jitter: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// No waiting between attempts.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
            max_jitter: Duration::ZERO,
        }
    }

    pub fn is_retryable_status(status: u16) -> bool {
        matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
    }

    /// Wait before retry number `attempt` (0-based). A 429 carrying
    /// `Retry-After` waits exactly that long.
    pub fn delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(wait) = retry_after {
            return wait;
        }
        let backoff = self.base_delay.saturating_mul(2u32.saturating_pow(attempt));
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..jitter_ms))
        };
        backoff + jitter
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct User {
    login: String,
}

#[derive(Deserialize)]
struct FileContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    download_url: Option<String>,
}

#[derive(Deserialize)]
struct ApiMessage {
    message: String,
}

/// Classifies a 404 for the endpoint being called.
#[derive(Debug, Clone, Copy)]
enum Missing<'a> {
    Repository,
    Version(&'a str),
    Path(&'a str),
}

impl Missing<'_> {
    fn error(self, repository: &str) -> PmKitError {
        match self {
            Missing::Repository => PmKitError::RepoNotFound(repository.to_string()),
            Missing::Version(tag) => PmKitError::RepoNotFound(format!("version not found: {tag}")),
            Missing::Path(path) => PmKitError::FileNotFound(path.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// GitHubClient
// ---------------------------------------------------------------------------

pub struct GitHubClient {
    http: Client,
    api_base: String,
    repository: String,
    token: Option<String>,
    retry: RetryPolicy,
}

impl GitHubClient {
    pub fn new(api_base: &str, repository: &str, token: Option<String>) -> Result<Self> {
        Self::with_timeout(api_base, repository, token, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(
        api_base: &str,
        repository: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        if repository.split('/').filter(|s| !s.is_empty()).count() != 2 {
            return Err(PmKitError::ValidationError(format!(
                "repository must be owner/name, got '{repository}'"
            )));
        }
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(format!("pm-kit-cli/{CLI_VERSION}"))
            .build()
            .map_err(|e| PmKitError::Network(e.to_string()))?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            repository: repository.to_string(),
            token,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }

    fn repo_url(&self, path: &str) -> String {
        self.url(&format!("repos/{}/{}", self.repository, path.trim_start_matches('/')))
    }

    /// GET `url` through the retry policy, mapping failures to `PmKitError`.
    fn get(&self, url: &str, query: &[(&str, &str)], missing: Missing<'_>) -> Result<Response> {
        let mut attempt = 0;
        loop {
            let mut req = self
                .http
                .get(url)
                .query(query)
                .header(ACCEPT, "application/vnd.github+json")
                .header("X-GitHub-Api-Version", "2022-11-28");
            if let Some(token) = &self.token {
                req = req.bearer_auth(token);
            }

            let (retry_after, failure) = match req.send() {
                Ok(resp) if resp.status().is_success() => return Ok(resp),
                Ok(resp) => {
                    let status = resp.status();
                    let retry_after = parse_retry_after(resp.headers());
                    if RetryPolicy::is_retryable_status(status.as_u16())
                        && attempt < self.retry.max_retries
                    {
                        (retry_after.filter(|_| status == StatusCode::TOO_MANY_REQUESTS), None)
                    } else {
                        (None, Some(self.status_error(resp, missing)))
                    }
                }
                Err(e) if (e.is_timeout() || e.is_connect()) && attempt < self.retry.max_retries => {
                    tracing::debug!(error = %e, "transport error");
                    (None, None)
                }
                Err(e) => (None, Some(PmKitError::Network(e.to_string()))),
            };
            if let Some(err) = failure {
                return Err(err);
            }

            let wait = self.retry.delay(attempt, retry_after);
            attempt += 1;
            tracing::debug!(
                attempt,
                max = self.retry.max_retries,
                wait_ms = wait.as_millis() as u64,
                url,
                "retrying GitHub request"
            );
            std::thread::sleep(wait);
        }
    }

    fn status_error(&self, resp: Response, missing: Missing<'_>) -> PmKitError {
        let status = resp.status();
        let rate_exhausted = resp
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == "0");
        let reset = resp
            .headers()
            .get("x-ratelimit-reset")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<i64>().ok())
            .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
            .map(|t| t.to_rfc3339());
        let message = resp
            .json::<ApiMessage>()
            .map(|m| m.message)
            .unwrap_or_else(|_| status.canonical_reason().unwrap_or("request failed").to_string());

        match status {
            StatusCode::NOT_FOUND => missing.error(&self.repository),
            StatusCode::UNAUTHORIZED => PmKitError::TokenInvalid,
            StatusCode::TOO_MANY_REQUESTS => PmKitError::RateLimited { reset },
            StatusCode::FORBIDDEN if rate_exhausted => PmKitError::RateLimited { reset },
            _ => PmKitError::Api {
                status: status.as_u16(),
                message,
            },
        }
    }

    fn contents(&self, path: &str, git_ref: &str) -> Result<serde_json::Value> {
        let url = self.repo_url(&format!("contents/{}", path.trim_start_matches('/')));
        self.get(&url, &[("ref", git_ref)], Missing::Path(path))?
            .json()
            .map_err(|e| PmKitError::Network(format!("invalid contents response for {path}: {e}")))
    }

    fn download_raw(&self, url: &str, path: &str) -> Result<Vec<u8>> {
        let resp = self.get(url, &[], Missing::Path(path))?;
        resp.bytes()
            .map(|b| b.to_vec())
            .map_err(|e| PmKitError::Network(e.to_string()))
    }
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn decode_base64(content: &str) -> Result<Vec<u8>> {
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| PmKitError::Network(format!("invalid base64 content: {e}")))
}

impl RemoteRepository for GitHubClient {
    fn repository(&self) -> &str {
        &self.repository
    }

    fn authenticate(&self) -> Result<String> {
        if self.token.is_none() {
            return Err(PmKitError::AuthFailed("no token configured".to_string()));
        }
        let user: User = self
            .get(&self.url("user"), &[], Missing::Repository)?
            .json()
            .map_err(|e| PmKitError::Network(e.to_string()))?;
        Ok(user.login)
    }

    fn latest_release(&self) -> Result<Release> {
        self.get(&self.repo_url("releases/latest"), &[], Missing::Repository)?
            .json()
            .map_err(|e| PmKitError::Network(e.to_string()))
    }

    fn release_by_tag(&self, tag: &str) -> Result<Release> {
        self.get(
            &self.repo_url(&format!("releases/tags/{tag}")),
            &[],
            Missing::Version(tag),
        )?
        .json()
        .map_err(|e| PmKitError::Network(e.to_string()))
    }

    fn list_releases(&self, limit: usize, include_all: bool) -> Result<Vec<Release>> {
        let per_page = limit.clamp(1, MAX_PER_PAGE).to_string();
        let releases: Vec<Release> = self
            .get(
                &self.repo_url("releases"),
                &[("per_page", per_page.as_str())],
                Missing::Repository,
            )?
            .json()
            .map_err(|e| PmKitError::Network(e.to_string()))?;
        Ok(releases
            .into_iter()
            .filter(|r| include_all || (!r.prerelease && !r.draft))
            .take(limit)
            .collect())
    }

    fn file_content(&self, path: &str, git_ref: &str) -> Result<Vec<u8>> {
        let value = self.contents(path, git_ref)?;
        if value.is_array() {
            return Err(PmKitError::Api {
                status: 200,
                message: format!("expected file but got directory: {path}"),
            });
        }
        let file: FileContent = serde_json::from_value(value)?;
        if file.kind != "file" {
            return Err(PmKitError::Api {
                status: 200,
                message: format!("expected file but got {}: {path}", file.kind),
            });
        }
        match (file.encoding.as_deref(), file.download_url) {
            // Files over 1 MB come back without inline content.
            (Some("none"), Some(url)) => self.download_raw(&url, path),
            _ => decode_base64(&file.content),
        }
    }

    fn list_directory(&self, path: &str, git_ref: &str) -> Result<Vec<RemoteEntry>> {
        let value = self.contents(path, git_ref)?;
        if !value.is_array() {
            return Err(PmKitError::Api {
                status: 200,
                message: format!("expected directory but got file: {path}"),
            });
        }
        Ok(serde_json::from_value(value)?)
    }
}
