use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::config::GithubConfig;

const USER_AGENT: &str = "devconnect-api";
const REPO_LIMIT: &str = "5";

#[derive(Debug, Error)]
pub enum GithubError {
    #[error("Invalid GitHub username")]
    InvalidUsername,

    #[error("No GitHub profile found")]
    NotFound,

    #[error("GitHub responded with {0}")]
    Upstream(StatusCode),

    #[error("Invalid GitHub API url: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),

    #[error("GitHub request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// The subset of GitHub's repository object that profile pages show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GithubRepo {
    pub name: String,
    pub html_url: String,
    pub description: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub watchers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    pub language: Option<String>,
}

/// Read-only client for the public GitHub REST API.
#[derive(Clone)]
pub struct GithubClient {
    http: Client,
    base: Url,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(config: &GithubConfig) -> Result<Self, GithubError> {
        let mut base = config.api_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            base: Url::parse(&base)?,
            token: config.token.clone().filter(|t| !t.is_empty()),
        })
    }

    /// The user's five oldest public repositories.
    pub async fn repos(&self, username: &str) -> Result<Vec<GithubRepo>, GithubError> {
        let username = username.trim();
        if !is_valid_username(username) {
            return Err(GithubError::InvalidUsername);
        }

        let mut url = self.base.join(&format!("users/{}/repos", username))?;
        url.query_pairs_mut()
            .append_pair("per_page", REPO_LIMIT)
            .append_pair("sort", "created")
            .append_pair("direction", "asc");

        let mut request = self
            .http
            .get(url)
            .header(header::ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(GithubError::NotFound),
            status if !status.is_success() => {
                warn!("GitHub repo lookup for {} returned {}", username, status);
                Err(GithubError::Upstream(status))
            }
            _ => {
                let repos: Vec<GithubRepo> = response.json().await?;
                debug!("Fetched {} repos for {}", repos.len(), username);
                Ok(repos)
            }
        }
    }
}

/// GitHub logins: 1 to 39 alphanumerics or single inner hyphens.
pub fn is_valid_username(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 39
        && !name.starts_with('-')
        && !name.ends_with('-')
        && !name.contains("--")
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}
