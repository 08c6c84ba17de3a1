#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query},
    http::{HeaderMap, StatusCode as AxumStatus},
    routing::get,
    Json, Router,
};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::net::TcpListener;

use devconnect_api::auth::{PasswordHasher, TokenService};
use devconnect_api::config::{AppConfig, GithubConfig};
use devconnect_api::database::{MemoryStore, UNIQUE_FIELDS};
use devconnect_api::services::GithubClient;
use devconnect_api::{app, AppState};

pub const TEST_SECRET: &str = "integration-secret";
pub const PASSWORD: &str = "secret1";

/// The real router over a fresh in-memory store, served on an ephemeral
/// port inside the test's runtime. GitHub calls go to a local stub.
pub struct TestServer {
    pub base_url: String,
    pub tokens: TokenService,
    client: reqwest::Client,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        let github_url = spawn_github_stub().await?;

        let store = Arc::new(MemoryStore::with_constraints(UNIQUE_FIELDS));
        let tokens = TokenService::new(TEST_SECRET, chrono::Duration::hours(1))?;
        let github = GithubClient::new(&GithubConfig {
            api_url: github_url,
            token: None,
            timeout_secs: 5,
        })?;
        let state = AppState::from_parts(store, PasswordHasher::new(4), tokens.clone(), github);
        let router = app(state, &AppConfig::development().security);

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Ok(Self {
            base_url: format!("http://{}", addr),
            tokens,
            client: reqwest::Client::new(),
        })
    }

    /// Send a request and return the status with the parsed JSON body.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut request = self.client.request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.context("request failed")?;
        let status = response.status();
        let body = response.json::<Value>().await.context("response is not JSON")?;
        Ok((status, body))
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        self.send(Method::GET, path, token, None).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::POST, path, token, Some(body)).await
    }

    pub async fn put(&self, path: &str, token: &str, body: Option<Value>) -> Result<(StatusCode, Value)> {
        self.send(Method::PUT, path, Some(token), body).await
    }

    pub async fn delete(&self, path: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.send(Method::DELETE, path, Some(token), None).await
    }

    /// Register a user with [`PASSWORD`] and return the issued token.
    pub async fn register(&self, name: &str, email: &str) -> Result<String> {
        let (status, body) = self
            .post(
                "/api/users",
                None,
                json!({ "name": name, "email": email, "password": PASSWORD }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "register failed: {} {}", status, body);
        token_of(&body)
    }

    /// Id of the account behind `token`.
    pub async fn user_id(&self, token: &str) -> Result<String> {
        let (_, body) = self.get("/api/auth", Some(token)).await?;
        body["data"]["id"]
            .as_str()
            .map(str::to_string)
            .context("whoami returned no id")
    }

    pub async fn create_profile(&self, token: &str, skills: &str) -> Result<Value> {
        let (status, body) = self
            .post(
                "/api/profile",
                Some(token),
                json!({ "status": "Developer", "skills": skills }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "profile failed: {} {}", status, body);
        Ok(body["data"].clone())
    }

    pub async fn create_post(&self, token: &str, text: &str) -> Result<Value> {
        let (status, body) = self.post("/api/posts", Some(token), json!({ "text": text })).await?;
        anyhow::ensure!(status == StatusCode::OK, "post failed: {} {}", status, body);
        Ok(body["data"].clone())
    }
}

pub fn token_of(body: &Value) -> Result<String> {
    body["data"]["token"]
        .as_str()
        .map(str::to_string)
        .context("response carries no token")
}

/// Field names from a validation error body, in order.
pub fn error_fields(body: &Value) -> Vec<String> {
    body["errors"]
        .as_array()
        .map(|errors| {
            errors
                .iter()
                .filter_map(|e| e["field"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Minimal GitHub API: `octocat` has repos, `broken` fails, everyone else is unknown.
async fn spawn_github_stub() -> Result<String> {
    async fn repos(
        Path(username): Path<String>,
        Query(query): Query<HashMap<String, String>>,
        headers: HeaderMap,
    ) -> (AxumStatus, Json<Value>) {
        let expected_query = query.get("per_page").map(String::as_str) == Some("5")
            && query.get("sort").map(String::as_str) == Some("created")
            && query.get("direction").map(String::as_str) == Some("asc");
        if !expected_query || !headers.contains_key("user-agent") {
            return (AxumStatus::BAD_REQUEST, Json(json!({ "message": "bad request" })));
        }

        match username.as_str() {
            "octocat" => (
                AxumStatus::OK,
                Json(json!([
                    {
                        "name": "hello-world",
                        "html_url": "https://github.com/octocat/hello-world",
                        "description": "My first repository",
                        "stargazers_count": 42,
                        "watchers_count": 42,
                        "forks_count": 7,
                        "language": "Rust"
                    },
                    {
                        "name": "spoon-knife",
                        "html_url": "https://github.com/octocat/spoon-knife",
                        "description": null,
                        "stargazers_count": 1,
                        "watchers_count": 1,
                        "forks_count": 0,
                        "language": null
                    }
                ])),
            ),
            "broken" => (
                AxumStatus::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "boom" })),
            ),
            _ => (AxumStatus::NOT_FOUND, Json(json!({ "message": "Not Found" }))),
        }
    }

    let stub = Router::new().route("/users/:username/repos", get(repos));
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, stub).await;
    });
    Ok(format!("http://{}", addr))
}
