mod common;

use anyhow::Result;
use reqwest::StatusCode;

use common::TestServer;

#[tokio::test]
async fn lists_repositories_from_github() -> Result<()> {
    let server = TestServer::start().await?;

    let (status, body) = server.get("/api/profile/github/octocat", None).await?;
    assert_eq!(status, StatusCode::OK);

    let repos = body["data"].as_array().unwrap();
    assert_eq!(repos.len(), 2);
    assert_eq!(repos[0]["name"], "hello-world");
    assert_eq!(repos[0]["stargazers_count"], 42);
    assert!(repos[1]["language"].is_null());
    Ok(())
}

#[tokio::test]
async fn unknown_github_user_is_not_found() -> Result<()> {
    let server = TestServer::start().await?;

    let (status, body) = server.get("/api/profile/github/ghost", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No GitHub profile found");

    let (status, _) = server.get("/api/profile/github/bad--name", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn upstream_failure_is_bad_gateway() -> Result<()> {
    let server = TestServer::start().await?;

    let (status, body) = server.get("/api/profile/github/broken", None).await?;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);
    Ok(())
}
