//! GitHub REST API client.
//!
//! Covers the contents API (`/repos/{owner}/{repo}/contents/{path}`) and the
//! user repository endpoints (`/user/repos`).

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use url::Url;

use deckhand_core::GithubSettings;

use crate::error::{GithubError, Result};
use crate::host::{RemoteFile, RepoHost};

const USER_AGENT: &str = concat!("deckhand/", env!("CARGO_PKG_VERSION"));
const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";

/// Page size for repository listing (GitHub's maximum).
const REPOS_PER_PAGE: &str = "100";

/// GitHub REST client implementing [`RepoHost`].
#[derive(Clone)]
pub struct GithubClient {
    client: reqwest::Client,
    api_url: Url,
    committer: Committer,
}

#[derive(Debug, Clone, Serialize)]
struct Committer {
    name: String,
    email: String,
}

#[derive(Serialize)]
struct PutContentRequest<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    committer: &'a Committer,
}

#[derive(Serialize)]
struct DeleteContentRequest<'a> {
    message: &'a str,
    sha: &'a str,
    committer: &'a Committer,
}

#[derive(Serialize)]
struct CreateRepoRequest<'a> {
    name: &'a str,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    content: Option<String>,
    sha: String,
}

#[derive(Deserialize)]
struct PutContentResponse {
    content: BlobRef,
}

#[derive(Deserialize)]
struct BlobRef {
    sha: String,
}

#[derive(Deserialize)]
struct RepoResponse {
    full_name: String,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

impl GithubClient {
    /// Create a client for the configured API endpoint.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(settings: &GithubSettings, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            api_url: settings.api_url.clone(),
            committer: Committer {
                name: settings.committer_name.clone(),
                email: settings.committer_email.clone(),
            },
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| GithubError::InvalidInput(format!("not a base URL: {}", self.api_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn contents_url(&self, repo: &str, path: &str) -> Result<Url> {
        let (owner, name) = split_repo(repo)?;
        let path_segments = split_path(path)?;
        let mut segments = vec!["repos", owner, name, "contents"];
        segments.extend(path_segments);
        self.endpoint(&segments)
    }

    fn request(&self, method: Method, url: Url, token: &str) -> RequestBuilder {
        trace!(method = %method, url = %url, "GitHub request");
        self.client
            .request(method, url)
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .header("X-GitHub-Api-Version", API_VERSION)
    }
}

#[async_trait]
impl RepoHost for GithubClient {
    async fn get_file(&self, token: &str, repo: &str, path: &str) -> Result<RemoteFile> {
        let url = self.contents_url(repo, path)?;
        let response = check(self.request(Method::GET, url, token).send().await?, || {
            format!("{} in {}", path, repo)
        })
        .await?;

        let body: ContentResponse = decode(response).await?;
        let encoded = body
            .content
            .ok_or_else(|| GithubError::Decode(format!("{} is not a file", path)))?;
        // GitHub wraps the base64 payload at 60 columns
        let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
        let content = STANDARD
            .decode(compact)
            .map_err(|e| GithubError::Decode(format!("invalid base64 content: {}", e)))?;

        debug!(repo = %repo, path = %path, bytes = content.len(), "file fetched");
        Ok(RemoteFile {
            content,
            sha: body.sha,
        })
    }

    async fn put_file(
        &self,
        token: &str,
        repo: &str,
        path: &str,
        content: &[u8],
        message: &str,
        sha: Option<&str>,
    ) -> Result<String> {
        let url = self.contents_url(repo, path)?;
        let body = PutContentRequest {
            message,
            content: STANDARD.encode(content),
            sha,
            committer: &self.committer,
        };
        let response = check(
            self.request(Method::PUT, url, token).json(&body).send().await?,
            || format!("{} in {}", path, repo),
        )
        .await?;

        let body: PutContentResponse = decode(response).await?;
        debug!(repo = %repo, path = %path, sha = %body.content.sha, "file written");
        Ok(body.content.sha)
    }

    async fn delete_file(
        &self,
        token: &str,
        repo: &str,
        path: &str,
        sha: &str,
        message: &str,
    ) -> Result<()> {
        let url = self.contents_url(repo, path)?;
        let body = DeleteContentRequest {
            message,
            sha,
            committer: &self.committer,
        };
        check(
            self.request(Method::DELETE, url, token).json(&body).send().await?,
            || format!("{} in {}", path, repo),
        )
        .await?;
        debug!(repo = %repo, path = %path, "file deleted");
        Ok(())
    }

    async fn list_repositories(&self, token: &str) -> Result<Vec<String>> {
        let mut url = self.endpoint(&["user", "repos"])?;
        url.query_pairs_mut().append_pair("per_page", REPOS_PER_PAGE);
        let response = check(self.request(Method::GET, url, token).send().await?, || {
            "repositories".to_string()
        })
        .await?;

        let repos: Vec<RepoResponse> = decode(response).await?;
        Ok(repos.into_iter().map(|r| r.full_name).collect())
    }

    async fn create_repository(&self, token: &str, name: &str) -> Result<String> {
        let name = name.trim();
        if name.is_empty() || name.contains('/') {
            return Err(GithubError::InvalidInput(format!(
                "not a repository name: {:?}",
                name
            )));
        }
        let url = self.endpoint(&["user", "repos"])?;
        let response = check(
            self.request(Method::POST, url, token)
                .json(&CreateRepoRequest { name })
                .send()
                .await?,
            || "user".to_string(),
        )
        .await?;

        let repo: RepoResponse = decode(response).await?;
        debug!(repo = %repo.full_name, "repository created");
        Ok(repo.full_name)
    }
}

/// Map a non-2xx response to a [`GithubError`].
///
/// `what` describes the resource for 404 replies.
async fn check(response: Response, what: impl FnOnce() -> String) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&text)
        .map(|b| b.message)
        .unwrap_or_else(|_| text.trim().to_string());
    debug!(status = status.as_u16(), message = %message, "GitHub API error");

    Err(match status {
        StatusCode::UNAUTHORIZED => GithubError::Unauthorized(message),
        StatusCode::FORBIDDEN if message.eq_ignore_ascii_case("bad credentials") => {
            GithubError::Unauthorized(message)
        }
        StatusCode::NOT_FOUND => GithubError::NotFound(what()),
        _ => GithubError::Api {
            status: status.as_u16(),
            message,
        },
    })
}

async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
    response
        .json()
        .await
        .map_err(|e| GithubError::Decode(e.to_string()))
}

fn split_repo(repo: &str) -> Result<(&str, &str)> {
    match repo.trim().split_once('/') {
        Some((owner, name))
            if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
        {
            Ok((owner, name))
        }
        _ => Err(GithubError::InvalidInput(format!(
            "repository must be owner/name, got {:?}",
            repo
        ))),
    }
}

fn split_path(path: &str) -> Result<Vec<&str>> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() || segments.iter().any(|s| *s == "." || *s == "..") {
        return Err(GithubError::InvalidInput(format!("invalid file path: {:?}", path)));
    }
    Ok(segments)
}
