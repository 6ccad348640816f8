//! GitHub API interaction module
//!
//! Provides functions for querying GitHub releases and constructing API URLs.

use crate::error::InstallError;
use crate::types::Release;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, StatusCode};

/// Build GitHub API URL for fetching release information
///
/// # Arguments
/// * `api_url` - API root, e.g. "https://api.github.com"
/// * `repo` - Repository in format "owner/repo"
/// * `tag` - Optional release tag; `None`, "latest" and "default" mean latest
pub fn build_gh_release_url(api_url: &str, repo: &str, tag: Option<&str>) -> String {
    let api_url = api_url.trim_end_matches('/');
    match tag {
        Some(t) if t != "latest" && t != "default" => {
            format!("{}/repos/{}/releases/tags/{}", api_url, repo, t)
        }
        _ => format!("{}/repos/{}/releases/latest", api_url, repo),
    }
}

/// Build the HTTP client shared by the release query and the asset downloads.
///
/// The client accepts gzip-encoded responses and identifies itself with
/// `user_agent`, which the GitHub API requires.
pub fn build_client(user_agent: &str) -> Result<Client, InstallError> {
    Ok(Client::builder().user_agent(user_agent).gzip(true).build()?)
}

/// Fetch and decode the release descriptor at `url`.
pub async fn get_gh_release_info(client: &Client, url: &str) -> Result<Release, InstallError> {
    tracing::debug!("Fetching GitHub release info from: {}", url);

    let mut request = client
        .get(url)
        .header(ACCEPT, "application/vnd.github.v3+json");

    if let Ok(token) = std::env::var("GITHUB_TOKEN") {
        request = request.header(AUTHORIZATION, format!("token {}", token));
        tracing::debug!("Using GITHUB_TOKEN");
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        if status == StatusCode::NOT_FOUND {
            return Err(InstallError::ReleaseNotFound {
                url: url.to_string(),
            });
        }
        return Err(InstallError::RequestFailed {
            url: url.to_string(),
            status,
        });
    }

    let body = response.text().await?;
    let release: Release = serde_json::from_str(&body)?;
    tracing::debug!(
        "Release {} has {} asset(s)",
        release.tag_name.as_deref().unwrap_or("<untagged>"),
        release.assets.len()
    );
    Ok(release)
}
