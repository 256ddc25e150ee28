// GitHub API HTTP client for the repository issues listing.
// One bounded GET per call; retry policy belongs to the cache.

use color_eyre::{eyre::eyre, Result};
use reqwest::{
  header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT},
  Client,
};
use std::future::Future;
use tracing::{debug, warn};
use url::Url;

use crate::config::GitHubConfig;

use super::api_types::RawIssue;
use super::error::UpstreamError;

const GITHUB_API_VERSION: &str = "2022-11-28";

/// Listing parameters: newest open issues first.
///
/// `pulls=false` is not honored by GitHub; pull requests are filtered
/// again after the response arrives.
const LISTING_QUERY: [(&str, &str); 5] = [
  ("state", "open"),
  ("sort", "created"),
  ("direction", "desc"),
  ("per_page", "15"),
  ("pulls", "false"),
];

/// Longest upstream error body kept in an error message
const MAX_ERROR_BODY: usize = 200;

/// Anything that can produce the raw issues listing.
pub trait IssueSource: Send + Sync {
  fn fetch_raw_issues(&self) -> impl Future<Output = Result<Vec<RawIssue>, UpstreamError>> + Send;
}

/// GitHub REST client bound to one repository's issues listing.
#[derive(Clone)]
pub struct GitHubClient {
  client: Client,
  issues_url: Url,
}

impl GitHubClient {
  pub fn new(config: &GitHubConfig, token: Option<&str>) -> Result<Self> {
    let mut headers = HeaderMap::new();

    headers.insert(
      ACCEPT,
      HeaderValue::from_static("application/vnd.github+json"),
    );
    headers.insert(
      "X-GitHub-Api-Version",
      HeaderValue::from_static(GITHUB_API_VERSION),
    );
    headers.insert(
      USER_AGENT,
      HeaderValue::from_str(&config.user_agent)
        .map_err(|e| eyre!("Invalid user agent {:?}: {}", config.user_agent, e))?,
    );
    if let Some(token) = token {
      let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|e| eyre!("Invalid GitHub token: {}", e))?;
      value.set_sensitive(true);
      headers.insert(AUTHORIZATION, value);
    }

    let client = Client::builder()
      .default_headers(headers)
      .timeout(config.timeout())
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      client,
      issues_url: issues_url(config)?,
    })
  }

  pub fn issues_url(&self) -> &Url {
    &self.issues_url
  }
}

/// Build `{api_url}/repos/{owner}/{repo}/issues`, tolerating a trailing
/// slash on the base URL.
fn issues_url(config: &GitHubConfig) -> Result<Url> {
  let mut url = Url::parse(&config.api_url)
    .map_err(|e| eyre!("Invalid GitHub API URL {:?}: {}", config.api_url, e))?;

  url
    .path_segments_mut()
    .map_err(|_| eyre!("GitHub API URL cannot be a base: {}", config.api_url))?
    .pop_if_empty()
    .extend(["repos", config.owner.as_str(), config.repo.as_str(), "issues"]);

  Ok(url)
}

impl IssueSource for GitHubClient {
  async fn fetch_raw_issues(&self) -> Result<Vec<RawIssue>, UpstreamError> {
    debug!(url = %self.issues_url, "Requesting issues from GitHub");

    let response = self
      .client
      .get(self.issues_url.clone())
      .query(&LISTING_QUERY[..])
      .send()
      .await?;

    let status = response.status();
    if !status.is_success() {
      let mut body = response.text().await.unwrap_or_default();
      body.truncate(
        body
          .char_indices()
          .nth(MAX_ERROR_BODY)
          .map_or(body.len(), |(i, _)| i),
      );
      warn!(%status, "GitHub returned non-success status");
      return Err(UpstreamError::Status { status, body });
    }

    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use reqwest::StatusCode;
  use wiremock::matchers::{header, method, path, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  const ISSUES_PATH: &str = "/repos/canonical/open-documentation-academy/issues";

  fn config_for(server: &MockServer) -> GitHubConfig {
    GitHubConfig {
      api_url: server.uri(),
      ..GitHubConfig::default()
    }
  }

  #[test]
  fn test_issues_url_with_and_without_trailing_slash() {
    let mut config = GitHubConfig::default();
    let client = GitHubClient::new(&config, None).unwrap();
    assert_eq!(
      client.issues_url().as_str(),
      "https://api.github.com/repos/canonical/open-documentation-academy/issues"
    );

    config.api_url = "https://github.example.com/api/v3/".to_string();
    let client = GitHubClient::new(&config, None).unwrap();
    assert_eq!(
      client.issues_url().as_str(),
      "https://github.example.com/api/v3/repos/canonical/open-documentation-academy/issues"
    );
  }

  #[test]
  fn test_invalid_api_url_rejected() {
    let config = GitHubConfig {
      api_url: "not a url".to_string(),
      ..GitHubConfig::default()
    };
    assert!(GitHubClient::new(&config, None).is_err());
  }

  #[tokio::test]
  async fn test_fetch_sends_listing_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path(ISSUES_PATH))
      .and(query_param("state", "open"))
      .and(query_param("sort", "created"))
      .and(query_param("direction", "desc"))
      .and(query_param("per_page", "15"))
      .and(query_param("pulls", "false"))
      .and(header("accept", "application/vnd.github+json"))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
        { "number": 2, "pull_request": {} },
        { "number": 1 }
      ])))
      .expect(1)
      .mount(&server)
      .await;

    let client = GitHubClient::new(&config_for(&server), None).unwrap();
    let raw = client.fetch_raw_issues().await.unwrap();

    assert_eq!(raw.len(), 2);
    assert!(raw[0].contains_key("pull_request"));
    assert_eq!(raw[1]["number"], 1);
  }

  #[tokio::test]
  async fn test_token_sent_as_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path(ISSUES_PATH))
      .and(header("authorization", "Bearer secret"))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
      .expect(1)
      .mount(&server)
      .await;

    let client = GitHubClient::new(&config_for(&server), Some("secret")).unwrap();
    assert!(client.fetch_raw_issues().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_non_success_status_is_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path(ISSUES_PATH))
      .respond_with(ResponseTemplate::new(403).set_body_string("API rate limit exceeded"))
      .mount(&server)
      .await;

    let client = GitHubClient::new(&config_for(&server), None).unwrap();
    match client.fetch_raw_issues().await {
      Err(UpstreamError::Status { status, body }) => {
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body, "API rate limit exceeded");
      }
      other => panic!("expected status error, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn test_non_array_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path(ISSUES_PATH))
      .respond_with(
        ResponseTemplate::new(200).set_body_json(serde_json::json!({ "message": "Not Found" })),
      )
      .mount(&server)
      .await;

    let client = GitHubClient::new(&config_for(&server), None).unwrap();
    let err = client.fetch_raw_issues().await.unwrap_err();
    assert!(matches!(err, UpstreamError::Malformed(_)));
  }

  #[tokio::test]
  async fn test_slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path(ISSUES_PATH))
      .respond_with(
        ResponseTemplate::new(200)
          .set_body_json(serde_json::json!([]))
          .set_delay(std::time::Duration::from_secs(3)),
      )
      .mount(&server)
      .await;

    let config = GitHubConfig {
      timeout_secs: 1,
      ..config_for(&server)
    };
    let client = GitHubClient::new(&config, None).unwrap();
    match client.fetch_raw_issues().await {
      Err(UpstreamError::Transport(e)) => assert!(e.is_timeout()),
      other => panic!("expected timeout, got {other:?}"),
    }
  }
}
