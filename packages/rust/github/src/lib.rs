//! GitHub REST adapter: repository search and contributor listing.
//!
//! Both calls are single-shot. A non-2xx answer becomes
//! [`EcoscoutError::GithubApi`] carrying the status and raw body; deciding
//! whether that aborts anything is the caller's business.

mod wire;

use std::time::Duration;

use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use tracing::{debug, info, instrument};
use url::Url;

use ecoscout_shared::{
    AppConfig, Contributor, EcoscoutError, RepositorySummary, Result, Topic, github_token,
};

use wire::{ContributorItem, SearchResponse};

/// Default timeout in seconds for GitHub requests.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// User-Agent string; GitHub rejects requests without one.
const USER_AGENT: &str = concat!("ecoscout/", env!("CARGO_PKG_VERSION"));

/// Media type GitHub recommends for REST v3.
const GITHUB_JSON: &str = "application/vnd.github+json";

/// Pinned REST API version.
const API_VERSION: &str = "2022-11-28";

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Connection settings for [`GithubClient`].
#[derive(Clone)]
pub struct GithubOptions {
    /// REST API root (`https://api.github.com` in production).
    pub api_base_url: Url,
    /// Personal access token for elevated rate limits.
    pub token: Option<String>,
    /// Timeout for each HTTP request in seconds.
    pub timeout_secs: u64,
}

impl GithubOptions {
    /// Anonymous access against the given API root.
    pub fn new(api_base_url: Url) -> Self {
        Self {
            api_base_url,
            token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Build options from the loaded config, reading the token from its env var.
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            api_base_url: config.github.api_base_url.clone(),
            token: github_token(config),
            timeout_secs: config.github.timeout_secs,
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Thin GitHub REST client. Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct GithubClient {
    client: Client,
    base: String,
}

impl GithubClient {
    /// Build a client with the GitHub headers and per-request timeout applied.
    pub fn new(opts: &GithubOptions) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_JSON));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));

        if let Some(token) = &opts.token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| EcoscoutError::config(format!("invalid GitHub token: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(opts.timeout_secs))
            .build()
            .map_err(|e| EcoscoutError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base: opts.api_base_url.as_str().trim_end_matches('/').to_string(),
        })
    }

    /// Search repositories whose name or description matches `topic`,
    /// most-starred first, keeping at most `max_results`.
    ///
    /// An empty vector means the search succeeded and matched nothing.
    #[instrument(skip_all, fields(topic = %topic, max_results = max_results))]
    pub async fn search_repositories(
        &self,
        topic: &Topic,
        max_results: u32,
    ) -> Result<Vec<RepositorySummary>> {
        let url = format!("{}/search/repositories", self.base);
        let query = format!("{topic} in:name,description");
        let per_page = max_results.to_string();

        debug!(%url, %query, "searching repositories");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", query.as_str()),
                ("sort", "stars"),
                ("order", "desc"),
                ("per_page", per_page.as_str()),
            ])
            .send()
            .await
            .map_err(|e| EcoscoutError::Network(format!("GitHub API request failed: {e}")))?;

        let body = read_success_body(response).await?;
        let parsed: SearchResponse = serde_json::from_str(&body)
            .map_err(|e| EcoscoutError::decode(format!("search response: {e}")))?;

        let repositories: Vec<RepositorySummary> = parsed
            .items
            .into_iter()
            .take(max_results as usize)
            .map(RepositorySummary::from)
            .collect();

        info!(count = repositories.len(), "repository search complete");
        Ok(repositories)
    }

    /// Fetch the top `max_contributors` contributors of `full_name` (`owner/name`),
    /// in the order GitHub ranks them.
    #[instrument(skip(self))]
    pub async fn top_contributors(
        &self,
        full_name: &str,
        max_contributors: u32,
    ) -> Result<Vec<Contributor>> {
        let url = format!("{}/repos/{full_name}/contributors", self.base);
        let per_page = max_contributors.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[("per_page", per_page.as_str())])
            .send()
            .await
            .map_err(|e| EcoscoutError::Network(format!("{full_name}: {e}")))?;

        // Empty repositories answer 204 with no body.
        if response.status() == reqwest::StatusCode::NO_CONTENT {
            debug!("repository has no contributors");
            return Ok(Vec::new());
        }

        let body = read_success_body(response).await?;
        let items: Vec<ContributorItem> = serde_json::from_str(&body)
            .map_err(|e| EcoscoutError::decode(format!("{full_name} contributors: {e}")))?;

        Ok(items
            .into_iter()
            .take(max_contributors as usize)
            .map(Contributor::from)
            .collect())
    }
}

/// Return the body of a 2xx response, or a [`EcoscoutError::GithubApi`] otherwise.
async fn read_success_body(response: reqwest::Response) -> Result<String> {
    let status = response.status();
    let url = response.url().to_string();

    let body = response
        .text()
        .await
        .map_err(|e| EcoscoutError::Network(format!("{url}: failed to read body: {e}")))?;

    if !status.is_success() {
        return Err(EcoscoutError::GithubApi {
            status: status.as_u16(),
            body,
        });
    }

    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("../../../fixtures/github/{name}")).expect("read fixture")
    }

    fn client_for(server: &MockServer, token: Option<&str>) -> GithubClient {
        let mut opts = GithubOptions::new(Url::parse(&server.uri()).unwrap());
        opts.token = token.map(String::from);
        GithubClient::new(&opts).unwrap()
    }

    #[tokio::test]
    async fn search_sends_scoped_query_sorted_by_stars() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search/repositories"))
            .and(query_param("q", "vector database in:name,description"))
            .and(query_param("sort", "stars"))
            .and(query_param("order", "desc"))
            .and(query_param("per_page", "5"))
            .and(header("accept", GITHUB_JSON))
            .respond_with(ResponseTemplate::new(200).set_body_string(fixture("search-two-repos.json")))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let topic = Topic::new("vector database").unwrap();
        let repos = client.search_repositories(&topic, 5).await.unwrap();

        assert_eq!(repos.len(), 2);
        assert_eq!(repos[0].full_name, "qdrant/qdrant");
        assert_eq!(repos[0].stars, 24000);
        assert_eq!(repos[0].language.as_deref(), Some("Rust"));
        assert_eq!(repos[1].full_name, "milvus-io/milvus");
    }

    #[tokio::test]
    async fn search_sends_bearer_token_when_configured() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search/repositories"))
            .and(header("authorization", "Bearer t0ken"))
            .respond_with(ResponseTemplate::new(200).set_body_string(fixture("search-empty.json")))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("t0ken"));
        let topic = Topic::new("anything").unwrap();
        let repos = client.search_repositories(&topic, 5).await.unwrap();
        assert!(repos.is_empty());
    }

    #[tokio::test]
    async fn search_truncates_to_max_results() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search/repositories"))
            .respond_with(ResponseTemplate::new(200).set_body_string(fixture("search-two-repos.json")))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let topic = Topic::new("vector").unwrap();
        let repos = client.search_repositories(&topic, 1).await.unwrap();
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].full_name, "qdrant/qdrant");
    }

    #[tokio::test]
    async fn search_non_success_carries_status_and_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search/repositories"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let topic = Topic::new("vector").unwrap();
        let err = client.search_repositories(&topic, 5).await.unwrap_err();

        match &err {
            EcoscoutError::GithubApi { status, body } => {
                assert_eq!(*status, 500);
                assert_eq!(body, "upstream exploded");
            }
            other => panic!("expected GithubApi, got {other:?}"),
        }
        assert!(err.to_string().starts_with("GitHub API error: 500"));
    }

    #[tokio::test]
    async fn search_malformed_body_is_decode_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search/repositories"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let topic = Topic::new("vector").unwrap();
        let err = client.search_repositories(&topic, 5).await.unwrap_err();
        assert!(matches!(err, EcoscoutError::Decode { .. }));
    }

    #[tokio::test]
    async fn contributors_are_capped_and_ordered() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/repos/qdrant/qdrant/contributors"))
            .and(query_param("per_page", "2"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(fixture("contributors-qdrant.json")),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let contributors = client.top_contributors("qdrant/qdrant", 2).await.unwrap();

        let names: Vec<&str> = contributors.iter().map(|c| c.username.as_str()).collect();
        assert_eq!(names, ["generall", "timvisee"]);
        assert_eq!(contributors[0].contributions, 1500);
    }

    #[tokio::test]
    async fn contributors_forbidden_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/repos/acme/private/contributors"))
            .respond_with(ResponseTemplate::new(403).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let err = client.top_contributors("acme/private", 3).await.unwrap_err();
        assert!(matches!(err, EcoscoutError::GithubApi { status: 403, .. }));
    }

    #[tokio::test]
    async fn contributors_no_content_is_empty() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/repos/acme/empty/contributors"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let contributors = client.top_contributors("acme/empty", 3).await.unwrap();
        assert!(contributors.is_empty());
    }

    #[test]
    fn options_from_default_config() {
        let opts = GithubOptions::from_config(&AppConfig::default());
        assert_eq!(opts.api_base_url.as_str(), "https://api.github.com/");
        assert_eq!(opts.timeout_secs, 10);
    }

    #[test]
    fn trailing_slash_is_trimmed_from_base() {
        let opts = GithubOptions::new(Url::parse("https://ghe.example.com/api/v3/").unwrap());
        let client = GithubClient::new(&opts).unwrap();
        assert_eq!(client.base, "https://ghe.example.com/api/v3");
    }
}
