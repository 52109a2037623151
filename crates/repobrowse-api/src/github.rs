use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, LINK, USER_AGENT};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::error::{FetchError, Result};
use crate::link::parse_next_link;

const GITHUB_API_BASE: &str = "https://api.github.com";
const GITHUB_API_VERSION: &str = "2022-11-28";

/// Connection settings for the GitHub REST API
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub api_version: String,
    pub token: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: GITHUB_API_BASE.to_string(),
            api_version: GITHUB_API_VERSION.to_string(),
            token: None,
        }
    }
}

/// One page of the public repository listing plus the cursor for the next one
#[derive(Debug, Clone)]
pub struct RepoPage {
    pub repos: Vec<GitHubRepo>,
    pub next: Option<String>,
}

pub struct GitHubClient {
    client: reqwest::Client,
    api_url: String,
}

impl GitHubClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("RepoBrowse/0.1.0"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_str(&config.api_version)
                .map_err(|e| FetchError::InvalidRequest(e.to_string()))?,
        );

        if let Some(token) = &config.token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| FetchError::InvalidRequest(e.to_string()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    /// List public repositories
    ///
    /// Without a cursor this hits `/repositories`. With one, the cursor is the
    /// absolute URL GitHub handed us in the previous `Link` header, so we
    /// follow it verbatim.
    pub async fn list_public_repositories(&self, cursor: Option<&str>) -> Result<RepoPage> {
        let url = match cursor {
            Some(next) => next.to_string(),
            None => format!("{}/repositories", self.api_url),
        };

        debug!("Fetching repository page {}", url);
        let (repos, headers) = self.get_json::<Vec<GitHubRepo>>(&url).await?;
        let next = parse_next_link(headers.get(LINK).and_then(|v| v.to_str().ok()));

        Ok(RepoPage { repos, next })
    }

    /// Get the full record for one repository, e.g. `mojombo/god`
    ///
    /// This is where the stars/language/forks fields live - the listing
    /// endpoint leaves them out.
    pub async fn get_repository(&self, full_name: &str) -> Result<GitHubRepo> {
        let url = format!("{}/repos/{}", self.api_url, full_name);
        debug!("Fetching repository detail {}", url);
        let (repo, _) = self.get_json::<GitHubRepo>(&url).await?;
        Ok(repo)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<(T, HeaderMap)> {
        let response = self.client.get(url).send().await?;

        if let Some(err) = FetchError::from_status(response.status()) {
            return Err(err);
        }

        let headers = response.headers().clone();
        let body = response.text().await?;
        let value = serde_json::from_str(&body)?;
        Ok((value, headers))
    }
}

/// Repository as GitHub serialises it
///
/// The listing endpoint omits the counters, so they are all optional here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubRepo {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub fork: bool,
    pub html_url: String,
    pub owner: GitHubOwner,
    #[serde(default)]
    pub stargazers_count: Option<u32>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub forks_count: Option<u32>,
    #[serde(default)]
    pub open_issues_count: Option<u32>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubOwner {
    pub login: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(rename = "type", default)]
    pub owner_type: Option<String>,
}
