use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

pub const GITHUB_API_BASE: &str = "https://api.github.com";
pub const PER_PAGE: u32 = 100;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("no GitHub username configured")]
    MissingIdentity,
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out after {}", timeout_text(.0))]
    Timeout(Duration),
    #[error("Failed to fetch repositories (HTTP {status})")]
    Rejected { status: u16 },
    #[error("Failed to fetch repositories (GitHub rate limit exceeded)")]
    RateLimited,
    #[error("could not decode repository list: {0}")]
    Decode(String),
}

fn timeout_text(timeout: &Duration) -> String {
    humantime::format_duration(*timeout).to_string()
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub user_agent: String,
    pub base_url: String,
    pub timeout: Duration,
    pub http_client: Option<HttpClient>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("repofolio/{}", crate::VERSION),
            base_url: GITHUB_API_BASE.to_string(),
            timeout: DEFAULT_TIMEOUT,
            http_client: None,
        }
    }
}

/// One public repository as returned by `GET /users/{user}/repos`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryItem {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub html_url: String,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    pub stargazers_count: u32,
    pub forks_count: u32,
    #[serde(default)]
    pub topics: Vec<String>,
    pub updated_at: DateTime<Utc>,
    pub fork: bool,
}

pub struct Client {
    http: HttpClient,
    user_agent: String,
    base_url: Url,
    timeout: Duration,
}

impl Client {
    pub fn new(config: ClientConfig) -> anyhow::Result<Self> {
        if config.user_agent.trim().is_empty() {
            anyhow::bail!("github client user agent required");
        }

        let mut base_url = Url::parse(config.base_url.trim())
            .map_err(|err| anyhow::anyhow!("invalid GitHub API base {:?}: {err}", config.base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("GitHub API base {:?} cannot carry a path", config.base_url);
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder().timeout(config.timeout).build()?,
        };

        Ok(Client {
            http,
            user_agent: config.user_agent,
            base_url,
            timeout: config.timeout,
        })
    }

    /// Endpoint for a user's repositories, most recently updated first.
    pub fn user_repos_url(&self, identity: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["users", identity, "repos"]);
        }
        url.query_pairs_mut()
            .append_pair("sort", "updated")
            .append_pair("per_page", &PER_PAGE.to_string());
        url
    }

    pub fn list_user_repos(&self, identity: &str) -> Result<Vec<RepositoryItem>, FetchError> {
        let identity = identity.trim();
        if identity.is_empty() {
            return Err(FetchError::MissingIdentity);
        }

        let url = self.user_repos_url(identity);
        let response = self
            .http
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "application/vnd.github+json")
            .send()
            .map_err(|err| self.transport_error(err))?;

        let status = response.status();
        if !status.is_success() {
            let rate_limited = status == StatusCode::FORBIDDEN
                && response
                    .headers()
                    .get(RATE_LIMIT_REMAINING)
                    .and_then(|value| value.to_str().ok())
                    .is_some_and(|value| value.trim() == "0");
            if rate_limited {
                return Err(FetchError::RateLimited);
            }
            return Err(FetchError::Rejected {
                status: status.as_u16(),
            });
        }

        let body = response.text().map_err(|err| self.transport_error(err))?;
        decode_repositories(&body)
    }

    fn transport_error(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

/// Decodes a full listing body. One malformed record fails the whole body.
pub fn decode_repositories(body: &str) -> Result<Vec<RepositoryItem>, FetchError> {
    serde_json::from_str(body).map_err(|err| FetchError::Decode(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn client_for(base_url: &str) -> Client {
        Client::new(ClientConfig {
            base_url: base_url.to_string(),
            timeout: Duration::from_secs(5),
            ..Default::default()
        })
        .unwrap()
    }

    fn serve_once(status: u16, body: &'static str, headers: Vec<(&'static str, &'static str)>) -> (String, thread::JoinHandle<String>) {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        let handle = thread::spawn(move || {
            let request = server.recv().unwrap();
            let url = request.url().to_string();
            let mut response = tiny_http::Response::from_string(body).with_status_code(status);
            for (name, value) in headers {
                response = response.with_header(
                    tiny_http::Header::from_bytes(name.as_bytes(), value.as_bytes()).unwrap(),
                );
            }
            request.respond(response).unwrap();
            url
        });
        (format!("http://{addr}"), handle)
    }

    const LISTING: &str = r#"[
        {"id": 1, "name": "alpha", "description": "first", "html_url": "https://github.com/o/alpha",
         "homepage": null, "language": "Rust", "stargazers_count": 5, "forks_count": 1,
         "topics": ["cli"], "updated_at": "2025-01-02T03:04:05Z", "fork": false},
        {"id": 2, "name": "beta", "description": null, "html_url": "https://github.com/o/beta",
         "homepage": "https://beta.dev", "language": null, "stargazers_count": 10, "forks_count": 0,
         "updated_at": "2025-01-01T00:00:00Z", "fork": true}
    ]"#;

    #[test]
    fn builds_listing_url() {
        let client = client_for("https://api.github.com");
        assert_eq!(
            client.user_repos_url("octocat").as_str(),
            "https://api.github.com/users/octocat/repos?sort=updated&per_page=100"
        );
    }

    #[test]
    fn identity_is_a_single_path_segment() {
        let client = client_for("http://localhost:9/api/v3");
        let url = client.user_repos_url("a/b c");
        assert_eq!(url.path(), "/api/v3/users/a%2Fb%20c/repos");
    }

    #[test]
    fn empty_identity_skips_request() {
        let client = client_for("http://127.0.0.1:9");
        assert_eq!(client.list_user_repos("  "), Err(FetchError::MissingIdentity));
    }

    #[test]
    fn decodes_listing() {
        let items = decode_repositories(LISTING).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].language.as_deref(), Some("Rust"));
        assert_eq!(items[0].topics, vec!["cli".to_string()]);
        assert!(items[1].topics.is_empty());
        assert!(items[1].fork);
    }

    #[test]
    fn malformed_record_fails_whole_body() {
        let body = r#"[
            {"id": 1, "name": "ok", "html_url": "u", "stargazers_count": 1, "forks_count": 0,
             "updated_at": "2025-01-01T00:00:00Z", "fork": false},
            {"id": 2, "name": "broken", "html_url": "u", "stargazers_count": -3, "forks_count": 0,
             "updated_at": "2025-01-01T00:00:00Z", "fork": false}
        ]"#;
        assert!(matches!(decode_repositories(body), Err(FetchError::Decode(_))));
    }

    #[test]
    fn fetches_from_server() {
        let (base, handle) = serve_once(200, LISTING, vec![]);
        let items = client_for(&base).list_user_repos("octocat").unwrap();
        assert_eq!(items.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(handle.join().unwrap(), "/users/octocat/repos?sort=updated&per_page=100");
    }

    #[test]
    fn not_found_is_rejected() {
        let (base, _handle) = serve_once(404, r#"{"message":"Not Found"}"#, vec![]);
        let err = client_for(&base).list_user_repos("nobody").unwrap_err();
        assert_eq!(err, FetchError::Rejected { status: 404 });
        assert_eq!(err.to_string(), "Failed to fetch repositories (HTTP 404)");
    }

    #[test]
    fn exhausted_rate_limit_is_noted() {
        let (base, _handle) = serve_once(403, "{}", vec![("X-RateLimit-Remaining", "0")]);
        let err = client_for(&base).list_user_repos("octocat").unwrap_err();
        assert_eq!(err, FetchError::RateLimited);
    }

    #[test]
    fn bad_body_is_decode_error() {
        let (base, _handle) = serve_once(200, "<html>oops</html>", vec![]);
        let err = client_for(&base).list_user_repos("octocat").unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn unreachable_host_is_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let err = client_for(&format!("http://{addr}"))
            .list_user_repos("octocat")
            .unwrap_err();
        assert!(matches!(err, FetchError::Network(_)), "{err:?}");
    }

    #[test]
    fn silent_server_times_out() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let holder = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            thread::sleep(Duration::from_secs(2));
            drop(stream);
        });

        let client = Client::new(ClientConfig {
            base_url: format!("http://{addr}"),
            timeout: Duration::from_millis(300),
            ..Default::default()
        })
        .unwrap();
        let err = client.list_user_repos("octocat").unwrap_err();
        assert_eq!(err, FetchError::Timeout(Duration::from_millis(300)));
        assert_eq!(err.to_string(), "request timed out after 300ms");
        holder.join().unwrap();
    }
}
