use std::collections::HashMap;
use std::sync::Arc;

use crate::github::{self, FetchError, RepositoryItem};

pub trait RepositoryService: Send + Sync {
    fn list_repositories(&self, identity: &str) -> Result<Vec<RepositoryItem>, FetchError>;
}

pub struct GitHubRepositoryService {
    client: Arc<github::Client>,
}

impl GitHubRepositoryService {
    pub fn new(client: Arc<github::Client>) -> Self {
        Self { client }
    }
}

impl RepositoryService for GitHubRepositoryService {
    fn list_repositories(&self, identity: &str) -> Result<Vec<RepositoryItem>, FetchError> {
        self.client.list_user_repos(identity)
    }
}

/// Serves canned listings keyed by identity. Unknown identities answer 404.
#[derive(Default)]
pub struct StaticRepositoryService {
    listings: HashMap<String, Vec<RepositoryItem>>,
}

impl StaticRepositoryService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listing(mut self, identity: &str, items: Vec<RepositoryItem>) -> Self {
        self.listings.insert(identity.to_string(), items);
        self
    }
}

impl RepositoryService for StaticRepositoryService {
    fn list_repositories(&self, identity: &str) -> Result<Vec<RepositoryItem>, FetchError> {
        if identity.trim().is_empty() {
            return Err(FetchError::MissingIdentity);
        }
        self.listings
            .get(identity)
            .cloned()
            .ok_or(FetchError::Rejected { status: 404 })
    }
}

/// Drops forks, then orders by stars, highest first. Equal star counts keep
/// their listing order.
pub fn filter_and_rank(items: Vec<RepositoryItem>) -> Vec<RepositoryItem> {
    let mut ranked: Vec<RepositoryItem> = items.into_iter().filter(|repo| !repo.fork).collect();
    ranked.sort_by(|a, b| b.stargazers_count.cmp(&a.stargazers_count));
    ranked
}

#[cfg(test)]
pub(crate) fn sample_repo(id: u64, stars: u32, fork: bool) -> RepositoryItem {
    RepositoryItem {
        id,
        name: format!("repo-{id}"),
        description: Some(format!("Repository number {id}")),
        html_url: format!("https://github.com/octocat/repo-{id}"),
        homepage: None,
        language: Some("Rust".to_string()),
        stargazers_count: stars,
        forks_count: 0,
        topics: Vec::new(),
        updated_at: chrono::DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .map(|ts| ts.with_timezone(&chrono::Utc))
            .unwrap(),
        fork,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(items: &[RepositoryItem]) -> Vec<u64> {
        items.iter().map(|repo| repo.id).collect()
    }

    #[test]
    fn drops_forks_and_ranks_by_stars() {
        let input = vec![sample_repo(1, 5, false), sample_repo(2, 10, false), sample_repo(3, 1, true)];
        let ranked = filter_and_rank(input);
        assert_eq!(ids(&ranked), vec![2, 1]);
        assert_eq!(ranked[0].stargazers_count, 10);
        assert_eq!(ranked[1].stargazers_count, 5);
    }

    #[test]
    fn equal_stars_keep_listing_order() {
        let input = vec![
            sample_repo(7, 3, false),
            sample_repo(4, 9, false),
            sample_repo(9, 3, false),
            sample_repo(2, 3, false),
            sample_repo(5, 9, false),
        ];
        let first = filter_and_rank(input.clone());
        assert_eq!(ids(&first), vec![4, 5, 7, 9, 2]);
        assert_eq!(ids(&filter_and_rank(input)), ids(&first));
    }

    #[test]
    fn never_grows_and_never_keeps_forks() {
        let input: Vec<RepositoryItem> = (0..40u64)
            .map(|id| sample_repo(id, ((id * 7) % 11) as u32, id % 3 == 0))
            .collect();
        let ranked = filter_and_rank(input.clone());
        assert!(ranked.len() <= input.len());
        assert!(ranked.iter().all(|repo| !repo.fork));
        assert!(ranked
            .windows(2)
            .all(|pair| pair[0].stargazers_count >= pair[1].stargazers_count));
    }

    #[test]
    fn empty_input_is_empty_output() {
        assert!(filter_and_rank(Vec::new()).is_empty());
    }

    #[test]
    fn static_service_answers_known_identities() {
        let service = StaticRepositoryService::new().with_listing("alice", vec![sample_repo(1, 1, false)]);
        assert_eq!(service.list_repositories("alice").unwrap().len(), 1);
        assert_eq!(
            service.list_repositories("bob"),
            Err(FetchError::Rejected { status: 404 })
        );
    }
}
