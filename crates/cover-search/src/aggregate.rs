use crate::backend::SearchBackend;
use crate::types::*;
use std::collections::HashSet;

/// Runs a query against every backend and merges what comes back.
#[derive(Debug, Clone)]
pub struct CandidateAggregator {
    client: reqwest::Client,
    backends: Vec<SearchBackend>,
}

impl CandidateAggregator {
    /// `backends` are listed in priority order.
    pub fn new(client: reqwest::Client, backends: Vec<SearchBackend>) -> Self {
        Self { client, backends }
    }

    /// Google Books first, then Open Library.
    pub fn with_default_backends(client: reqwest::Client, google_api_key: Option<String>) -> Self {
        Self::new(
            client,
            vec![
                SearchBackend::google_books(google_api_key),
                SearchBackend::open_library(),
            ],
        )
    }

    pub fn backends(&self) -> &[SearchBackend] {
        &self.backends
    }

    /// Search every backend, dropping duplicates and keeping the earlier
    /// backend's entry. A failing backend contributes nothing.
    pub async fn search(&self, query: &str, max_results: usize) -> Vec<SearchCandidate> {
        let query = query.trim();
        if query.is_empty() || max_results == 0 {
            log::warn!("Skipping cover search for empty query");
            return Vec::new();
        }

        let mut per_backend = Vec::with_capacity(self.backends.len());
        for backend in &self.backends {
            match backend.search(&self.client, query, max_results).await {
                Ok(found) => {
                    log::info!(
                        "{} returned {} results for '{}'",
                        backend.name(),
                        found.len(),
                        query
                    );
                    per_backend.push(found);
                }
                Err(e) => {
                    log::error!("{} search failed for '{}': {}", backend.name(), query, e);
                }
            }
        }

        merge_candidates(per_backend, max_results)
    }
}

/// Concatenate lists in priority order, keep the first candidate per title
/// and truncate to `max_results`.
pub fn merge_candidates(lists: Vec<Vec<SearchCandidate>>, max_results: usize) -> Vec<SearchCandidate> {
    let mut seen = HashSet::new();
    lists
        .into_iter()
        .flatten()
        .filter(|candidate| seen.insert(candidate.dedup_key()))
        .take(max_results)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(title: &str, source: &str) -> SearchCandidate {
        SearchCandidate::new(title, "Someone", "https://t", "https://f", source)
    }

    #[test]
    fn test_dedup_prefers_earlier_backend() {
        let first = vec![candidate("Dune", "A"), candidate("Children of Dune", "A")];
        let second = vec![
            candidate("  DUNE ", "B"),
            candidate("children  of dune", "B"),
            candidate("Dune Messiah", "B"),
        ];

        let merged = merge_candidates(vec![first, second], 10);
        let titles: Vec<_> = merged.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Dune", "Children of Dune", "Dune Messiah"]);
        assert_eq!(merged[0].source_name, "A");
        assert_eq!(merged[1].source_name, "A");
    }

    #[test]
    fn test_merge_truncates_after_dedup() {
        let first = vec![candidate("One", "A"), candidate("one", "A")];
        let second = vec![candidate("Two", "B"), candidate("Three", "B")];
        let merged = merge_candidates(vec![first, second], 2);
        let titles: Vec<_> = merged.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["One", "Two"]);
    }

    #[tokio::test]
    async fn test_empty_query_makes_no_requests() {
        let aggregator = CandidateAggregator::new(
            reqwest::Client::new(),
            vec![SearchBackend::GoogleBooks {
                endpoint: "http://127.0.0.1:9/unreachable".to_string(),
                api_key: None,
            }],
        );
        assert!(aggregator.search("   ", 8).await.is_empty());
    }
}
