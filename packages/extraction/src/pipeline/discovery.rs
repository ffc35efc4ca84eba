//! EIN discovery: paginated registry search with global deduplication.

use std::collections::HashSet;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use super::pause;
use crate::error::RegistryError;
use crate::traits::registry::{Registry, SearchPage};
use crate::types::{
    config::DiscoveryConfig,
    organization::{Ein, OrganizationSummary},
};

/// Common words in registered nonprofit names.
pub const COMMON_TERMS: &[&str] = &[
    "foundation", "association", "society", "institute", "center", "council",
    "trust", "fund", "alliance", "coalition", "network", "group",
    "organization", "charity", "church", "temple", "synagogue", "school",
    "college", "university", "hospital", "health", "medical", "community",
    "family", "children", "youth", "project", "arts", "museum", "library",
    "research", "education", "housing", "veterans", "services", "support",
    "relief", "development", "international", "american",
];

/// Frequent leading letter pairs, for exhaustive sweeps.
pub const BIGRAMS: &[&str] = &[
    "al", "am", "an", "ar", "as", "at", "ca", "ce", "ch", "ci", "co", "cr",
    "de", "di", "do", "ea", "ed", "el", "em", "en", "ex", "fa", "fi", "fo",
    "fr", "ge", "gl", "go", "gr", "ha", "he", "hi", "ho", "hu", "in", "is",
    "ja", "jo", "ka", "ki", "la", "le", "li", "lo", "ma", "me", "mi", "mo",
    "na", "ne", "no", "of", "op", "or", "pa", "pe", "pr", "qu", "ra", "re",
    "ri", "ro", "sa", "sc", "se", "sh", "so", "st", "su", "ta", "te", "th",
    "ti", "to", "tr", "un", "up", "ur", "va", "vi", "wa", "we", "wi", "wo",
    "yo",
];

/// Build the search-term catalogue for a jurisdiction.
///
/// Common terms come first, then the jurisdiction's name and code, then
/// (optionally) every letter and the bigram list. Duplicates are dropped.
pub fn search_terms(code: &str, name: &str, include_alphabet: bool) -> Vec<String> {
    let mut terms: Vec<String> = COMMON_TERMS.iter().map(|t| t.to_string()).collect();
    terms.push(name.to_lowercase());
    terms.push(code.to_lowercase());

    if include_alphabet {
        terms.extend(('a'..='z').map(String::from));
        terms.extend(BIGRAMS.iter().map(|b| b.to_string()));
    }

    let mut seen = HashSet::new();
    terms.retain(|t| !t.is_empty() && seen.insert(t.clone()));
    terms
}

/// Why pagination for a term stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermEnd {
    /// Empty page or explicit end signal.
    Exhausted,
    /// Consecutive failures reached the cap; partial results kept.
    FailureLimit,
    /// Hard page ceiling reached.
    PageCeiling,
    Cancelled,
}

/// Result of paginating one term.
#[derive(Debug, Clone)]
pub struct TermOutcome {
    /// Organizations not seen under any earlier term, in page order.
    pub organizations: Vec<OrganizationSummary>,
    /// Pages that returned results.
    pub pages: u32,
    pub end: TermEnd,
}

/// Paginates registry search for one jurisdiction.
pub struct Discovery<'a> {
    registry: &'a dyn Registry,
    permits: &'a Semaphore,
    jurisdiction: &'a str,
    config: &'a DiscoveryConfig,
}

impl<'a> Discovery<'a> {
    pub fn new(
        registry: &'a dyn Registry,
        permits: &'a Semaphore,
        jurisdiction: &'a str,
        config: &'a DiscoveryConfig,
    ) -> Self {
        Self {
            registry,
            permits,
            jurisdiction,
            config,
        }
    }

    /// Fetch pages for `term` from 0 until the registry signals the end.
    ///
    /// A failed page is retried after a backoff; the term is abandoned after
    /// `max_consecutive_failures` failures in a row. Every EIN not already
    /// in `seen` is added to it and returned.
    pub async fn discover_term(
        &self,
        term: &str,
        seen: &mut HashSet<Ein>,
        cancel: &CancellationToken,
    ) -> TermOutcome {
        let mut organizations = Vec::new();
        let mut page = 0u32;
        let mut pages = 0u32;
        let mut failures = 0u32;

        let end = loop {
            if cancel.is_cancelled() {
                break TermEnd::Cancelled;
            }
            if page >= self.config.max_pages_per_term {
                tracing::warn!(term, page, "page ceiling reached, moving to next term");
                break TermEnd::PageCeiling;
            }

            let response = {
                let Ok(_permit) = self.permits.acquire().await else {
                    break TermEnd::Cancelled;
                };
                self.registry.search(term, self.jurisdiction, page).await
            };

            match response {
                Ok(SearchPage::Organizations(found)) if !found.is_empty() => {
                    failures = 0;
                    pages += 1;
                    let before = organizations.len();
                    for org in found {
                        if seen.insert(org.ein) {
                            organizations.push(org);
                        }
                    }
                    tracing::debug!(
                        term,
                        page,
                        new = organizations.len() - before,
                        "search page fetched"
                    );
                    page += 1;
                    if !pause(self.config.page_delay, cancel).await {
                        break TermEnd::Cancelled;
                    }
                }
                Ok(_) => break TermEnd::Exhausted,
                Err(e) => {
                    failures += 1;
                    tracing::warn!(term, page, failures, error = %e, "search page failed");
                    if failures >= self.config.max_consecutive_failures {
                        tracing::warn!(term, page, "too many consecutive failures, abandoning term");
                        break TermEnd::FailureLimit;
                    }
                    if !pause(self.backoff_for(&e), cancel).await {
                        break TermEnd::Cancelled;
                    }
                }
            }
        };

        TermOutcome {
            organizations,
            pages,
            end,
        }
    }

    fn backoff_for(&self, error: &RegistryError) -> std::time::Duration {
        match error {
            RegistryError::RateLimited { retry_after_secs } => {
                let requested = std::time::Duration::from_secs(*retry_after_secs);
                requested
                    .min(self.config.max_retry_after)
                    .max(self.config.failure_backoff)
            }
            _ => self.config.failure_backoff,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockRegistry;

    fn orgs(eins: &[u64]) -> Vec<OrganizationSummary> {
        eins.iter()
            .map(|e| OrganizationSummary::new(Ein(*e), format!("Org {e}")))
            .collect()
    }

    fn config() -> DiscoveryConfig {
        DiscoveryConfig {
            page_delay: std::time::Duration::ZERO,
            failure_backoff: std::time::Duration::ZERO,
            max_retry_after: std::time::Duration::ZERO,
            ..DiscoveryConfig::default()
        }
    }

    #[tokio::test]
    async fn test_paginates_until_empty_page() {
        let registry = MockRegistry::new()
            .with_page("fund", orgs(&[1, 2]))
            .with_page("fund", orgs(&[3]))
            .with_page("fund", vec![]);
        let permits = Semaphore::new(1);
        let config = config();
        let discovery = Discovery::new(&registry, &permits, "CT", &config);

        let mut seen = HashSet::new();
        let outcome = discovery
            .discover_term("fund", &mut seen, &CancellationToken::new())
            .await;

        assert_eq!(outcome.end, TermEnd::Exhausted);
        assert_eq!(outcome.pages, 2);
        assert_eq!(outcome.organizations.len(), 3);
        assert_eq!(registry.pages_requested("fund"), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_duplicates_across_terms_returned_once() {
        let registry = MockRegistry::new()
            .with_page("arts", orgs(&[10, 11]))
            .with_page("museum", orgs(&[11, 12, 12]));
        let permits = Semaphore::new(1);
        let config = config();
        let discovery = Discovery::new(&registry, &permits, "CT", &config);
        let cancel = CancellationToken::new();

        let mut seen = HashSet::new();
        let first = discovery.discover_term("arts", &mut seen, &cancel).await;
        let second = discovery.discover_term("museum", &mut seen, &cancel).await;

        assert_eq!(first.organizations.len(), 2);
        let eins: Vec<Ein> = second.organizations.iter().map(|o| o.ein).collect();
        assert_eq!(eins, vec![Ein(12)]);
        assert_eq!(seen.len(), 3);
    }

    #[tokio::test]
    async fn test_failed_page_is_retried() {
        let registry = MockRegistry::new()
            .with_page("trust", orgs(&[1]))
            .with_search_failure("trust", RegistryError::Timeout)
            .with_page("trust", orgs(&[2]));
        let permits = Semaphore::new(1);
        let config = config();
        let discovery = Discovery::new(&registry, &permits, "CT", &config);

        let mut seen = HashSet::new();
        let outcome = discovery
            .discover_term("trust", &mut seen, &CancellationToken::new())
            .await;

        assert_eq!(outcome.end, TermEnd::Exhausted);
        assert_eq!(outcome.organizations.len(), 2);
        assert_eq!(registry.pages_requested("trust"), vec![0, 1, 1, 2]);
    }

    #[tokio::test]
    async fn test_three_consecutive_failures_abandon_term() {
        let registry = MockRegistry::new()
            .with_page("health", orgs(&[7]))
            .with_search_failure("health", RegistryError::Timeout)
            .with_search_failure("health", RegistryError::Transport("reset".into()))
            .with_search_failure("health", RegistryError::RateLimited { retry_after_secs: 5 })
            .with_page("health", orgs(&[8]));
        let permits = Semaphore::new(1);
        let config = config();
        let discovery = Discovery::new(&registry, &permits, "CT", &config);

        let mut seen = HashSet::new();
        let outcome = discovery
            .discover_term("health", &mut seen, &CancellationToken::new())
            .await;

        assert_eq!(outcome.end, TermEnd::FailureLimit);
        // Partial results are kept
        assert_eq!(outcome.organizations.len(), 1);
        assert_eq!(registry.pages_requested("health"), vec![0, 1, 1, 1]);
    }

    #[tokio::test]
    async fn test_page_ceiling() {
        let mut registry = MockRegistry::new();
        for i in 0..5 {
            registry = registry.with_page("school", orgs(&[100 + i]));
        }
        let permits = Semaphore::new(1);
        let config = DiscoveryConfig {
            max_pages_per_term: 3,
            ..config()
        };
        let discovery = Discovery::new(&registry, &permits, "CT", &config);

        let mut seen = HashSet::new();
        let outcome = discovery
            .discover_term("school", &mut seen, &CancellationToken::new())
            .await;

        assert_eq!(outcome.end, TermEnd::PageCeiling);
        assert_eq!(outcome.pages, 3);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_page() {
        let registry = MockRegistry::new().with_page("youth", orgs(&[1]));
        let permits = Semaphore::new(1);
        let config = config();
        let discovery = Discovery::new(&registry, &permits, "CT", &config);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut seen = HashSet::new();
        let outcome = discovery.discover_term("youth", &mut seen, &cancel).await;

        assert_eq!(outcome.end, TermEnd::Cancelled);
        assert!(registry.calls().is_empty());
    }

    #[test]
    fn test_catalogue() {
        let terms = search_terms("CT", "Connecticut", false);
        assert_eq!(terms.first().map(String::as_str), Some("foundation"));
        assert!(terms.contains(&"connecticut".to_string()));
        assert!(terms.contains(&"ct".to_string()));
        assert_eq!(terms.len(), COMMON_TERMS.len() + 2);

        let exhaustive = search_terms("CT", "Connecticut", true);
        assert!(exhaustive.contains(&"q".to_string()));
        assert!(exhaustive.contains(&"th".to_string()));
        assert_eq!(exhaustive.len(), COMMON_TERMS.len() + 2 + 26 + BIGRAMS.len());
    }
}
