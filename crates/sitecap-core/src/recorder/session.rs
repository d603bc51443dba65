//! Per-session mutable state and counters

use crate::capability::SiteCapability;
use crate::recorder::types::StepRecord;
use std::collections::HashSet;
use std::time::Instant;
use url::Url;
use uuid::Uuid;

/// Counters the termination evaluator reads each turn
#[derive(Debug, Clone, Default)]
pub struct SessionCounters {
    /// Cumulative chat input tokens
    pub input_tokens: u64,
    /// Cumulative chat output tokens
    pub output_tokens: u64,
    /// Distinct elements discovered so far
    pub element_count: usize,
    /// Observe calls completed (successful only)
    pub observe_calls: u64,
    /// Elements returned across all observe calls
    pub observed_elements: u64,
    /// Distinct normalized URLs visited
    pub visited_pages: usize,
    /// Turns completed
    pub turn: usize,
    /// Next step ordinal
    pub step_ordinal: u64,
    /// Tool calls executed (successful or skipped)
    pub tools_executed: u64,
}

/// Mutable state for one recording session
#[derive(Debug)]
pub struct SessionState {
    /// The capability under construction; created on first navigation
    pub capability: Option<SiteCapability>,
    /// Active page-type context, if the model has set one
    pub current_page: Option<String>,
    /// Last URL the browser reported
    pub current_url: Option<String>,
    /// URL before the last navigation, for cross-domain refusal payloads
    pub previous_url: Option<String>,
    /// Normalized URLs counted as distinct pages
    pub visited: HashSet<String>,
    /// Normalized URLs already auto-scrolled before observe
    pub scrolled_pages: HashSet<String>,
    /// Counters for the termination evaluator
    pub counters: SessionCounters,
    /// Step telemetry in execution order
    pub steps: Vec<StepRecord>,
    /// Task row id, bound lazily
    pub task_id: Option<Uuid>,
    /// Source row id from the first capability save
    pub source_id: Option<i64>,
    /// Session start
    pub started_at: Instant,
    /// Domain extracted from the start URL
    pub domain: Option<String>,
}

impl SessionState {
    pub(crate) fn new() -> Self {
        Self {
            capability: None,
            current_page: None,
            current_url: None,
            previous_url: None,
            visited: HashSet::new(),
            scrolled_pages: HashSet::new(),
            counters: SessionCounters::default(),
            steps: Vec::new(),
            task_id: None,
            source_id: None,
            started_at: Instant::now(),
            domain: None,
        }
    }

    /// Record a visit; returns true when the normalized URL is new
    pub(crate) fn mark_visited(&mut self, url: &str) -> bool {
        match normalize_url(url) {
            Some(key) => {
                let fresh = self.visited.insert(key);
                self.counters.visited_pages = self.visited.len();
                fresh
            }
            None => false,
        }
    }
}

/// Normalize a URL into the key used for distinct-page counting.
///
/// Two URLs count as the same page when they share path, query parameters
/// (order-insensitive) and fragment. Scheme and host are dropped because a
/// session never leaves its start domain.
#[must_use]
pub fn normalize_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let mut pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    pairs.sort();

    let mut key = parsed.path().to_string();
    if !pairs.is_empty() {
        key.push('?');
        for (i, (k, v)) in pairs.iter().enumerate() {
            if i > 0 {
                key.push('&');
            }
            key.push_str(k);
            key.push('=');
            key.push_str(v);
        }
    }
    if let Some(fragment) = parsed.fragment() {
        key.push('#');
        key.push_str(fragment);
    }
    Some(key)
}

/// Extract the registrable domain (host) from a URL
#[must_use]
pub(crate) fn domain_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .host_str()
        .map(|h| h.trim_start_matches("www.").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_order_insensitive() {
        assert_eq!(
            normalize_url("https://example.com/s?q=a&page=1"),
            normalize_url("https://example.com/s?page=1&q=a"),
        );
    }

    #[test]
    fn test_fragment_distinguishes() {
        assert_ne!(
            normalize_url("https://example.com/doc#intro"),
            normalize_url("https://example.com/doc#usage"),
        );
    }

    #[test]
    fn test_host_dropped() {
        assert_eq!(
            normalize_url("https://example.com/a?x=1"),
            normalize_url("https://www.example.com/a?x=1"),
        );
    }

    #[test]
    fn test_mark_visited_counts_distinct() {
        let mut state = SessionState::new();
        assert!(state.mark_visited("https://example.com/s?q=a&page=1"));
        assert!(!state.mark_visited("https://example.com/s?page=1&q=a"));
        assert!(state.mark_visited("https://example.com/s?page=2&q=a"));
        assert_eq!(state.counters.visited_pages, 2);
    }

    #[test]
    fn test_domain_of_strips_www() {
        assert_eq!(
            domain_of("https://www.example.com/x").as_deref(),
            Some("example.com")
        );
        assert_eq!(domain_of("not a url"), None);
    }
}
