//! Recorder configuration

use crate::recorder::termination::TerminationLimits;
use crate::retry::RetryConfig;
use std::time::Duration;

/// Configuration for the turn-loop orchestrator
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Maximum turns before the loop finalizes with `max_turns_reached`
    pub max_turns: usize,
    /// Termination thresholds checked at the start of every turn
    pub limits: TerminationLimits,
    /// Per-tool retry for navigation and observation tools
    pub tool_retry: RetryConfig,
    /// Scroll to the bottom once before the first observe on a fresh page
    pub auto_scroll: bool,
    /// Wait after a scroll-to-bottom pass, for lazy-loaded content
    pub scroll_wait_ms: u64,
    /// Timeout for one observe call
    pub observe_timeout_ms: u64,
    /// Human-like pacing delay between turns
    pub turn_delay: Duration,
    /// Human-like pacing delay between tool executions within a turn
    pub tool_delay: Duration,
    /// Ceiling for the wait tool, to keep the model from stalling the session
    pub wait_tool_max_ms: u64,
    /// When non-empty, register-element is silently dropped unless the
    /// current URL contains one of these patterns
    pub url_allow_patterns: Vec<String>,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            max_turns: 25,
            limits: TerminationLimits::default(),
            tool_retry: RetryConfig::default(),
            auto_scroll: true,
            scroll_wait_ms: sitecap_browser::DEFAULT_SCROLL_WAIT_MS,
            observe_timeout_ms: sitecap_browser::DEFAULT_OBSERVE_TIMEOUT_MS,
            turn_delay: Duration::from_millis(800),
            tool_delay: Duration::from_millis(400),
            wait_tool_max_ms: 10_000,
            url_allow_patterns: Vec::new(),
        }
    }
}

impl RecorderConfig {
    /// Create a new configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the turn budget
    #[must_use]
    pub fn with_max_turns(mut self, max: usize) -> Self {
        self.max_turns = max;
        self
    }

    /// Set termination limits
    #[must_use]
    pub fn with_limits(mut self, limits: TerminationLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Set per-tool retry behavior
    #[must_use]
    pub fn with_tool_retry(mut self, retry: RetryConfig) -> Self {
        self.tool_retry = retry;
        self
    }

    /// Enable or disable the pre-observe auto-scroll pass
    #[must_use]
    pub fn with_auto_scroll(mut self, enabled: bool) -> Self {
        self.auto_scroll = enabled;
        self
    }

    /// Set pacing delays (zero both for tests)
    #[must_use]
    pub fn with_pacing(mut self, turn_delay: Duration, tool_delay: Duration) -> Self {
        self.turn_delay = turn_delay;
        self.tool_delay = tool_delay;
        self
    }

    /// Restrict element registration to URLs containing one of the patterns
    #[must_use]
    pub fn with_url_allow_patterns(mut self, patterns: Vec<String>) -> Self {
        self.url_allow_patterns = patterns;
        self
    }

    /// True when the URL filter permits registrations at `url`
    #[must_use]
    pub fn url_allowed(&self, url: Option<&str>) -> bool {
        if self.url_allow_patterns.is_empty() {
            return true;
        }
        match url {
            Some(url) => self.url_allow_patterns.iter().any(|p| url.contains(p)),
            None => false,
        }
    }
}
