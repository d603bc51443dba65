//! Termination evaluation
//!
//! A pure decision function over session counters and configured thresholds,
//! evaluated once at the start of every turn before any tool executes. The
//! checks run in a fixed priority order and the first hit wins; breaching
//! several thresholds at once still reports the earliest check.

use crate::recorder::session::SessionCounters;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Why a recording session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// The model signaled natural completion (no further tool calls)
    Completed,
    /// Wall-clock ceiling reached
    TaskTimeout,
    /// Session token budget exhausted
    MaxTokensReached,
    /// Enough distinct elements discovered
    ElementThresholdReached,
    /// Observe calls keep returning too little new material
    LowObserveEfficiency,
    /// Distinct-page ceiling reached
    MaxPagesVisited,
    /// Turn budget exhausted without any other signal
    MaxTurnsReached,
}

impl TerminationReason {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::TaskTimeout => "task_timeout",
            Self::MaxTokensReached => "max_tokens_reached",
            Self::ElementThresholdReached => "element_threshold_reached",
            Self::LowObserveEfficiency => "low_observe_efficiency",
            Self::MaxPagesVisited => "max_pages_visited",
            Self::MaxTurnsReached => "max_turns_reached",
        }
    }
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Thresholds the evaluator checks against
#[derive(Debug, Clone)]
pub struct TerminationLimits {
    /// Wall-clock ceiling for one session
    pub max_task_duration: Duration,
    /// Cumulative session token ceiling; 0 means unlimited
    pub max_session_tokens: u64,
    /// Stop once this many distinct elements were discovered
    pub element_threshold: usize,
    /// Observe-efficiency check only arms after this many observe calls
    pub min_observe_calls: u64,
    /// Floor for average elements per observe call; 0.0 disables the check
    pub observe_efficiency_floor: f64,
    /// Distinct normalized-URL ceiling
    pub max_pages: usize,
}

impl Default for TerminationLimits {
    fn default() -> Self {
        Self {
            max_task_duration: Duration::from_secs(15 * 60),
            max_session_tokens: 0,
            element_threshold: 80,
            min_observe_calls: 3,
            observe_efficiency_floor: 3.0,
            max_pages: 5,
        }
    }
}

impl TerminationLimits {
    /// Evaluate the checks in fixed priority order; first hit wins
    #[must_use]
    pub fn evaluate(&self, elapsed: Duration, counters: &SessionCounters) -> Option<TerminationReason> {
        if elapsed >= self.max_task_duration {
            return Some(TerminationReason::TaskTimeout);
        }

        if self.max_session_tokens > 0
            && counters.input_tokens + counters.output_tokens >= self.max_session_tokens
        {
            return Some(TerminationReason::MaxTokensReached);
        }

        if counters.element_count >= self.element_threshold {
            return Some(TerminationReason::ElementThresholdReached);
        }

        if self.observe_efficiency_floor > 0.0 && counters.observe_calls >= self.min_observe_calls {
            let avg = counters.observed_elements as f64 / counters.observe_calls as f64;
            if avg < self.observe_efficiency_floor {
                return Some(TerminationReason::LowObserveEfficiency);
            }
        }

        if counters.visited_pages >= self.max_pages {
            return Some(TerminationReason::MaxPagesVisited);
        }

        None
    }
}
