//! Request and result envelopes for a recording session

use crate::capability::SiteCapability;
use crate::recorder::termination::TerminationReason;
use serde::{Deserialize, Serialize};
use sitecap_store::{StoredStep, TaskTokens};
use uuid::Uuid;

/// Input to one recording session
#[derive(Debug, Clone)]
pub struct RecordRequest {
    /// Scenario text driving the exploration
    pub scenario: String,
    /// System prompt for the chat client
    pub system_prompt: String,
    /// First user message; defaults to the scenario when empty
    pub user_message: String,
    /// Display name for the site
    pub site_name: String,
    /// Free-text site description
    pub site_description: String,
    /// URL the session starts at
    pub start_url: String,
    /// Reuse an existing task row instead of creating one
    pub existing_task_id: Option<Uuid>,
}

impl RecordRequest {
    /// Create a request with the required fields
    #[must_use]
    pub fn new(
        start_url: impl Into<String>,
        scenario: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        let scenario = scenario.into();
        Self {
            user_message: scenario.clone(),
            scenario,
            system_prompt: system_prompt.into(),
            site_name: String::new(),
            site_description: String::new(),
            start_url: start_url.into(),
            existing_task_id: None,
        }
    }

    /// Override the first user message
    #[must_use]
    pub fn with_user_message(mut self, message: impl Into<String>) -> Self {
        self.user_message = message.into();
        self
    }

    /// Set site display name and description
    #[must_use]
    pub fn with_site_info(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.site_name = name.into();
        self.site_description = description.into();
        self
    }

    /// Bind the session to an existing task row
    #[must_use]
    pub fn with_existing_task(mut self, task_id: Uuid) -> Self {
        self.existing_task_id = Some(task_id);
        self
    }
}

/// Token totals for one session, chat and browser attributed separately
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RecordTokens {
    /// Chat client input tokens
    pub input_tokens: u64,
    /// Chat client output tokens
    pub output_tokens: u64,
    /// Browser-side model input tokens, when the adapter reports them
    pub browser_input_tokens: u64,
    /// Browser-side model output tokens
    pub browser_output_tokens: u64,
}

impl RecordTokens {
    /// Sum of all four counters
    #[must_use]
    pub fn total(&self) -> u64 {
        self.input_tokens
            + self.output_tokens
            + self.browser_input_tokens
            + self.browser_output_tokens
    }

    /// Collapse into the store's two-column shape
    #[must_use]
    pub fn as_task_tokens(&self) -> TaskTokens {
        TaskTokens {
            input_tokens: self.input_tokens + self.browser_input_tokens,
            output_tokens: self.output_tokens + self.browser_output_tokens,
        }
    }
}

/// One executed (or skipped) tool call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    /// Position in execution order, starting at 1
    pub ordinal: u64,
    /// Tool name
    pub tool: String,
    /// Arguments as passed by the model
    pub arguments: serde_json::Value,
    /// Result payload on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Error message when the tool failed or was skipped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Execution duration in milliseconds
    pub duration_ms: u64,
    /// Page-type context active when the step ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_type: Option<String>,
}

impl StepRecord {
    /// Convert into the store's persisted shape
    #[must_use]
    pub fn to_stored(&self) -> StoredStep {
        StoredStep {
            ordinal: self.ordinal,
            tool: self.tool.clone(),
            arguments: self.arguments.clone(),
            result: self.result.clone(),
            error: self.error.clone(),
            duration_ms: self.duration_ms,
            page_type: self.page_type.clone(),
        }
    }
}

/// Outcome of one recording session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordResult {
    /// True when at least one element was discovered
    pub success: bool,
    /// Human-readable outcome summary
    pub message: String,
    /// Turns consumed
    pub turns: usize,
    /// Tool steps executed
    pub steps: u64,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
    /// Token totals
    pub tokens: RecordTokens,
    /// Distinct elements discovered
    pub element_count: usize,
    /// The recorded capability, when any element was discovered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_capability: Option<SiteCapability>,
    /// Source row id from persistence, when the save succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<i64>,
    /// Task row id, when task tracking was bound
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<Uuid>,
    /// Persistence failure message; the in-memory result stays valid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_save_error: Option<String>,
    /// Why the session ended
    #[serde(skip_serializing_if = "Option::is_none")]
    pub termination_reason: Option<TerminationReason>,
    /// True when the session ended on a limit rather than natural completion
    pub partial_complete: bool,
}

/// Capability snapshot recovered from an interrupted session
#[derive(Debug, Clone)]
pub struct PartialSnapshot {
    /// Distinct elements discovered before the interruption
    pub element_count: usize,
    /// The capability as of the interruption
    pub site_capability: SiteCapability,
    /// Turns completed
    pub turns: usize,
    /// Tool steps executed
    pub steps: u64,
    /// Token totals
    pub tokens: RecordTokens,
    /// Source row id, when the recovery save succeeded
    pub source_id: Option<i64>,
    /// Task row id, when task tracking was bound
    pub task_id: Option<Uuid>,
    /// Persistence failure message from the recovery save
    pub db_save_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults_user_message_to_scenario() {
        let req = RecordRequest::new("https://example.com", "find the search box", "sys");
        assert_eq!(req.user_message, "find the search box");

        let req = req.with_user_message("start here");
        assert_eq!(req.user_message, "start here");
        assert_eq!(req.scenario, "find the search box");
    }

    #[test]
    fn test_tokens_fold_browser_side() {
        let tokens = RecordTokens {
            input_tokens: 100,
            output_tokens: 50,
            browser_input_tokens: 10,
            browser_output_tokens: 5,
        };
        assert_eq!(tokens.total(), 165);
        let task = tokens.as_task_tokens();
        assert_eq!(task.input_tokens, 110);
        assert_eq!(task.output_tokens, 55);
    }
}
