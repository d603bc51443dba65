//! Task and step record types
//!
//! A recording task tracks one recorder session from the first tool execution
//! to its terminal status. Steps form an append-only telemetry log per task.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a recording task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task is running
    Running,
    /// Task completed naturally
    Completed,
    /// Task ended early but produced a usable partial capability
    Partial,
    /// Task failed
    Failed,
}

impl TaskStatus {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }

    /// Check if the status is terminal
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "partial" => Ok(Self::Partial),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("unknown task status: {s}")),
        }
    }
}

/// Token totals persisted with a terminal task status
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TaskTokens {
    /// Session-level input tokens
    pub input_tokens: u64,
    /// Session-level output tokens
    pub output_tokens: u64,
}

/// One persisted step of a recording task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredStep {
    /// Step ordinal, monotonically increasing within a task
    pub ordinal: u64,
    /// Tool name
    pub tool: String,
    /// Tool arguments
    pub arguments: serde_json::Value,
    /// Tool result, if it succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Error message, if it failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Duration in milliseconds
    pub duration_ms: u64,
    /// Page type active when the step executed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_type: Option<String>,
}

/// A recording task row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Task ID
    pub id: Uuid,
    /// Source (capability catalogue entry) this task recorded
    pub source_id: i64,
    /// Scenario text the recorder was driven with
    pub scenario: String,
    /// Starting URL
    pub start_url: String,
    /// Current status
    pub status: TaskStatus,
    /// Total duration, set with the terminal status
    pub duration_ms: Option<u64>,
    /// Token totals, set with the terminal status
    pub tokens: TaskTokens,
    /// Error message for failed tasks
    pub error_message: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Completion timestamp
    pub completed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_status_roundtrip() {
        for status in [
            TaskStatus::Running,
            TaskStatus::Completed,
            TaskStatus::Partial,
            TaskStatus::Failed,
        ] {
            assert_eq!(TaskStatus::from_str(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!TaskStatus::Running.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Partial.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
    }
}
