//! Chat client trait and response types
//!
//! The recorder exchanges one request/response with the chat client per turn.
//! The client is opaque: it may retry or rate-limit internally. The recorder
//! only reads the returned tool calls and token usage.

use crate::error::Result;
use crate::message::Message;
use crate::tools::{ToolCall, ToolDefinition};
use serde::{Deserialize, Serialize};

/// Token usage for one chat exchange
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Input (prompt) tokens
    pub input_tokens: u64,
    /// Output (completion) tokens
    pub output_tokens: u64,
}

impl TokenUsage {
    /// Total tokens for this exchange
    #[must_use]
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// Response from one chat exchange
#[derive(Debug, Clone, Default)]
pub struct ChatResponse {
    /// Text content, if any
    pub content: Option<String>,
    /// Tool calls requested by the model, in execution order
    pub tool_calls: Vec<ToolCall>,
    /// Token usage for this exchange
    pub usage: TokenUsage,
}

impl ChatResponse {
    /// True when the model requested no further tool calls
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.tool_calls.is_empty()
    }
}

/// Tool-calling chat client
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ChatClient: Send + Sync {
    /// Send the transcript plus the available tool schema, get one decision back
    async fn chat(&self, messages: &[Message], tools: &[ToolDefinition]) -> Result<ChatResponse>;

    /// Client name (for logging)
    fn name(&self) -> &str;
}
