//! Sitecap LLM - Chat client abstraction
//!
//! This crate provides the chat-client seam for the recording engine:
//! - Message: conversation message types
//! - Tools: tool definitions and tool calls for function calling
//! - Client: the `ChatClient` trait the recorder drives each turn

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod error;
pub mod message;
pub mod tools;

pub use client::{ChatClient, ChatResponse, TokenUsage};
pub use error::{Error, Result};
pub use message::{Message, MessageRole};
pub use tools::{ToolCall, ToolDefinition};
