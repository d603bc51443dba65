//! Tool types for LLM function calling

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Tool definition for function calling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name
    pub name: String,
    /// Tool description
    pub description: String,
    /// JSON schema for parameters
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Create a new tool definition
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// A tool call requested by the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique ID for this tool call
    pub id: String,
    /// Tool name
    pub name: String,
    /// Arguments as JSON string
    pub arguments: String,
}

impl ToolCall {
    /// Parse arguments as a typed value
    pub fn parse_arguments<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.arguments).map_err(|e| Error::InvalidResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_definition() {
        let tool = ToolDefinition::new(
            "navigate",
            "Navigate the browser to a URL",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "url": {"type": "string"}
                },
                "required": ["url"]
            }),
        );

        assert_eq!(tool.name, "navigate");
        assert_eq!(tool.description, "Navigate the browser to a URL");
    }

    #[test]
    fn test_tool_call_parse_arguments() {
        let tool_call = ToolCall {
            id: "call_123".to_string(),
            name: "navigate".to_string(),
            arguments: r#"{"url": "https://example.com"}"#.to_string(),
        };

        #[derive(Deserialize)]
        struct Args {
            url: String,
        }

        let args: Args = tool_call.parse_arguments().unwrap();
        assert_eq!(args.url, "https://example.com");
    }

    #[test]
    fn test_tool_call_bad_arguments() {
        let tool_call = ToolCall {
            id: "call_124".to_string(),
            name: "navigate".to_string(),
            arguments: "not json".to_string(),
        };
        let parsed: Result<serde_json::Value> = tool_call.parse_arguments();
        assert!(parsed.is_err());
    }
}
