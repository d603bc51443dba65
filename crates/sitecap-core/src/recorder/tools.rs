//! The closed tool set exposed to the chat client
//!
//! The model interacts with the session exclusively through these tools.
//! Anything outside the set deserializes to an error and is reported back
//! to the model as a failed step instead of aborting the session.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sitecap_browser::RawElementAttributes;
use sitecap_llm::{ToolCall, ToolDefinition};

/// One decoded tool invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RecorderTool {
    /// Declare the page-type context for subsequent registrations
    SetPageContext {
        /// Page-type key, e.g. `search_results`
        page_type: String,
        /// Display name
        name: String,
        /// Description
        #[serde(default)]
        description: Option<String>,
        /// URL patterns identifying this page type
        #[serde(default)]
        url_patterns: Vec<String>,
    },
    /// Register one interactive element into the capability
    RegisterElement {
        /// Stable snake_case element id
        element_id: String,
        /// Element kind, e.g. `button`
        kind: String,
        /// Human description
        #[serde(default)]
        description: Option<String>,
        /// Allowed interaction methods
        #[serde(default)]
        methods: Vec<String>,
        /// Raw attributes observed in the DOM
        attributes: RawElementAttributes,
        /// `type` attribute for form controls
        #[serde(default)]
        input_type: Option<String>,
        /// `name` attribute for form controls
        #[serde(default)]
        input_name: Option<String>,
        /// Default value for form controls
        #[serde(default)]
        default_value: Option<String>,
        /// `href` for links
        #[serde(default)]
        href: Option<String>,
        /// Element that must be interacted with first
        #[serde(default)]
        depends_on: Option<String>,
    },
    /// Navigate the browser to a URL on the session's domain
    Navigate {
        /// Absolute target URL
        url: String,
    },
    /// Run an observation pass over the current page
    Observe {
        /// Optional focus instruction for the observation
        #[serde(default)]
        instruction: Option<String>,
    },
    /// Scroll down one viewport
    Scroll,
    /// Scroll to the bottom of the page
    ScrollToBottom,
    /// Pause briefly, e.g. for content to settle
    Wait {
        /// Milliseconds to wait; clamped to the configured ceiling
        #[serde(default)]
        ms: Option<u64>,
    },
    /// Navigate back in browser history
    GoBack,
}

impl RecorderTool {
    /// Decode a chat tool call into a recorder tool
    pub fn from_call(call: &ToolCall) -> Result<Self> {
        let mut value: serde_json::Value = if call.arguments.trim().is_empty() {
            json!({})
        } else {
            serde_json::from_str(&call.arguments)
                .map_err(|e| Error::InvalidInput(format!("malformed tool arguments: {e}")))?
        };
        match &mut value {
            serde_json::Value::Object(map) => {
                map.insert("action".to_string(), json!(call.name));
            }
            _ => {
                return Err(Error::InvalidInput(format!(
                    "tool arguments for {} must be an object",
                    call.name
                )))
            }
        }
        serde_json::from_value(value)
            .map_err(|e| Error::InvalidInput(format!("unknown or malformed tool {}: {e}", call.name)))
    }

    /// Tool name as exposed to the model
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetPageContext { .. } => "set_page_context",
            Self::RegisterElement { .. } => "register_element",
            Self::Navigate { .. } => "navigate",
            Self::Observe { .. } => "observe",
            Self::Scroll => "scroll",
            Self::ScrollToBottom => "scroll_to_bottom",
            Self::Wait { .. } => "wait",
            Self::GoBack => "go_back",
        }
    }

    /// True for tools wrapped in per-tool retry on transient failure
    #[must_use]
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            Self::Navigate { .. } | Self::Observe { .. } | Self::GoBack
        )
    }

    /// Schemas for the full tool set, handed to the chat client each turn
    #[must_use]
    pub fn definitions() -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: "set_page_context".to_string(),
                description: "Declare the current page type. Elements registered afterwards \
                              attach to this page until the context changes."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "page_type": {"type": "string", "description": "Stable snake_case page key, e.g. search_results"},
                        "name": {"type": "string", "description": "Display name"},
                        "description": {"type": "string"},
                        "url_patterns": {"type": "array", "items": {"type": "string"}, "description": "URL substrings identifying this page type"}
                    },
                    "required": ["page_type", "name"]
                }),
            },
            ToolDefinition {
                name: "register_element".to_string(),
                description: "Record one interactive element with its raw DOM attributes. \
                              Re-registering an id overwrites the earlier entry."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "element_id": {"type": "string", "description": "Stable snake_case id, unique in this session"},
                        "kind": {"type": "string", "enum": ["button", "link", "input", "select", "checkbox", "radio", "textarea", "other"]},
                        "description": {"type": "string"},
                        "methods": {"type": "array", "items": {"type": "string", "enum": ["click", "fill", "type", "select", "hover", "press"]}},
                        "attributes": {
                            "type": "object",
                            "properties": {
                                "tag": {"type": "string"},
                                "id": {"type": "string"},
                                "data_testid": {"type": "string"},
                                "aria_label": {"type": "string"},
                                "placeholder": {"type": "string"},
                                "data_attributes": {"type": "object", "additionalProperties": {"type": "string"}},
                                "raw_selector": {"type": "string"},
                                "css_selector": {"type": "string"}
                            },
                            "required": ["tag"]
                        },
                        "input_type": {"type": "string"},
                        "input_name": {"type": "string"},
                        "default_value": {"type": "string"},
                        "href": {"type": "string"},
                        "depends_on": {"type": "string", "description": "Id of an element that must be used first"}
                    },
                    "required": ["element_id", "kind", "attributes"]
                }),
            },
            ToolDefinition {
                name: "navigate".to_string(),
                description: "Navigate to an absolute URL. Only URLs on the session's domain \
                              are followed."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "url": {"type": "string", "description": "Absolute URL"}
                    },
                    "required": ["url"]
                }),
            },
            ToolDefinition {
                name: "observe".to_string(),
                description: "List the interactive elements on the current page, optionally \
                              focused by an instruction."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "instruction": {"type": "string", "description": "Optional focus, e.g. 'the filter sidebar'"}
                    }
                }),
            },
            ToolDefinition {
                name: "scroll".to_string(),
                description: "Scroll down one viewport.".to_string(),
                parameters: json!({"type": "object", "properties": {}}),
            },
            ToolDefinition {
                name: "scroll_to_bottom".to_string(),
                description: "Scroll to the bottom of the page to trigger lazy-loaded content."
                    .to_string(),
                parameters: json!({"type": "object", "properties": {}}),
            },
            ToolDefinition {
                name: "wait".to_string(),
                description: "Pause for the given number of milliseconds.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "ms": {"type": "integer", "minimum": 0}
                    }
                }),
            },
            ToolDefinition {
                name: "go_back".to_string(),
                description: "Navigate back in browser history.".to_string(),
                parameters: json!({"type": "object", "properties": {}}),
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: "call_1".to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }

    #[test]
    fn test_decode_navigate() {
        let tool =
            RecorderTool::from_call(&call("navigate", r#"{"url": "https://example.com/s"}"#))
                .unwrap();
        assert!(matches!(tool, RecorderTool::Navigate { ref url } if url == "https://example.com/s"));
        assert!(tool.retryable());
    }

    #[test]
    fn test_decode_empty_arguments() {
        let tool = RecorderTool::from_call(&call("go_back", "")).unwrap();
        assert!(matches!(tool, RecorderTool::GoBack));
    }

    #[test]
    fn test_unknown_tool_rejected() {
        let err = RecorderTool::from_call(&call("launch_missiles", "{}")).unwrap_err();
        assert!(err.to_string().contains("launch_missiles"));
    }

    #[test]
    fn test_register_element_defaults() {
        let tool = RecorderTool::from_call(&call(
            "register_element",
            r#"{"element_id": "search_button", "kind": "button", "attributes": {"tag": "button"}}"#,
        ))
        .unwrap();
        match tool {
            RecorderTool::RegisterElement {
                element_id,
                methods,
                depends_on,
                ..
            } => {
                assert_eq!(element_id, "search_button");
                assert!(methods.is_empty());
                assert!(depends_on.is_none());
            }
            other => panic!("unexpected tool: {other:?}"),
        }
    }

    #[test]
    fn test_definitions_cover_tool_set() {
        let names: Vec<String> = RecorderTool::definitions()
            .into_iter()
            .map(|d| d.name)
            .collect();
        for expected in [
            "set_page_context",
            "register_element",
            "navigate",
            "observe",
            "scroll",
            "scroll_to_bottom",
            "wait",
            "go_back",
        ] {
            assert!(names.contains(&expected.to_string()), "missing {expected}");
        }
    }
}
