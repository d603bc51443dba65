//! Element observation types
//!
//! An observe call enumerates candidate interactive elements on the current
//! page. Each element carries the raw attributes the selector extractor turns
//! into a ranked selector list.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw attributes observed for one element
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawElementAttributes {
    /// Tag name (lowercase)
    pub tag: String,
    /// `id` attribute
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// `data-testid` attribute
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_testid: Option<String>,
    /// `aria-label` attribute
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aria_label: Option<String>,
    /// `placeholder` attribute (form controls)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    /// Remaining `data-*` attributes, keyed by full attribute name.
    /// BTreeMap keeps extraction order deterministic.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data_attributes: BTreeMap<String, String>,
    /// Raw selector reported by the observation backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_selector: Option<String>,
    /// CSS selector supplied by the backend, if it computed one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub css_selector: Option<String>,
}

/// One element returned by an observe call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservedElement {
    /// Human description from the observation backend
    pub description: String,
    /// Raw attributes for selector extraction
    pub attributes: RawElementAttributes,
    /// Visible text, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes_roundtrip() {
        let mut data = BTreeMap::new();
        data.insert("data-date".to_string(), "2025-12-10".to_string());
        let attrs = RawElementAttributes {
            tag: "button".to_string(),
            id: Some("submit".to_string()),
            data_attributes: data,
            ..Default::default()
        };
        let json = serde_json::to_string(&attrs).unwrap();
        let back: RawElementAttributes = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id.as_deref(), Some("submit"));
        assert_eq!(back.data_attributes.get("data-date").unwrap(), "2025-12-10");
    }
}
