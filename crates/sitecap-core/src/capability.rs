//! Site capability data model
//!
//! A capability is the recorded catalogue of a site's pages and interactive
//! elements. It is created lazily on the first successful navigation, mutated
//! throughout a recording session, and persisted at session end.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kind of an interactive element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    /// Button
    Button,
    /// Link
    Link,
    /// Text input
    Input,
    /// Select / dropdown
    Select,
    /// Checkbox
    Checkbox,
    /// Radio button
    Radio,
    /// Multi-line text input
    Textarea,
    /// Anything else
    #[serde(other)]
    Other,
}

/// Interaction method allowed on an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionMethod {
    /// Click the element
    Click,
    /// Fill the element with a value (clears first)
    Fill,
    /// Type into the element
    Type,
    /// Select an option
    Select,
    /// Hover over the element
    Hover,
    /// Press a key while focused
    Press,
    /// Anything else
    #[serde(other)]
    Other,
}

/// Kind of a candidate selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorKind {
    /// `id` attribute
    Id,
    /// `data-testid` attribute
    DataTestid,
    /// `aria-label` attribute
    AriaLabel,
    /// CSS selector
    Css,
    /// XPath selector
    Xpath,
    /// `placeholder` attribute
    Placeholder,
    /// Visible text
    Text,
}

/// Template parameter attached to a selector with a dynamic fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateParam {
    /// Parameter name (the placeholder is `{{name}}`)
    pub name: String,
    /// Parameter type, e.g. `date`
    #[serde(rename = "type")]
    pub param_type: String,
    /// Expected value format, e.g. `YYYY-MM-DD`
    pub format: String,
    /// Human description of the parameter
    pub description: String,
}

/// One ranked candidate selector for an element
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorItem {
    /// Selector kind
    pub kind: SelectorKind,
    /// Literal value, or a template string containing `{{...}}` placeholders
    pub value: String,
    /// Priority rank; lower is tried first (more stable)
    pub priority: u32,
    /// Confidence score in `[0, 1]`
    pub confidence: f32,
    /// Template metadata when the value embeds a dynamic component
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<TemplateParam>,
}

/// Input-specific metadata for form controls
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputMeta {
    /// `type` attribute of the input
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
    /// `name` attribute of the input
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Default value, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl InputMeta {
    /// True when no field is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.input_type.is_none() && self.name.is_none() && self.default_value.is_none()
    }
}

/// One recorded interactive element
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementCapability {
    /// Stable element id, snake_case, unique within the session
    pub id: String,
    /// Element kind
    pub kind: ElementKind,
    /// Allowed interaction methods
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<InteractionMethod>,
    /// Ranked candidate selectors, most stable first
    pub selectors: Vec<SelectorItem>,
    /// Human description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Element this one depends on (e.g. a menu that must be open first)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<String>,
    /// Input metadata for form controls
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<InputMeta>,
    /// `href` for links
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

/// One recorded page, keyed by page-type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageCapability {
    /// Page-type key, e.g. `search_results`
    pub page_type: String,
    /// Display name
    pub name: String,
    /// Description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// URL patterns that identify this page type
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub url_patterns: Vec<String>,
    /// Concrete URL snapshot from when the page context was set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Elements local to this page, keyed by element id
    #[serde(default)]
    pub elements: BTreeMap<String, ElementCapability>,
}

/// The recorded catalogue of one site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteCapability {
    /// Domain identity, e.g. `example.com`
    pub domain: String,
    /// Site display name
    pub name: String,
    /// Free-text description
    pub description: String,
    /// Scenario the recording session was driven with
    pub scenario: String,
    /// Recording timestamp
    pub recorded_at: DateTime<Utc>,
    /// Elements not bound to any page, keyed by element id
    #[serde(default)]
    pub global_elements: BTreeMap<String, ElementCapability>,
    /// Pages keyed by page-type
    #[serde(default)]
    pub pages: BTreeMap<String, PageCapability>,
}

impl SiteCapability {
    /// Create an empty capability for a domain
    #[must_use]
    pub fn new(
        domain: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        scenario: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            name: name.into(),
            description: description.into(),
            scenario: scenario.into(),
            recorded_at: Utc::now(),
            global_elements: BTreeMap::new(),
            pages: BTreeMap::new(),
        }
    }

    /// Ensure a page entry exists and return a mutable reference to it
    pub fn page_mut(&mut self, page: PageCapability) -> &mut PageCapability {
        self.pages
            .entry(page.page_type.clone())
            .or_insert_with(|| page)
    }

    /// Register an element into the container rule's target: the given page
    /// if one is active, otherwise the global mapping. Registration is an
    /// upsert; a repeated id overwrites the existing entry.
    pub fn register_element(&mut self, page_type: Option<&str>, element: ElementCapability) {
        let container = match page_type.and_then(|p| self.pages.get_mut(p)) {
            Some(page) => &mut page.elements,
            None => &mut self.global_elements,
        };
        container.insert(element.id.clone(), element);
    }

    /// Total number of distinct discovered elements across all containers
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.global_elements.len() + self.pages.values().map(|p| p.elements.len()).sum::<usize>()
    }

    /// Iterate over all elements, global first, then page by page
    pub fn elements(&self) -> impl Iterator<Item = &ElementCapability> {
        self.global_elements
            .values()
            .chain(self.pages.values().flat_map(|p| p.elements.values()))
    }

    /// Iterate mutably over all elements
    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut ElementCapability> {
        self.global_elements
            .values_mut()
            .chain(self.pages.values_mut().flat_map(|p| p.elements.values_mut()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(id: &str) -> ElementCapability {
        ElementCapability {
            id: id.to_string(),
            kind: ElementKind::Button,
            methods: vec![InteractionMethod::Click],
            selectors: Vec::new(),
            description: None,
            depends_on: None,
            input: None,
            href: None,
        }
    }

    #[test]
    fn test_register_is_upsert() {
        let mut cap = SiteCapability::new("example.com", "Example", "", "scenario");
        cap.register_element(None, element("search_button"));
        cap.register_element(None, element("search_button"));
        assert_eq!(cap.element_count(), 1);
    }

    #[test]
    fn test_container_rule() {
        let mut cap = SiteCapability::new("example.com", "Example", "", "scenario");
        cap.page_mut(PageCapability {
            page_type: "search".to_string(),
            name: "Search".to_string(),
            description: None,
            url_patterns: vec!["/s".to_string()],
            url: None,
            elements: BTreeMap::new(),
        });

        cap.register_element(Some("search"), element("query_input"));
        cap.register_element(None, element("nav_home"));

        assert_eq!(cap.pages["search"].elements.len(), 1);
        assert_eq!(cap.global_elements.len(), 1);
        assert_eq!(cap.element_count(), 2);
    }

    #[test]
    fn test_unknown_page_falls_back_to_global() {
        let mut cap = SiteCapability::new("example.com", "Example", "", "scenario");
        cap.register_element(Some("missing"), element("orphan"));
        assert_eq!(cap.global_elements.len(), 1);
    }

    #[test]
    fn test_element_kind_other_fallback() {
        let kind: ElementKind = serde_json::from_str("\"carousel\"").unwrap();
        assert_eq!(kind, ElementKind::Other);
    }
}
