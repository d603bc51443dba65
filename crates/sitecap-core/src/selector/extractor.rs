//! Ranked selector extraction
//!
//! Turns the raw attributes observed for one element into an ordered
//! `SelectorItem` list, most stable first. The priority order is fixed:
//! id, data-testid, aria-label, remaining data-* attributes (template
//! pattern tried first), the supplied CSS selector, a structural selector
//! derived from the raw observation, and finally placeholder for form
//! controls. Duplicated values keep their first-found rank.

use crate::capability::{SelectorItem, SelectorKind, TemplateParam};
use crate::selector::template::{TemplateEngine, TemplateScope};
use once_cell::sync::Lazy;
use regex::Regex;
use sitecap_browser::RawElementAttributes;

static SAFE_BARE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").expect("valid regex"));

const CONFIDENCE_ID: f32 = 0.95;
const CONFIDENCE_TESTID: f32 = 0.9;
const CONFIDENCE_ARIA: f32 = 0.85;
const CONFIDENCE_DATA_TEMPLATE: f32 = 0.8;
const CONFIDENCE_DATA: f32 = 0.75;
const CONFIDENCE_CSS: f32 = 0.6;
const CONFIDENCE_PLACEHOLDER: f32 = 0.5;
const CONFIDENCE_STRUCTURAL: f32 = 0.4;

struct Ranked {
    items: Vec<SelectorItem>,
}

impl Ranked {
    fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Append unless the same value was already emitted (first-found wins)
    fn push(
        &mut self,
        kind: SelectorKind,
        value: String,
        confidence: f32,
        template: Option<TemplateParam>,
    ) {
        if self.items.iter().any(|s| s.value == value) {
            return;
        }
        let priority = self.items.len() as u32 + 1;
        self.items.push(SelectorItem {
            kind,
            value,
            priority,
            confidence,
            template,
        });
    }
}

/// Quote a value for use inside an attribute selector
fn quote_attr(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Normalize a raw observation selector into a plain relative path.
///
/// Observation backends report cross-frame paths with a frame combinator
/// (`iframe >>> button.buy`); only the innermost segment is addressable once
/// the frame is entered, so everything before the last combinator is dropped.
fn normalize_structural(raw: &str) -> (SelectorKind, String) {
    let inner = raw.rsplit(">>>").next().unwrap_or(raw).trim();
    let inner = inner.strip_prefix("xpath=").unwrap_or(inner).trim();
    if inner.starts_with('/') || inner.starts_with("./") || inner.starts_with("(/") {
        (SelectorKind::Xpath, inner.to_string())
    } else {
        (SelectorKind::Css, inner.to_string())
    }
}

fn is_form_control(tag: &str) -> bool {
    matches!(tag, "input" | "textarea" | "select")
}

/// Extract a ranked selector list using the default template patterns
#[must_use]
pub fn extract_selectors(attrs: &RawElementAttributes) -> Vec<SelectorItem> {
    static DEFAULT_ENGINE: Lazy<TemplateEngine> = Lazy::new(TemplateEngine::new);
    extract_selectors_with(&DEFAULT_ENGINE, attrs)
}

/// Extract a ranked selector list with a custom template engine
#[must_use]
pub fn extract_selectors_with(
    engine: &TemplateEngine,
    attrs: &RawElementAttributes,
) -> Vec<SelectorItem> {
    let mut ranked = Ranked::new();

    // 1. id attribute, escaped into an attribute selector when unsafe
    if let Some(id) = attrs.id.as_deref().filter(|s| !s.is_empty()) {
        let value = if SAFE_BARE_ID.is_match(id) {
            format!("#{id}")
        } else {
            format!("[id={}]", quote_attr(id))
        };
        ranked.push(SelectorKind::Id, value, CONFIDENCE_ID, None);
    }

    // 2. data-testid
    if let Some(testid) = attrs.data_testid.as_deref().filter(|s| !s.is_empty()) {
        ranked.push(
            SelectorKind::DataTestid,
            format!("[data-testid={}]", quote_attr(testid)),
            CONFIDENCE_TESTID,
            None,
        );
    }

    // 3. aria-label, template pattern tried against the label text
    if let Some(label) = attrs.aria_label.as_deref().filter(|s| !s.is_empty()) {
        match engine.detect(TemplateScope::AriaLabel, label) {
            Some((rewritten, param)) => ranked.push(
                SelectorKind::AriaLabel,
                format!("[aria-label={}]", quote_attr(&rewritten)),
                CONFIDENCE_ARIA,
                Some(param),
            ),
            None => ranked.push(
                SelectorKind::AriaLabel,
                format!("[aria-label={}]", quote_attr(label)),
                CONFIDENCE_ARIA,
                None,
            ),
        }
    }

    // 4. remaining data-* attributes, template pattern first
    for (attr, value) in &attrs.data_attributes {
        if attr == "data-testid" || value.is_empty() {
            continue;
        }
        let literal = format!("[{}={}]", attr, quote_attr(value));
        match engine.detect(TemplateScope::AttributeSelector, &literal) {
            Some((rewritten, param)) => ranked.push(
                SelectorKind::Css,
                rewritten,
                CONFIDENCE_DATA_TEMPLATE,
                Some(param),
            ),
            None => ranked.push(SelectorKind::Css, literal, CONFIDENCE_DATA, None),
        }
    }

    // 5. supplied CSS selector (dedup drops it when a data-attribute match
    //    already emitted the same value)
    if let Some(css) = attrs.css_selector.as_deref().filter(|s| !s.is_empty()) {
        ranked.push(SelectorKind::Css, css.to_string(), CONFIDENCE_CSS, None);
    }

    // 6. structural selector from the raw observation
    if let Some(raw) = attrs.raw_selector.as_deref().filter(|s| !s.is_empty()) {
        let (kind, value) = normalize_structural(raw);
        ranked.push(kind, value, CONFIDENCE_STRUCTURAL, None);
    }

    // 7. placeholder for form controls
    if is_form_control(&attrs.tag) {
        if let Some(placeholder) = attrs.placeholder.as_deref().filter(|s| !s.is_empty()) {
            ranked.push(
                SelectorKind::Placeholder,
                format!("[placeholder={}]", quote_attr(placeholder)),
                CONFIDENCE_PLACEHOLDER,
                None,
            );
        }
    }

    // An observed element never yields an empty list: fall back to the tag
    if ranked.items.is_empty() && !attrs.tag.is_empty() {
        ranked.push(
            SelectorKind::Css,
            attrs.tag.clone(),
            CONFIDENCE_STRUCTURAL,
            None,
        );
    }

    ranked.items
}
