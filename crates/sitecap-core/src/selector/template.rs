//! Dynamic-value template detection
//!
//! A template pattern recognizes a dynamic fragment embedded in an otherwise
//! stable selector value and rewrites it into a `{{name}}` placeholder with
//! an attached parameter descriptor. Patterns form an ordered strategy list;
//! the first match wins. New dynamic-value kinds (ids, prices) are added by
//! appending a pattern, not by branching.

use crate::capability::TemplateParam;
use once_cell::sync::Lazy;
use regex::Regex;

/// Where a pattern applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateScope {
    /// Bracketed attribute selectors, e.g. `[data-date="2025-12-10"]`
    AttributeSelector,
    /// `aria-label` values
    AriaLabel,
}

/// One (pattern, parameter-descriptor) pair
#[derive(Debug, Clone)]
pub struct TemplatePattern {
    /// Scope the pattern applies to
    pub scope: TemplateScope,
    /// Regex whose first capture group is the dynamic fragment
    pub regex: Regex,
    /// Descriptor attached to a rewritten selector
    pub param: TemplateParam,
}

static ISO_DATE_IN_BRACKETS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\[[^\[\]]*?(\d{4}-\d{2}-\d{2})[^\[\]]*?\]"#).expect("valid regex"));

static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4}-\d{2}-\d{2})").expect("valid regex"));

fn date_param() -> TemplateParam {
    TemplateParam {
        name: "date".to_string(),
        param_type: "date".to_string(),
        format: "YYYY-MM-DD".to_string(),
        description: "Calendar date embedded in the selector".to_string(),
    }
}

/// Ordered list of template patterns
#[derive(Debug, Clone)]
pub struct TemplateEngine {
    patterns: Vec<TemplatePattern>,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self {
            patterns: vec![
                TemplatePattern {
                    scope: TemplateScope::AttributeSelector,
                    regex: ISO_DATE_IN_BRACKETS.clone(),
                    param: date_param(),
                },
                TemplatePattern {
                    scope: TemplateScope::AriaLabel,
                    regex: ISO_DATE.clone(),
                    param: date_param(),
                },
            ],
        }
    }
}

impl TemplateEngine {
    /// Engine with the default date patterns
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine with no patterns (template detection disabled)
    #[must_use]
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// Append a pattern to the strategy list
    #[must_use]
    pub fn with_pattern(mut self, pattern: TemplatePattern) -> Self {
        self.patterns.push(pattern);
        self
    }

    /// Try the patterns for `scope` against `value`, in order.
    ///
    /// On a match the dynamic fragment (the first capture group) is replaced
    /// with the parameter's placeholder and the descriptor is returned.
    #[must_use]
    pub fn detect(&self, scope: TemplateScope, value: &str) -> Option<(String, TemplateParam)> {
        for pattern in self.patterns.iter().filter(|p| p.scope == scope) {
            if let Some(caps) = pattern.regex.captures(value) {
                if let Some(fragment) = caps.get(1) {
                    let placeholder = format!("{{{{{}}}}}", pattern.param.name);
                    let rewritten = format!(
                        "{}{}{}",
                        &value[..fragment.start()],
                        placeholder,
                        &value[fragment.end()..]
                    );
                    return Some((rewritten, pattern.param.clone()));
                }
            }
        }
        None
    }
}

/// Substitute a concrete value back into a template selector
#[must_use]
pub fn fill_template(template: &str, param_name: &str, value: &str) -> String {
    template.replace(&format!("{{{{{param_name}}}}}"), value)
}
