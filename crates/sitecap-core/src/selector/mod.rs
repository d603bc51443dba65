//! Selector extraction
//!
//! Pure functions that turn raw element attributes into a ranked,
//! deduplicated list of candidate selectors, with dynamic-value template
//! detection so one recorded selector can stand in for arbitrarily many
//! concrete values (dates today, more patterns later).

mod extractor;
mod template;

pub use extractor::{extract_selectors, extract_selectors_with};
pub use template::{fill_template, TemplateEngine, TemplatePattern, TemplateScope};
