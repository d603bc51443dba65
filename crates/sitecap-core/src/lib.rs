//! Sitecap Core - Capability Recording Engine
//!
//! This crate drives an LLM-directed agent that explores a website and
//! produces a durable, structured catalogue of its interactive elements.
//! It is organized around two layers:
//!
//! - `recorder`: the turn-loop orchestrator. Owns session state (discovered
//!   elements, page context, visited URLs, token/step counters), checks
//!   termination at the start of every turn, asks the chat client for one
//!   decision, executes the returned tool calls with per-tool retry, and
//!   finalizes with optimize-and-persist.
//! - `builder`: the build wrapper. Races one recorder run against a wall
//!   clock, retries transient infrastructure failures with a fresh browser
//!   session, and recovers a partial result when the timeout wins.
//!
//! Pure leaves live in `selector` (ranked selector extraction with
//! dynamic-value templates) and `recorder::termination` (the termination
//! evaluator). Collaborators (chat client, browser adapter, persistence)
//! stay behind the trait seams in the sibling crates.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod builder;
pub mod capability;
pub mod error;
pub mod optimizer;
pub mod recorder;
pub mod retry;
pub mod selector;

pub use builder::{BuildOptions, Builder};
pub use capability::{
    ElementCapability, ElementKind, InputMeta, InteractionMethod, PageCapability, SelectorItem,
    SelectorKind, SiteCapability, TemplateParam,
};
pub use error::{Error, Result};
pub use optimizer::SelectorOptimizer;
pub use recorder::{
    PartialSnapshot, RecordRequest, RecordResult, RecordTokens, Recorder, RecorderConfig,
    StepRecord, StepSink, TerminationReason,
};
pub use selector::{extract_selectors, TemplateEngine};
