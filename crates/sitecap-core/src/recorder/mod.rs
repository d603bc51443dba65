//! Recorder - the turn-loop orchestrator
//!
//! One recorder instance owns one isolated recording session. Each turn it
//! checks termination, requests one decision from the chat client, executes
//! the returned tool calls sequentially (with per-tool retry for navigation
//! and observation), updates session state, and records step telemetry.
//!
//! # Module Structure
//!
//! - `types`: request/result envelope types (RecordRequest, RecordResult)
//! - `config`: RecorderConfig
//! - `core`: Recorder struct and builder methods
//! - `session`: per-session state and counters, visited-URL normalization
//! - `termination`: the pure termination evaluator
//! - `tools`: the closed tool set and its JSON schemas
//! - `process`: the turn loop
//! - `finalize`: optimize-and-persist, partial-result recovery
//! - `steps`: step telemetry and the StepSink callback

mod config;
mod core;
mod finalize;
mod process;
mod session;
mod steps;
mod termination;
mod tools;
mod types;

pub use config::RecorderConfig;
pub use self::core::Recorder;
pub use session::normalize_url;
pub use steps::StepSink;
pub use termination::{TerminationLimits, TerminationReason};
pub use tools::RecorderTool;
pub use types::{PartialSnapshot, RecordRequest, RecordResult, RecordTokens, StepRecord};
