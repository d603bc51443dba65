//! Sitecap Store - Capability and task persistence
//!
//! This crate provides the storage layer for recorded site capabilities and
//! recording tasks:
//! - Task: task/step record types and statuses
//! - Store: the `CapabilityStore` trait, a SQLite backend, and an in-memory
//!   backend for tests
//!
//! A store is opened once per builder instance and survives build retries;
//! only an explicit `close()` (dropping the pool) tears it down. `save` is an
//! idempotent upsert keyed on domain so concurrent writers and repeated
//! finalize/partial-save calls are safe.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod memory;
pub mod sqlite;
pub mod task;
pub mod traits;

pub use error::{Error, Result};
pub use memory::MemoryCapabilityStore;
pub use sqlite::SqliteCapabilityStore;
pub use task::{StoredStep, TaskRecord, TaskStatus, TaskTokens};
pub use traits::CapabilityStore;
