//! The `CapabilityStore` trait

use crate::error::Result;
use crate::task::{StoredStep, TaskStatus, TaskTokens};
use uuid::Uuid;

/// Storage backend for capability catalogues and recording tasks
///
/// Implementations must tolerate concurrent writers: `save` is an idempotent
/// upsert keyed on domain, and terminal `complete_task` writes may arrive
/// from racing finalize paths (the caller guards against double writes, the
/// store only needs to accept whichever arrives).
#[async_trait::async_trait]
pub trait CapabilityStore: Send + Sync {
    /// Upsert a capability catalogue entry for a domain; returns the source id
    async fn save(&self, domain: &str, capability: &serde_json::Value) -> Result<i64>;

    /// Create a recording task bound to a source
    async fn create_task(&self, source_id: i64, scenario: &str, start_url: &str) -> Result<Uuid>;

    /// Append a step to a task's telemetry log
    async fn add_step(&self, task_id: Uuid, step: &StoredStep) -> Result<()>;

    /// Write a task's terminal status
    async fn complete_task(
        &self,
        task_id: Uuid,
        status: TaskStatus,
        duration_ms: u64,
        tokens: TaskTokens,
        error_message: Option<&str>,
    ) -> Result<()>;

    /// Store name (for logging)
    fn name(&self) -> &str;
}
