//! In-memory capability store
//!
//! Used by tests and by callers that want recording without durable
//! persistence. Mirrors the SQLite backend's semantics, including the
//! domain-keyed idempotent save.

use crate::error::{Error, Result};
use crate::task::{StoredStep, TaskRecord, TaskStatus, TaskTokens};
use crate::traits::CapabilityStore;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    sources: HashMap<String, (i64, serde_json::Value)>,
    next_source_id: i64,
    tasks: HashMap<Uuid, TaskRecord>,
    steps: HashMap<Uuid, Vec<StoredStep>>,
}

/// Capability store kept entirely in memory
#[derive(Default)]
pub struct MemoryCapabilityStore {
    inner: Mutex<Inner>,
}

impl MemoryCapabilityStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the stored capability for a domain, if any
    #[must_use]
    pub fn capability(&self, domain: &str) -> Option<serde_json::Value> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.sources.get(domain).map(|(_, cap)| cap.clone())
    }

    /// Snapshot a task record
    #[must_use]
    pub fn task(&self, task_id: Uuid) -> Option<TaskRecord> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.tasks.get(&task_id).cloned()
    }

    /// Ids of every task ever created, in no particular order
    #[must_use]
    pub fn task_ids(&self) -> Vec<Uuid> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.tasks.keys().copied().collect()
    }

    /// Number of steps recorded for a task
    #[must_use]
    pub fn step_count(&self, task_id: Uuid) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.steps.get(&task_id).map_or(0, Vec::len)
    }
}

#[async_trait::async_trait]
impl CapabilityStore for MemoryCapabilityStore {
    async fn save(&self, domain: &str, capability: &serde_json::Value) -> Result<i64> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some((id, cap)) = inner.sources.get_mut(domain) {
            *cap = capability.clone();
            return Ok(*id);
        }
        inner.next_source_id += 1;
        let id = inner.next_source_id;
        inner
            .sources
            .insert(domain.to_string(), (id, capability.clone()));
        Ok(id)
    }

    async fn create_task(&self, source_id: i64, scenario: &str, start_url: &str) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let record = TaskRecord {
            id,
            source_id,
            scenario: scenario.to_string(),
            start_url: start_url.to_string(),
            status: TaskStatus::Running,
            duration_ms: None,
            tokens: TaskTokens::default(),
            error_message: None,
            created_at: Utc::now(),
            completed_at: None,
        };
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.tasks.insert(id, record);
        Ok(id)
    }

    async fn add_step(&self, task_id: Uuid, step: &StoredStep) -> Result<()> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if !inner.tasks.contains_key(&task_id) {
            return Err(Error::TaskNotFound(task_id.to_string()));
        }
        inner.steps.entry(task_id).or_default().push(step.clone());
        Ok(())
    }

    async fn complete_task(
        &self,
        task_id: Uuid,
        status: TaskStatus,
        duration_ms: u64,
        tokens: TaskTokens,
        error_message: Option<&str>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let task = inner
            .tasks
            .get_mut(&task_id)
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
        task.status = status;
        task.duration_ms = Some(duration_ms);
        task.tokens = tokens;
        task.error_message = error_message.map(String::from);
        task.completed_at = Some(Utc::now());
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_save_upserts() {
        let store = MemoryCapabilityStore::new();
        let a = store
            .save("example.com", &serde_json::json!({"v": 1}))
            .await
            .unwrap();
        let b = store
            .save("example.com", &serde_json::json!({"v": 2}))
            .await
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(
            store.capability("example.com").unwrap(),
            serde_json::json!({"v": 2})
        );
    }

    #[tokio::test]
    async fn test_memory_step_log() {
        let store = MemoryCapabilityStore::new();
        let sid = store.save("example.com", &serde_json::json!({})).await.unwrap();
        let tid = store
            .create_task(sid, "scenario", "https://example.com")
            .await
            .unwrap();
        let step = StoredStep {
            ordinal: 1,
            tool: "observe".to_string(),
            arguments: serde_json::json!({}),
            result: None,
            error: Some("timed out".to_string()),
            duration_ms: 10,
            page_type: Some("search".to_string()),
        };
        store.add_step(tid, &step).await.unwrap();
        assert_eq!(store.step_count(tid), 1);
    }
}
