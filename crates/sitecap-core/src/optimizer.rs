//! Selector optimization seam
//!
//! Finalization passes the discovered capability through an optional
//! optimization pass (e.g. a robustness scorer or an LLM-backed cleanup)
//! before persisting. The pass is best-effort: failures are logged and
//! swallowed, never fatal to the recording.

use crate::capability::SiteCapability;

/// Best-effort selector optimization pass
#[async_trait::async_trait]
pub trait SelectorOptimizer: Send + Sync {
    /// Rewrite the capability's selectors in place
    async fn optimize(&self, capability: &mut SiteCapability) -> anyhow::Result<()>;

    /// Optimizer name (for logging)
    fn name(&self) -> &str;
}
