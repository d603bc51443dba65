//! Step telemetry callback

use crate::recorder::types::StepRecord;

/// Synchronous observer notified after every executed or skipped tool step.
///
/// Implementations must be fast and must not block; the loop calls them
/// inline between tool executions.
pub trait StepSink: Send + Sync {
    /// Called once per step, in execution order
    fn on_step(&self, step: &StepRecord);
}

impl<F> StepSink for F
where
    F: Fn(&StepRecord) + Send + Sync,
{
    fn on_step(&self, step: &StepRecord) {
        self(step)
    }
}
