//! Session finalization and partial-result recovery

use crate::recorder::core::Recorder;
use crate::recorder::session::SessionState;
use crate::recorder::termination::TerminationReason;
use crate::recorder::types::{PartialSnapshot, RecordResult, RecordTokens};
use sitecap_store::TaskStatus;
use std::sync::atomic::Ordering;
use tracing::{info, warn};
use uuid::Uuid;

impl Recorder {
    /// Optimize, persist and summarize the session.
    ///
    /// Persistence failures never fail the session: the in-memory result is
    /// returned intact with `db_save_error` describing what went wrong.
    pub(crate) async fn finalize(
        &self,
        state: &mut SessionState,
        reason: TerminationReason,
    ) -> RecordResult {
        let mut db_save_error = None;

        if state
            .capability
            .as_ref()
            .map(|c| c.element_count() > 0)
            .unwrap_or(false)
        {
            self.run_optimizer(state).await;
            db_save_error = self.persist_capability(state).await;
        }

        let tokens = self.collect_tokens(state).await;
        let element_count = state
            .capability
            .as_ref()
            .map(|c| c.element_count())
            .unwrap_or(0);
        let success = element_count > 0;
        let partial_complete = reason != TerminationReason::Completed;
        let duration_ms = state.started_at.elapsed().as_millis() as u64;

        let status = if reason == TerminationReason::Completed {
            TaskStatus::Completed
        } else if success {
            TaskStatus::Partial
        } else {
            TaskStatus::Failed
        };
        self.complete_task_once(
            state.task_id,
            status,
            duration_ms,
            &tokens,
            if success { None } else { Some(reason.as_str()) },
        )
        .await;

        info!(
            reason = %reason,
            element_count,
            turns = state.counters.turn,
            duration_ms,
            "Recording session finalized"
        );

        RecordResult {
            success,
            message: if success {
                format!("recorded {element_count} elements ({reason})")
            } else {
                format!("no elements recorded ({reason})")
            },
            turns: state.counters.turn,
            steps: state.counters.step_ordinal,
            duration_ms,
            tokens,
            element_count,
            site_capability: state.capability.clone(),
            source_id: state.source_id,
            task_id: state.task_id,
            db_save_error,
            termination_reason: Some(reason),
            partial_complete,
        }
    }

    /// Recover whatever the session discovered before it was interrupted.
    ///
    /// Called by the build wrapper after aborting the turn loop on timeout.
    /// Returns `None` when no capability exists yet. Persistence only runs
    /// when elements were discovered; an empty session must not overwrite a
    /// previously recorded catalogue for the same domain.
    pub async fn save_partial_result(&self) -> Option<PartialSnapshot> {
        let mut state = self.state.lock().await;
        let element_count = state.capability.as_ref()?.element_count();

        let mut db_save_error = None;
        if element_count > 0 {
            self.run_optimizer(&mut state).await;
            db_save_error = self.persist_capability(&mut state).await;
        }
        let tokens = self.collect_tokens(&state).await;
        let duration_ms = state.started_at.elapsed().as_millis() as u64;
        let capability = state.capability.clone()?;

        self.complete_task_once(
            state.task_id,
            if element_count > 0 {
                TaskStatus::Partial
            } else {
                TaskStatus::Failed
            },
            duration_ms,
            &tokens,
            Some(TerminationReason::TaskTimeout.as_str()),
        )
        .await;

        info!(element_count, "Partial result recovered");
        Some(PartialSnapshot {
            element_count,
            site_capability: capability,
            turns: state.counters.turn,
            steps: state.counters.step_ordinal,
            tokens,
            source_id: state.source_id,
            task_id: state.task_id,
            db_save_error,
        })
    }

    /// Mark the bound task failed before an error propagates out of the turn
    /// loop, so an abandoned attempt never leaves its row `running`
    pub(crate) async fn fail_task(&self, state: &SessionState, message: &str) {
        let tokens = self.collect_tokens(state).await;
        let duration_ms = state.started_at.elapsed().as_millis() as u64;
        self.complete_task_once(
            state.task_id,
            TaskStatus::Failed,
            duration_ms,
            &tokens,
            Some(message),
        )
        .await;
    }

    /// Run the optional selector optimization pass; failures are swallowed
    async fn run_optimizer(&self, state: &mut SessionState) {
        let (Some(optimizer), Some(capability)) = (&self.optimizer, &mut state.capability) else {
            return;
        };
        if let Err(e) = optimizer.optimize(capability).await {
            warn!(optimizer = optimizer.name(), error = %e, "Selector optimization failed, keeping extracted selectors");
        }
    }

    /// Save the capability; returns the error message on failure
    async fn persist_capability(&self, state: &mut SessionState) -> Option<String> {
        let capability = state.capability.as_ref()?;
        let value = match serde_json::to_value(capability) {
            Ok(value) => value,
            Err(e) => return Some(e.to_string()),
        };
        match self.store.save(&capability.domain, &value).await {
            Ok(id) => {
                state.source_id = Some(id);
                None
            }
            Err(e) => {
                warn!(error = %e, "Capability persistence failed, result stays in memory");
                Some(e.to_string())
            }
        }
    }

    /// Write the terminal task status at most once across all finalization
    /// paths, so a timeout recovery and a racing natural finalize cannot
    /// both record an outcome
    async fn complete_task_once(
        &self,
        task_id: Option<Uuid>,
        status: TaskStatus,
        duration_ms: u64,
        tokens: &RecordTokens,
        error_message: Option<&str>,
    ) {
        let Some(task_id) = task_id else {
            return;
        };
        if self
            .finalized
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        if let Err(e) = self
            .store
            .complete_task(
                task_id,
                status,
                duration_ms,
                tokens.as_task_tokens(),
                error_message,
            )
            .await
        {
            warn!(task_id = %task_id, error = %e, "Terminal task status write failed");
        }
    }

    /// Fold browser-side token usage into the session totals
    async fn collect_tokens(&self, state: &SessionState) -> RecordTokens {
        let mut tokens = RecordTokens {
            input_tokens: state.counters.input_tokens,
            output_tokens: state.counters.output_tokens,
            browser_input_tokens: 0,
            browser_output_tokens: 0,
        };
        if let Some(stats) = self.browser.token_stats().await {
            tokens.browser_input_tokens = stats.input_tokens;
            tokens.browser_output_tokens = stats.output_tokens;
        }
        tokens
    }
}
