//! Build wrapper
//!
//! Wraps one recording session in a wall-clock race and an outer retry.
//! Transient infrastructure failures (dead browser session, dropped
//! connection) get a fresh browser and a linearly delayed retry; everything
//! else propagates. A timeout is terminal: the loop is aborted and whatever
//! it discovered is recovered as a partial result, never retried.

use crate::error::{Error, Result};
use crate::optimizer::SelectorOptimizer;
use crate::recorder::{
    PartialSnapshot, RecordRequest, RecordResult, Recorder, RecorderConfig, StepSink,
    TerminationReason,
};
use sitecap_llm::ChatClient;
use sitecap_store::CapabilityStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Default system prompt driving the exploration
const DEFAULT_SYSTEM_PROMPT: &str = "You are a website capability recorder. Explore the site \
with the provided tools, declare a page context when the page type changes, and register every \
interactive element relevant to the scenario with its raw DOM attributes. Stay on the starting \
domain. Stop calling tools when the scenario is covered.";

/// Configuration for the build wrapper
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Maximum build attempts (including the first)
    pub max_attempts: u32,
    /// Base retry delay; attempt `n` waits `base * n`
    pub base_delay: Duration,
    /// Wall-clock ceiling for one attempt
    pub timeout: Duration,
    /// Lowercased substrings that mark an error as transient
    pub transient_signatures: Vec<String>,
    /// Configuration handed to each recorder
    pub recorder_config: RecorderConfig,
    /// System prompt for the chat client
    pub system_prompt: String,
    /// First user message; defaults to the scenario
    pub user_message: Option<String>,
    /// Site display name
    pub site_name: String,
    /// Site description
    pub site_description: String,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            timeout: Duration::from_secs(600),
            transient_signatures: [
                "connection reset",
                "connection refused",
                "session closed",
                "target closed",
                "browser has been closed",
                "protocol error",
                "broken pipe",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            recorder_config: RecorderConfig::default(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            user_message: None,
            site_name: String::new(),
            site_description: String::new(),
        }
    }
}

impl BuildOptions {
    /// Create default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum attempts
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the base retry delay
    #[must_use]
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the per-attempt wall-clock ceiling
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the recorder configuration
    #[must_use]
    pub fn with_recorder_config(mut self, config: RecorderConfig) -> Self {
        self.recorder_config = config;
        self
    }

    /// Replace the system prompt
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Set site display name and description
    #[must_use]
    pub fn with_site_info(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.site_name = name.into();
        self.site_description = description.into();
        self
    }

    /// True when the error message carries a transient signature
    #[must_use]
    pub fn is_transient(&self, error: &Error) -> bool {
        let message = error.to_string().to_lowercase();
        self.transient_signatures.iter().any(|s| message.contains(s))
    }
}

/// Runs recording sessions with timeout, retry and partial recovery
pub struct Builder {
    chat: Arc<dyn ChatClient>,
    browser_factory: Arc<dyn sitecap_browser::BrowserFactory>,
    store: Arc<dyn CapabilityStore>,
    optimizer: Option<Arc<dyn SelectorOptimizer>>,
    step_sink: Option<Arc<dyn StepSink>>,
    options: BuildOptions,
}

impl Builder {
    /// Create a builder over its collaborators
    #[must_use]
    pub fn new(
        chat: Arc<dyn ChatClient>,
        browser_factory: Arc<dyn sitecap_browser::BrowserFactory>,
        store: Arc<dyn CapabilityStore>,
        options: BuildOptions,
    ) -> Self {
        Self {
            chat,
            browser_factory,
            store,
            optimizer: None,
            step_sink: None,
            options,
        }
    }

    /// Attach a selector optimization pass to each recorder
    #[must_use]
    pub fn with_optimizer(mut self, optimizer: Arc<dyn SelectorOptimizer>) -> Self {
        self.optimizer = Some(optimizer);
        self
    }

    /// Attach a step telemetry sink to each recorder
    #[must_use]
    pub fn with_step_sink(mut self, sink: Arc<dyn StepSink>) -> Self {
        self.step_sink = Some(sink);
        self
    }

    /// Record the site at `url` for `scenario`.
    ///
    /// Each attempt opens a fresh browser session and races the recorder
    /// against the configured timeout. Transient failures retry with a
    /// linear delay; a timeout resolves to the recovered partial result or,
    /// when nothing was discovered, [`Error::Timeout`].
    #[instrument(skip(self), fields(url = %url))]
    pub async fn build(&self, url: &str, scenario: &str) -> Result<RecordResult> {
        let mut last_error = String::new();

        for attempt in 1..=self.options.max_attempts {
            info!(attempt, max_attempts = self.options.max_attempts, "Build attempt starting");

            match self.run_attempt(url, scenario).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) if matches!(e, Error::Timeout { .. }) => return Err(e),
                Err(e) if self.options.is_transient(&e) && attempt < self.options.max_attempts => {
                    let delay = self.options.base_delay * attempt;
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient failure, retrying with a fresh browser"
                    );
                    last_error = e.to_string();
                    tokio::time::sleep(delay).await;
                }
                Err(e) if self.options.is_transient(&e) => {
                    last_error = e.to_string();
                }
                Err(e) => return Err(e),
            }
        }

        Err(Error::BuildFailed {
            attempts: self.options.max_attempts,
            message: last_error,
        })
    }

    /// One attempt: open a browser, race the recorder against the clock
    async fn run_attempt(&self, url: &str, scenario: &str) -> Result<RecordResult> {
        let browser = self.browser_factory.open().await.map_err(Error::Browser)?;

        let mut recorder = Recorder::new(
            self.chat.clone(),
            browser.clone(),
            self.store.clone(),
            self.options.recorder_config.clone(),
        );
        if let Some(optimizer) = &self.optimizer {
            recorder = recorder.with_optimizer(optimizer.clone());
        }
        if let Some(sink) = &self.step_sink {
            recorder = recorder.with_step_sink(sink.clone());
        }
        let recorder = Arc::new(recorder);

        let mut request =
            RecordRequest::new(url, scenario, &self.options.system_prompt).with_site_info(
                self.options.site_name.clone(),
                self.options.site_description.clone(),
            );
        if let Some(message) = &self.options.user_message {
            request = request.with_user_message(message.clone());
        }

        let loop_recorder = recorder.clone();
        let mut handle = tokio::spawn(async move { loop_recorder.record(request).await });

        let outcome = tokio::select! {
            joined = &mut handle => match joined {
                Ok(result) => result,
                Err(e) => Err(Error::BuildFailed {
                    attempts: 1,
                    message: format!("recording task failed: {e}"),
                }),
            },
            () = tokio::time::sleep(self.options.timeout) => {
                handle.abort();
                let recovered = recorder.save_partial_result().await;
                self.close_browser(&browser).await;
                return self.resolve_timeout(recovered);
            }
        };

        self.close_browser(&browser).await;
        outcome
    }

    /// Turn a recovered snapshot into a partial success, or a timeout error
    /// when the session had discovered nothing
    fn resolve_timeout(&self, recovered: Option<PartialSnapshot>) -> Result<RecordResult> {
        let after_ms = self.options.timeout.as_millis() as u64;
        match recovered {
            Some(snapshot) if snapshot.element_count > 0 => {
                info!(
                    element_count = snapshot.element_count,
                    "Timeout hit, partial result recovered"
                );
                Ok(RecordResult {
                    success: true,
                    message: format!(
                        "timed out after {after_ms}ms; recovered {} elements",
                        snapshot.element_count
                    ),
                    turns: snapshot.turns,
                    steps: snapshot.steps,
                    duration_ms: after_ms,
                    tokens: snapshot.tokens,
                    element_count: snapshot.element_count,
                    site_capability: Some(snapshot.site_capability),
                    source_id: snapshot.source_id,
                    task_id: snapshot.task_id,
                    db_save_error: snapshot.db_save_error,
                    termination_reason: Some(TerminationReason::TaskTimeout),
                    partial_complete: true,
                })
            }
            _ => {
                warn!(after_ms, "Timeout hit with nothing to recover");
                Err(Error::Timeout { after_ms })
            }
        }
    }

    async fn close_browser(&self, browser: &Arc<dyn sitecap_browser::BrowserSession>) {
        if let Err(e) = browser.close().await {
            warn!(error = %e, "Browser close failed");
        }
    }
}
