//! Recorder construction

use crate::optimizer::SelectorOptimizer;
use crate::recorder::config::RecorderConfig;
use crate::recorder::session::SessionState;
use crate::recorder::steps::StepSink;
use sitecap_browser::BrowserSession;
use sitecap_llm::ChatClient;
use sitecap_store::CapabilityStore;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// The turn-loop orchestrator for one recording session.
///
/// One recorder owns one session. State lives behind an async mutex so the
/// build wrapper can recover a partial result from another task after
/// aborting the loop; the `finalized` flag guarantees terminal status is
/// written exactly once no matter which path gets there first.
pub struct Recorder {
    pub(crate) chat: Arc<dyn ChatClient>,
    pub(crate) browser: Arc<dyn BrowserSession>,
    pub(crate) store: Arc<dyn CapabilityStore>,
    pub(crate) optimizer: Option<Arc<dyn SelectorOptimizer>>,
    pub(crate) step_sink: Option<Arc<dyn StepSink>>,
    pub(crate) config: RecorderConfig,
    pub(crate) session_id: Uuid,
    pub(crate) state: Mutex<SessionState>,
    pub(crate) finalized: AtomicBool,
}

impl Recorder {
    /// Create a recorder over its three collaborators
    #[must_use]
    pub fn new(
        chat: Arc<dyn ChatClient>,
        browser: Arc<dyn BrowserSession>,
        store: Arc<dyn CapabilityStore>,
        config: RecorderConfig,
    ) -> Self {
        Self {
            chat,
            browser,
            store,
            optimizer: None,
            step_sink: None,
            config,
            session_id: Uuid::new_v4(),
            state: Mutex::new(SessionState::new()),
            finalized: AtomicBool::new(false),
        }
    }

    /// Attach a best-effort selector optimization pass
    #[must_use]
    pub fn with_optimizer(mut self, optimizer: Arc<dyn SelectorOptimizer>) -> Self {
        self.optimizer = Some(optimizer);
        self
    }

    /// Attach a step telemetry sink
    #[must_use]
    pub fn with_step_sink(mut self, sink: Arc<dyn StepSink>) -> Self {
        self.step_sink = Some(sink);
        self
    }

    /// Unique id of this recording session
    #[must_use]
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }
}
