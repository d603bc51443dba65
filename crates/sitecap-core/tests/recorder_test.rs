//! End-to-end recording tests over scripted collaborators

use serde_json::json;
use sitecap_browser::{
    BrowserFactory, BrowserSession, Error as BrowserError, ObservedElement, RawElementAttributes,
    Result as BrowserResult,
};
use sitecap_core::recorder::{Recorder, RecorderConfig, TerminationLimits, TerminationReason};
use sitecap_core::retry::RetryConfig;
use sitecap_core::{BuildOptions, Builder, Error, RecordRequest};
use sitecap_llm::{
    ChatClient, ChatResponse, Error as ChatError, Message, Result as ChatResult, TokenUsage,
    ToolCall, ToolDefinition,
};
use sitecap_store::{
    CapabilityStore, Error as StoreError, MemoryCapabilityStore, Result as StoreResult,
    StoredStep, TaskStatus, TaskTokens,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// One scripted chat turn
enum Script {
    Respond(ChatResponse),
    Fail(ChatError),
    /// Never resolves; stands in for a stalled provider
    Hang,
}

struct ScriptedChat {
    script: Mutex<VecDeque<Script>>,
    calls: AtomicU32,
}

impl ScriptedChat {
    fn new(script: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: AtomicU32::new(0),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ChatClient for ScriptedChat {
    async fn chat(
        &self,
        _messages: &[Message],
        _tools: &[ToolDefinition],
    ) -> ChatResult<ChatResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let entry = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        match entry {
            Some(Script::Respond(response)) => Ok(response),
            Some(Script::Fail(error)) => Err(error),
            Some(Script::Hang) => futures::future::pending().await,
            None => Err(ChatError::Api("script exhausted".to_string())),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[derive(Default)]
struct FakeBrowser {
    navigations: Mutex<Vec<String>>,
    fail_url_containing: Option<String>,
    fail_observe: bool,
    observed: Vec<ObservedElement>,
    current: Mutex<String>,
}

impl FakeBrowser {
    fn navigation_count(&self) -> usize {
        self.navigations.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait::async_trait]
impl BrowserSession for FakeBrowser {
    async fn navigate(&self, url: &str) -> BrowserResult<()> {
        if let Some(needle) = &self.fail_url_containing {
            if url.contains(needle.as_str()) {
                return Err(BrowserError::SessionClosed("target closed".to_string()));
            }
        }
        self.navigations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(url.to_string());
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = url.to_string();
        Ok(())
    }

    async fn scroll_to_bottom(&self, _wait_ms: u64) -> BrowserResult<()> {
        Ok(())
    }

    async fn observe(
        &self,
        _instruction: &str,
        _timeout_ms: u64,
    ) -> BrowserResult<Vec<ObservedElement>> {
        if self.fail_observe {
            return Err(BrowserError::Observe("page script crashed".to_string()));
        }
        Ok(self.observed.clone())
    }

    async fn act(&self, _instruction: &str) -> BrowserResult<serde_json::Value> {
        Ok(json!({"done": true}))
    }

    async fn go_back(&self) -> BrowserResult<()> {
        Ok(())
    }

    async fn current_url(&self) -> BrowserResult<String> {
        Ok(self.current.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    async fn close(&self) -> BrowserResult<()> {
        Ok(())
    }
}

struct FakeFactory {
    browser: Arc<FakeBrowser>,
    opens: AtomicU32,
}

impl FakeFactory {
    fn new(browser: Arc<FakeBrowser>) -> Arc<Self> {
        Arc::new(Self {
            browser,
            opens: AtomicU32::new(0),
        })
    }
}

#[async_trait::async_trait]
impl BrowserFactory for FakeFactory {
    async fn open(&self) -> BrowserResult<Arc<dyn BrowserSession>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(self.browser.clone())
    }
}

/// Store whose capability writes always fail; task plumbing still answers
struct FailingStore;

#[async_trait::async_trait]
impl CapabilityStore for FailingStore {
    async fn save(&self, _domain: &str, _capability: &serde_json::Value) -> StoreResult<i64> {
        Err(StoreError::Database("disk full".to_string()))
    }

    async fn create_task(
        &self,
        _source_id: i64,
        _scenario: &str,
        _start_url: &str,
    ) -> StoreResult<Uuid> {
        Err(StoreError::Database("disk full".to_string()))
    }

    async fn add_step(&self, _task_id: Uuid, _step: &StoredStep) -> StoreResult<()> {
        Ok(())
    }

    async fn complete_task(
        &self,
        _task_id: Uuid,
        _status: TaskStatus,
        _duration_ms: u64,
        _tokens: TaskTokens,
        _error_message: Option<&str>,
    ) -> StoreResult<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "failing"
    }
}

fn call(id: &str, name: &str, arguments: serde_json::Value) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments: arguments.to_string(),
    }
}

fn respond(tool_calls: Vec<ToolCall>) -> Script {
    Script::Respond(ChatResponse {
        content: None,
        tool_calls,
        usage: TokenUsage {
            input_tokens: 100,
            output_tokens: 20,
        },
    })
}

fn respond_final(content: &str) -> Script {
    Script::Respond(ChatResponse {
        content: Some(content.to_string()),
        tool_calls: Vec::new(),
        usage: TokenUsage {
            input_tokens: 50,
            output_tokens: 10,
        },
    })
}

fn register_call(id: &str, element_id: &str) -> ToolCall {
    call(
        id,
        "register_element",
        json!({
            "element_id": element_id,
            "kind": "button",
            "methods": ["click"],
            "attributes": {"tag": "button", "id": element_id}
        }),
    )
}

fn test_config() -> RecorderConfig {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("sitecap_core=debug")
        .with_test_writer()
        .try_init();
    RecorderConfig::new()
        .with_pacing(Duration::ZERO, Duration::ZERO)
        .with_tool_retry(
            RetryConfig::new()
                .with_max_attempts(2)
                .with_base_delay(Duration::from_millis(1)),
        )
}

fn request() -> RecordRequest {
    RecordRequest::new(
        "https://example.com/",
        "catalogue the search flow",
        "explore and register elements",
    )
}

#[tokio::test]
async fn natural_completion_persists_capability_and_task() {
    let chat = ScriptedChat::new(vec![
        respond(vec![
            call(
                "c1",
                "set_page_context",
                json!({"page_type": "home", "name": "Home", "url_patterns": ["/"]}),
            ),
            register_call("c2", "search_input"),
            register_call("c3", "search_button"),
        ]),
        respond_final("done"),
    ]);
    let browser = Arc::new(FakeBrowser::default());
    let store = Arc::new(MemoryCapabilityStore::new());

    let recorder = Recorder::new(chat.clone(), browser.clone(), store.clone(), test_config());
    let result = recorder.record(request()).await.unwrap();

    assert!(result.success);
    assert!(!result.partial_complete);
    assert_eq!(result.termination_reason, Some(TerminationReason::Completed));
    assert_eq!(result.element_count, 2);
    assert_eq!(result.steps, 3);
    assert_eq!(result.tokens.input_tokens, 150);
    assert_eq!(chat.calls(), 2);

    let saved = store.capability("example.com").expect("capability saved");
    assert_eq!(saved["pages"]["home"]["elements"].as_object().unwrap().len(), 2);

    let task_id = result.task_id.expect("task bound");
    let task = store.task(task_id).unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(store.step_count(task_id), 3);
}

#[tokio::test]
async fn repeated_element_id_is_an_upsert() {
    let chat = ScriptedChat::new(vec![
        respond(vec![
            register_call("c1", "search_button"),
            register_call("c2", "search_button"),
        ]),
        respond_final("done"),
    ]);
    let browser = Arc::new(FakeBrowser::default());
    let store = Arc::new(MemoryCapabilityStore::new());

    let recorder = Recorder::new(chat, browser, store, test_config());
    let result = recorder.record(request()).await.unwrap();

    assert_eq!(result.element_count, 1);
    assert_eq!(result.steps, 2);
}

#[tokio::test]
async fn element_threshold_terminates_before_next_chat_call() {
    let chat = ScriptedChat::new(vec![respond(vec![
        register_call("c1", "a"),
        register_call("c2", "b"),
    ])]);
    let browser = Arc::new(FakeBrowser::default());
    let store = Arc::new(MemoryCapabilityStore::new());

    let config = test_config().with_limits(TerminationLimits {
        element_threshold: 2,
        ..Default::default()
    });
    let recorder = Recorder::new(chat.clone(), browser, store.clone(), config);
    let result = recorder.record(request()).await.unwrap();

    assert_eq!(chat.calls(), 1);
    assert!(result.success);
    assert!(result.partial_complete);
    assert_eq!(
        result.termination_reason,
        Some(TerminationReason::ElementThresholdReached)
    );

    let task = store.task(result.task_id.unwrap()).unwrap();
    assert_eq!(task.status, TaskStatus::Partial);
}

#[tokio::test]
async fn exhausted_tool_retries_degrade_to_skipped_step() {
    let chat = ScriptedChat::new(vec![
        respond(vec![call(
            "c1",
            "navigate",
            json!({"url": "https://example.com/broken"}),
        )]),
        respond_final("giving up on that page"),
    ]);
    let browser = Arc::new(FakeBrowser {
        fail_url_containing: Some("/broken".to_string()),
        ..Default::default()
    });
    let store = Arc::new(MemoryCapabilityStore::new());

    let recorder = Recorder::new(chat.clone(), browser, store, test_config());
    let result = recorder.record(request()).await.unwrap();

    // The session survives the failed tool and ends naturally
    assert_eq!(chat.calls(), 2);
    assert_eq!(result.termination_reason, Some(TerminationReason::Completed));
    assert_eq!(result.steps, 1);
    assert!(!result.success);
}

#[tokio::test]
async fn cross_domain_navigation_is_refused_without_a_browser_call() {
    let chat = ScriptedChat::new(vec![
        respond(vec![call(
            "c1",
            "navigate",
            json!({"url": "https://evil.example.net/"}),
        )]),
        respond_final("staying put"),
    ]);
    let browser = Arc::new(FakeBrowser::default());
    let store = Arc::new(MemoryCapabilityStore::new());

    let recorder = Recorder::new(chat, browser.clone(), store, test_config());
    let result = recorder.record(request()).await.unwrap();

    // Only the initial navigation reached the browser
    assert_eq!(browser.navigation_count(), 1);
    assert_eq!(result.termination_reason, Some(TerminationReason::Completed));
}

#[tokio::test]
async fn turn_budget_exhaustion_reports_max_turns() {
    let chat = ScriptedChat::new(vec![
        respond(vec![call("c1", "observe", json!({}))]),
        respond(vec![call("c2", "observe", json!({}))]),
    ]);
    let browser = Arc::new(FakeBrowser::default());
    let store = Arc::new(MemoryCapabilityStore::new());

    let config = test_config().with_max_turns(2).with_limits(TerminationLimits {
        // keep observe efficiency out of the way
        observe_efficiency_floor: 0.0,
        ..Default::default()
    });
    let recorder = Recorder::new(chat, browser, store, config);
    let result = recorder.record(request()).await.unwrap();

    assert_eq!(
        result.termination_reason,
        Some(TerminationReason::MaxTurnsReached)
    );
    assert!(result.partial_complete);
}

fn build_options() -> BuildOptions {
    BuildOptions::new()
        .with_timeout(Duration::from_secs(1))
        .with_base_delay(Duration::from_millis(100))
        .with_recorder_config(test_config())
}

#[tokio::test(start_paused = true)]
async fn timeout_recovers_partial_result() {
    let chat = ScriptedChat::new(vec![
        respond(vec![register_call("c1", "search_button")]),
        Script::Hang,
    ]);
    let browser = Arc::new(FakeBrowser::default());
    let store = Arc::new(MemoryCapabilityStore::new());
    let builder = Builder::new(
        chat,
        FakeFactory::new(browser),
        store.clone(),
        build_options(),
    );

    let result = builder
        .build("https://example.com/", "catalogue the search flow")
        .await
        .unwrap();

    assert!(result.success);
    assert!(result.partial_complete);
    assert_eq!(result.termination_reason, Some(TerminationReason::TaskTimeout));
    assert_eq!(result.duration_ms, 1_000);
    assert_eq!(result.element_count, 1);

    let task = store.task(result.task_id.unwrap()).unwrap();
    assert_eq!(task.status, TaskStatus::Partial);
    assert!(store.capability("example.com").is_some());
}

#[tokio::test(start_paused = true)]
async fn timeout_with_nothing_recovered_is_an_error_and_never_retried() {
    let chat = ScriptedChat::new(vec![Script::Hang]);
    let browser = Arc::new(FakeBrowser::default());
    let factory = FakeFactory::new(browser);
    let builder = Builder::new(
        chat,
        factory.clone(),
        Arc::new(MemoryCapabilityStore::new()),
        build_options(),
    );

    let err = builder
        .build("https://example.com/", "scenario")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Timeout { after_ms: 1_000 }));
    assert_eq!(factory.opens.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn empty_timeout_leaves_an_existing_catalogue_untouched() {
    let seeded = json!({
        "domain": "example.com",
        "pages": {
            "home": {
                "elements": { "search_button": { "kind": "button" } }
            }
        }
    });
    let store = Arc::new(MemoryCapabilityStore::new());
    store.save("example.com", &seeded).await.unwrap();

    // The session discovers nothing before stalling out
    let chat = ScriptedChat::new(vec![Script::Hang]);
    let browser = Arc::new(FakeBrowser::default());
    let builder = Builder::new(chat, FakeFactory::new(browser), store.clone(), build_options());

    let err = builder
        .build("https://example.com/", "catalogue the search flow")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Timeout { .. }));
    assert_eq!(store.capability("example.com"), Some(seeded));
}

#[tokio::test(start_paused = true)]
async fn abandoned_attempt_marks_its_task_failed() {
    let chat = ScriptedChat::new(vec![
        respond(vec![register_call("c1", "search_button")]),
        Script::Fail(ChatError::Network("connection reset by peer".to_string())),
        respond_final("nothing more to add"),
    ]);
    let browser = Arc::new(FakeBrowser::default());
    let store = Arc::new(MemoryCapabilityStore::new());
    let builder = Builder::new(
        chat.clone(),
        FakeFactory::new(browser),
        store.clone(),
        build_options(),
    );

    let result = builder
        .build("https://example.com/", "scenario")
        .await
        .unwrap();
    assert_eq!(chat.calls(), 3);

    // The retried attempt never bound a task; only the abandoned one did,
    // and its row must not be left running
    assert!(result.task_id.is_none());
    let task_ids = store.task_ids();
    assert_eq!(task_ids.len(), 1);
    let task = store.task(task_ids[0]).unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert!(task
        .error_message
        .as_deref()
        .is_some_and(|m| m.contains("connection reset")));
}

#[tokio::test]
async fn persistence_failure_does_not_fail_the_session() {
    let chat = ScriptedChat::new(vec![
        respond(vec![register_call("c1", "search_button")]),
        respond_final("done"),
    ]);
    let browser = Arc::new(FakeBrowser::default());

    let recorder = Recorder::new(chat, browser, Arc::new(FailingStore), test_config());
    let result = recorder.record(request()).await.unwrap();

    assert!(result.success);
    assert_eq!(result.element_count, 1);
    assert!(result.site_capability.is_some());
    assert!(result
        .db_save_error
        .as_deref()
        .is_some_and(|m| m.contains("disk full")));
    // Task tracking never attached, the save it depends on kept failing
    assert!(result.task_id.is_none());
    assert!(result.source_id.is_none());
}

#[tokio::test]
async fn failed_observes_still_arm_the_efficiency_check() {
    let chat = ScriptedChat::new(vec![
        respond(vec![call("c1", "observe", json!({}))]),
        respond(vec![call("c2", "observe", json!({}))]),
        respond(vec![call("c3", "observe", json!({}))]),
    ]);
    let browser = Arc::new(FakeBrowser {
        fail_observe: true,
        ..Default::default()
    });
    let store = Arc::new(MemoryCapabilityStore::new());

    let recorder = Recorder::new(chat.clone(), browser, store, test_config());
    let result = recorder.record(request()).await.unwrap();

    // Three broken observes average 0.0 elements, under the 3.0 floor
    assert_eq!(chat.calls(), 3);
    assert_eq!(
        result.termination_reason,
        Some(TerminationReason::LowObserveEfficiency)
    );
}

#[tokio::test]
async fn fatal_chat_error_is_not_retried() {
    let chat = ScriptedChat::new(vec![Script::Fail(ChatError::Api(
        "Invalid API key".to_string(),
    ))]);
    let browser = Arc::new(FakeBrowser::default());
    let factory = FakeFactory::new(browser);
    let builder = Builder::new(
        chat.clone(),
        factory.clone(),
        Arc::new(MemoryCapabilityStore::new()),
        build_options(),
    );

    let err = builder
        .build("https://example.com/", "scenario")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Chat(_)));
    assert_eq!(chat.calls(), 1);
    assert_eq!(factory.opens.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn transient_failure_retries_with_a_fresh_browser() {
    let chat = ScriptedChat::new(vec![
        Script::Fail(ChatError::Network("connection reset by peer".to_string())),
        respond_final("recovered"),
    ]);
    let browser = Arc::new(FakeBrowser::default());
    let factory = FakeFactory::new(browser);
    let builder = Builder::new(
        chat.clone(),
        factory.clone(),
        Arc::new(MemoryCapabilityStore::new()),
        build_options(),
    );

    let result = builder
        .build("https://example.com/", "scenario")
        .await
        .unwrap();

    assert_eq!(factory.opens.load(Ordering::SeqCst), 2);
    assert_eq!(chat.calls(), 2);
    assert_eq!(result.termination_reason, Some(TerminationReason::Completed));
}

#[tokio::test(start_paused = true)]
async fn retry_delays_grow_linearly() {
    let chat = ScriptedChat::new(vec![
        Script::Fail(ChatError::Network("connection reset by peer".to_string())),
        Script::Fail(ChatError::Network("connection reset by peer".to_string())),
        Script::Fail(ChatError::Network("connection reset by peer".to_string())),
    ]);
    let browser = Arc::new(FakeBrowser::default());
    let builder = Builder::new(
        chat,
        FakeFactory::new(browser),
        Arc::new(MemoryCapabilityStore::new()),
        build_options(),
    );

    let started = tokio::time::Instant::now();
    let err = builder
        .build("https://example.com/", "scenario")
        .await
        .unwrap_err();

    // attempt 1 waits base * 1, attempt 2 waits base * 2, attempt 3 fails out
    assert_eq!(started.elapsed(), Duration::from_millis(300));
    assert!(matches!(err, Error::BuildFailed { attempts: 3, .. }));
}

#[tokio::test]
async fn observe_feeds_efficiency_counters() {
    let observed = vec![ObservedElement {
        description: "search input".to_string(),
        attributes: RawElementAttributes {
            tag: "input".to_string(),
            id: Some("q".to_string()),
            ..Default::default()
        },
        text: None,
    }];
    // 3 observe turns at 1 element each: average 1.0 < the 3.0 floor
    let chat = ScriptedChat::new(vec![
        respond(vec![call("c1", "observe", json!({}))]),
        respond(vec![call("c2", "observe", json!({}))]),
        respond(vec![call("c3", "observe", json!({}))]),
    ]);
    let browser = Arc::new(FakeBrowser {
        observed,
        ..Default::default()
    });
    let store = Arc::new(MemoryCapabilityStore::new());

    let recorder = Recorder::new(chat.clone(), browser, store, test_config());
    let result = recorder.record(request()).await.unwrap();

    assert_eq!(chat.calls(), 3);
    assert_eq!(
        result.termination_reason,
        Some(TerminationReason::LowObserveEfficiency)
    );
}
