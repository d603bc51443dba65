//! The turn loop
//!
//! Each turn: evaluate termination, request one decision from the chat
//! client, execute the returned tool calls sequentially, relay the results
//! back as tool responses. Chat errors propagate to the build wrapper for
//! transient classification; tool failures never abort the session — after
//! retry exhaustion the tool is downgraded to a skipped step and the model
//! is told what happened.

use crate::capability::{
    ElementCapability, ElementKind, InputMeta, InteractionMethod, PageCapability, SiteCapability,
};
use crate::error::{Error, Result};
use crate::recorder::core::Recorder;
use crate::recorder::session::{domain_of, normalize_url, SessionState};
use crate::recorder::termination::TerminationReason;
use crate::recorder::tools::RecorderTool;
use crate::recorder::types::{RecordRequest, RecordResult, StepRecord};
use crate::retry::retry_with_backoff;
use crate::selector::extract_selectors;
use serde_json::{json, Value};
use sitecap_llm::{Message, ToolCall};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

impl Recorder {
    /// Run one recording session to completion.
    ///
    /// Returns `Err` only for chat failures and a failed initial navigation;
    /// everything else resolves into a [`RecordResult`], possibly partial.
    #[instrument(skip_all, fields(session_id = %self.session_id, start_url = %request.start_url))]
    pub async fn record(&self, request: RecordRequest) -> Result<RecordResult> {
        let domain = domain_of(&request.start_url)
            .ok_or_else(|| Error::InvalidInput(format!("invalid start URL: {}", request.start_url)))?;

        let mut state = self.state.lock().await;
        *state = SessionState::new();
        state.domain = Some(domain.clone());

        // Initial navigation; failure here is infrastructure, not exploration
        retry_with_backoff(&self.config.tool_retry, || {
            self.browser.navigate(&request.start_url)
        })
        .await
        .map_err(|e| Error::Browser(e.last_error))?;

        state.current_url = Some(request.start_url.clone());
        state.mark_visited(&request.start_url);
        state.capability = Some(SiteCapability::new(
            domain,
            if request.site_name.is_empty() {
                request.start_url.clone()
            } else {
                request.site_name.clone()
            },
            request.site_description.clone(),
            request.scenario.clone(),
        ));

        let definitions = RecorderTool::definitions();
        let mut messages = vec![
            Message::system(&request.system_prompt),
            Message::user(format!(
                "Starting URL: {}\n\n{}",
                request.start_url, request.user_message
            )),
        ];

        for turn in 1..=self.config.max_turns {
            state.counters.turn = turn;

            let elapsed = state.started_at.elapsed();
            if let Some(reason) = self.config.limits.evaluate(elapsed, &state.counters) {
                info!(turn, reason = %reason, "Termination limit reached");
                return Ok(self.finalize(&mut state, reason).await);
            }

            let response = match self.chat.chat(&messages, &definitions).await {
                Ok(response) => response,
                Err(e) => {
                    // The build wrapper retries with a fresh recorder and a
                    // fresh task row; this one must not stay running
                    self.fail_task(&state, &e.to_string()).await;
                    return Err(e.into());
                }
            };
            state.counters.input_tokens += response.usage.input_tokens;
            state.counters.output_tokens += response.usage.output_tokens;

            if response.is_final() {
                debug!(turn, "Model signaled completion");
                if let Some(content) = response.content {
                    messages.push(Message::assistant(content));
                }
                return Ok(self
                    .finalize(&mut state, TerminationReason::Completed)
                    .await);
            }

            messages.push(Message::assistant_with_tool_calls(
                response.content.unwrap_or_default(),
                response.tool_calls.clone(),
            ));

            for (i, call) in response.tool_calls.iter().enumerate() {
                if i > 0 && !self.config.tool_delay.is_zero() {
                    tokio::time::sleep(self.config.tool_delay).await;
                }
                let payload = self.run_tool(&mut state, call).await;
                self.bind_task(&mut state, &request).await;
                self.persist_last_step(&state).await;
                messages.push(Message::tool_response_named(
                    &call.id,
                    &call.name,
                    payload.to_string(),
                ));
            }

            if !self.config.turn_delay.is_zero() {
                tokio::time::sleep(self.config.turn_delay).await;
            }
        }

        info!(max_turns = self.config.max_turns, "Turn budget exhausted");
        Ok(self
            .finalize(&mut state, TerminationReason::MaxTurnsReached)
            .await)
    }

    /// Decode and execute one tool call, recording a step either way
    async fn run_tool(&self, state: &mut SessionState, call: &ToolCall) -> Value {
        let started = Instant::now();
        let (result, error) = match RecorderTool::from_call(call) {
            Ok(tool) => self.execute_tool(state, tool).await,
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Rejected tool call");
                (json!({ "error": e.to_string() }), Some(e.to_string()))
            }
        };

        state.counters.step_ordinal += 1;
        state.counters.tools_executed += 1;
        let step = StepRecord {
            ordinal: state.counters.step_ordinal,
            tool: call.name.clone(),
            arguments: serde_json::from_str(&call.arguments).unwrap_or(Value::Null),
            result: if error.is_none() {
                Some(result.clone())
            } else {
                None
            },
            error,
            duration_ms: started.elapsed().as_millis() as u64,
            page_type: state.current_page.clone(),
        };
        if let Some(sink) = &self.step_sink {
            sink.on_step(&step);
        }
        state.steps.push(step);
        result
    }

    /// Execute one decoded tool; returns the response payload and, on
    /// failure, the error message recorded on the step
    async fn execute_tool(
        &self,
        state: &mut SessionState,
        tool: RecorderTool,
    ) -> (Value, Option<String>) {
        match tool {
            RecorderTool::SetPageContext {
                page_type,
                name,
                description,
                url_patterns,
            } => {
                if let Some(capability) = &mut state.capability {
                    capability.page_mut(PageCapability {
                        page_type: page_type.clone(),
                        name,
                        description,
                        url_patterns,
                        url: state.current_url.clone(),
                        elements: BTreeMap::new(),
                    });
                }
                state.current_page = Some(page_type.clone());
                (json!({ "page_type": page_type, "active": true }), None)
            }

            RecorderTool::RegisterElement {
                element_id,
                kind,
                description,
                methods,
                attributes,
                input_type,
                input_name,
                default_value,
                href,
                depends_on,
            } => {
                if !self.config.url_allowed(state.current_url.as_deref()) {
                    debug!(element_id, "Registration dropped by URL filter");
                    return (
                        json!({ "registered": false, "reason": "current URL is outside the allowed patterns" }),
                        None,
                    );
                }

                let selectors = extract_selectors(&attributes);
                let input = InputMeta {
                    input_type,
                    name: input_name,
                    default_value,
                };
                let element = ElementCapability {
                    id: element_id.clone(),
                    kind: parse_kind(&kind),
                    methods: methods.iter().map(|m| parse_method(m)).collect(),
                    selectors,
                    description,
                    depends_on,
                    input: if input.is_empty() { None } else { Some(input) },
                    href,
                };
                let selector_count = element.selectors.len();

                if let Some(capability) = &mut state.capability {
                    capability.register_element(state.current_page.as_deref(), element);
                    state.counters.element_count = capability.element_count();
                }
                debug!(
                    element_id,
                    selector_count,
                    total = state.counters.element_count,
                    "Element registered"
                );
                (
                    json!({
                        "registered": true,
                        "element_id": element_id,
                        "selectors": selector_count,
                        "total_elements": state.counters.element_count,
                    }),
                    None,
                )
            }

            RecorderTool::Navigate { url } => {
                if domain_of(&url).as_deref() != state.domain.as_deref() {
                    warn!(url, "Cross-domain navigation refused");
                    return (
                        json!({
                            "navigated": false,
                            "error": "URL is off the session's domain; stay on the start site",
                            "current_url": state.current_url,
                        }),
                        None,
                    );
                }
                match retry_with_backoff(&self.config.tool_retry, || self.browser.navigate(&url))
                    .await
                {
                    Ok(()) => {
                        state.previous_url = state.current_url.take();
                        state.current_url = Some(url.clone());
                        state.mark_visited(&url);
                        (
                            json!({ "navigated": true, "url": url, "pages_visited": state.counters.visited_pages }),
                            None,
                        )
                    }
                    Err(e) => skipped(&e.to_string()),
                }
            }

            RecorderTool::Observe { instruction } => {
                self.auto_scroll_if_fresh(state).await;
                let instruction = instruction
                    .unwrap_or_else(|| "List the interactive elements on this page".to_string());
                match retry_with_backoff(&self.config.tool_retry, || {
                    self.browser
                        .observe(&instruction, self.config.observe_timeout_ms)
                })
                .await
                {
                    Ok(elements) => {
                        state.counters.observe_calls += 1;
                        state.counters.observed_elements += elements.len() as u64;
                        (
                            json!({ "count": elements.len(), "elements": elements }),
                            None,
                        )
                    }
                    Err(e) => {
                        // A failed observe yields zero elements; it still
                        // counts, so a persistently unproductive page arms
                        // the low-efficiency check
                        state.counters.observe_calls += 1;
                        skipped(&e.to_string())
                    }
                }
            }

            RecorderTool::Scroll => match self.browser.act("Scroll down one viewport").await {
                Ok(result) => {
                    if let Some(key) = state.current_url.as_deref().and_then(normalize_url) {
                        state.scrolled_pages.insert(key);
                    }
                    (json!({ "scrolled": true, "result": result }), None)
                }
                Err(e) => skipped(&e.to_string()),
            },

            RecorderTool::ScrollToBottom => {
                match self
                    .browser
                    .scroll_to_bottom(self.config.scroll_wait_ms)
                    .await
                {
                    Ok(()) => {
                        if let Some(key) = state.current_url.as_deref().and_then(normalize_url) {
                            state.scrolled_pages.insert(key);
                        }
                        (json!({ "scrolled_to_bottom": true }), None)
                    }
                    Err(e) => skipped(&e.to_string()),
                }
            }

            RecorderTool::Wait { ms } => {
                let ms = ms.unwrap_or(1_000).min(self.config.wait_tool_max_ms);
                tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
                (json!({ "waited_ms": ms }), None)
            }

            RecorderTool::GoBack => {
                match retry_with_backoff(&self.config.tool_retry, || self.browser.go_back()).await {
                    Ok(()) => {
                        // Fall back to the tracked previous URL when the
                        // adapter cannot report where it landed
                        let url = match self.browser.current_url().await {
                            Ok(url) => Some(url),
                            Err(_) => state.previous_url.clone(),
                        };
                        if let Some(url) = &url {
                            state.previous_url = state.current_url.take();
                            state.current_url = Some(url.clone());
                            state.mark_visited(url);
                        }
                        (json!({ "navigated_back": true, "url": url }), None)
                    }
                    Err(e) => skipped(&e.to_string()),
                }
            }
        }
    }

    /// Scroll to the bottom once per page before its first observe, so
    /// lazy-loaded content is present in the observation
    async fn auto_scroll_if_fresh(&self, state: &mut SessionState) {
        if !self.config.auto_scroll {
            return;
        }
        let Some(key) = state.current_url.as_deref().and_then(normalize_url) else {
            return;
        };
        if state.scrolled_pages.contains(&key) {
            return;
        }
        if let Err(e) = self.browser.scroll_to_bottom(self.config.scroll_wait_ms).await {
            debug!(error = %e, "Pre-observe scroll failed, observing as-is");
        }
        state.scrolled_pages.insert(key);
    }

    /// Bind the session to its store rows once real work exists: the first
    /// save establishes the source row, then task tracking attaches to it
    async fn bind_task(&self, state: &mut SessionState, request: &RecordRequest) {
        if state.task_id.is_some() || state.counters.tools_executed == 0 {
            return;
        }
        let Some(capability) = &state.capability else {
            return;
        };

        if state.source_id.is_none() {
            match serde_json::to_value(capability) {
                Ok(value) => match self.store.save(&capability.domain, &value).await {
                    Ok(id) => state.source_id = Some(id),
                    Err(e) => {
                        warn!(error = %e, "Initial capability save failed, task tracking disabled");
                        return;
                    }
                },
                Err(e) => {
                    warn!(error = %e, "Capability serialization failed");
                    return;
                }
            }
        }
        let Some(source_id) = state.source_id else {
            return;
        };

        if let Some(existing) = request.existing_task_id {
            state.task_id = Some(existing);
            return;
        }
        match self
            .store
            .create_task(source_id, &request.scenario, &request.start_url)
            .await
        {
            Ok(task_id) => {
                debug!(task_id = %task_id, "Task tracking bound");
                state.task_id = Some(task_id);
            }
            Err(e) => warn!(error = %e, "Task creation failed, continuing without tracking"),
        }
    }

    /// Persist the most recent step, best effort
    async fn persist_last_step(&self, state: &SessionState) {
        let (Some(task_id), Some(step)) = (state.task_id, state.steps.last()) else {
            return;
        };
        if let Err(e) = self.store.add_step(task_id, &step.to_stored()).await {
            warn!(error = %e, ordinal = step.ordinal, "Step persistence failed");
        }
    }
}

fn skipped(message: &str) -> (Value, Option<String>) {
    (
        json!({ "error": message, "skipped": true }),
        Some(message.to_string()),
    )
}

fn parse_kind(kind: &str) -> ElementKind {
    serde_json::from_value(Value::String(kind.to_string())).unwrap_or(ElementKind::Other)
}

fn parse_method(method: &str) -> InteractionMethod {
    serde_json::from_value(Value::String(method.to_string())).unwrap_or(InteractionMethod::Other)
}
