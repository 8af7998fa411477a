//! Shared specialist worker skeleton
//!
//! Every specialist runs the same internal loop against the gateway and
//! its capability-gated tool set; specialists differ only in their
//! [`WorkerSpec`]. Tool failures are contained here: they are fed back
//! into the conversation so the model can adapt, and only a run-level
//! outcome escapes as a [`WorkerResult`].

use crate::ports::llm_gateway::{ChatRequest, GatewayError, GenOptions, LlmGateway, collect_chat};
use crate::ports::progress::ProgressNotifier;
use crate::ports::tool_executor::ToolExecutorPort;
use conductor_domain::agent::entities::{ToolCallLogEntry, WorkerResult, WorkerSpec};
use conductor_domain::core::string::truncate;
use conductor_domain::routing::json_scan::parse_embedded_tool_calls;
use conductor_domain::session::Message;
use conductor_domain::tool::entities::{RawToolCall, ToolCall};
use conductor_domain::tool::intent::detect_tool_intent;
use conductor_domain::tool::schema::schemas_for_capabilities;
use conductor_domain::tool::value_objects::{ToolError, ToolResult};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Consecutive identical tool failures before a worker aborts its run
/// and asks the orchestrator to re-plan.
pub const ESCALATION_FAILURE_STREAK: u32 = 3;

/// Truncation applied to tool output fed back into the conversation.
const MAX_TOOL_FEEDBACK: usize = 3000;

/// A single specialist instance, short-lived per `run`.
pub struct Worker {
    spec: WorkerSpec,
    gateway: Arc<dyn LlmGateway>,
    tools: Arc<dyn ToolExecutorPort>,
    working_dir: String,
    options: GenOptions,
    llm_timeout: Duration,
    progress: Arc<dyn ProgressNotifier>,
    cancellation: CancellationToken,
}

/// Tracks consecutive identical tool failures for escalation detection.
#[derive(Default)]
struct FailureStreak {
    last: Option<(String, String)>,
    count: u32,
}

impl FailureStreak {
    fn observe(&mut self, tool: &str, result: &ToolResult) -> u32 {
        if result.is_success() {
            self.last = None;
            self.count = 0;
            return 0;
        }
        let message = result
            .error()
            .map(|e| e.message.clone())
            .unwrap_or_default();
        let key = (tool.to_string(), message);
        if self.last.as_ref() == Some(&key) {
            self.count += 1;
        } else {
            self.last = Some(key);
            self.count = 1;
        }
        self.count
    }
}

impl Worker {
    pub fn new(
        spec: WorkerSpec,
        gateway: Arc<dyn LlmGateway>,
        tools: Arc<dyn ToolExecutorPort>,
        working_dir: impl Into<String>,
    ) -> Self {
        Self {
            spec,
            gateway,
            tools,
            working_dir: working_dir.into(),
            options: GenOptions::default(),
            llm_timeout: Duration::from_secs(120),
            progress: Arc::new(crate::ports::progress::NoProgress),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_options(mut self, options: GenOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_llm_timeout(mut self, timeout: Duration) -> Self {
        self.llm_timeout = timeout;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressNotifier>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn spec(&self) -> &WorkerSpec {
        &self.spec
    }

    /// Run the tool-use loop until a final answer, the iteration bound,
    /// or an escalation trigger.
    pub async fn run(&self, task: &str) -> WorkerResult {
        let start = Instant::now();
        let name = self.spec.name.clone();
        let available = ToolCall::names_for_capabilities(&self.spec.capabilities);
        let tool_schemas = schemas_for_capabilities(&self.spec.capabilities);

        let mut messages = vec![
            Message::system(format!(
                "{}\n\nWorking directory: {}",
                self.spec.system_prompt, self.working_dir
            )),
            Message::user(task),
        ];

        let mut log: Vec<ToolCallLogEntry> = Vec::new();
        let mut streak = FailureStreak::default();

        for iteration in 1..=self.spec.max_iterations {
            debug!(worker = %name, iteration, "worker iteration");

            let request = ChatRequest::new(self.spec.model.clone(), messages.clone())
                .with_tools(tool_schemas.clone())
                .with_options(self.options.clone());

            let outcome = match collect_chat(
                self.gateway.as_ref(),
                request,
                self.llm_timeout,
                Some(&self.cancellation),
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(GatewayError::Cancelled) => {
                    return WorkerResult::failure(&name, "cancelled")
                        .with_tool_call_log(log)
                        .with_duration(start.elapsed().as_millis() as u64);
                }
                Err(e) => {
                    return WorkerResult::failure(&name, format!("LLM error: {e}"))
                        .with_tool_call_log(log)
                        .with_duration(start.elapsed().as_millis() as u64);
                }
            };

            // Tool-call extraction, three tiers: structured, embedded
            // JSON, then keyword intent over the free text.
            let mut calls: Vec<RawToolCall> = outcome.tool_calls;
            if calls.is_empty() {
                calls = parse_embedded_tool_calls(&outcome.text, &available);
            }
            if calls.is_empty()
                && let Some(guess) = detect_tool_intent(&outcome.text, task, &available)
            {
                debug!(worker = %name, tool = %guess.name, "inferred tool intent from narration");
                calls = vec![guess];
            }

            if calls.is_empty() {
                // Final answer
                let text = outcome.text.trim().to_string();
                let duration = start.elapsed().as_millis() as u64;
                if text.is_empty() {
                    return WorkerResult::failure(&name, "model returned an empty response")
                        .with_tool_call_log(log)
                        .with_duration(duration);
                }
                return WorkerResult::success(&name, text)
                    .with_tool_call_log(log)
                    .with_duration(duration);
            }

            messages.push(Message::assistant(if outcome.text.is_empty() {
                "Executing tools...".to_string()
            } else {
                outcome.text.clone()
            }));

            let mut feedback = Vec::new();
            for raw in &calls {
                let result = self.dispatch(raw).await;

                log.push(ToolCallLogEntry {
                    tool: raw.name.clone(),
                    summary: truncate(&raw.arguments.to_string(), 120),
                    success: result.is_success(),
                });
                self.progress.on_tool_result(&raw.name, result.is_success());

                if streak.observe(&raw.name, &result) >= ESCALATION_FAILURE_STREAK {
                    let context = format!(
                        "Tool '{}' failed {} times in a row with the same error: {}\nOriginal task: {}",
                        raw.name,
                        ESCALATION_FAILURE_STREAK,
                        result
                            .error()
                            .map(|e| e.message.clone())
                            .unwrap_or_default(),
                        task,
                    );
                    warn!(worker = %name, tool = %raw.name, "escalating after repeated identical failures");
                    return WorkerResult::escalation(&name, context)
                        .with_tool_call_log(log)
                        .with_duration(start.elapsed().as_millis() as u64);
                }

                feedback.push(format!(
                    "[Tool: {}]\n{}",
                    raw.name,
                    truncate(&result.feedback_text(), MAX_TOOL_FEEDBACK)
                ));
            }

            messages.push(Message::user(format!(
                "Tool results:\n{}",
                feedback.join("\n\n")
            )));
        }

        WorkerResult::failure(
            &name,
            format!(
                "agent reached max iterations ({}) without completing",
                self.spec.max_iterations
            ),
        )
        .with_tool_call_log(log)
        .with_duration(start.elapsed().as_millis() as u64)
    }

    /// Validate, capability-check, and execute one raw tool call.
    ///
    /// Every failure mode becomes a failed `ToolResult` fed back into the
    /// loop; a missing capability must fail deterministically before
    /// dispatch.
    async fn dispatch(&self, raw: &RawToolCall) -> ToolResult {
        self.progress.on_tool_call(&raw.name);

        let call = match ToolCall::parse(raw) {
            Ok(call) => call,
            Err(e) => {
                return ToolResult::failure(&raw.name, ToolError::invalid_argument(e.to_string()));
            }
        };

        if !self.spec.has_capability(call.required_capability()) {
            debug!(worker = %self.spec.name, tool = %raw.name, "capability denied");
            return ToolResult::failure(&raw.name, ToolError::capability_denied(&raw.name));
        }

        self.tools.execute(&call).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockToolExecutor, ScriptedGateway, ScriptedResponse};
    use conductor_domain::agent::capability::Capability;
    use conductor_domain::agent::entities::AgentKind;
    use serde_json::json;

    fn worker_with(
        kind: AgentKind,
        responses: Vec<ScriptedResponse>,
        tools: Arc<MockToolExecutor>,
    ) -> Worker {
        let gateway = Arc::new(ScriptedGateway::with_responses(responses));
        Worker::new(
            WorkerSpec::for_kind(kind, "test-model"),
            gateway,
            tools,
            "/tmp/project",
        )
    }

    #[tokio::test]
    async fn test_plain_response_is_final_answer() {
        let tools = Arc::new(MockToolExecutor::new());
        let worker = worker_with(
            AgentKind::Explorer,
            vec![ScriptedResponse::Text("The config sets port 8080.".into())],
            tools.clone(),
        );

        let result = worker.run("what's the port?").await;
        assert!(result.success);
        assert_eq!(result.output, "The config sets port 8080.");
        assert!(tools.calls().is_empty());
    }

    #[tokio::test]
    async fn test_structured_tool_call_loop() {
        let tools = Arc::new(MockToolExecutor::new());
        let worker = worker_with(
            AgentKind::Explorer,
            vec![
                ScriptedResponse::ToolCalls(vec![RawToolCall::new(
                    "read",
                    json!({"path": "config.yaml"}),
                )]),
                ScriptedResponse::Text("The file contains: port 8080".into()),
            ],
            tools.clone(),
        );

        let result = worker.run("what's in config.yaml?").await;
        assert!(result.success);
        assert_eq!(tools.calls(), vec!["read".to_string()]);
        assert_eq!(result.tool_call_log.len(), 1);
        assert!(result.tool_call_log[0].success);
    }

    #[tokio::test]
    async fn test_embedded_json_tool_call() {
        let tools = Arc::new(MockToolExecutor::new());
        let worker = worker_with(
            AgentKind::Executor,
            vec![
                ScriptedResponse::Text(
                    r#"{"name": "write", "arguments": {"path": "hello.py", "content": "print('hello')"}}"#
                        .into(),
                ),
                ScriptedResponse::Text("Created hello.py".into()),
            ],
            tools.clone(),
        );

        let result = worker.run("create hello.py").await;
        assert!(result.success);
        assert_eq!(tools.calls(), vec!["write".to_string()]);
    }

    #[tokio::test]
    async fn test_capability_denied_is_fed_back_not_executed() {
        let tools = Arc::new(MockToolExecutor::new());
        let gateway = Arc::new(ScriptedGateway::with_responses(vec![
            ScriptedResponse::ToolCalls(vec![RawToolCall::new(
                "write",
                json!({"path": "x.txt", "content": "data"}),
            )]),
            ScriptedResponse::Text("I cannot write files with my current permissions.".into()),
        ]));
        // Executor spec stripped of WRITE
        let spec = WorkerSpec::for_kind(AgentKind::Executor, "test-model")
            .with_capabilities([Capability::Read, Capability::Search, Capability::Bash]);
        let worker = Worker::new(spec, gateway, tools.clone(), "/tmp");

        let result = worker.run("write x.txt").await;
        assert!(result.success, "worker adapts and answers");
        assert!(
            tools.calls().is_empty(),
            "denied call must never reach the executor"
        );
        assert_eq!(result.tool_call_log.len(), 1);
        assert!(!result.tool_call_log[0].success);
    }

    #[tokio::test]
    async fn test_capability_denial_sweep() {
        use conductor_domain::tool::entities::TOOL_NAMES;

        // For every (capability-subset containing one capability, tool)
        // pair, the tool executes iff its capability is granted.
        for granted in Capability::all() {
            for tool_name in TOOL_NAMES {
                let args = match *tool_name {
                    "read" => json!({"path": "f"}),
                    "write" => json!({"path": "f", "content": "c"}),
                    "edit" => json!({"path": "f", "old_text": "a", "new_text": "b"}),
                    "grep" => json!({"pattern": "p"}),
                    "glob" => json!({"pattern": "*"}),
                    "bash" => json!({"command": "ls"}),
                    "web_search" => json!({"query": "q"}),
                    "web_fetch" => json!({"url": "http://x"}),
                    _ => unreachable!(),
                };
                let tools = Arc::new(MockToolExecutor::new());
                let gateway = Arc::new(ScriptedGateway::with_responses(vec![
                    ScriptedResponse::ToolCalls(vec![RawToolCall::new(*tool_name, args)]),
                    ScriptedResponse::Text("done".into()),
                ]));
                let spec = WorkerSpec::for_kind(AgentKind::Executor, "m")
                    .with_capabilities([granted]);
                let worker = Worker::new(spec, gateway, tools.clone(), "/tmp");
                let _ = worker.run("task").await;

                let should_run = ToolCall::capability_for(tool_name) == Some(granted);
                assert_eq!(
                    !tools.calls().is_empty(),
                    should_run,
                    "tool {tool_name} with grant {granted:?}"
                );
            }
        }
    }

    #[tokio::test]
    async fn test_escalation_after_three_identical_failures() {
        let tools = Arc::new(MockToolExecutor::new());
        tools.fail_tool("read", "No such file: ghost.txt");

        let read_call =
            ScriptedResponse::ToolCalls(vec![RawToolCall::new("read", json!({"path": "ghost.txt"}))]);
        let worker = worker_with(
            AgentKind::Explorer,
            vec![read_call.clone(), read_call.clone(), read_call],
            tools.clone(),
        );

        let result = worker.run("read ghost.txt").await;
        assert!(!result.success);
        assert!(result.needs_escalation);
        let context = result.escalation_context.unwrap();
        assert!(context.contains("ghost.txt"));
        assert!(context.contains("3 times"));
        assert_eq!(tools.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_different_errors_do_not_escalate() {
        let tools = Arc::new(MockToolExecutor::new());
        tools.fail_tool("read", "No such file: a.txt");

        let worker = worker_with(
            AgentKind::Explorer,
            vec![
                ScriptedResponse::ToolCalls(vec![RawToolCall::new("read", json!({"path": "a.txt"}))]),
                ScriptedResponse::ToolCalls(vec![RawToolCall::new("glob", json!({"pattern": "*"}))]),
                ScriptedResponse::ToolCalls(vec![RawToolCall::new("read", json!({"path": "a.txt"}))]),
                ScriptedResponse::Text("gave up gracefully".into()),
            ],
            tools.clone(),
        );

        let result = worker.run("find a.txt").await;
        assert!(result.success);
        assert!(!result.needs_escalation);
    }

    #[tokio::test]
    async fn test_max_iterations_bound() {
        let tools = Arc::new(MockToolExecutor::new());
        // Every turn emits a (successful) tool call, never a final answer
        let gateway = Arc::new(ScriptedGateway::repeating(ScriptedResponse::ToolCalls(vec![
            RawToolCall::new("glob", json!({"pattern": "*"})),
        ])));
        let spec = WorkerSpec::for_kind(AgentKind::Explorer, "m").with_max_iterations(3);
        let worker = Worker::new(spec, gateway, tools.clone(), "/tmp");

        let result = worker.run("loop forever").await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("max iterations (3)"));
        assert_eq!(tools.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_gateway_error_fails_the_run() {
        let tools = Arc::new(MockToolExecutor::new());
        let worker = worker_with(
            AgentKind::Explorer,
            vec![ScriptedResponse::Error(GatewayError::Connection(
                "refused".into(),
            ))],
            tools,
        );

        let result = worker.run("anything").await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("LLM error"));
    }

    #[tokio::test]
    async fn test_planner_has_no_tools() {
        let tools = Arc::new(MockToolExecutor::new());
        let worker = worker_with(
            AgentKind::Planner,
            vec![ScriptedResponse::Text(
                "ANALYSIS: x\nSTEPS:\n1. [executor] do\n".into(),
            )],
            tools.clone(),
        );
        let result = worker.run("plan it").await;
        assert!(result.success);
        assert!(tools.calls().is_empty());
    }
}
