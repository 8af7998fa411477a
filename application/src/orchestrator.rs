//! The orchestrator loop
//!
//! The public entry point `process()` shapes every user turn: context
//! compaction, memory augmentation, intent routing, semaphore-gated
//! dispatch, review/supervision with a bounded number of rounds, and
//! escalation handling. The worker loop contains tool errors; this loop
//! contains worker errors; only gateway failures and the supervision
//! bound ever reach the user, and always as readable text.

use crate::plan_executor::{PlanExecutor, PlanReport};
use crate::pool::WorkerPool;
use crate::ports::conversation_logger::ConversationLogger;
use crate::ports::llm_gateway::{ChatOutcome, ChatRequest, GatewayError, LlmGateway, collect_chat};
use crate::ports::memory::MemoryPort;
use crate::ports::progress::ProgressNotifier;
use conductor_domain::agent::entities::{AgentKind, ModelTier, WorkerResult};
use conductor_domain::core::string::truncate;
use conductor_domain::plan::{Plan, parse_plan};
use conductor_domain::prompt;
use conductor_domain::routing::{
    RoutingDecision, detect_response_intent, detect_user_intent, parse_routing_calls,
};
use conductor_domain::session::{Message, Session, Turn};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Marker prefixed to the reply when supervision hits its round bound.
pub const MAX_ROUNDS_MARKER: &str = "[max rounds reached]";

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

/// Orchestrator tuning knobs.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Bound on (spawn → review → dispatch) cycles per turn
    pub max_supervision_rounds: u32,
    /// Deadline for one routing/review gateway call
    pub llm_timeout: Duration,
    /// Model context window in tokens; drives compaction
    pub context_window: usize,
    /// Memories injected per turn
    pub max_memory_results: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_supervision_rounds: 3,
            llm_timeout: Duration::from_secs(120),
            context_window: 8192,
            max_memory_results: 5,
        }
    }
}

/// Live concurrency telemetry for the `/agents` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentStatus {
    pub active: usize,
    pub available: usize,
    pub capacity: usize,
    pub waiting: usize,
}

/// Carries the worker outcome between supervision rounds.
struct RoundState {
    agent_type: String,
    output: String,
    success: bool,
    escalation: Option<String>,
}

impl RoundState {
    fn from_worker(kind: AgentKind, result: WorkerResult) -> Self {
        Self {
            agent_type: kind.as_str().to_string(),
            output: result.user_facing_output().to_string(),
            success: result.success,
            escalation: if result.needs_escalation {
                Some(
                    result
                        .escalation_context
                        .unwrap_or_else(|| "no context provided".to_string()),
                )
            } else {
                None
            },
        }
    }

    fn from_plan_report(report: &PlanReport) -> Self {
        Self {
            agent_type: "plan_execution".to_string(),
            output: report.combined_output.clone(),
            success: report.all_succeeded(),
            escalation: None,
        }
    }
}

enum EscalationOutcome {
    Continue(RoundState),
    Final(String),
}

/// The top-level supervisor.
pub struct Orchestrator {
    gateway: Arc<dyn LlmGateway>,
    pool: Arc<WorkerPool>,
    memory: Option<Arc<dyn MemoryPort>>,
    progress: Arc<dyn ProgressNotifier>,
    logger: Option<Arc<dyn ConversationLogger>>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        gateway: Arc<dyn LlmGateway>,
        pool: Arc<WorkerPool>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            gateway,
            pool,
            memory: None,
            progress: Arc::new(crate::ports::progress::NoProgress),
            logger: None,
            config,
        }
    }

    pub fn with_memory(mut self, memory: Arc<dyn MemoryPort>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressNotifier>) -> Self {
        self.progress = progress;
        self
    }

    pub fn agent_status(&self) -> AgentStatus {
        let semaphore = self.pool.semaphore();
        AgentStatus {
            active: semaphore.active(),
            available: semaphore.available(),
            capacity: semaphore.capacity(),
            waiting: semaphore.waiting(),
        }
    }

    /// Directly run one specialist (the `/explore` and `/execute`
    /// control-plane commands). Bypasses routing and review.
    pub async fn run_specialist(&self, kind: AgentKind, task: &str) -> WorkerResult {
        self.pool.run(kind, task).await
    }

    /// Process one user turn. The `&mut Session` receiver serializes
    /// turns per session by construction; calls across different
    /// sessions are independent.
    pub async fn process(
        &self,
        session: &mut Session,
        user_message: &str,
    ) -> Result<String, OrchestratorError> {
        // 1. Context preparation
        self.compact_if_needed(session).await;

        // 2. Memory retrieval (transient augmentation only)
        let memories = self.retrieve_memories(&session.id, user_message).await;

        // 3. Intent resolution
        self.progress.on_routing();
        let decision = self.route(session, &memories, user_message).await?;
        debug!(?decision, "routing decision");

        // 4–7. Dispatch, review, escalation
        let reply = match decision {
            RoutingDecision::Direct(text) => text,
            RoutingDecision::Spawn {
                agent: AgentKind::Planner,
                task,
            } => self.run_plan(user_message, &task).await,
            RoutingDecision::Spawn { agent, task } => {
                let result = self.pool.run(agent, &task).await;
                let state = RoundState::from_worker(agent, result);
                self.supervise(user_message, state).await
            }
        };

        // 8. Persistence + best-effort memory extraction
        session.push_turn(Turn::new(user_message, reply.clone()));
        if let Some(logger) = &self.logger {
            logger.log_turn(&session.id, user_message, &reply);
        }
        self.extract_memories(&session.id, user_message, &reply);

        Ok(reply)
    }

    // ==================== Context management ====================

    async fn compact_if_needed(&self, session: &mut Session) {
        if !session.needs_compaction(self.config.context_window) {
            return;
        }
        let Some(to_summarize) = session.split_for_compaction() else {
            return;
        };
        info!(
            dropped_turns = to_summarize.len(),
            kept_turns = session.turns.len(),
            "compacting conversation history"
        );

        let history_text = to_summarize
            .iter()
            .flat_map(|t| {
                [
                    format!("user: {}", truncate(&t.user, 500)),
                    format!("assistant: {}", truncate(&t.assistant, 500)),
                ]
            })
            .collect::<Vec<_>>()
            .join("\n");

        // Dedicated no-tools gateway call; on failure the history stays
        // truncated, which is the acceptable degraded outcome.
        let request = ChatRequest::new(
            self.pool.catalog().orchestration.clone(),
            vec![Message::user(prompt::summarize_prompt(&history_text))],
        );
        match collect_chat(self.gateway.as_ref(), request, self.config.llm_timeout, None).await {
            Ok(outcome) if !outcome.text.trim().is_empty() => {
                session.extend_summary(outcome.text.trim());
            }
            Ok(_) => debug!("empty compaction summary; history truncated without one"),
            Err(e) => debug!("compaction summary failed ({e}); history truncated without one"),
        }
        if let Some(logger) = &self.logger {
            logger.log_event(
                "compaction",
                serde_json::json!({"dropped_turns": to_summarize.len()}),
            );
        }
        self.progress.on_compaction();
    }

    async fn retrieve_memories(&self, session_id: &str, query: &str) -> Vec<String> {
        let Some(memory) = &self.memory else {
            return Vec::new();
        };
        match memory
            .search(query, session_id, self.config.max_memory_results)
            .await
        {
            Ok(memories) => memories,
            Err(e) => {
                debug!("memory search failed: {e}");
                Vec::new()
            }
        }
    }

    /// Spawn a background task extracting durable facts from the
    /// exchange. Failures are logged, never surfaced.
    fn extract_memories(&self, session_id: &str, user_msg: &str, assistant_msg: &str) {
        let Some(memory) = &self.memory else { return };
        if assistant_msg.len() < 50 {
            return;
        }

        let gateway = Arc::clone(&self.gateway);
        let memory = Arc::clone(memory);
        let model = self.pool.catalog().orchestration.clone();
        let extract = prompt::memory_extract_prompt(
            &truncate(user_msg, 500),
            &truncate(assistant_msg, 500),
        );
        let session_id = session_id.to_string();

        tokio::spawn(async move {
            let request = ChatRequest::new(model, vec![Message::user(extract)]);
            match collect_chat(gateway.as_ref(), request, Duration::from_secs(20), None).await {
                Ok(outcome) => {
                    let text = outcome.text.trim();
                    if !text.is_empty() && !text.to_lowercase().starts_with("none") {
                        if let Err(e) = memory.store(text, &session_id).await {
                            debug!("memory store failed: {e}");
                        }
                    }
                }
                Err(e) => debug!("memory extraction failed: {e}"),
            }
        });
    }

    // ==================== Routing ====================

    fn build_system_prompt(&self, session: &Session, memories: &[String]) -> String {
        let base = prompt::orchestrator_system(&session.project_dir);
        let mut parts = Vec::new();
        if !session.summary.is_empty() {
            parts.push(format!(
                "Previous conversation summary:\n{}",
                session.summary
            ));
        }
        if !memories.is_empty() {
            let memory_text = memories
                .iter()
                .take(self.config.max_memory_results)
                .map(|m| format!("- {m}"))
                .collect::<Vec<_>>()
                .join("\n");
            parts.push(format!("Relevant memories:\n{memory_text}"));
        }
        if parts.is_empty() {
            base
        } else {
            format!("{}\n\n---\n\n{}", parts.join("\n\n"), base)
        }
    }

    /// One gateway call with a single cheap retry on failure.
    async fn gateway_call(&self, request: ChatRequest) -> Result<ChatOutcome, GatewayError> {
        match collect_chat(
            self.gateway.as_ref(),
            request.clone(),
            self.config.llm_timeout,
            None,
        )
        .await
        {
            Ok(outcome) => Ok(outcome),
            Err(first) => {
                warn!("gateway call failed ({first}); retrying once");
                collect_chat(self.gateway.as_ref(), request, self.config.llm_timeout, None).await
            }
        }
    }

    async fn route(
        &self,
        session: &Session,
        memories: &[String],
        user_message: &str,
    ) -> Result<RoutingDecision, OrchestratorError> {
        let mut messages = vec![Message::system(self.build_system_prompt(session, memories))];
        messages.extend(session.recent_messages(5));
        messages.push(Message::user(user_message));

        let request = ChatRequest::new(self.pool.catalog().orchestration.clone(), messages)
            .with_tools(prompt::routing_tools());
        let outcome = self.gateway_call(request).await?;

        // Single-dispatch contract: only the first call is honored.
        for raw in &outcome.tool_calls {
            if let Some(decision) = RoutingDecision::from_raw_call(raw, user_message) {
                return Ok(decision);
            }
        }
        if let Some(raw) = parse_routing_calls(&outcome.text).first()
            && let Some(decision) = RoutingDecision::from_raw_call(raw, user_message)
        {
            return Ok(decision);
        }
        if let Some(agent) = detect_response_intent(&outcome.text) {
            debug!(agent = %agent, "routing via response-language intent");
            return Ok(RoutingDecision::Spawn {
                agent,
                task: user_message.to_string(),
            });
        }
        if let Some(agent) = detect_user_intent(user_message) {
            debug!(agent = %agent, "routing via user-message intent");
            return Ok(RoutingDecision::Spawn {
                agent,
                task: user_message.to_string(),
            });
        }

        Ok(RoutingDecision::Direct(outcome.text))
    }

    // ==================== Planner path ====================

    async fn run_plan(&self, user_message: &str, task: &str) -> String {
        let planner = self
            .pool
            .run_with_tier(AgentKind::Planner, task, ModelTier::Standard)
            .await;
        if !planner.success {
            return format!("Planning failed: {}", planner.user_facing_output());
        }

        let plan = normalize_plan(parse_plan(&planner.output));
        if plan.steps.is_empty() {
            return format!(
                "Plan created but no executable steps found:\n{}",
                planner.output
            );
        }
        self.progress.on_plan(&plan);

        let executor = PlanExecutor::new(Arc::clone(&self.pool));
        let report = executor.execute(&plan).await;
        let state = RoundState::from_plan_report(&report);
        self.supervise(user_message, state).await
    }

    // ==================== Review & supervision ====================

    /// The (review → possibly dispatch again) cycle, bounded by
    /// `max_supervision_rounds`. Implemented iteratively: each follow-up
    /// dispatch or escalation consumes one round and feeds the next.
    async fn supervise(&self, user_request: &str, mut state: RoundState) -> String {
        let mut round: u32 = 1;

        loop {
            if round > self.config.max_supervision_rounds {
                warn!("supervision bound reached; returning last output");
                return format!("{MAX_ROUNDS_MARKER} {}", state.output);
            }
            self.progress.on_review_round(round);

            // Escalation sentinel takes priority over review
            if let Some(context) = state.escalation.take() {
                self.progress.on_escalation(&context);
                match self.handle_escalation(user_request, &context).await {
                    EscalationOutcome::Continue(next) => {
                        state = next;
                        round += 1;
                        continue;
                    }
                    EscalationOutcome::Final(text) => return text,
                }
            }

            let review_body = prompt::review_prompt(
                user_request,
                &state.agent_type,
                &if state.success {
                    state.output.clone()
                } else {
                    format!("AGENT ERROR: {}", state.output)
                },
            );
            let messages = vec![
                Message::system(prompt::orchestrator_system(self.pool.working_dir())),
                Message::user(review_body),
            ];
            let request = ChatRequest::new(self.pool.catalog().orchestration.clone(), messages)
                .with_tools(prompt::routing_tools());

            let review = match self.gateway_call(request).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    // Review is advisory; fall back to the worker output
                    warn!("review call failed ({e}); returning agent output");
                    return state.output;
                }
            };

            // A follow-up spawn from the reviewer consumes a round.
            // Reviews may only dispatch explorer/executor follow-ups.
            let follow_up = review
                .tool_calls
                .iter()
                .cloned()
                .chain(parse_routing_calls(&review.text))
                .filter_map(|raw| RoutingDecision::from_raw_call(&raw, user_request))
                .find(|decision| {
                    matches!(
                        decision,
                        RoutingDecision::Spawn {
                            agent: AgentKind::Explorer | AgentKind::Executor,
                            ..
                        }
                    )
                });

            if let Some(RoutingDecision::Spawn { agent, task }) = follow_up {
                info!(agent = %agent, "reviewer requested follow-up");
                let result = self.pool.run(agent, &task).await;
                state = RoundState::from_worker(agent, result);
                round += 1;
                continue;
            }

            // Approved: the review summary, or the output when the
            // review adds nothing.
            let text = review.text.trim();
            return if text.is_empty() {
                state.output
            } else {
                text.to_string()
            };
        }
    }

    /// Present the failure context to the orchestrator model and act on
    /// its choice: decompose via planner, gather facts via explorer, or
    /// retry the executor with a reformulated task on the heavy tier.
    async fn handle_escalation(&self, user_request: &str, context: &str) -> EscalationOutcome {
        info!("handling worker escalation");
        let messages = vec![
            Message::system(prompt::orchestrator_system(self.pool.working_dir())),
            Message::user(prompt::escalation_prompt(user_request, context)),
        ];
        let request = ChatRequest::new(self.pool.catalog().orchestration.clone(), messages)
            .with_tools(prompt::routing_tools());

        let outcome = match self.gateway_call(request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                return EscalationOutcome::Final(format!("Escalation handling failed: {e}"));
            }
        };

        let decision = outcome
            .tool_calls
            .iter()
            .cloned()
            .chain(parse_routing_calls(&outcome.text))
            .filter_map(|raw| RoutingDecision::from_raw_call(&raw, user_request))
            .next();

        match decision {
            Some(RoutingDecision::Spawn {
                agent: AgentKind::Planner,
                task,
            }) => {
                info!("escalation: decomposing with the planner");
                let planner = self
                    .pool
                    .run_with_tier(AgentKind::Planner, &task, ModelTier::Standard)
                    .await;
                if !planner.success {
                    return EscalationOutcome::Final(format!(
                        "Planning failed: {}",
                        planner.user_facing_output()
                    ));
                }
                let plan = normalize_plan(parse_plan(&planner.output));
                if plan.steps.is_empty() {
                    return EscalationOutcome::Final(planner.output);
                }
                self.progress.on_plan(&plan);
                let report = PlanExecutor::new(Arc::clone(&self.pool)).execute(&plan).await;
                EscalationOutcome::Continue(RoundState::from_plan_report(&report))
            }
            Some(RoutingDecision::Spawn {
                agent: AgentKind::Explorer,
                task,
            }) => {
                info!("escalation: gathering facts first");
                let result = self.pool.run(AgentKind::Explorer, &task).await;
                EscalationOutcome::Continue(RoundState::from_worker(AgentKind::Explorer, result))
            }
            Some(RoutingDecision::Spawn { agent: _, task }) => {
                // Reformulated retry gets the heavy tier
                info!("escalation: retrying executor with reformulated task");
                let result = self
                    .pool
                    .run_with_tier(AgentKind::Executor, &task, ModelTier::Full)
                    .await;
                EscalationOutcome::Continue(RoundState::from_worker(AgentKind::Executor, result))
            }
            Some(RoutingDecision::Direct(_)) | None => {
                let text = outcome.text.trim();
                if text.is_empty() {
                    EscalationOutcome::Final(
                        "The task could not be completed. The orchestrator was unable to find a solution."
                            .to_string(),
                    )
                } else {
                    EscalationOutcome::Final(text.to_string())
                }
            }
        }
    }
}

/// Ensure a parsed plan satisfies the group invariants, rebuilding the
/// groups (and, if needed, dropping stale dependency edges) when the
/// planner produced an inconsistent layout.
fn normalize_plan(mut plan: Plan) -> Plan {
    if plan.steps.is_empty() || plan.validate().is_ok() {
        return plan;
    }
    warn!("planner produced inconsistent groups; falling back to sequential execution");
    plan.parallel_groups = plan.steps.iter().map(|s| vec![s.step_num]).collect();
    if plan.validate().is_err() {
        for step in &mut plan.steps {
            step.depends_on.clear();
        }
    }
    plan
}
