//! Progress notification port
//!
//! The presentation layer implements this to render orchestration
//! activity; every method has a no-op default so implementations opt in
//! to what they display.

use conductor_domain::agent::entities::{AgentKind, ModelTier, WorkerResult};
use conductor_domain::plan::Plan;

pub trait ProgressNotifier: Send + Sync {
    /// The orchestrator started classifying a user turn.
    fn on_routing(&self) {}

    /// A worker is being spawned.
    fn on_spawn(&self, _kind: AgentKind, _tier: ModelTier) {}

    /// A worker run finished.
    fn on_worker_done(&self, _result: &WorkerResult) {}

    /// A worker dispatched a tool call.
    fn on_tool_call(&self, _summary: &str) {}

    fn on_tool_result(&self, _tool: &str, _success: bool) {}

    /// A supervision round started (1-based).
    fn on_review_round(&self, _round: u32) {}

    /// A worker escalated and the orchestrator is re-planning.
    fn on_escalation(&self, _context: &str) {}

    /// A plan was parsed and is about to execute.
    fn on_plan(&self, _plan: &Plan) {}

    /// A parallel group started (1-based index, member count).
    fn on_group_start(&self, _index: usize, _size: usize) {}

    /// Conversation history was compacted.
    fn on_compaction(&self) {}
}

/// No-op progress for headless runs and tests.
pub struct NoProgress;

impl ProgressNotifier for NoProgress {}
