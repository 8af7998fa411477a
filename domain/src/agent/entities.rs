//! Worker specifications and execution results

use crate::agent::capability::Capability;
use crate::core::error::DomainError;
use crate::prompt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

/// The closed set of specialist worker kinds.
///
/// Explorer, executor, researcher and planner are routable from the
/// orchestrator; the rest are auxiliary specialists reachable through
/// review follow-ups and the `/agents` listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Explorer,
    Executor,
    Researcher,
    Planner,
    Reviewer,
    Tester,
    Debugger,
    Docs,
    Refactor,
}

impl AgentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Explorer => "explorer",
            AgentKind::Executor => "executor",
            AgentKind::Researcher => "researcher",
            AgentKind::Planner => "planner",
            AgentKind::Reviewer => "reviewer",
            AgentKind::Tester => "tester",
            AgentKind::Debugger => "debugger",
            AgentKind::Docs => "docs",
            AgentKind::Refactor => "refactor",
        }
    }

    /// All worker kinds, in a stable order.
    pub fn all() -> &'static [AgentKind] {
        &[
            AgentKind::Explorer,
            AgentKind::Executor,
            AgentKind::Researcher,
            AgentKind::Planner,
            AgentKind::Reviewer,
            AgentKind::Tester,
            AgentKind::Debugger,
            AgentKind::Docs,
            AgentKind::Refactor,
        ]
    }

    /// Whether the orchestrator's routing layer may spawn this kind directly.
    pub fn is_routable(&self) -> bool {
        matches!(
            self,
            AgentKind::Explorer | AgentKind::Executor | AgentKind::Researcher | AgentKind::Planner
        )
    }

    /// The routing tool name used to spawn this kind (`spawn_explorer`, ...).
    ///
    /// Only meaningful for routable kinds.
    pub fn spawn_tool_name(&self) -> String {
        format!("spawn_{}", self.as_str())
    }

    /// Resolve a routing tool name (`spawn_executor`) back to the kind.
    pub fn from_spawn_tool(name: &str) -> Option<AgentKind> {
        let kind = name.strip_prefix("spawn_")?;
        kind.parse().ok().filter(AgentKind::is_routable)
    }

    /// The capability grant for this specialist.
    pub fn capabilities(&self) -> BTreeSet<Capability> {
        use Capability::*;
        let caps: &[Capability] = match self {
            AgentKind::Explorer => &[Read, Search],
            AgentKind::Executor => &[Read, Search, Bash, Write],
            AgentKind::Researcher => &[Read, Search, Web],
            AgentKind::Planner => &[],
            AgentKind::Reviewer => &[Read, Search],
            AgentKind::Tester => &[Read, Search, Bash],
            AgentKind::Debugger => &[Read, Search, Bash],
            AgentKind::Docs => &[Read, Search, Write],
            AgentKind::Refactor => &[Read, Search, Write],
        };
        caps.iter().copied().collect()
    }

    /// Iteration budget for the internal tool-use loop.
    pub fn max_iterations(&self) -> u32 {
        match self {
            AgentKind::Planner => 1,
            AgentKind::Executor | AgentKind::Refactor => 15,
            _ => 10,
        }
    }
}

impl FromStr for AgentKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "explorer" => Ok(AgentKind::Explorer),
            "executor" => Ok(AgentKind::Executor),
            "researcher" => Ok(AgentKind::Researcher),
            "planner" => Ok(AgentKind::Planner),
            "reviewer" => Ok(AgentKind::Reviewer),
            "tester" => Ok(AgentKind::Tester),
            "debugger" => Ok(AgentKind::Debugger),
            "docs" => Ok(AgentKind::Docs),
            "refactor" => Ok(AgentKind::Refactor),
            other => Err(DomainError::UnknownAgentKind(other.to_string())),
        }
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Model tier selected from the estimated task complexity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelTier {
    /// Lightweight model for simple tasks
    Lite,
    /// Default model
    #[default]
    Standard,
    /// Heavy model for complex tasks (also forced after escalation)
    Full,
}

/// Immutable configuration for one worker instance.
#[derive(Debug, Clone)]
pub struct WorkerSpec {
    pub name: String,
    pub kind: AgentKind,
    pub model: String,
    pub system_prompt: String,
    pub capabilities: BTreeSet<Capability>,
    pub max_iterations: u32,
}

impl WorkerSpec {
    /// Build the standard spec for a specialist kind with the given model.
    pub fn for_kind(kind: AgentKind, model: impl Into<String>) -> Self {
        Self {
            name: kind.as_str().to_string(),
            kind,
            model: model.into(),
            system_prompt: prompt::worker_system(kind).to_string(),
            capabilities: kind.capabilities(),
            max_iterations: kind.max_iterations(),
        }
    }

    /// Replace the capability grant (used by tests sweeping subsets).
    pub fn with_capabilities(mut self, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        self.capabilities = capabilities.into_iter().collect();
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

/// One entry in the per-run tool call log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallLogEntry {
    pub tool: String,
    pub summary: String,
    pub success: bool,
}

/// Result of one worker run.
///
/// Invariants: `success` implies non-empty `output`; a non-empty
/// `escalation_context` implies `success == false`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerResult {
    pub name: String,
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
    pub tool_call_log: Vec<ToolCallLogEntry>,
    pub duration_ms: u64,
    pub escalation_context: Option<String>,
    pub needs_escalation: bool,
}

impl WorkerResult {
    pub fn success(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            success: true,
            output: output.into(),
            error: None,
            tool_call_log: Vec::new(),
            duration_ms: 0,
            escalation_context: None,
            needs_escalation: false,
        }
    }

    pub fn failure(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            success: false,
            output: String::new(),
            error: Some(error.into()),
            tool_call_log: Vec::new(),
            duration_ms: 0,
            escalation_context: None,
            needs_escalation: false,
        }
    }

    /// A structured request for orchestrator re-planning.
    pub fn escalation(name: impl Into<String>, context: impl Into<String>) -> Self {
        let context = context.into();
        Self {
            name: name.into(),
            success: false,
            output: String::new(),
            error: Some("worker requested escalation".to_string()),
            tool_call_log: Vec::new(),
            duration_ms: 0,
            escalation_context: Some(context),
            needs_escalation: true,
        }
    }

    pub fn with_tool_call_log(mut self, log: Vec<ToolCallLogEntry>) -> Self {
        self.tool_call_log = log;
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// The text fed back to the orchestrator: output on success, the
    /// error message otherwise.
    pub fn user_facing_output(&self) -> &str {
        if self.success {
            &self.output
        } else {
            self.error.as_deref().unwrap_or("Unknown error")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip() {
        for kind in AgentKind::all() {
            assert_eq!(kind.as_str().parse::<AgentKind>().unwrap(), *kind);
        }
    }

    #[test]
    fn test_spawn_tool_name_round_trip() {
        assert_eq!(
            AgentKind::from_spawn_tool("spawn_explorer"),
            Some(AgentKind::Explorer)
        );
        assert_eq!(
            AgentKind::from_spawn_tool("spawn_planner"),
            Some(AgentKind::Planner)
        );
        // Auxiliary specialists are not routable
        assert_eq!(AgentKind::from_spawn_tool("spawn_reviewer"), None);
        assert_eq!(AgentKind::from_spawn_tool("read"), None);
    }

    #[test]
    fn test_capability_grants() {
        assert!(AgentKind::Explorer.capabilities().contains(&Capability::Read));
        assert!(!AgentKind::Explorer.capabilities().contains(&Capability::Write));
        assert!(AgentKind::Executor.capabilities().contains(&Capability::Bash));
        assert!(AgentKind::Researcher.capabilities().contains(&Capability::Web));
        assert!(AgentKind::Planner.capabilities().is_empty());
    }

    #[test]
    fn test_worker_spec_for_kind() {
        let spec = WorkerSpec::for_kind(AgentKind::Executor, "big-coder:7b");
        assert_eq!(spec.name, "executor");
        assert_eq!(spec.model, "big-coder:7b");
        assert_eq!(spec.max_iterations, 15);
        assert!(spec.has_capability(Capability::Write));
        assert!(!spec.has_capability(Capability::Web));
    }

    #[test]
    fn test_result_invariants() {
        let ok = WorkerResult::success("explorer", "found it");
        assert!(ok.success);
        assert!(!ok.output.is_empty());
        assert!(ok.escalation_context.is_none());

        let esc = WorkerResult::escalation("executor", "file keeps missing");
        assert!(!esc.success);
        assert!(esc.needs_escalation);
        assert!(esc.escalation_context.is_some());
    }
}
