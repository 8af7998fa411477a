//! Worker pool: builds specialists and runs them under admission control
//!
//! Shared by the orchestrator and the plan executor. Every run acquires a
//! semaphore slot (the planner excepted: it holds no tools and competes
//! with nothing), applies the agent deadline, and releases the slot on
//! every exit path via the RAII permit.

use crate::ports::llm_gateway::{GenOptions, LlmGateway};
use crate::ports::progress::ProgressNotifier;
use crate::ports::tool_executor::ToolExecutorPort;
use crate::semaphore::AgentSemaphore;
use crate::worker::Worker;
use conductor_domain::agent::entities::{AgentKind, ModelTier, WorkerResult, WorkerSpec};
use conductor_domain::plan::Complexity;
use conductor_domain::routing::intent::estimate_complexity;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Role-based model selection, mirroring the `models` config section.
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    pub planning: String,
    pub orchestration: String,
    pub research: String,
    pub execution: String,
    pub execution_lite: String,
    pub exploration: String,
    pub exploration_lite: String,
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self {
            planning: "deepseek-coder:6.7b".to_string(),
            orchestration: "llama3.2:3b".to_string(),
            research: "llama3.2:3b".to_string(),
            execution: "qwen2.5-coder:7b".to_string(),
            execution_lite: "qwen2.5-coder:1.5b".to_string(),
            exploration: "llama3.2:3b".to_string(),
            exploration_lite: "llama3.2:1b".to_string(),
        }
    }
}

impl ModelCatalog {
    /// Model for a specialist at a tier. Lite tiers only exist for the
    /// exploration/execution roles; everything else uses its role model.
    pub fn model_for(&self, kind: AgentKind, tier: ModelTier) -> &str {
        match kind {
            AgentKind::Explorer => match tier {
                ModelTier::Lite => &self.exploration_lite,
                _ => &self.exploration,
            },
            AgentKind::Executor | AgentKind::Refactor | AgentKind::Docs => match tier {
                ModelTier::Lite => &self.execution_lite,
                _ => &self.execution,
            },
            AgentKind::Researcher => &self.research,
            AgentKind::Planner => &self.planning,
            AgentKind::Reviewer => &self.exploration,
            AgentKind::Tester | AgentKind::Debugger => &self.execution,
        }
    }
}

/// Pool-wide settings.
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    pub working_dir: String,
    pub options: GenOptions,
    /// Deadline for one worker run
    pub agent_timeout: Duration,
    /// Deadline for one gateway call inside the worker loop
    pub llm_timeout: Duration,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            working_dir: ".".to_string(),
            options: GenOptions::default(),
            agent_timeout: Duration::from_secs(300),
            llm_timeout: Duration::from_secs(120),
        }
    }
}

/// Builds and runs specialist workers under the concurrency semaphore.
pub struct WorkerPool {
    gateway: Arc<dyn LlmGateway>,
    tools: Arc<dyn ToolExecutorPort>,
    semaphore: AgentSemaphore,
    progress: Arc<dyn ProgressNotifier>,
    catalog: ModelCatalog,
    config: WorkerPoolConfig,
    cancellation: CancellationToken,
}

impl WorkerPool {
    pub fn new(
        gateway: Arc<dyn LlmGateway>,
        tools: Arc<dyn ToolExecutorPort>,
        semaphore: AgentSemaphore,
        catalog: ModelCatalog,
        config: WorkerPoolConfig,
    ) -> Self {
        Self {
            gateway,
            tools,
            semaphore,
            progress: Arc::new(crate::ports::progress::NoProgress),
            catalog,
            config,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressNotifier>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn semaphore(&self) -> &AgentSemaphore {
        &self.semaphore
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn working_dir(&self) -> &str {
        &self.config.working_dir
    }

    /// Run a specialist, picking the model tier from the estimated task
    /// complexity.
    pub async fn run(&self, kind: AgentKind, task: &str) -> WorkerResult {
        let tier = match estimate_complexity(task) {
            Complexity::Simple => ModelTier::Lite,
            Complexity::Moderate => ModelTier::Standard,
            Complexity::Complex => ModelTier::Full,
        };
        self.run_with_tier(kind, task, tier).await
    }

    /// Run a specialist at an explicit tier (`force_lite` / `force_full`).
    pub async fn run_with_tier(&self, kind: AgentKind, task: &str, tier: ModelTier) -> WorkerResult {
        let model = self.catalog.model_for(kind, tier).to_string();
        let spec = WorkerSpec::for_kind(kind, model);
        self.progress.on_spawn(kind, tier);
        debug!(kind = %kind, tier = ?tier, "spawning worker");

        let worker = Worker::new(
            spec,
            Arc::clone(&self.gateway),
            Arc::clone(&self.tools),
            self.config.working_dir.clone(),
        )
        .with_options(self.config.options.clone())
        .with_llm_timeout(self.config.llm_timeout)
        .with_progress(Arc::clone(&self.progress))
        .with_cancellation(self.cancellation.clone());

        // The planner holds no tools and returns a single completion; it
        // does not consume an agent slot.
        let _permit = if kind == AgentKind::Planner {
            None
        } else {
            Some(self.semaphore.acquire().await)
        };

        let result = match tokio::time::timeout(self.config.agent_timeout, worker.run(task)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(kind = %kind, "worker timed out");
                WorkerResult::failure(
                    kind.as_str(),
                    format!(
                        "agent timed out after {} seconds",
                        self.config.agent_timeout.as_secs()
                    ),
                )
            }
        };

        self.progress.on_worker_done(&result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockToolExecutor, ScriptedGateway, ScriptedResponse};

    fn pool(gateway: Arc<ScriptedGateway>, capacity: usize) -> WorkerPool {
        WorkerPool::new(
            gateway,
            Arc::new(MockToolExecutor::new()),
            AgentSemaphore::new(capacity),
            ModelCatalog::default(),
            WorkerPoolConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_tier_selection_from_complexity() {
        let catalog = ModelCatalog::default();
        assert_eq!(
            catalog.model_for(AgentKind::Executor, ModelTier::Lite),
            "qwen2.5-coder:1.5b"
        );
        assert_eq!(
            catalog.model_for(AgentKind::Executor, ModelTier::Full),
            "qwen2.5-coder:7b"
        );
        assert_eq!(
            catalog.model_for(AgentKind::Planner, ModelTier::Standard),
            "deepseek-coder:6.7b"
        );
    }

    #[tokio::test]
    async fn test_simple_task_uses_lite_model() {
        let gateway = Arc::new(ScriptedGateway::with_responses(vec![
            ScriptedResponse::Text("done".into()),
        ]));
        let pool = pool(gateway.clone(), 2);

        let result = pool.run(AgentKind::Explorer, "read the README").await;
        assert!(result.success);
        assert_eq!(gateway.models_used(), vec!["llama3.2:1b".to_string()]);
    }

    #[tokio::test]
    async fn test_complex_task_uses_full_model() {
        let gateway = Arc::new(ScriptedGateway::with_responses(vec![
            ScriptedResponse::Text("done".into()),
        ]));
        let pool = pool(gateway.clone(), 2);

        let result = pool
            .run(AgentKind::Executor, "refactor the session module")
            .await;
        assert!(result.success);
        assert_eq!(gateway.models_used(), vec!["qwen2.5-coder:7b".to_string()]);
    }

    #[tokio::test]
    async fn test_timeout_releases_slot() {
        let gateway = Arc::new(ScriptedGateway::repeating(ScriptedResponse::Hang));
        let mut pool = pool(gateway, 1);
        pool.config.agent_timeout = Duration::from_millis(50);
        pool.config.llm_timeout = Duration::from_secs(10);

        let result = pool.run(AgentKind::Explorer, "hang forever").await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("timed out"));
        assert_eq!(pool.semaphore().active(), 0, "slot must be released");
    }

    #[tokio::test]
    async fn test_auxiliary_specialists_run_with_their_role_models() {
        for (kind, expected_model) in [
            (AgentKind::Reviewer, "llama3.2:3b"),
            (AgentKind::Tester, "qwen2.5-coder:7b"),
            (AgentKind::Debugger, "qwen2.5-coder:7b"),
            (AgentKind::Docs, "qwen2.5-coder:7b"),
            (AgentKind::Refactor, "qwen2.5-coder:7b"),
        ] {
            let gateway = Arc::new(ScriptedGateway::with_responses(vec![
                ScriptedResponse::Text("looked it over".into()),
            ]));
            let pool = pool(gateway.clone(), 2);
            let result = pool
                .run_with_tier(kind, "inspect the module", ModelTier::Standard)
                .await;
            assert!(result.success, "{kind} should complete");
            assert_eq!(gateway.models_used(), vec![expected_model.to_string()]);
        }
    }

    #[tokio::test]
    async fn test_planner_does_not_take_a_slot() {
        let gateway = Arc::new(ScriptedGateway::with_responses(vec![
            ScriptedResponse::Text("ANALYSIS: a\nSTEPS:\n1. [executor] x\n".into()),
        ]));
        let pool = pool(gateway, 1);
        // Hold the only slot; the planner must still run
        let _permit = pool.semaphore().acquire().await;
        let result = tokio::time::timeout(
            Duration::from_secs(1),
            pool.run(AgentKind::Planner, "plan something"),
        )
        .await
        .expect("planner must not block on the semaphore");
        assert!(result.success);
    }
}
