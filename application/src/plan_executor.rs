//! Plan executor
//!
//! Executes a validated plan as a sequence of parallel groups: groups run
//! strictly in order (a full barrier between them, the only
//! happens-before guarantee the planner can rely on), steps within a
//! group run concurrently under the agent semaphore. A step's failure
//! never aborts its group, and the combined report is assembled in
//! ascending step-number order so the output is deterministic regardless
//! of completion order.

use crate::pool::WorkerPool;
use crate::ports::progress::ProgressNotifier;
use conductor_domain::agent::entities::WorkerResult;
use conductor_domain::plan::Plan;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Aggregated outcome of one plan execution.
#[derive(Debug)]
pub struct PlanReport {
    /// Per-step sections concatenated in ascending step-number order
    pub combined_output: String,
    /// Step numbers that failed, ascending
    pub failed_steps: Vec<u32>,
    /// Every step result, keyed by step number
    pub step_results: BTreeMap<u32, WorkerResult>,
}

impl PlanReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed_steps.is_empty()
    }
}

pub struct PlanExecutor {
    pool: Arc<WorkerPool>,
    progress: Arc<dyn ProgressNotifier>,
}

impl PlanExecutor {
    pub fn new(pool: Arc<WorkerPool>) -> Self {
        Self {
            pool,
            progress: Arc::new(crate::ports::progress::NoProgress),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressNotifier>) -> Self {
        self.progress = progress;
        self
    }

    /// Run every group in order; within a group, start every member step
    /// concurrently and wait for all of them (success or failure) before
    /// the next group begins.
    pub async fn execute(&self, plan: &Plan) -> PlanReport {
        info!(steps = plan.steps.len(), groups = plan.parallel_groups.len(), "executing plan");
        let mut step_results: BTreeMap<u32, WorkerResult> = BTreeMap::new();

        for (index, group) in plan.parallel_groups.iter().enumerate() {
            let steps = plan.steps_in_group(group);
            if steps.is_empty() {
                continue;
            }
            self.progress.on_group_start(index + 1, steps.len());

            let mut join_set = JoinSet::new();
            for step in steps {
                let pool = Arc::clone(&self.pool);
                let kind = step.agent;
                let description = step.description.clone();
                let step_num = step.step_num;
                join_set.spawn(async move { (step_num, pool.run(kind, &description).await) });
            }

            while let Some(joined) = join_set.join_next().await {
                match joined {
                    Ok((step_num, result)) => {
                        step_results.insert(step_num, result);
                    }
                    Err(e) => {
                        warn!("plan step task failed to join: {e}");
                    }
                }
            }
        }

        let mut sections = Vec::new();
        let mut ordered_steps: Vec<_> = plan.steps.iter().collect();
        ordered_steps.sort_by_key(|s| s.step_num);
        for step in ordered_steps {
            if let Some(result) = step_results.get(&step.step_num) {
                sections.push(format!(
                    "### Step {}: {}\n{}",
                    step.step_num,
                    step.description,
                    result.user_facing_output()
                ));
            }
        }

        let failed_steps: Vec<u32> = step_results
            .iter()
            .filter(|(_, r)| !r.success)
            .map(|(num, _)| *num)
            .collect();

        if !failed_steps.is_empty() {
            warn!(?failed_steps, "plan finished with failed steps");
        }

        PlanReport {
            combined_output: sections.join("\n\n"),
            failed_steps,
            step_results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{ModelCatalog, WorkerPoolConfig};
    use crate::semaphore::AgentSemaphore;
    use crate::test_support::{MockToolExecutor, ScriptedGateway, ScriptedResponse};
    use conductor_domain::agent::entities::AgentKind;
    use conductor_domain::plan::{Complexity, PlanStep};
    use std::time::Duration;

    fn make_plan(groups: Vec<Vec<u32>>, steps: Vec<(u32, &str)>) -> Plan {
        Plan {
            analysis: "test".to_string(),
            steps: steps
                .into_iter()
                .map(|(num, desc)| PlanStep {
                    step_num: num,
                    agent: AgentKind::Executor,
                    description: desc.to_string(),
                    depends_on: Vec::new(),
                })
                .collect(),
            parallel_groups: groups,
            complexity: Complexity::Moderate,
            raw_output: String::new(),
        }
    }

    fn make_pool(gateway: Arc<ScriptedGateway>, capacity: usize) -> Arc<WorkerPool> {
        Arc::new(WorkerPool::new(
            gateway,
            Arc::new(MockToolExecutor::new()),
            AgentSemaphore::new(capacity),
            ModelCatalog::default(),
            WorkerPoolConfig::default(),
        ))
    }

    #[tokio::test]
    async fn test_combined_output_in_step_order() {
        // Finish steps in scrambled order via per-response delays; the
        // report must still read 1, 2, 3.
        let gateway = Arc::new(ScriptedGateway::repeating(ScriptedResponse::Delayed(
            Duration::from_millis(10),
            Box::new(ScriptedResponse::Text("done".into())),
        )));
        let pool = make_pool(gateway, 4);
        let plan = make_plan(
            vec![vec![1, 2, 3]],
            vec![(1, "first task"), (2, "second task"), (3, "third task")],
        );

        let report = PlanExecutor::new(pool).execute(&plan).await;
        let first = report.combined_output.find("### Step 1").unwrap();
        let second = report.combined_output.find("### Step 2").unwrap();
        let third = report.combined_output.find("### Step 3").unwrap();
        assert!(first < second && second < third);
        assert!(report.all_succeeded());
    }

    #[tokio::test]
    async fn test_groups_form_a_barrier() {
        // Two groups; the group-2 step must not start until both group-1
        // steps completed. The scripted gateway records request order, and
        // each worker makes exactly one request, so it suffices that the
        // group-2 request comes last.
        let gateway = Arc::new(ScriptedGateway::with_responses(vec![
            ScriptedResponse::Delayed(
                Duration::from_millis(60),
                Box::new(ScriptedResponse::Text("slow one".into())),
            ),
            ScriptedResponse::Text("fast one".into()),
            ScriptedResponse::Text("after the barrier".into()),
        ]));
        let pool = make_pool(gateway.clone(), 4);
        let plan = make_plan(
            vec![vec![1, 2], vec![3]],
            vec![(1, "slow step"), (2, "fast step"), (3, "final step")],
        );

        let report = PlanExecutor::new(pool).execute(&plan).await;
        assert_eq!(gateway.request_count(), 3);
        // The third request happened after both group-1 workers finished
        let third_messages = gateway.request_messages(2);
        assert!(third_messages.iter().any(|m| m.content.contains("final step")));
        assert!(report.all_succeeded());
    }

    #[tokio::test]
    async fn test_step_failure_does_not_abort_group() {
        let gateway = Arc::new(ScriptedGateway::with_responses(vec![
            ScriptedResponse::Error(crate::ports::llm_gateway::GatewayError::Connection(
                "refused".into(),
            )),
            ScriptedResponse::Text("second ok".into()),
        ]));
        let pool = make_pool(gateway, 1);
        let plan = make_plan(vec![vec![1, 2]], vec![(1, "fails"), (2, "succeeds")]);

        let report = PlanExecutor::new(pool).execute(&plan).await;
        assert_eq!(report.step_results.len(), 2, "both steps ran to completion");
        assert_eq!(report.failed_steps.len(), 1);
        assert!(report.combined_output.contains("### Step 1"));
        assert!(report.combined_output.contains("### Step 2"));
    }

    #[tokio::test]
    async fn test_capacity_bounds_concurrency() {
        // S6: a 4-step parallel group under capacity 2; all steps finish
        // and the observed concurrency never exceeds the ceiling.
        let gateway = Arc::new(ScriptedGateway::repeating(ScriptedResponse::Delayed(
            Duration::from_millis(30),
            Box::new(ScriptedResponse::Text("done".into())),
        )));
        let pool = make_pool(gateway, 2);
        let semaphore = pool.semaphore().clone();
        let plan = make_plan(
            vec![vec![1, 2, 3, 4]],
            vec![(1, "a"), (2, "b"), (3, "c"), (4, "d")],
        );

        let watcher = {
            let semaphore = semaphore.clone();
            tokio::spawn(async move {
                let mut max_seen = 0;
                for _ in 0..40 {
                    max_seen = max_seen.max(semaphore.active());
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
                max_seen
            })
        };

        let report = PlanExecutor::new(pool).execute(&plan).await;
        assert_eq!(report.step_results.len(), 4);
        assert!(report.all_succeeded());

        let max_seen = watcher.await.unwrap();
        assert!(max_seen <= 2, "activeCount exceeded capacity: {max_seen}");
        assert_eq!(semaphore.active(), 0);
    }

    #[tokio::test]
    async fn test_deterministic_report_across_runs() {
        // Nondeterministic completion order; byte-identical reports.
        let mut reports = Vec::new();
        for round in 0..2 {
            let gateway = Arc::new(ScriptedGateway::with_responses(vec![
                ScriptedResponse::Delayed(
                    Duration::from_millis(if round == 0 { 40 } else { 1 }),
                    Box::new(ScriptedResponse::Text("alpha output".into())),
                ),
                ScriptedResponse::Delayed(
                    Duration::from_millis(if round == 0 { 1 } else { 40 }),
                    Box::new(ScriptedResponse::Text("beta output".into())),
                ),
            ]));
            let pool = make_pool(gateway, 4);
            let plan = make_plan(vec![vec![1, 2]], vec![(1, "alpha task"), (2, "beta task")]);
            let report = PlanExecutor::new(pool).execute(&plan).await;
            reports.push(report.combined_output);
        }
        // Responses are served in request order, which is spawn order
        // (ascending step number), so outputs pair with the same steps
        // in both rounds and the combined text must match exactly.
        assert_eq!(reports[0], reports[1]);
    }
}
