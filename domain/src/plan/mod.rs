//! Plan domain: structured task decompositions produced by the planner
//!
//! A plan is a numbered list of steps, each assigned to an explorer or
//! executor worker, grouped into parallel groups that execute in order.

pub mod parser;

pub use parser::parse_plan;

use crate::agent::entities::AgentKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Estimated task complexity. Drives model-tier selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    #[default]
    Moderate,
    Complex,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Simple => "simple",
            Complexity::Moderate => "moderate",
            Complexity::Complex => "complex",
        }
    }
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Complexity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simple" => Ok(Complexity::Simple),
            "moderate" => Ok(Complexity::Moderate),
            "complex" => Ok(Complexity::Complex),
            _ => Err(()),
        }
    }
}

/// A single step in a plan.
///
/// Planner output is constrained to explorer/executor assignments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub step_num: u32,
    pub agent: AgentKind,
    pub description: String,
    pub depends_on: Vec<u32>,
}

/// Validation errors for a parsed plan.
#[derive(Error, Debug, PartialEq)]
pub enum PlanError {
    #[error("plan has no steps")]
    Empty,

    #[error("step {0} appears in more than one parallel group")]
    StepInMultipleGroups(u32),

    #[error("step {0} is missing from the parallel groups")]
    StepMissingFromGroups(u32),

    #[error("group references unknown step {0}")]
    UnknownStepInGroup(u32),

    #[error("step {step} depends on step {dependency}, which is not in an earlier group")]
    DependencyNotEarlier { step: u32, dependency: u32 },
}

/// A structured plan for executing a complex task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub analysis: String,
    pub steps: Vec<PlanStep>,
    /// Groups of step numbers; groups execute in order, members of a
    /// group execute concurrently.
    pub parallel_groups: Vec<Vec<u32>>,
    pub complexity: Complexity,
    /// Original planner output, kept for display
    pub raw_output: String,
}

impl Plan {
    /// Steps belonging to a group, in ascending step-number order.
    pub fn steps_in_group(&self, group: &[u32]) -> Vec<&PlanStep> {
        let mut steps: Vec<&PlanStep> = self
            .steps
            .iter()
            .filter(|s| group.contains(&s.step_num))
            .collect();
        steps.sort_by_key(|s| s.step_num);
        steps
    }

    pub fn step(&self, step_num: u32) -> Option<&PlanStep> {
        self.steps.iter().find(|s| s.step_num == step_num)
    }

    /// Check the structural invariants:
    /// - at least one step
    /// - every step number appears in exactly one group
    /// - groups only reference known steps
    /// - every dependency of a step lies in a strictly earlier group
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.steps.is_empty() {
            return Err(PlanError::Empty);
        }

        let known: BTreeSet<u32> = self.steps.iter().map(|s| s.step_num).collect();

        let mut seen = BTreeSet::new();
        for group in &self.parallel_groups {
            for &num in group {
                if !known.contains(&num) {
                    return Err(PlanError::UnknownStepInGroup(num));
                }
                if !seen.insert(num) {
                    return Err(PlanError::StepInMultipleGroups(num));
                }
            }
        }
        for &num in &known {
            if !seen.contains(&num) {
                return Err(PlanError::StepMissingFromGroups(num));
            }
        }

        // group index of each step, for the dependency ordering check
        let group_of = |num: u32| {
            self.parallel_groups
                .iter()
                .position(|g| g.contains(&num))
                .expect("membership checked above")
        };

        for step in &self.steps {
            let step_group = group_of(step.step_num);
            for &dep in &step.depends_on {
                if !known.contains(&dep) {
                    return Err(PlanError::UnknownStepInGroup(dep));
                }
                if group_of(dep) >= step_group {
                    return Err(PlanError::DependencyNotEarlier {
                        step: step.step_num,
                        dependency: dep,
                    });
                }
            }
        }

        Ok(())
    }

    /// Render a short human-readable summary of the plan.
    pub fn summary(&self) -> String {
        let mut lines = vec![format!(
            "Plan ({} complexity, {} steps): {}",
            self.complexity,
            self.steps.len(),
            self.analysis
        )];
        for step in &self.steps {
            let deps = if step.depends_on.is_empty() {
                String::new()
            } else {
                format!(
                    " (after {})",
                    step.depends_on
                        .iter()
                        .map(u32::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            };
            lines.push(format!(
                "  {}. [{}] {}{}",
                step.step_num, step.agent, step.description, deps
            ));
        }
        lines.join("\n")
    }
}
