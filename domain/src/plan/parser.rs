//! Plan parsing from planner output
//!
//! The planner emits a fenced or bare text block in this shape:
//!
//! ```text
//! ANALYSIS: <brief description>
//!
//! STEPS:
//! 1. [explorer] <description>
//! 2. [executor] <description> (depends on: 1)
//!
//! PARALLEL_GROUPS:
//! - Group 1: steps 1, 2
//! - Group 2: step 3 (after group 1)
//!
//! COMPLEXITY: <simple|moderate|complex>
//! ```
//!
//! Missing groups default to one sequential group per step. Steps whose
//! agent tag is not explorer/executor parse as executor.

use crate::agent::entities::AgentKind;
use crate::plan::{Complexity, Plan, PlanStep};
use regex::Regex;
use std::sync::OnceLock;

fn step_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)\.\s*(.+)$").expect("valid regex"))
}

fn agent_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\[(\w+)\]\s*").expect("valid regex"))
}

fn depends_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\(depends on:\s*([\d,\s]+)\)").expect("valid regex"))
}

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("valid regex"))
}

#[derive(PartialEq)]
enum Section {
    None,
    Analysis,
    Steps,
    Parallel,
}

/// Parse planner output into a [`Plan`].
///
/// Never fails: unknown lines are skipped and a plan with no steps is
/// returned as-is (callers decide whether that is an error). A fenced
/// ```` ```plan ```` block, if present, is parsed in place of the whole
/// text.
pub fn parse_plan(raw_output: &str) -> Plan {
    let body = extract_fenced_block(raw_output).unwrap_or(raw_output);

    let mut analysis = String::new();
    let mut steps: Vec<PlanStep> = Vec::new();
    let mut parallel_groups: Vec<Vec<u32>> = Vec::new();
    let mut complexity = Complexity::Moderate;
    let mut section = Section::None;

    for line in body.lines() {
        let line = line.trim();

        if let Some(rest) = line.strip_prefix("ANALYSIS:") {
            section = Section::Analysis;
            analysis = rest.trim().to_string();
        } else if line.starts_with("STEPS:") {
            section = Section::Steps;
        } else if line.starts_with("PARALLEL_GROUPS:") {
            section = Section::Parallel;
        } else if let Some(rest) = line.strip_prefix("COMPLEXITY:") {
            complexity = rest.trim().parse().unwrap_or(Complexity::Moderate);
        } else if section == Section::Analysis && !line.is_empty() {
            analysis.push(' ');
            analysis.push_str(line);
        } else if section == Section::Steps && !line.is_empty() {
            if let Some(mut step) = parse_step(line, steps.len() as u32 + 1) {
                // Models occasionally repeat a number; renumber the clash
                if steps.iter().any(|s| s.step_num == step.step_num) {
                    step.step_num = steps.iter().map(|s| s.step_num).max().unwrap_or(0) + 1;
                }
                steps.push(step);
            }
        } else if section == Section::Parallel && line.starts_with("- Group") {
            let group = parse_parallel_group(line);
            if !group.is_empty() {
                parallel_groups.push(group);
            }
        }
    }

    // Default: one sequential group per step
    if parallel_groups.is_empty() && !steps.is_empty() {
        parallel_groups = steps.iter().map(|s| vec![s.step_num]).collect();
    }

    Plan {
        analysis: analysis.trim().to_string(),
        steps,
        parallel_groups,
        complexity,
        raw_output: raw_output.to_string(),
    }
}

fn extract_fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```plan")?;
    let body = &text[start + "```plan".len()..];
    let end = body.find("```")?;
    Some(&body[..end])
}

fn parse_step(line: &str, default_num: u32) -> Option<PlanStep> {
    let caps = step_re().captures(line);
    let (step_num, rest) = match &caps {
        Some(caps) => (
            caps[1].parse().unwrap_or(default_num),
            caps.get(2).map(|m| m.as_str()).unwrap_or(""),
        ),
        None => return None,
    };

    let agent = agent_tag_re()
        .captures(rest)
        .and_then(|c| match c[1].to_lowercase().as_str() {
            "explorer" => Some(AgentKind::Explorer),
            _ => None,
        })
        .unwrap_or(AgentKind::Executor);

    let depends_on: Vec<u32> = depends_re()
        .captures(rest)
        .map(|c| {
            number_re()
                .find_iter(&c[1])
                .filter_map(|m| m.as_str().parse().ok())
                .collect()
        })
        .unwrap_or_default();

    let description = depends_re().replace_all(rest, "");
    let description = agent_tag_re().replace_all(&description, "");
    let description = description.trim().to_string();

    if description.is_empty() {
        return None;
    }

    Some(PlanStep {
        step_num,
        agent,
        description,
        depends_on,
    })
}

fn parse_parallel_group(line: &str) -> Vec<u32> {
    // Expected format: "- Group 1: steps 1, 2 (can run together)"
    let numbers_part = line.split_once(':').map(|(_, rest)| rest).unwrap_or(line);
    number_re()
        .find_iter(numbers_part)
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}
