//! Deterministic keyword classifiers
//!
//! Fallbacks for when the routing model produces no tool call: a
//! user-message intent table, a response-language intent table, and the
//! task complexity estimator that drives model-tier selection.

use crate::agent::entities::AgentKind;
use crate::plan::Complexity;
use regex::Regex;
use std::sync::OnceLock;

const RESEARCH_KEYWORDS: &[&str] = &[
    "how do i ",
    "how to ",
    "what is ",
    "explain ",
    "documentation",
    "docs for ",
    "tutorial",
    "research ",
    "look up ",
];

const PLANNER_KEYWORDS: &[&str] = &[
    "implement ",
    "build a ",
    "create a system",
    "refactor ",
    "redesign ",
    "architect ",
];

const EXECUTOR_RUN_KEYWORDS: &[&str] = &[
    "run ", "execute ", "install ", "build ", "compile ", "test ", "pytest", "npm ", "pip ",
    "cargo ",
];

const EXECUTOR_EDIT_KEYWORDS: &[&str] = &[
    "edit ",
    "modify ",
    "change ",
    "update ",
    "fix ",
    "add to ",
    "remove from ",
    "delete from ",
];

const EXPLORER_KEYWORDS: &[&str] = &[
    "read ",
    "show ",
    "display ",
    "what's in ",
    "what is in ",
    "find ",
    "search ",
    "look for ",
    "where is ",
    "list ",
    "ls ",
    "cat ",
];

fn file_creation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(create|write|make|add)\s+(?:a\s+)?(?:\w+\s+)?(file|script)\b")
            .expect("valid regex")
    })
}

fn file_extension_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b\w+\.(py|js|ts|sh|bash|rb|go|rs|java|c|cpp|h|txt|json|yaml|yml|md|html|css)\b")
            .expect("valid regex")
    })
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Classify a user message into the agent kind to spawn.
///
/// This is the fallback when the routing model emits no tool call.
/// Research patterns are checked first so "documentation for pytest"
/// doesn't trip the "pytest" executor keyword.
pub fn detect_user_intent(user_message: &str) -> Option<AgentKind> {
    let msg = user_message.to_lowercase();

    if contains_any(&msg, RESEARCH_KEYWORDS) {
        return Some(AgentKind::Researcher);
    }

    if contains_any(&msg, PLANNER_KEYWORDS) {
        return Some(AgentKind::Planner);
    }

    if file_creation_re().is_match(&msg) {
        return Some(AgentKind::Executor);
    }
    if file_extension_re().is_match(&msg)
        && contains_any(&msg, &["write", "create", "make", "add", "generate"])
    {
        return Some(AgentKind::Executor);
    }
    if contains_any(&msg, &["save to file", "save file", "new file", "touch ", "echo "]) {
        return Some(AgentKind::Executor);
    }

    if contains_any(&msg, EXECUTOR_RUN_KEYWORDS) || contains_any(&msg, EXECUTOR_EDIT_KEYWORDS) {
        return Some(AgentKind::Executor);
    }

    if contains_any(&msg, EXPLORER_KEYWORDS) {
        return Some(AgentKind::Explorer);
    }

    None
}

/// Detect spawn intent in the routing model's own response text:
/// explicit mentions of a spawn tool or action-oriented narration.
pub fn detect_response_intent(response_text: &str) -> Option<AgentKind> {
    let text = response_text.to_lowercase();

    if text.contains("spawn_planner") || text.contains("planner agent") {
        return Some(AgentKind::Planner);
    }
    if text.contains("spawn_researcher") || text.contains("researcher agent") {
        return Some(AgentKind::Researcher);
    }
    if text.contains("spawn_explorer") || text.contains("explorer agent") {
        return Some(AgentKind::Explorer);
    }
    if text.contains("spawn_executor") || text.contains("executor agent") {
        return Some(AgentKind::Executor);
    }

    if contains_any(
        &text,
        &[
            "create the file",
            "write the file",
            "create a file",
            "let me create",
            "i'll create",
            "i will create",
            "let me write",
            "i'll write",
            "run the command",
        ],
    ) {
        return Some(AgentKind::Executor);
    }

    if contains_any(
        &text,
        &[
            "let me search",
            "let me look",
            "let me find",
            "searching for",
            "read the file",
            "check the file",
        ],
    ) {
        return Some(AgentKind::Explorer);
    }

    if contains_any(
        &text,
        &[
            "search the web",
            "web search",
            "look up documentation",
            "find documentation",
            "let me research",
            "search online",
        ],
    ) {
        return Some(AgentKind::Researcher);
    }

    None
}

const SIMPLE_PATTERNS: &[&str] = &[
    "read ",
    "show ",
    "display ",
    "print ",
    "cat ",
    "find file",
    "list files",
    "what is",
    "where is",
    "add comment",
    "fix typo",
    "rename variable",
    "simple",
    "quick",
    "just ",
];

const COMPLEX_PATTERNS: &[&str] = &[
    "refactor",
    "restructure",
    "redesign",
    "architect",
    "implement feature",
    "add feature",
    "create system",
    "multiple files",
    "across the codebase",
    "all files",
    "migrate",
    "upgrade",
    "overhaul",
];

/// Estimate task complexity for model-tier selection.
pub fn estimate_complexity(task: &str) -> Complexity {
    let task = task.to_lowercase();

    if contains_any(&task, SIMPLE_PATTERNS) {
        return Complexity::Simple;
    }
    if contains_any(&task, COMPLEX_PATTERNS) {
        return Complexity::Complex;
    }
    Complexity::Moderate
}
