//! Heuristic tool-intent detection over free text
//!
//! Third tier of the worker's tool-call extraction: when the model
//! narrates what it wants to do instead of emitting a tool call, a fixed
//! table of keyword patterns maps the narration to a `(tool, arguments)`
//! guess. Each rule only fires when its argument extractor finds something
//! concrete, so the table stays auditable and conservative.

use crate::tool::entities::RawToolCall;
use regex::Regex;
use serde_json::json;
use std::sync::OnceLock;

const WRITE_PATTERNS: &[&str] = &[
    "create the file",
    "create a file",
    "creating file",
    "write the file",
    "write to file",
    "let me create",
    "i'll create",
    "i will create",
    "save to file",
];

const READ_PATTERNS: &[&str] = &[
    "read the file",
    "reading file",
    "let me read",
    "check the file",
    "look at the file",
    "examine the file",
    "open the file",
    "view the file",
];

const BASH_PATTERNS: &[&str] = &[
    "run the command",
    "execute the command",
    "let me run",
    "i'll run",
    "i will run",
    "running this",
    "shell command",
];

const GREP_PATTERNS: &[&str] = &[
    "search for",
    "searching for",
    "let me search",
    "find occurrences",
    "grep for",
];

const GLOB_PATTERNS: &[&str] = &[
    "find files",
    "list files",
    "locate files",
    "files matching",
    "files with extension",
];

fn file_path_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[`"']?([\w./-]+\.\w{1,5})[`"']?"#).expect("valid regex"))
}

fn code_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:bash|sh)?\s*\n(.+?)\n```").expect("valid regex"))
}

fn quoted_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[`"']([^`"']+)[`"']"#).expect("valid regex"))
}

fn contains_any(haystack: &str, patterns: &[&str]) -> bool {
    patterns.iter().any(|p| haystack.contains(p))
}

/// Extract a file path mention, preferring the task text over the response.
fn extract_path(response: &str, task: &str) -> Option<String> {
    for text in [task, response] {
        if let Some(cap) = file_path_re().captures(text) {
            let candidate = cap[1].to_string();
            if !matches!(candidate.as_str(), "e.g" | "i.e") {
                return Some(candidate);
            }
        }
    }
    None
}

fn extract_command(response: &str) -> Option<String> {
    if let Some(cap) = code_block_re().captures(response) {
        return Some(cap[1].trim().to_string());
    }
    if let Some(cap) = quoted_re().captures(response) {
        let cmd = cap[1].trim();
        if !cmd.is_empty() && !cmd.starts_with("I ") && !cmd.starts_with("The ") {
            return Some(cmd.to_string());
        }
    }
    None
}

fn extract_quoted(task: &str, response: &str) -> Option<String> {
    for text in [task, response] {
        if let Some(cap) = quoted_re().captures(text) {
            return Some(cap[1].to_string());
        }
    }
    None
}

/// Detect a tool invocation intent in a model response that contained no
/// parseable tool call. `available` restricts which tools may be guessed.
pub fn detect_tool_intent(response: &str, task: &str, available: &[&str]) -> Option<RawToolCall> {
    let lower = response.to_lowercase();

    if available.contains(&"write")
        && contains_any(&lower, WRITE_PATTERNS)
        && let Some(path) = extract_path(response, task)
    {
        // Content extraction from narration is unreliable; an empty file
        // still moves the loop forward and the next turn can fill it in.
        let content = extract_quoted(task, response)
            .filter(|c| c != &path)
            .unwrap_or_default();
        return Some(RawToolCall::new(
            "write",
            json!({"path": path, "content": content}),
        ));
    }

    if available.contains(&"read")
        && contains_any(&lower, READ_PATTERNS)
        && let Some(path) = extract_path(response, task)
    {
        return Some(RawToolCall::new("read", json!({"path": path})));
    }

    if available.contains(&"bash")
        && contains_any(&lower, BASH_PATTERNS)
        && let Some(command) = extract_command(response)
    {
        return Some(RawToolCall::new("bash", json!({"command": command})));
    }

    if available.contains(&"grep")
        && contains_any(&lower, GREP_PATTERNS)
        && let Some(pattern) = extract_quoted(task, response)
    {
        return Some(RawToolCall::new("grep", json!({"pattern": pattern})));
    }

    if available.contains(&"glob") && contains_any(&lower, GLOB_PATTERNS) {
        let task_lower = task.to_lowercase();
        let pattern = if let Some(cap) = quoted_re().captures(task)
            && cap[1].starts_with('*')
        {
            cap[1].to_string()
        } else if task_lower.contains("python") {
            "**/*.py".to_string()
        } else if task_lower.contains("rust") {
            "**/*.rs".to_string()
        } else if task_lower.contains("javascript") {
            "**/*.js".to_string()
        } else {
            return None;
        };
        return Some(RawToolCall::new("glob", json!({"pattern": pattern})));
    }

    None
}
