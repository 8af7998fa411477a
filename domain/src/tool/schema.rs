//! JSON schemas for the worker tool set, in the function-calling format
//! the chat endpoint understands.

use crate::agent::capability::Capability;
use crate::tool::entities::ToolCall;
use serde_json::{Value, json};

/// Schema for a single tool by canonical name. Unknown names yield `None`.
pub fn tool_schema(name: &str) -> Option<Value> {
    let schema = match name {
        "read" => json!({
            "type": "function",
            "function": {
                "name": "read",
                "description": "Read the contents of a file. Returns the file content.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "path": {"type": "string", "description": "Path to the file to read"},
                        "start_line": {"type": "integer", "description": "Optional start line (1-indexed)"},
                        "end_line": {"type": "integer", "description": "Optional end line (1-indexed, inclusive)"}
                    },
                    "required": ["path"]
                }
            }
        }),
        "write" => json!({
            "type": "function",
            "function": {
                "name": "write",
                "description": "Write content to a file. Creates the file if it doesn't exist, overwrites if it does.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "path": {"type": "string", "description": "Path to the file to write"},
                        "content": {"type": "string", "description": "Content to write"}
                    },
                    "required": ["path", "content"]
                }
            }
        }),
        "edit" => json!({
            "type": "function",
            "function": {
                "name": "edit",
                "description": "Edit a file by replacing specific text. The old_text must match exactly.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "path": {"type": "string", "description": "Path to the file to edit"},
                        "old_text": {"type": "string", "description": "Exact text to find and replace"},
                        "new_text": {"type": "string", "description": "Replacement text"},
                        "replace_all": {"type": "boolean", "description": "Replace all occurrences (default: first only)"}
                    },
                    "required": ["path", "old_text", "new_text"]
                }
            }
        }),
        "grep" => json!({
            "type": "function",
            "function": {
                "name": "grep",
                "description": "Search for a regex pattern in files. Returns matching lines with paths and line numbers.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "pattern": {"type": "string", "description": "The search pattern (regex)"},
                        "path": {"type": "string", "description": "File or directory to search (default: working directory)"},
                        "case_sensitive": {"type": "boolean", "description": "Case-sensitive search (default: true)"}
                    },
                    "required": ["pattern"]
                }
            }
        }),
        "glob" => json!({
            "type": "function",
            "function": {
                "name": "glob",
                "description": "Find files matching a glob pattern (e.g. '**/*.py').",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "pattern": {"type": "string", "description": "The glob pattern"},
                        "path": {"type": "string", "description": "Base directory (default: working directory)"}
                    },
                    "required": ["pattern"]
                }
            }
        }),
        "bash" => json!({
            "type": "function",
            "function": {
                "name": "bash",
                "description": "Execute a shell command. Returns stdout and stderr.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "command": {"type": "string", "description": "The command to execute"},
                        "timeout": {"type": "integer", "description": "Optional timeout in seconds (default: 30)"}
                    },
                    "required": ["command"]
                }
            }
        }),
        "web_search" => json!({
            "type": "function",
            "function": {
                "name": "web_search",
                "description": "Search the web. Returns result titles, URLs and snippets.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "query": {"type": "string", "description": "The search query"}
                    },
                    "required": ["query"]
                }
            }
        }),
        "web_fetch" => json!({
            "type": "function",
            "function": {
                "name": "web_fetch",
                "description": "Fetch a web page and extract its readable text content.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "url": {"type": "string", "description": "The URL to fetch"},
                        "max_length": {"type": "integer", "description": "Maximum extracted text length in bytes"}
                    },
                    "required": ["url"]
                }
            }
        }),
        _ => return None,
    };
    Some(schema)
}

/// Schemas for every tool reachable under a capability grant.
pub fn schemas_for_capabilities<'a>(
    capabilities: impl IntoIterator<Item = &'a Capability>,
) -> Vec<Value> {
    ToolCall::names_for_capabilities(capabilities)
        .into_iter()
        .filter_map(tool_schema)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::entities::TOOL_NAMES;

    #[test]
    fn test_every_tool_has_a_schema() {
        for name in TOOL_NAMES {
            let schema = tool_schema(name).unwrap_or_else(|| panic!("no schema for {name}"));
            assert_eq!(schema["function"]["name"], *name);
        }
    }

    #[test]
    fn test_schemas_follow_grant() {
        let schemas = schemas_for_capabilities(&[Capability::Read, Capability::Search]);
        let names: Vec<&str> = schemas
            .iter()
            .map(|s| s["function"]["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["read", "grep", "glob"]);
    }
}
