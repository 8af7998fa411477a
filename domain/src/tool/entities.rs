//! Typed tool calls
//!
//! Rather than a dynamic map-of-anything, every tool has a typed argument
//! struct and [`ToolCall`] is a tagged sum over them. Parsing from LLM
//! output produces either a concrete variant or a structured error that is
//! surfaced back into the worker loop as a failed tool result.

use crate::agent::capability::Capability;
use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A tool call as it appears in LLM output, before typed validation:
/// a name plus a free-form JSON argument object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawToolCall {
    pub name: String,
    pub arguments: serde_json::Value,
}

impl RawToolCall {
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// Fetch a string argument (`task` for spawn tools, etc.).
    pub fn string_arg(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(|v| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadArgs {
    pub path: String,
    #[serde(default)]
    pub start_line: Option<u64>,
    #[serde(default)]
    pub end_line: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteArgs {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditArgs {
    pub path: String,
    pub old_text: String,
    pub new_text: String,
    #[serde(default)]
    pub replace_all: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrepArgs {
    pub pattern: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default = "default_true")]
    pub case_sensitive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobArgs {
    pub pattern: String,
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BashArgs {
    pub command: String,
    #[serde(default)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebSearchArgs {
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebFetchArgs {
    pub url: String,
    #[serde(default)]
    pub max_length: Option<u64>,
}

fn default_true() -> bool {
    true
}

/// A validated call to one of the closed set of tools.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    Read(ReadArgs),
    Write(WriteArgs),
    Edit(EditArgs),
    Grep(GrepArgs),
    Glob(GlobArgs),
    Bash(BashArgs),
    WebSearch(WebSearchArgs),
    WebFetch(WebFetchArgs),
}

/// Canonical tool names, in schema order.
pub const TOOL_NAMES: &[&str] = &[
    "read",
    "write",
    "edit",
    "grep",
    "glob",
    "bash",
    "web_search",
    "web_fetch",
];

impl ToolCall {
    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::Read(_) => "read",
            ToolCall::Write(_) => "write",
            ToolCall::Edit(_) => "edit",
            ToolCall::Grep(_) => "grep",
            ToolCall::Glob(_) => "glob",
            ToolCall::Bash(_) => "bash",
            ToolCall::WebSearch(_) => "web_search",
            ToolCall::WebFetch(_) => "web_fetch",
        }
    }

    /// The capability a worker must hold to dispatch this call.
    pub fn required_capability(&self) -> Capability {
        match self {
            ToolCall::Read(_) => Capability::Read,
            ToolCall::Grep(_) | ToolCall::Glob(_) => Capability::Search,
            ToolCall::Bash(_) => Capability::Bash,
            ToolCall::Write(_) | ToolCall::Edit(_) => Capability::Write,
            ToolCall::WebSearch(_) | ToolCall::WebFetch(_) => Capability::Web,
        }
    }

    /// The capability required for a tool name, if the name is known.
    pub fn capability_for(name: &str) -> Option<Capability> {
        match name {
            "read" => Some(Capability::Read),
            "grep" | "glob" => Some(Capability::Search),
            "bash" => Some(Capability::Bash),
            "write" | "edit" => Some(Capability::Write),
            "web_search" | "web_fetch" => Some(Capability::Web),
            _ => None,
        }
    }

    /// Tool names available under a capability grant.
    pub fn names_for_capabilities<'a>(
        capabilities: impl IntoIterator<Item = &'a Capability>,
    ) -> Vec<&'static str> {
        let caps: Vec<Capability> = capabilities.into_iter().copied().collect();
        TOOL_NAMES
            .iter()
            .copied()
            .filter(|name| {
                Self::capability_for(name)
                    .map(|c| caps.contains(&c))
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Validate a raw call into a typed one.
    pub fn parse(raw: &RawToolCall) -> Result<ToolCall, DomainError> {
        Self::from_named_json(&raw.name, raw.arguments.clone())
    }

    /// Validate a `(name, arguments)` pair into a typed call.
    pub fn from_named_json(name: &str, arguments: serde_json::Value) -> Result<ToolCall, DomainError> {
        fn args<T: serde::de::DeserializeOwned>(
            name: &str,
            value: serde_json::Value,
        ) -> Result<T, DomainError> {
            serde_json::from_value(value)
                .map_err(|e| DomainError::InvalidToolCall(format!("{name}: {e}")))
        }

        match name {
            "read" => Ok(ToolCall::Read(args(name, arguments)?)),
            "write" => Ok(ToolCall::Write(args(name, arguments)?)),
            "edit" => Ok(ToolCall::Edit(args(name, arguments)?)),
            "grep" => Ok(ToolCall::Grep(args(name, arguments)?)),
            "glob" => Ok(ToolCall::Glob(args(name, arguments)?)),
            "bash" => Ok(ToolCall::Bash(args(name, arguments)?)),
            "web_search" => Ok(ToolCall::WebSearch(args(name, arguments)?)),
            "web_fetch" => Ok(ToolCall::WebFetch(args(name, arguments)?)),
            other => Err(DomainError::InvalidToolCall(format!(
                "unknown tool: {other}"
            ))),
        }
    }

    /// Flatten the arguments into the string map used by the callback wire.
    pub fn wire_arguments(&self) -> BTreeMap<String, String> {
        fn value_map<T: Serialize>(args: &T) -> BTreeMap<String, String> {
            let value = serde_json::to_value(args).unwrap_or_default();
            let mut map = BTreeMap::new();
            if let serde_json::Value::Object(obj) = value {
                for (k, v) in obj {
                    match v {
                        serde_json::Value::Null => {}
                        serde_json::Value::String(s) => {
                            map.insert(k, s);
                        }
                        other => {
                            map.insert(k, other.to_string());
                        }
                    }
                }
            }
            map
        }

        match self {
            ToolCall::Read(a) => value_map(a),
            ToolCall::Write(a) => value_map(a),
            ToolCall::Edit(a) => value_map(a),
            ToolCall::Grep(a) => value_map(a),
            ToolCall::Glob(a) => value_map(a),
            ToolCall::Bash(a) => value_map(a),
            ToolCall::WebSearch(a) => value_map(a),
            ToolCall::WebFetch(a) => value_map(a),
        }
    }

    /// Rebuild a typed call from the wire string map (client side of the
    /// callback channel). Numbers and booleans are parsed back from their
    /// string form; if the coerced shape fails to validate (a content
    /// string that merely looks numeric), the raw strings are retried.
    pub fn from_wire(
        name: &str,
        arguments: &BTreeMap<String, String>,
    ) -> Result<ToolCall, DomainError> {
        let coerced: serde_json::Map<String, serde_json::Value> = arguments
            .iter()
            .map(|(key, value)| {
                let parsed = if let Ok(n) = value.parse::<u64>() {
                    serde_json::Value::from(n)
                } else if let Ok(b) = value.parse::<bool>() {
                    serde_json::Value::from(b)
                } else {
                    serde_json::Value::from(value.clone())
                };
                (key.clone(), parsed)
            })
            .collect();

        Self::from_named_json(name, serde_json::Value::Object(coerced)).or_else(|coerced_err| {
            let plain: serde_json::Map<String, serde_json::Value> = arguments
                .iter()
                .map(|(key, value)| (key.clone(), serde_json::Value::from(value.clone())))
                .collect();
            Self::from_named_json(name, serde_json::Value::Object(plain)).map_err(|_| coerced_err)
        })
    }

    /// Short human-readable form for progress output and the call log.
    pub fn summary(&self) -> String {
        match self {
            ToolCall::Read(a) => format!("read({})", a.path),
            ToolCall::Write(a) => format!("write({}, {} bytes)", a.path, a.content.len()),
            ToolCall::Edit(a) => format!("edit({})", a.path),
            ToolCall::Grep(a) => format!("grep({})", a.pattern),
            ToolCall::Glob(a) => format!("glob({})", a.pattern),
            ToolCall::Bash(a) => format!("bash({})", crate::core::string::truncate(&a.command, 60)),
            ToolCall::WebSearch(a) => format!("web_search({})", a.query),
            ToolCall::WebFetch(a) => format!("web_fetch({})", a.url),
        }
    }
}
