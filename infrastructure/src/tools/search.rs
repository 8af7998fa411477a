//! Search tools: grep, glob

use super::file::resolve;
use conductor_domain::tool::entities::{GlobArgs, GrepArgs};
use conductor_domain::tool::value_objects::{ToolError, ToolResult, ToolResultMetadata};
use regex::RegexBuilder;
use std::fs;
use std::path::Path;
use std::time::Instant;

/// Maximum results returned by either tool
const MAX_RESULTS: usize = 1000;

/// Maximum file size grep will scan (5 MB)
const MAX_GREP_FILE_SIZE: u64 = 5 * 1024 * 1024;

pub fn execute_grep(working_dir: &str, args: &GrepArgs) -> ToolResult {
    let start = Instant::now();

    let regex = match RegexBuilder::new(&args.pattern)
        .case_insensitive(!args.case_sensitive)
        .build()
    {
        Ok(regex) => regex,
        Err(e) => {
            return ToolResult::failure(
                "grep",
                ToolError::invalid_argument(format!("invalid pattern: {e}")),
            );
        }
    };

    let root = resolve(working_dir, args.path.as_deref().unwrap_or("."));
    if !root.exists() {
        return ToolResult::failure(
            "grep",
            ToolError::not_found(root.display().to_string()),
        );
    }

    let mut matches = Vec::new();
    grep_path(&root, &regex, &mut matches);

    let match_count = matches.len();
    let output = if matches.is_empty() {
        format!("No matches for pattern: {}", args.pattern)
    } else {
        matches.join("\n")
    };

    ToolResult::success("grep", output).with_metadata(ToolResultMetadata {
        duration_ms: Some(start.elapsed().as_millis() as u64),
        match_count: Some(match_count),
        ..Default::default()
    })
}

fn grep_path(path: &Path, regex: &regex::Regex, matches: &mut Vec<String>) {
    if matches.len() >= MAX_RESULTS {
        return;
    }
    if path.is_dir() {
        // Skip dot-directories and dependency caches
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if name.starts_with('.') && name.len() > 1 {
            return;
        }
        if matches!(name, "node_modules" | "target" | "__pycache__" | "venv") {
            return;
        }
        let Ok(entries) = fs::read_dir(path) else {
            return;
        };
        let mut children: Vec<_> = entries.flatten().map(|e| e.path()).collect();
        children.sort();
        for child in children {
            grep_path(&child, regex, matches);
        }
        return;
    }

    if let Ok(metadata) = fs::metadata(path)
        && metadata.len() > MAX_GREP_FILE_SIZE
    {
        return;
    }
    let Ok(content) = fs::read_to_string(path) else {
        return; // binary or unreadable
    };
    for (index, line) in content.lines().enumerate() {
        if regex.is_match(line) {
            matches.push(format!("{}:{}: {}", path.display(), index + 1, line.trim()));
            if matches.len() >= MAX_RESULTS {
                return;
            }
        }
    }
}

pub fn execute_glob(working_dir: &str, args: &GlobArgs) -> ToolResult {
    let start = Instant::now();

    let base = resolve(working_dir, args.path.as_deref().unwrap_or("."));
    let pattern = base.join(&args.pattern);
    let pattern = match pattern.to_str() {
        Some(p) => p.to_string(),
        None => {
            return ToolResult::failure(
                "glob",
                ToolError::invalid_argument("non-UTF8 glob pattern"),
            );
        }
    };

    let paths = match glob::glob(&pattern) {
        Ok(paths) => paths,
        Err(e) => {
            return ToolResult::failure(
                "glob",
                ToolError::invalid_argument(format!("invalid glob pattern: {e}")),
            );
        }
    };

    let mut results: Vec<String> = paths
        .flatten()
        .take(MAX_RESULTS)
        .map(|p| p.display().to_string())
        .collect();
    results.sort();

    let match_count = results.len();
    let output = if results.is_empty() {
        format!("No files matching: {}", args.pattern)
    } else {
        results.join("\n")
    };

    ToolResult::success("glob", output).with_metadata(ToolResultMetadata {
        duration_ms: Some(start.elapsed().as_millis() as u64),
        match_count: Some(match_count),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn setup() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("main.rs"), "fn main() {\n    run();\n}\n").unwrap();
        fs::write(dir.path().join("lib.rs"), "pub fn run() {}\n").unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs/guide.md"), "# Guide\nrun the app\n").unwrap();
        dir
    }

    #[test]
    fn test_grep_finds_matches_with_locations() {
        let dir = setup();
        let args = GrepArgs {
            pattern: r"fn \w+".to_string(),
            path: None,
            case_sensitive: true,
        };
        let result = execute_grep(dir.path().to_str().unwrap(), &args);
        assert!(result.is_success());
        let output = result.output().unwrap();
        assert!(output.contains("main.rs:1"));
        assert!(output.contains("lib.rs:1"));
        assert_eq!(result.metadata.match_count, Some(2));
    }

    #[test]
    fn test_grep_case_insensitive() {
        let dir = setup();
        let args = GrepArgs {
            pattern: "GUIDE".to_string(),
            path: None,
            case_sensitive: false,
        };
        let result = execute_grep(dir.path().to_str().unwrap(), &args);
        assert!(result.output().unwrap().contains("guide.md"));
    }

    #[test]
    fn test_grep_invalid_pattern() {
        let args = GrepArgs {
            pattern: "[unclosed".to_string(),
            path: None,
            case_sensitive: true,
        };
        let result = execute_grep(".", &args);
        assert!(!result.is_success());
        assert_eq!(result.error().unwrap().code, "INVALID_ARGUMENT");
    }

    #[test]
    fn test_glob_matches_recursive() {
        let dir = setup();
        let args = GlobArgs {
            pattern: "**/*.rs".to_string(),
            path: None,
        };
        let result = execute_glob(dir.path().to_str().unwrap(), &args);
        assert!(result.is_success());
        let output = result.output().unwrap();
        assert!(output.contains("main.rs"));
        assert!(output.contains("lib.rs"));
        assert!(!output.contains("guide.md"));
    }

    #[test]
    fn test_glob_no_matches_reports_cleanly() {
        let dir = setup();
        let args = GlobArgs {
            pattern: "**/*.go".to_string(),
            path: None,
        };
        let result = execute_glob(dir.path().to_str().unwrap(), &args);
        assert!(result.is_success());
        assert!(result.output().unwrap().contains("No files matching"));
    }
}
