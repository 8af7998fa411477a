//! File operation tools: read, write, edit

use conductor_domain::tool::entities::{EditArgs, ReadArgs, WriteArgs};
use conductor_domain::tool::value_objects::{ToolError, ToolResult, ToolResultMetadata};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Maximum file size to read (10 MB)
const MAX_READ_SIZE: u64 = 10 * 1024 * 1024;

/// Resolve a possibly relative path against the working directory.
pub fn resolve(working_dir: &str, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        Path::new(working_dir).join(p)
    }
}

pub fn execute_read(working_dir: &str, args: &ReadArgs) -> ToolResult {
    let start = Instant::now();
    let path = resolve(working_dir, &args.path);

    if !path.exists() {
        return ToolResult::failure("read", ToolError::not_found(&args.path));
    }
    if !path.is_file() {
        return ToolResult::failure(
            "read",
            ToolError::invalid_argument(format!("'{}' is not a file", args.path)),
        );
    }

    let metadata = match fs::metadata(&path) {
        Ok(m) => m,
        Err(e) => {
            return ToolResult::failure(
                "read",
                ToolError::execution_failed(format!("failed to stat file: {e}")),
            );
        }
    };
    if metadata.len() > MAX_READ_SIZE {
        return ToolResult::failure(
            "read",
            ToolError::invalid_argument(format!(
                "file too large ({} bytes, max {MAX_READ_SIZE})",
                metadata.len()
            )),
        );
    }

    let content = match fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return ToolResult::failure("read", ToolError::permission_denied(&args.path));
        }
        Err(e) => {
            return ToolResult::failure(
                "read",
                ToolError::execution_failed(format!("failed to read file: {e}")),
            );
        }
    };

    // Optional 1-indexed line range
    let output = match (args.start_line, args.end_line) {
        (None, None) => content,
        (start, end) => {
            let lines: Vec<&str> = content.lines().collect();
            let from = start.unwrap_or(1).saturating_sub(1) as usize;
            let to = end.map(|e| e as usize).unwrap_or(lines.len()).min(lines.len());
            if from >= to {
                String::new()
            } else {
                lines[from..to].join("\n")
            }
        }
    };

    let bytes = output.len();
    ToolResult::success("read", output).with_metadata(ToolResultMetadata {
        duration_ms: Some(start.elapsed().as_millis() as u64),
        bytes: Some(bytes),
        path: Some(args.path.clone()),
        ..Default::default()
    })
}

pub fn execute_write(working_dir: &str, args: &WriteArgs) -> ToolResult {
    let start = Instant::now();
    let path = resolve(working_dir, &args.path);

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
        && let Err(e) = fs::create_dir_all(parent)
    {
        return ToolResult::failure(
            "write",
            ToolError::execution_failed(format!("failed to create parent directories: {e}")),
        );
    }

    let bytes = args.content.len();
    if let Err(e) = fs::write(&path, &args.content) {
        if e.kind() == std::io::ErrorKind::PermissionDenied {
            return ToolResult::failure("write", ToolError::permission_denied(&args.path));
        }
        return ToolResult::failure(
            "write",
            ToolError::execution_failed(format!("failed to write file: {e}")),
        );
    }

    ToolResult::success("write", format!("wrote {bytes} bytes to {}", args.path))
        .with_metadata(ToolResultMetadata {
            duration_ms: Some(start.elapsed().as_millis() as u64),
            bytes: Some(bytes),
            path: Some(args.path.clone()),
            ..Default::default()
        })
}

pub fn execute_edit(working_dir: &str, args: &EditArgs) -> ToolResult {
    let start = Instant::now();
    let path = resolve(working_dir, &args.path);

    if !path.exists() {
        return ToolResult::failure("edit", ToolError::not_found(&args.path));
    }
    let content = match fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) => {
            return ToolResult::failure(
                "edit",
                ToolError::execution_failed(format!("failed to read file: {e}")),
            );
        }
    };

    // old_text has exact-match semantics
    let occurrences = content.matches(&args.old_text).count();
    if occurrences == 0 {
        return ToolResult::failure(
            "edit",
            ToolError::invalid_argument(format!(
                "old_text not found in {} (must match exactly)",
                args.path
            )),
        );
    }

    let (updated, replaced) = if args.replace_all {
        (content.replace(&args.old_text, &args.new_text), occurrences)
    } else {
        (content.replacen(&args.old_text, &args.new_text, 1), 1)
    };

    if let Err(e) = fs::write(&path, &updated) {
        return ToolResult::failure(
            "edit",
            ToolError::execution_failed(format!("failed to write file: {e}")),
        );
    }

    ToolResult::success(
        "edit",
        format!("replaced {replaced} occurrence(s) in {}", args.path),
    )
    .with_metadata(ToolResultMetadata {
        duration_ms: Some(start.elapsed().as_millis() as u64),
        path: Some(args.path.clone()),
        match_count: Some(replaced),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::{NamedTempFile, tempdir};

    #[test]
    fn test_read_success() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "hello world").unwrap();
        let args = ReadArgs {
            path: file.path().to_str().unwrap().to_string(),
            start_line: None,
            end_line: None,
        };
        let result = execute_read(".", &args);
        assert!(result.is_success());
        assert!(result.output().unwrap().contains("hello world"));
    }

    #[test]
    fn test_read_not_found() {
        let args = ReadArgs {
            path: "/nonexistent/file.txt".to_string(),
            start_line: None,
            end_line: None,
        };
        let result = execute_read(".", &args);
        assert!(!result.is_success());
        assert_eq!(result.error().unwrap().code, "NOT_FOUND");
    }

    #[test]
    fn test_read_line_range() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "one\ntwo\nthree\nfour").unwrap();
        let args = ReadArgs {
            path: file.path().to_str().unwrap().to_string(),
            start_line: Some(2),
            end_line: Some(3),
        };
        let result = execute_read(".", &args);
        assert_eq!(result.output(), Some("two\nthree"));
    }

    #[test]
    fn test_write_relative_to_working_dir() {
        let dir = tempdir().unwrap();
        let args = WriteArgs {
            path: "sub/out.txt".to_string(),
            content: "data".to_string(),
        };
        let result = execute_write(dir.path().to_str().unwrap(), &args);
        assert!(result.is_success());
        assert_eq!(
            fs::read_to_string(dir.path().join("sub/out.txt")).unwrap(),
            "data"
        );
    }

    #[test]
    fn test_edit_exact_match() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("code.py");
        fs::write(&path, "x = 1\ny = 1\n").unwrap();

        let args = EditArgs {
            path: path.to_str().unwrap().to_string(),
            old_text: "x = 1".to_string(),
            new_text: "x = 2".to_string(),
            replace_all: false,
        };
        let result = execute_edit(".", &args);
        assert!(result.is_success());
        assert_eq!(fs::read_to_string(&path).unwrap(), "x = 2\ny = 1\n");
    }

    #[test]
    fn test_edit_replace_all() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("code.py");
        fs::write(&path, "a a a").unwrap();

        let args = EditArgs {
            path: path.to_str().unwrap().to_string(),
            old_text: "a".to_string(),
            new_text: "b".to_string(),
            replace_all: true,
        };
        let result = execute_edit(".", &args);
        assert!(result.is_success());
        assert_eq!(fs::read_to_string(&path).unwrap(), "b b b");
        assert_eq!(result.metadata.match_count, Some(3));
    }

    #[test]
    fn test_edit_no_match_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("code.py");
        fs::write(&path, "x = 1").unwrap();

        let args = EditArgs {
            path: path.to_str().unwrap().to_string(),
            old_text: "x = 9".to_string(),
            new_text: "x = 2".to_string(),
            replace_all: false,
        };
        let result = execute_edit(".", &args);
        assert!(!result.is_success());
        assert_eq!(result.error().unwrap().code, "INVALID_ARGUMENT");
        assert_eq!(fs::read_to_string(&path).unwrap(), "x = 1", "file untouched");
    }
}
