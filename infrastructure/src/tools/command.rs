//! Command execution tool: bash

use conductor_domain::tool::entities::BashArgs;
use conductor_domain::tool::value_objects::{ToolError, ToolResult, ToolResultMetadata};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

/// Default timeout for command execution
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum combined output size (1 MB)
const MAX_OUTPUT_SIZE: usize = 1024 * 1024;

pub async fn execute_bash(working_dir: &str, args: &BashArgs) -> ToolResult {
    let start = Instant::now();
    let timeout = Duration::from_secs(args.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS));

    let mut command = Command::new("sh");
    command
        .args(["-c", &args.command])
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            return ToolResult::failure(
                "bash",
                ToolError::execution_failed(format!("failed to spawn command: {e}")),
            );
        }
    };

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return ToolResult::failure(
                "bash",
                ToolError::execution_failed(format!("failed to wait for command: {e}")),
            );
        }
        Err(_) => {
            return ToolResult::failure(
                "bash",
                ToolError::timeout(format!(
                    "command did not finish within {}s",
                    timeout.as_secs()
                )),
            );
        }
    };

    let exit_code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    let mut combined = String::new();
    combined.push_str(&stdout);
    if !stderr.is_empty() {
        if !combined.is_empty() {
            combined.push_str("\n--- stderr ---\n");
        }
        combined.push_str(&stderr);
    }
    if combined.len() > MAX_OUTPUT_SIZE {
        combined.truncate(MAX_OUTPUT_SIZE);
        combined.push_str("\n... (output truncated)");
    }

    let metadata = ToolResultMetadata {
        duration_ms: Some(start.elapsed().as_millis() as u64),
        bytes: Some(combined.len()),
        exit_code: Some(exit_code),
        ..Default::default()
    };

    // A non-zero exit is still a tool-level success; the worker decides
    // what to do with it.
    if output.status.success() {
        ToolResult::success("bash", combined).with_metadata(metadata)
    } else {
        ToolResult::success(
            "bash",
            format!("Command exited with code {exit_code}\n{combined}"),
        )
        .with_metadata(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo() {
        let args = BashArgs {
            command: "echo hello".to_string(),
            timeout: None,
        };
        let result = execute_bash(".", &args).await;
        assert!(result.is_success());
        assert!(result.output().unwrap().contains("hello"));
        assert_eq!(result.metadata.exit_code, Some(0));
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_reported_not_failed() {
        let args = BashArgs {
            command: "exit 3".to_string(),
            timeout: None,
        };
        let result = execute_bash(".", &args).await;
        assert!(result.is_success());
        assert_eq!(result.metadata.exit_code, Some(3));
        assert!(result.output().unwrap().contains("exited with code 3"));
    }

    #[tokio::test]
    async fn test_working_dir_applies() {
        let dir = tempfile::tempdir().unwrap();
        let args = BashArgs {
            command: "pwd".to_string(),
            timeout: None,
        };
        let result = execute_bash(dir.path().to_str().unwrap(), &args).await;
        let expected = dir.path().file_name().unwrap().to_str().unwrap();
        assert!(result.output().unwrap().contains(expected));
    }

    #[tokio::test]
    async fn test_timeout_kills_the_command() {
        let args = BashArgs {
            command: "sleep 5".to_string(),
            timeout: Some(1),
        };
        let started = Instant::now();
        let result = execute_bash(".", &args).await;
        assert!(!result.is_success());
        assert_eq!(result.error().unwrap().code, "TIMEOUT");
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_stderr_captured() {
        let args = BashArgs {
            command: "echo oops >&2".to_string(),
            timeout: None,
        };
        let result = execute_bash(".", &args).await;
        assert!(result.output().unwrap().contains("oops"));
    }
}
