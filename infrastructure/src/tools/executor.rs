//! Local tool executor
//!
//! Runs validated tool calls in-process. Implements the
//! `ToolExecutorPort` from the application layer; this is the executor
//! used in local mode and by the trusted client in remote mode.

use super::web::SearchEngine;
use super::{command, file, search, web};
use async_trait::async_trait;
use conductor_application::ports::tool_executor::ToolExecutorPort;
use conductor_domain::tool::entities::ToolCall;
use conductor_domain::tool::value_objects::ToolResult;
use std::time::Duration;

/// Executor that runs tools on the local machine.
#[derive(Debug, Clone)]
pub struct LocalToolExecutor {
    working_dir: String,
    client: reqwest::Client,
    search_engine: SearchEngine,
}

impl LocalToolExecutor {
    pub fn new(working_dir: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            working_dir: working_dir.into(),
            client,
            search_engine: SearchEngine::default(),
        }
    }

    pub fn with_search_engine(mut self, engine: SearchEngine) -> Self {
        self.search_engine = engine;
        self
    }

    pub fn working_dir(&self) -> &str {
        &self.working_dir
    }
}

#[async_trait]
impl ToolExecutorPort for LocalToolExecutor {
    async fn execute(&self, call: &ToolCall) -> ToolResult {
        // Blocking filesystem work runs on the blocking pool so a large
        // read never stalls the reactor.
        match call {
            ToolCall::Read(args) => {
                let (dir, args) = (self.working_dir.clone(), args.clone());
                tokio::task::spawn_blocking(move || file::execute_read(&dir, &args))
                    .await
                    .unwrap_or_else(|e| panicked("read", e))
            }
            ToolCall::Write(args) => {
                let (dir, args) = (self.working_dir.clone(), args.clone());
                tokio::task::spawn_blocking(move || file::execute_write(&dir, &args))
                    .await
                    .unwrap_or_else(|e| panicked("write", e))
            }
            ToolCall::Edit(args) => {
                let (dir, args) = (self.working_dir.clone(), args.clone());
                tokio::task::spawn_blocking(move || file::execute_edit(&dir, &args))
                    .await
                    .unwrap_or_else(|e| panicked("edit", e))
            }
            ToolCall::Grep(args) => {
                let (dir, args) = (self.working_dir.clone(), args.clone());
                tokio::task::spawn_blocking(move || search::execute_grep(&dir, &args))
                    .await
                    .unwrap_or_else(|e| panicked("grep", e))
            }
            ToolCall::Glob(args) => {
                let (dir, args) = (self.working_dir.clone(), args.clone());
                tokio::task::spawn_blocking(move || search::execute_glob(&dir, &args))
                    .await
                    .unwrap_or_else(|e| panicked("glob", e))
            }
            ToolCall::Bash(args) => command::execute_bash(&self.working_dir, args).await,
            ToolCall::WebSearch(args) => {
                web::execute_web_search(&self.client, &self.search_engine, args).await
            }
            ToolCall::WebFetch(args) => web::execute_web_fetch(&self.client, args).await,
        }
    }
}

fn panicked(tool: &str, e: tokio::task::JoinError) -> ToolResult {
    ToolResult::failure(
        tool,
        conductor_domain::tool::value_objects::ToolError::execution_failed(format!(
            "tool task failed: {e}"
        )),
    )
}
