//! Application layer for conductor
//!
//! Use cases and ports: the orchestrator loop, the shared worker
//! skeleton, the plan executor, the agent concurrency semaphore, and the
//! tool-callback broker. Infrastructure adapters implement the ports
//! defined here.

pub mod callback;
pub mod orchestrator;
pub mod plan_executor;
pub mod pool;
pub mod ports;
pub mod semaphore;
pub mod worker;

#[cfg(test)]
pub(crate) mod test_support;

pub use callback::{ChannelError, RemoteToolExecutor, ToolCallbackBroker};
pub use orchestrator::{Orchestrator, OrchestratorConfig, OrchestratorError};
pub use plan_executor::{PlanExecutor, PlanReport};
pub use pool::{ModelCatalog, WorkerPool, WorkerPoolConfig};
pub use ports::llm_gateway::{
    ChatChunk, ChatOutcome, ChatRequest, ChatStream, GatewayError, GenOptions, LlmGateway, Usage,
    collect_chat,
};
pub use ports::memory::{MemoryError, MemoryPort};
pub use ports::progress::{NoProgress, ProgressNotifier};
pub use ports::tool_executor::ToolExecutorPort;
pub use semaphore::{AgentPermit, AgentSemaphore};
pub use worker::Worker;
