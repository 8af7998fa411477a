//! Local tool implementations
//!
//! The concrete tools behind the closed tool set: file I/O, content
//! search, command execution, and web access. `LocalToolExecutor`
//! dispatches validated [`ToolCall`](conductor_domain::tool::entities::ToolCall)
//! variants to these modules.

pub mod command;
pub mod executor;
pub mod file;
pub mod search;
pub mod web;

pub use executor::LocalToolExecutor;
pub use web::SearchEngine;
