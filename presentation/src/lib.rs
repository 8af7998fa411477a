//! Presentation layer for conductor
//!
//! The clap CLI surface, the interactive REPL, and the console progress
//! reporter.

mod cli;
mod progress;
mod repl;

pub use cli::{Cli, Command};
pub use progress::ProgressReporter;
pub use repl::ChatRepl;
