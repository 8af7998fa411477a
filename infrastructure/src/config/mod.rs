//! Declarative configuration

mod file_config;
mod loader;

pub use file_config::{
    DefaultsSection, FileConfig, LlmSection, LoggingSection, MemorySection, ModelsSection,
    RegulatorsSection, RemoteSection, ResearchSection,
};
pub use loader::{ConfigError, ConfigLoader};
