//! Raw TOML configuration data types
//!
//! These structs mirror the structure of `conductor.toml`. Every section
//! and field has a default, so a missing file is a valid configuration.

use serde::{Deserialize, Serialize};

/// LLM endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub api_url: String,
    pub timeout_seconds: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:11434".to_string(),
            timeout_seconds: 120,
        }
    }
}

/// Role-based model selection. Orchestration is the routing model; the
/// lite variants serve simple-complexity tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsSection {
    pub planning: String,
    pub orchestration: String,
    pub research: String,
    pub execution: String,
    pub execution_lite: String,
    pub exploration: String,
    pub exploration_lite: String,
}

impl Default for ModelsSection {
    fn default() -> Self {
        Self {
            planning: "deepseek-coder:6.7b".to_string(),
            orchestration: "llama3.2:3b".to_string(),
            research: "llama3.2:3b".to_string(),
            execution: "qwen2.5-coder:7b".to_string(),
            execution_lite: "qwen2.5-coder:1.5b".to_string(),
            exploration: "llama3.2:3b".to_string(),
            exploration_lite: "llama3.2:1b".to_string(),
        }
    }
}

/// Default generation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsSection {
    pub temperature: f64,
    pub max_tokens: u32,
    /// Drives the compaction threshold
    pub context_window: usize,
}

impl Default for DefaultsSection {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 4096,
            context_window: 8192,
        }
    }
}

/// Concurrency and supervision limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegulatorsSection {
    pub max_concurrent_agents: usize,
    pub agent_timeout_seconds: u64,
    pub max_supervision_rounds: u32,
}

impl Default for RegulatorsSection {
    fn default() -> Self {
        Self {
            max_concurrent_agents: 5,
            agent_timeout_seconds: 300,
            max_supervision_rounds: 3,
        }
    }
}

/// Long-term memory settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySection {
    pub enabled: bool,
    /// chroma | qdrant | pgvector (only qdrant is implemented)
    pub vector_store: String,
    pub embedding_model: String,
    pub stores: MemoryStores,
}

impl Default for MemorySection {
    fn default() -> Self {
        Self {
            enabled: false,
            vector_store: "qdrant".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            stores: MemoryStores::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryStores {
    pub qdrant: QdrantStore,
    pub chroma: ChromaStore,
    pub pgvector: PgVectorStore,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QdrantStore {
    pub url: String,
    pub collection: String,
}

impl Default for QdrantStore {
    fn default() -> Self {
        Self {
            url: "http://localhost:6333".to_string(),
            collection: "conductor_memory".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChromaStore {
    pub path: String,
    pub collection: String,
}

impl Default for ChromaStore {
    fn default() -> Self {
        Self {
            path: "./.conductor/memory".to_string(),
            collection: "conductor_memory".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PgVectorStore {
    pub connection_string: String,
    pub table: String,
}

/// Web research settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchSection {
    /// duckduckgo | searxng
    pub engine: String,
    pub max_results: usize,
    pub engines: ResearchEngines,
}

impl Default for ResearchSection {
    fn default() -> Self {
        Self {
            engine: "duckduckgo".to_string(),
            max_results: 5,
            engines: ResearchEngines::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchEngines {
    pub duckduckgo: DuckDuckGoEngine,
    pub searxng: SearxNgEngine,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DuckDuckGoEngine {
    pub safesearch: String,
    pub region: String,
}

impl Default for DuckDuckGoEngine {
    fn default() -> Self {
        Self {
            safesearch: "moderate".to_string(),
            region: "wt-wt".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearxNgEngine {
    pub url: String,
}

impl Default for SearxNgEngine {
    fn default() -> Self {
        Self {
            url: "https://searx.be".to_string(),
        }
    }
}

/// Remote mode: tool execution delegated over the callback channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSection {
    pub enabled: bool,
    pub listen_addr: String,
    /// Bearer token expected from the trusted client; empty disables auth
    pub token: String,
}

impl Default for RemoteSection {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1:50551".to_string(),
            token: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// JSONL conversation log path; empty disables it
    pub conversation_file: String,
}

/// Complete file configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub llm: LlmSection,
    pub models: ModelsSection,
    pub defaults: DefaultsSection,
    pub regulators: RegulatorsSection,
    pub memory: MemorySection,
    pub research: ResearchSection,
    pub remote: RemoteSection,
    pub logging: LoggingSection,
}
