//! Configuration file loader with multi-source merging
//!
//! Priority (highest to lowest):
//! 1. Explicit config path (if provided)
//! 2. Project root: `./conductor.toml` or `./.conductor.toml`
//! 3. Global: `~/.config/conductor/config.toml`
//! 4. Built-in defaults
//!
//! After extraction, `${VAR}` strings anywhere in the configuration are
//! expanded from the environment (unset variables become empty strings).

use super::file_config::FileConfig;
use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("unsupported vector store '{0}' (supported: qdrant)")]
    UnsupportedVectorStore(String),

    #[error("unsupported search engine '{0}' (supported: duckduckgo, searxng)")]
    UnsupportedSearchEngine(String),
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority.
    pub fn load(config_path: Option<&PathBuf>) -> Result<FileConfig, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        if let Some(global) = Self::global_config_path()
            && global.exists()
        {
            figment = figment.merge(Toml::file(&global));
        }

        for filename in ["conductor.toml", ".conductor.toml"] {
            let path = PathBuf::from(filename);
            if path.exists() {
                figment = figment.merge(Toml::file(&path));
                break;
            }
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        let config: FileConfig = figment
            .extract()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        let config = expand_env(config)?;
        validate(&config)?;
        Ok(config)
    }

    /// Built-in defaults only (for `--no-config`).
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
    }

    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("conductor").join("config.toml"))
    }
}

/// Expand `${VAR}` in every string field by a JSON round-trip walk.
fn expand_env(config: FileConfig) -> Result<FileConfig, ConfigError> {
    let mut value =
        serde_json::to_value(&config).map_err(|e| ConfigError::Invalid(e.to_string()))?;
    expand_value(&mut value);
    serde_json::from_value(value).map_err(|e| ConfigError::Invalid(e.to_string()))
}

fn expand_value(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::String(s) => {
            if let Some(expanded) = expand_string(s) {
                *s = expanded;
            }
        }
        serde_json::Value::Array(items) => items.iter_mut().for_each(expand_value),
        serde_json::Value::Object(map) => map.values_mut().for_each(expand_value),
        _ => {}
    }
}

/// Expand a `${VAR}`-shaped string; `None` when no expansion applies.
fn expand_string(s: &str) -> Option<String> {
    if !s.contains("${") {
        return None;
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let var = &after[..end];
                out.push_str(&std::env::var(var).unwrap_or_default());
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    Some(out)
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    if config.memory.enabled && config.memory.vector_store != "qdrant" {
        return Err(ConfigError::UnsupportedVectorStore(
            config.memory.vector_store.clone(),
        ));
    }
    if !matches!(config.research.engine.as_str(), "duckduckgo" | "searxng") {
        return Err(ConfigError::UnsupportedSearchEngine(
            config.research.engine.clone(),
        ));
    }
    if config.regulators.max_concurrent_agents == 0 {
        return Err(ConfigError::Invalid(
            "regulators.max_concurrent_agents must be at least 1".to_string(),
        ));
    }
    Ok(())
}
