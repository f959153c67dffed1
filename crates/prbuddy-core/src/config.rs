//! Configuration for the PRBuddy agent.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub endpoint: String,
    pub model: String,
    pub request_timeout_secs: u64,
    pub num_ctx: u32,
}

impl Default for LlmSection {
    fn default() -> Self {
        LlmSection {
            endpoint: "http://localhost:11434".to_string(),
            model: "llama3".to_string(),
            request_timeout_secs: 30,
            num_ctx: 8192,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanionSection {
    pub poll_interval_secs: u64,
}

impl Default for CompanionSection {
    fn default() -> Self {
        CompanionSection {
            poll_interval_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationSection {
    pub max_age_secs: u64,
}

impl Default for ConversationSection {
    fn default() -> Self {
        ConversationSection {
            max_age_secs: 86_400,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: String,
    pub shutdown_grace_secs: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        ServerSection {
            bind: "127.0.0.1:0".to_string(),
            shutdown_grace_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrbuddyConfig {
    pub llm: LlmSection,
    pub companion: CompanionSection,
    pub conversation: ConversationSection,
    pub server: ServerSection,
}

impl PrbuddyConfig {
    /// Applies the `PRBUDDY_LLM_ENDPOINT` / `PRBUDDY_LLM_MODEL` env var
    /// overrides on top of whatever was loaded from a config file.
    /// Env always wins; this is the only override path the agent
    /// supports (no general env-for-every-field mechanism).
    pub fn apply_env_overrides(&mut self) {
        if let Ok(endpoint) = std::env::var("PRBUDDY_LLM_ENDPOINT") {
            if !endpoint.is_empty() {
                self.llm.endpoint = endpoint;
            }
        }
        if let Ok(model) = std::env::var("PRBUDDY_LLM_MODEL") {
            if !model.is_empty() {
                self.llm.model = model;
            }
        }
    }
}

pub fn parse_config(contents: &str) -> Result<PrbuddyConfig, toml::de::Error> {
    if contents.trim().is_empty() {
        return Ok(PrbuddyConfig::default());
    }
    toml::from_str(contents)
}

/// Loads config from `path`. A missing file is not an error — the
/// default config is used, matching how the agent runs fine with no
/// config file present at all.
pub fn load_config(path: impl AsRef<Path>) -> Result<PrbuddyConfig, ConfigError> {
    let path_ref = path.as_ref();
    if !path_ref.exists() {
        return Ok(PrbuddyConfig::default());
    }
    let body = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
        path: path_ref.to_path_buf(),
        source,
    })?;
    parse_config(&body).map_err(|source| ConfigError::Parse {
        path: path_ref.to_path_buf(),
        source,
    })
}
