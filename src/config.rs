//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (API keys) are referenced by env-var name in the config and
//! resolved at runtime via `std::env::var`. Every section has defaults, so
//! a partial file (or none at all, via `load_or_default`) is usable.

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::platforms::GAMMA_API_URL;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub agent: AgentConfig,
    pub llm: LlmConfig,
    pub polymarket: PolymarketConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AgentConfig {
    pub name: String,
    /// Prepend the current UTC date/time to the agent's instructions.
    pub add_datetime_to_context: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "polymarket_agent".to_string(),
            add_datetime_to_context: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    pub api_key_env: String,
    /// Chat-completions endpoint (OpenAI-compatible).
    pub api_url: String,
    pub max_tokens: u32,
    /// Upper bound on model turns that request tools within one run.
    pub max_tool_rounds: u32,
    /// Conversations kept in memory; the least recently used is evicted.
    pub max_sessions: usize,
    /// Messages kept per conversation (user and assistant turns).
    pub max_history_messages: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openrouter".to_string(),
            model: "anthropic/claude-sonnet-4".to_string(),
            api_key_env: "OPENROUTER_API_KEY".to_string(),
            api_url: "https://openrouter.ai/api/v1/chat/completions".to_string(),
            max_tokens: 2048,
            max_tool_rounds: 8,
            max_sessions: 1000,
            max_history_messages: 20,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PolymarketConfig {
    pub gamma_base_url: String,
    /// Per-request timeout. Unset means the transport's own default.
    pub request_timeout_secs: Option<u64>,
}

impl Default for PolymarketConfig {
    fn default() -> Self {
        Self {
            gamma_base_url: GAMMA_API_URL.to_string(),
            request_timeout_secs: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            info!(path, "No config file found, using defaults");
            Ok(Self::default())
        }
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }

    /// The LLM API key, wrapped so it never lands in logs.
    pub fn llm_api_key(&self) -> Result<SecretString> {
        Self::resolve_env(&self.llm.api_key_env).map(SecretString::new)
    }
}
