//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Root configuration for chat-memory
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Session memory configuration
    #[serde(default)]
    pub memory: MemoryConfig,
    /// Model provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Agent behaviour
    #[serde(default)]
    pub agent: AgentConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for log files
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_dir() -> String {
    "~/.chat-memory/logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: default_log_dir(),
            overrides: HashMap::new(),
        }
    }
}

/// Which session store backs the conversation memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryBackend {
    /// In-process only, lost on exit
    #[default]
    Volatile,
    /// One JSON file per session
    Durable,
}

impl fmt::Display for MemoryBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryBackend::Volatile => write!(f, "volatile"),
            MemoryBackend::Durable => write!(f, "durable"),
        }
    }
}

impl FromStr for MemoryBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "volatile" | "memory" => Ok(MemoryBackend::Volatile),
            "durable" | "file" => Ok(MemoryBackend::Durable),
            other => Err(format!(
                "unknown memory backend '{}' (expected volatile or durable)",
                other
            )),
        }
    }
}

/// Session memory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default)]
    pub backend: MemoryBackend,
    /// Maximum retained messages per session
    #[serde(default = "default_max_history")]
    pub max_history: usize,
    /// Directory for durable session files
    #[serde(default = "default_storage_dir")]
    pub storage_dir: String,
    /// Messages of prior context included in each prompt
    #[serde(default = "default_recent_window")]
    pub recent_window: usize,
}

fn default_max_history() -> usize {
    50
}

fn default_storage_dir() -> String {
    "~/.chat-memory/sessions".to_string()
}

fn default_recent_window() -> usize {
    5
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: MemoryBackend::default(),
            max_history: default_max_history(),
            storage_dir: default_storage_dir(),
            recent_window: default_recent_window(),
        }
    }
}

/// Hosted model endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    /// OpenAI-compatible base URL; the Gemini endpoint when unset
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub extra_headers: Option<HashMap<String, String>>,
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f32 {
    0.7
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            extra_headers: None,
        }
    }
}

/// Agent retry behaviour around the model call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Attempts before the failure is recorded in the conversation
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
    /// Offer the built-in tools to the model
    #[serde(default = "default_enable_tools")]
    pub enable_tools: bool,
}

fn default_enable_tools() -> bool {
    true
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}

fn default_retry_max_delay_ms() -> u64 {
    8000
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
            enable_tools: default_enable_tools(),
        }
    }
}
