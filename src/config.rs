//! Configuration management for chatvault
//!
//! Configuration is loaded from a YAML file, then overridden by
//! `CHATVAULT_*` environment variables, then by CLI flags. Defaults are
//! applied per field so partial config files work.

use crate::cli::Cli;
use crate::error::{ChatvaultError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Reply-generation provider settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Record store settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Conversation policy settings
    #[serde(default)]
    pub conversation: ConversationConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Model name sent with each completion request
    #[serde(default = "default_model")]
    pub model: String,

    /// API key; usually supplied via CHATVAULT_API_KEY
    #[serde(default)]
    pub api_key: String,

    /// Base URL of the OpenAI-compatible API
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// System message substituted when a request supplies none
    #[serde(default = "default_system_message")]
    pub default_system_message: String,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_system_message() -> String {
    "You are a helpful assistant.".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: String::new(),
            api_base: default_api_base(),
            default_system_message: default_system_message(),
        }
    }
}

/// Record store configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Session directory; platform data directory when unset
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

/// Conversation policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Stored turns included in each prompt window
    #[serde(default = "default_context_turns")]
    pub context_turns: usize,

    /// Cap on stored turns per conversation (0 = unlimited)
    #[serde(default = "default_max_stored_turns")]
    pub max_stored_turns: usize,
}

fn default_context_turns() -> usize {
    crate::manager::DEFAULT_CONTEXT_TURNS
}

fn default_max_stored_turns() -> usize {
    crate::manager::DEFAULT_MAX_STORED_TURNS
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            context_turns: default_context_turns(),
            max_stored_turns: default_max_stored_turns(),
        }
    }
}

impl Config {
    /// Load configuration from file, environment, and CLI flags
    ///
    /// Missing config files are not an error; defaults apply.
    ///
    /// # Arguments
    ///
    /// * `path` - path to the YAML config file
    /// * `cli` - parsed CLI arguments for overrides
    pub fn load(path: &str, cli: &Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::debug!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ChatvaultError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| ChatvaultError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(host) = std::env::var("CHATVAULT_HOST") {
            self.server.host = host;
        }

        if let Ok(port) = std::env::var("CHATVAULT_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid CHATVAULT_PORT: {}", port),
            }
        }

        if let Ok(model) = std::env::var("CHATVAULT_MODEL") {
            self.provider.model = model;
        }

        if let Ok(api_key) = std::env::var("CHATVAULT_API_KEY") {
            self.provider.api_key = api_key;
        }

        if let Ok(api_base) = std::env::var("CHATVAULT_API_BASE") {
            self.provider.api_base = api_base;
        }

        if let Ok(system_message) = std::env::var("CHATVAULT_SYSTEM_MESSAGE") {
            self.provider.default_system_message = system_message;
        }

        if let Ok(data_dir) = std::env::var("CHATVAULT_DATA_DIR") {
            self.storage.data_dir = Some(PathBuf::from(data_dir));
        }

        if let Ok(turns) = std::env::var("CHATVAULT_CONTEXT_TURNS") {
            match turns.parse() {
                Ok(turns) => self.conversation.context_turns = turns,
                Err(_) => tracing::warn!("Ignoring invalid CHATVAULT_CONTEXT_TURNS: {}", turns),
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &Cli) {
        if let Some(data_dir) = &cli.data_dir {
            self.storage.data_dir = Some(data_dir.clone());
        }
    }

    /// Validate the assembled configuration
    ///
    /// # Errors
    ///
    /// Returns a config error describing the first invalid field
    pub fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            return Err(ChatvaultError::Config("server.host cannot be empty".to_string()).into());
        }

        if self.provider.model.is_empty() {
            return Err(
                ChatvaultError::Config("provider.model cannot be empty".to_string()).into(),
            );
        }

        if self.provider.api_base.is_empty() {
            return Err(
                ChatvaultError::Config("provider.api_base cannot be empty".to_string()).into(),
            );
        }

        if self.conversation.context_turns == 0 {
            return Err(ChatvaultError::Config(
                "conversation.context_turns must be greater than 0".to_string(),
            )
            .into());
        }

        if self.conversation.context_turns > 100 {
            return Err(ChatvaultError::Config(
                "conversation.context_turns must be less than or equal to 100".to_string(),
            )
            .into());
        }

        Ok(())
    }
}
