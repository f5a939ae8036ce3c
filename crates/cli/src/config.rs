//! Configuration loading from bridget.toml.

use policy::Policy;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use toolcall::{ArgumentMode, EnvKeys, KeySource, Provider, Providers};

/// Top-level configuration.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// API keys by key id (`openai-api-key`, ...).
    #[serde(default)]
    pub keys: HashMap<String, String>,

    /// Base URL overrides by provider id.
    #[serde(default)]
    pub providers: HashMap<String, String>,

    /// Tool execution settings.
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Policy rules (allow/deny). Restrictive when neither table is present.
    #[serde(flatten)]
    pub policy: Policy,
}

#[derive(Debug, Deserialize)]
pub struct ToolsConfig {
    /// Directory relative tool paths resolve against.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Reject non-string arguments instead of coercing them.
    #[serde(default)]
    pub strict_arguments: bool,

    /// Kill commands that run longer than this. Zero disables the limit.
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            strict_arguments: false,
            command_timeout_secs: default_command_timeout(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_command_timeout() -> u64 {
    60
}

impl ToolsConfig {
    pub fn argument_mode(&self) -> ArgumentMode {
        if self.strict_arguments {
            ArgumentMode::Strict
        } else {
            ArgumentMode::Lenient
        }
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        (self.command_timeout_secs > 0).then(|| Duration::from_secs(self.command_timeout_secs))
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        let table: toml::Table =
            toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let mut config: Self =
            toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        if !table.contains_key("allow") && !table.contains_key("deny") {
            debug!("no [allow] or [deny] tables, using the restrictive policy");
            config.policy = Policy::restrictive();
        }
        config.policy.validate()?;
        for id in config.providers.keys() {
            id.parse::<Provider>().map_err(ConfigError::UnknownProvider)?;
        }
        Ok(config)
    }

    /// Create a default configuration with the restrictive policy.
    pub fn default_config() -> Self {
        Self {
            keys: HashMap::new(),
            providers: HashMap::new(),
            tools: ToolsConfig::default(),
            policy: Policy::restrictive(),
        }
    }

    /// Provider settings: configured keys first, then the environment.
    pub fn providers(&self) -> Providers {
        self.providers_with(&EnvKeys)
    }

    pub fn providers_with(&self, fallback: &impl KeySource) -> Providers {
        let keys = Chain(&self.keys, fallback);
        let mut providers = Providers::from_keys(&keys);
        for (id, api_base) in &self.providers {
            // ids were checked in `parse`
            if let Ok(provider) = id.parse::<Provider>() {
                providers = providers.with_api_base(provider, api_base);
            }
        }
        providers
    }
}

/// Borrowing counterpart of the `(A, B)` key source.
struct Chain<'a, A, B>(&'a A, &'a B);

impl<A: KeySource, B: KeySource> KeySource for Chain<'_, A, B> {
    fn get(&self, key_id: &str) -> Option<String> {
        self.0
            .get(key_id)
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.1.get(key_id))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error(transparent)]
    Policy(#[from] policy::Error),

    #[error("invalid [providers] entry: {0}")]
    UnknownProvider(String),
}
