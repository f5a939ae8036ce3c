//! Model provider configuration.
//!
//! Each provider has a fixed default base URL and, for hosted APIs, a key
//! identifier used to look up its API key. Keys come from an explicit
//! [`KeySource`]; nothing is read from ambient global state.

mod ollama;

pub use ollama::OllamaClient;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Supported model providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAI,
    Anthropic,
    Gemini,
    OpenRouter,
    Ollama,
}

impl Provider {
    pub const ALL: [Provider; 5] = [
        Self::OpenAI,
        Self::Anthropic,
        Self::Gemini,
        Self::OpenRouter,
        Self::Ollama,
    ];

    /// Short lowercase identifier, as used in config files.
    pub fn id(self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
            Self::OpenRouter => "openrouter",
            Self::Ollama => "ollama",
        }
    }

    pub fn default_api_base(self) -> &'static str {
        match self {
            Self::OpenAI => "https://api.openai.com/v1",
            Self::Anthropic => "https://api.anthropic.com/v1",
            Self::Gemini => "https://api.gemini.com/v1",
            Self::OpenRouter => "https://openrouter.ai/api/v1",
            Self::Ollama => "http://localhost:11434",
        }
    }

    /// Key-storage identifier, `None` for the keyless local server.
    pub fn key_id(self) -> Option<&'static str> {
        match self {
            Self::OpenAI => Some("openai-api-key"),
            Self::Anthropic => Some("anthropic-api-key"),
            Self::Gemini => Some("gemini-api-key"),
            Self::OpenRouter => Some("openrouter-api-key"),
            Self::Ollama => None,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::Gemini => "Gemini",
            Self::OpenRouter => "OpenRouter",
            Self::Ollama => "Ollama",
        };
        f.write_str(name)
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.id().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown provider: {s}"))
    }
}

/// Source of API keys, keyed by [`Provider::key_id`].
pub trait KeySource {
    fn get(&self, key_id: &str) -> Option<String>;
}

impl KeySource for HashMap<String, String> {
    fn get(&self, key_id: &str) -> Option<String> {
        HashMap::get(self, key_id).cloned()
    }
}

/// Reads keys from environment variables: `openai-api-key` becomes
/// `OPENAI_API_KEY`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvKeys;

impl EnvKeys {
    pub fn var_name(key_id: &str) -> String {
        key_id.to_ascii_uppercase().replace('-', "_")
    }
}

impl KeySource for EnvKeys {
    fn get(&self, key_id: &str) -> Option<String> {
        std::env::var(Self::var_name(key_id)).ok()
    }
}

/// The first source that has a non-empty key wins.
impl<A: KeySource, B: KeySource> KeySource for (A, B) {
    fn get(&self, key_id: &str) -> Option<String> {
        non_empty(self.0.get(key_id)).or_else(|| non_empty(self.1.get(key_id)))
    }
}

fn non_empty(key: Option<String>) -> Option<String> {
    key.filter(|k| !k.trim().is_empty())
}

/// Connection settings for one provider. Immutable once built.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    provider: Provider,
    api_base: String,
    api_key: Option<String>,
}

impl ProviderConfig {
    /// Build a config; blank keys are treated as absent and the local
    /// server never carries one.
    pub fn new(provider: Provider, api_base: impl Into<String>, api_key: Option<String>) -> Self {
        let api_key = match provider.key_id() {
            Some(_) => non_empty(api_key),
            None => None,
        };
        Self {
            provider,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn has_key(&self) -> bool {
        self.api_key.is_some()
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// One [`ProviderConfig`] per supported provider.
#[derive(Debug, Clone)]
pub struct Providers {
    configs: Vec<ProviderConfig>,
}

impl Providers {
    /// Default base URLs with keys looked up in `keys`.
    pub fn from_keys(keys: &impl KeySource) -> Self {
        let configs = Provider::ALL
            .into_iter()
            .map(|provider| {
                let key = provider.key_id().and_then(|id| keys.get(id));
                ProviderConfig::new(provider, provider.default_api_base(), key)
            })
            .collect();
        Self { configs }
    }

    /// Replace the base URL of one provider, keeping its key.
    pub fn with_api_base(mut self, provider: Provider, api_base: impl Into<String>) -> Self {
        let api_base = api_base.into();
        for config in &mut self.configs {
            if config.provider == provider {
                *config = ProviderConfig::new(provider, api_base.clone(), config.api_key.clone());
            }
        }
        self
    }

    pub fn get(&self, provider: Provider) -> &ProviderConfig {
        // one entry per provider, in declaration order
        &self.configs[provider as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProviderConfig> {
        self.configs.iter()
    }
}
