//! LLM integration for Quill.
//!
//! Quill does not talk to any provider itself. It resolves provider settings
//! once at startup and hands them to a [`SqlGenerator`] collaborator that
//! turns a question into SQL.

mod mock;
mod suggestions;

pub use mock::StaticSqlGenerator;
pub use suggestions::{query_suggestions, MAX_SUGGESTIONS};

use crate::config::LlmConfig;
use crate::db::Schema;
use crate::error::{QuillError, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Environment variable naming the provider.
pub const PROVIDER_ENV: &str = "LLM_PROVIDER";

/// Turns a natural-language question into SQL.
///
/// Implementations must be thread-safe (Send + Sync) to support async operations.
/// Whatever they return is validated before it reaches a database.
#[async_trait]
pub trait SqlGenerator: Send + Sync {
    async fn generate_sql(
        &self,
        question: &str,
        schema: &Schema,
        settings: &LlmSettings,
    ) -> Result<String>;
}

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LlmProvider {
    /// Google Gemini
    #[default]
    Gemini,
    /// OpenAI (GPT-3.5, etc.)
    OpenAi,
}

impl LlmProvider {
    /// Returns the provider as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "GEMINI",
            Self::OpenAi => "OPENAI",
        }
    }

    /// Human-readable provider name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Gemini => "Gemini",
            Self::OpenAi => "OpenAI",
        }
    }

    /// Prefix every well-formed key for this provider starts with.
    pub fn key_prefix(&self) -> &'static str {
        match self {
            Self::Gemini => "AIza",
            Self::OpenAi => "sk-",
        }
    }

    /// Environment variable holding this provider's key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Self::Gemini => "GEMINI_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini-1.5-flash",
            Self::OpenAi => "gpt-3.5-turbo",
        }
    }
}

impl FromStr for LlmProvider {
    type Err = QuillError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "GEMINI" => Ok(Self::Gemini),
            "OPENAI" => Ok(Self::OpenAi),
            _ => Err(QuillError::config(format!(
                "Invalid provider '{s}'. Must be GEMINI or OPENAI"
            ))),
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved, immutable LLM settings passed explicitly to every call that
/// needs them.
#[derive(Clone, PartialEq, Eq)]
pub struct LlmSettings {
    provider: LlmProvider,
    api_key: Option<String>,
    model: String,
}

impl LlmSettings {
    /// Creates settings for a provider, checking the key format.
    pub fn new(provider: LlmProvider, api_key: Option<String>) -> Result<Self> {
        let api_key = api_key.filter(|key| !key.trim().is_empty());

        if let Some(key) = &api_key {
            if !key.starts_with(provider.key_prefix()) {
                return Err(QuillError::config(format!(
                    "Invalid {} API key format. Should start with \"{}\"",
                    provider.display_name(),
                    provider.key_prefix()
                )));
            }
        }

        Ok(Self {
            provider,
            api_key,
            model: provider.default_model().to_string(),
        })
    }

    /// Overrides the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Resolves settings from the config file, falling back to the process
    /// environment.
    pub fn from_env(config: &LlmConfig) -> Result<Self> {
        Self::resolve(config, |key| std::env::var(key).ok())
    }

    /// Resolves settings from the config file, then `lookup`.
    ///
    /// The config file wins over the environment for every field.
    pub fn resolve(config: &LlmConfig, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let provider = match config.provider.clone().or_else(|| lookup(PROVIDER_ENV)) {
            Some(name) => name.parse()?,
            None => LlmProvider::default(),
        };

        let api_key = config
            .api_key
            .clone()
            .or_else(|| lookup(provider.api_key_env()));

        let settings = Self::new(provider, api_key)?;
        Ok(match &config.model {
            Some(model) => settings.with_model(model.clone()),
            None => settings,
        })
    }

    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// True when a key is available for the provider.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Returns the key, or an LLM error when none is configured.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key().ok_or_else(|| {
            QuillError::llm(format!(
                "No {} API key configured. Set {} or add api_key to the [llm] config section",
                self.provider.display_name(),
                self.provider.api_key_env()
            ))
        })
    }

    /// Reports configuration state without exposing the key.
    pub fn status(&self) -> LlmStatus {
        LlmStatus {
            configured: self.is_configured(),
            provider: self.provider,
            has_api_key: self.api_key.is_some(),
        }
    }
}

impl fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmSettings")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .finish()
    }
}

/// Public view of the LLM configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmStatus {
    pub configured: bool,
    pub provider: LlmProvider,
    pub has_api_key: bool,
}
