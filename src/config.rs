use crate::error::{CorepError, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_TOP_K: usize = 3;
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Runtime settings for a [`crate::CorepAssistant`] and the Groq client.
///
/// The API key is deliberately absent: clients read it from `GROQ_API_KEY`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Number of rules handed to the oracle as context.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub temperature: f64,

    /// OpenAI-compatible API root, without the `/chat/completions` suffix.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// JSON rule file. The bundled rulebook is used when unset.
    #[serde(default)]
    pub knowledge_base_path: Option<PathBuf>,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            model: default_model(),
            temperature: 0.0,
            base_url: default_base_url(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            knowledge_base_path: None,
        }
    }
}

impl AssistantConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: AssistantConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `COREP_*` environment variables on top of the current values.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("COREP_TOP_K") {
            self.top_k = raw.trim().parse().map_err(|_| {
                CorepError::InvalidConfig(format!("COREP_TOP_K is not an integer: {}", raw))
            })?;
        }
        if let Some(model) = lookup("COREP_MODEL") {
            self.model = model;
        }
        if let Some(url) = lookup("COREP_BASE_URL") {
            self.base_url = url;
        }
        if let Some(raw) = lookup("COREP_TIMEOUT_SECS") {
            self.timeout_secs = raw.trim().parse().map_err(|_| {
                CorepError::InvalidConfig(format!("COREP_TIMEOUT_SECS is not an integer: {}", raw))
            })?;
        }
        if let Some(path) = lookup("COREP_KNOWLEDGE_BASE") {
            self.knowledge_base_path = Some(PathBuf::from(path));
        }

        debug!("Effective assistant configuration: {:?}", self);
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(CorepError::InvalidConfig(
                "top_k must be at least 1".to_string(),
            ));
        }
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(CorepError::InvalidConfig(format!(
                "temperature must be a non-negative number, got {}",
                self.temperature
            )));
        }
        Ok(())
    }
}
