//! Configuration loading, validation, and management for stepwise.
//!
//! Loads configuration from `~/.stepwise/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Environment variables consulted for the API key, highest priority first.
pub const API_KEY_VARS: &[&str] = &["STEPWISE_API_KEY", "GEMINI_API_KEY", "OPENAI_API_KEY"];

/// The root configuration structure.
///
/// Maps directly to `~/.stepwise/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default model provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Agent loop settings
    #[serde(default)]
    pub agent: AgentSettings,

    /// Tool settings
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "gemini".into()
}
fn default_model() -> String {
    "gemini-2.0-flash-exp".into()
}
fn default_temperature() -> f32 {
    0.7
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("agent", &self.agent)
            .field("tools", &self.tools)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

/// How long the conversation history lives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextScope {
    /// One history for the whole process; queries see earlier turns.
    #[default]
    Session,
    /// A fresh history for every query.
    Query,
}

/// Which system prompt the model is given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptStyle {
    /// START / PLAN (possibly several) / TOOL / OUTPUT.
    #[default]
    ChainOfThought,
    /// Exactly PLAN → TOOL → OUTPUT.
    Direct,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Hard ceiling on loop iterations per query
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    #[serde(default)]
    pub context_scope: ContextScope,

    /// Messages included in each prompt; 0 means the full history
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    #[serde(default)]
    pub prompt_style: PromptStyle,

    /// Fixed sleep before every model call
    #[serde(default = "default_pacing_delay_ms")]
    pub pacing_delay_ms: u64,

    /// Wait applied before retrying a throttled model call
    #[serde(default = "default_rate_limit_backoff_secs")]
    pub rate_limit_backoff_secs: u64,
}

fn default_max_steps() -> u32 {
    10
}
fn default_history_window() -> usize {
    10
}
fn default_pacing_delay_ms() -> u64 {
    1000
}
fn default_rate_limit_backoff_secs() -> u64 {
    10
}

impl AgentSettings {
    /// The window as the agent consumes it: `None` for the full history.
    pub fn window(&self) -> Option<usize> {
        (self.history_window > 0).then_some(self.history_window)
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            context_scope: ContextScope::default(),
            history_window: default_history_window(),
            prompt_style: PromptStyle::default(),
            pacing_delay_ms: default_pacing_delay_ms(),
            rate_limit_backoff_secs: default_rate_limit_backoff_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Base URL of the weather service
    #[serde(default = "default_weather_url")]
    pub weather_url: String,

    /// Names of the capabilities to register
    #[serde(default = "default_enabled_tools")]
    pub enabled: Vec<String>,
}

fn default_weather_url() -> String {
    "https://wttr.in".into()
}
fn default_enabled_tools() -> Vec<String> {
    vec!["get_weather".into(), "run_command".into()]
}

impl ToolsConfig {
    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled.iter().any(|t| t == name)
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            weather_url: default_weather_url(),
            enabled: default_enabled_tools(),
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.stepwise/config.toml).
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_overrides(&Self::config_dir().join("config.toml"))
    }

    /// Load from `path`, then apply environment overrides.
    ///
    /// API key lookup order: `STEPWISE_API_KEY`, `GEMINI_API_KEY`,
    /// `OPENAI_API_KEY`. `STEPWISE_PROVIDER` and `STEPWISE_MODEL` replace
    /// the configured defaults.
    pub fn load_with_overrides(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply environment overrides using the given lookup.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = API_KEY_VARS
                .iter()
                .find_map(|var| lookup(var).filter(|v| !v.trim().is_empty()));
        }

        if let Some(provider) = lookup("STEPWISE_PROVIDER") {
            self.default_provider = provider;
        }

        if let Some(model) = lookup("STEPWISE_MODEL") {
            self.default_model = model;
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".stepwise")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_steps == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_steps must be at least 1".into(),
            ));
        }

        if self.default_model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "default_model must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
            || self
                .providers
                .get(&self.default_provider)
                .is_some_and(|p| p.api_key.is_some())
    }

    /// The model to use with the default provider.
    pub fn resolved_model(&self) -> &str {
        self.providers
            .get(&self.default_provider)
            .and_then(|p| p.default_model.as_deref())
            .unwrap_or(&self.default_model)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            agent: AgentSettings::default(),
            tools: ToolsConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.default_provider, "gemini");
        assert_eq!(config.agent.max_steps, 10);
        assert_eq!(config.agent.window(), Some(10));
        assert_eq!(config.agent.context_scope, ContextScope::Session);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_provider, config.default_provider);
        assert_eq!(parsed.agent.max_steps, config.agent.max_steps);
        assert_eq!(parsed.tools.enabled, config.tools.enabled);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            default_temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_max_steps_rejected() {
        let mut config = AppConfig::default();
        config.agent.max_steps = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_steps"));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        let config = result.unwrap();
        assert_eq!(config.default_provider, "gemini");
    }

    #[test]
    fn loads_agent_section_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
default_model = "gemini-2.5-flash"

[agent]
max_steps = 5
context_scope = "query"
history_window = 0
prompt_style = "direct"
pacing_delay_ms = 0

[tools]
enabled = ["get_weather"]
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.default_model, "gemini-2.5-flash");
        assert_eq!(config.agent.max_steps, 5);
        assert_eq!(config.agent.context_scope, ContextScope::Query);
        assert_eq!(config.agent.window(), None);
        assert_eq!(config.agent.prompt_style, PromptStyle::Direct);
        assert_eq!(config.agent.rate_limit_backoff_secs, 10);
        assert!(config.tools.is_enabled("get_weather"));
        assert!(!config.tools.is_enabled("run_command"));
    }

    #[test]
    fn invalid_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "agent = [not valid").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn env_api_key_priority() {
        let mut config = AppConfig::default();
        config.apply_env(|key| match key {
            "GEMINI_API_KEY" => Some("gemini-key".into()),
            "OPENAI_API_KEY" => Some("openai-key".into()),
            _ => None,
        });
        assert_eq!(config.api_key.as_deref(), Some("gemini-key"));
        assert!(config.has_api_key());
    }

    #[test]
    fn file_api_key_wins_over_env() {
        let mut config = AppConfig {
            api_key: Some("from-file".into()),
            ..AppConfig::default()
        };
        config.apply_env(|_| Some("from-env".into()));
        assert_eq!(config.api_key.as_deref(), Some("from-file"));
        // Provider and model overrides still apply.
        assert_eq!(config.default_provider, "from-env");
        assert_eq!(config.default_model, "from-env");
    }

    #[test]
    fn blank_env_key_is_ignored() {
        let mut config = AppConfig::default();
        config.apply_env(|key| (key == "STEPWISE_API_KEY").then(|| "  ".to_string()));
        assert!(config.api_key.is_none());
        assert!(!config.has_api_key());
    }

    #[test]
    fn provider_model_overrides_default() {
        let mut config = AppConfig::default();
        config.providers.insert(
            "gemini".into(),
            ProviderConfig {
                default_model: Some("gemini-2.5-pro".into()),
                ..ProviderConfig::default()
            },
        );
        assert_eq!(config.resolved_model(), "gemini-2.5-pro");
    }

    #[test]
    fn debug_redacts_keys() {
        let config = AppConfig {
            api_key: Some("super-secret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn enums_serialize_snake_case() {
        let json = serde_json::to_string(&PromptStyle::ChainOfThought).unwrap();
        assert_eq!(json, "\"chain_of_thought\"");
        let json = serde_json::to_string(&ContextScope::Query).unwrap();
        assert_eq!(json, "\"query\"");
    }
}
