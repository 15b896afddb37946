//! Application configuration types

use serde::{Deserialize, Serialize};
use siteforge_core::{PipelineConfig, RetryConfig};
use siteforge_llm::OpenAiCompatConfig;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub redis: RedisConfig,
    pub pipeline: PipelineSettings,
    pub storage: StorageConfig,
    #[serde(default)]
    pub prompts: PromptsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Model endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub base_url: String,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    120
}

impl LlmConfig {
    pub fn provider_config(&self) -> OpenAiCompatConfig {
        let mut config = OpenAiCompatConfig::new()
            .with_base_url(&self.base_url)
            .with_model(&self.model)
            .with_timeout(Duration::from_secs(self.timeout_secs));
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.is_empty()) {
            config = config.with_api_key(key);
        }
        config
    }
}

/// Redis connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_journal_prefix")]
    pub journal_prefix: String,
    #[serde(default = "default_journal_ttl")]
    pub journal_ttl_secs: u64,
}

fn default_journal_prefix() -> String {
    "siteforge:journal:".to_string()
}

fn default_journal_ttl() -> u64 {
    7 * 24 * 3600
}

/// Where step outputs are journaled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalBackend {
    Memory,
    #[default]
    File,
    Redis,
}

impl JournalBackend {
    /// Whether journaled steps outlive the process
    pub fn is_durable(self) -> bool {
        !matches!(self, JournalBackend::Memory)
    }
}

/// Pipeline retry and rendering settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    #[serde(default = "default_true")]
    pub safe_delimit: bool,
    /// Drop placeholders of absent optional inputs
    #[serde(default = "default_true")]
    pub strip_unresolved: bool,
    #[serde(default)]
    pub journal: JournalBackend,
    /// Prompt id to pinned version
    #[serde(default)]
    pub prompt_versions: BTreeMap<String, u32>,
}

fn default_true() -> bool {
    true
}

impl PipelineSettings {
    pub fn to_pipeline_config(&self, default_model: &str) -> PipelineConfig {
        let retry = RetryConfig::new()
            .with_max_attempts(self.max_attempts)
            .with_initial_delay(Duration::from_millis(self.initial_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms));
        let mut config = PipelineConfig::default()
            .with_retry(retry)
            .with_default_model(default_model);
        config.safe_delimit = self.safe_delimit;
        config.strip_unresolved = self.strip_unresolved;
        config.prompt_versions = self.prompt_versions.clone();
        config
    }
}

/// Local storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

impl StorageConfig {
    pub fn artifacts_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("artifacts")
    }

    pub fn journal_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("journal")
    }
}

/// Prompt hot-patch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptsConfig {
    /// Load prompt overrides from Redis before each run
    #[serde(default)]
    pub hot_patch: bool,
    #[serde(default)]
    pub namespace: Option<String>,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            hot_patch: false,
            namespace: Some("siteforge:".to_string()),
        }
    }
}

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub filter: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "siteforge=info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
