//! Configuration loading
//!
//! Handles loading configuration from embedded defaults, files, and environment.

use super::config::AppConfig;
use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};

/// Embedded default configuration (compiled into binary)
pub const DEFAULT_CONFIG: &str = include_str!("../../config/default.toml");

/// Load configuration from files and environment
pub fn load_config() -> Result<AppConfig> {
    let env = std::env::var("SITEFORGE_ENV").unwrap_or_else(|_| "development".to_string());
    let config = Config::builder()
        // 1. Embedded defaults (always available)
        .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
        // 2. External overrides (optional)
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{env}")).required(false))
        .add_source(File::with_name("config/local").required(false))
        // 3. Environment variables (highest priority)
        // prefix_separator("_") makes SITEFORGE_LLM__MODEL map to llm.model
        .add_source(
            Environment::with_prefix("SITEFORGE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::config::JournalBackend;

    #[test]
    fn test_embedded_defaults_deserialize() {
        let config: AppConfig = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.pipeline.max_attempts, 3);
        assert_eq!(config.pipeline.journal, JournalBackend::File);
        assert!(config.pipeline.journal.is_durable());
        assert!(config.pipeline.strip_unresolved);
        assert!(config.pipeline.safe_delimit);
        assert!(config.pipeline.prompt_versions.is_empty());
        assert!(!config.prompts.hot_patch);
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let overrides = r#"
            [pipeline]
            journal = "redis"
            max_attempts = 5

            [pipeline.prompt_versions]
            website_html = 2
        "#;
        let config: AppConfig = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::from_str(overrides, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.pipeline.journal, JournalBackend::Redis);
        let pipeline = config.pipeline.to_pipeline_config(&config.llm.model);
        assert_eq!(pipeline.retry.max_attempts, 5);
        assert_eq!(pipeline.prompt_versions.get("website_html"), Some(&2));
        assert_eq!(pipeline.default_model, "gpt-4o-mini");
    }

    #[test]
    fn test_api_key_not_written_back() {
        let mut config: AppConfig = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        config.llm.api_key = Some("sk-secret".into());

        let rendered = config.to_toml().unwrap();
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("[pipeline]"));
    }
}
