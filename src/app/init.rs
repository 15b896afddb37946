//! Pipeline component initialization

use super::config::{AppConfig, JournalBackend};
use anyhow::{Context, Result};
use siteforge_core::prompts::catalog::register_builtin;
use siteforge_core::{
    FsArtifactStore, FsJournal, MemoryJournal, MemorySiteRecords, PromptRegistry, RedisJournal, RedisKv,
    SitePipeline, StaticPlacesLookup, StepJournal,
};
use siteforge_llm::OpenAiCompatProvider;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Registry holding the bundled prompts
pub fn builtin_registry() -> Result<PromptRegistry> {
    let registry = PromptRegistry::new();
    let count = register_builtin(&registry).context("Bundled prompts are invalid")?;
    info!(count, "Registered bundled prompts");
    Ok(registry)
}

/// Key-value source for prompt hot-patches
pub fn prompt_store(config: &AppConfig) -> Result<RedisKv> {
    let store = match config.prompts.namespace.as_deref() {
        Some(ns) => RedisKv::with_namespace(&config.redis.url, ns),
        None => RedisKv::new(&config.redis.url),
    };
    store.context("Failed to open Redis prompt store")
}

/// Bundled prompts plus hot-patches, when enabled
///
/// An unreachable store is logged and the bundled prompts are used as-is.
pub async fn init_registry(config: &AppConfig) -> Result<Arc<PromptRegistry>> {
    let registry = builtin_registry()?;
    if config.prompts.hot_patch {
        let store = prompt_store(config)?;
        match registry.load_from_kv(&store, None).await {
            Ok(loaded) => info!(loaded, "Applied prompt hot-patches"),
            Err(e) => warn!(error = %e, "Prompt hot-patch load failed, using bundled prompts"),
        }
    }
    Ok(Arc::new(registry))
}

fn init_journal(config: &AppConfig) -> Result<Arc<dyn StepJournal>> {
    Ok(match config.pipeline.journal {
        JournalBackend::Memory => Arc::new(MemoryJournal::new()),
        JournalBackend::File => {
            let dir = config.storage.journal_dir();
            info!(dir = %dir.display(), "Using file step journal");
            Arc::new(FsJournal::new(dir))
        }
        JournalBackend::Redis => {
            let journal = RedisJournal::with_options(
                &config.redis.url,
                &config.redis.journal_prefix,
                config.redis.journal_ttl_secs,
            )
            .context("Failed to open Redis step journal")?;
            info!(prefix = %config.redis.journal_prefix, "Using Redis step journal");
            Arc::new(journal)
        }
    })
}

async fn init_places(places_file: Option<&Path>) -> Result<StaticPlacesLookup> {
    let Some(path) = places_file else {
        return Ok(StaticPlacesLookup::new());
    };
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read places file {}", path.display()))?;
    let places = StaticPlacesLookup::from_json(&raw)
        .with_context(|| format!("Invalid places file {}", path.display()))?;
    info!(count = places.len(), "Loaded places directory");
    Ok(places)
}

/// Assemble a pipeline from configuration
pub async fn init_pipeline(config: &AppConfig, places_file: Option<&Path>) -> Result<SitePipeline> {
    let llm = OpenAiCompatProvider::new(config.llm.provider_config())
        .context("Failed to initialize model provider")?;
    let registry = init_registry(config).await?;
    let artifacts_dir = config.storage.artifacts_dir();
    tokio::fs::create_dir_all(&artifacts_dir)
        .await
        .with_context(|| format!("Failed to create {}", artifacts_dir.display()))?;
    info!(dir = %artifacts_dir.display(), "Artifact store initialized");

    Ok(SitePipeline::new(
        Arc::new(llm),
        registry,
        config.pipeline.to_pipeline_config(&config.llm.model),
    )
    .with_places(Arc::new(init_places(places_file).await?))
    .with_artifacts(Arc::new(FsArtifactStore::new(artifacts_dir)))
    .with_records(Arc::new(MemorySiteRecords::new()))
    .with_journal(init_journal(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_places_file_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("places.json");
        tokio::fs::write(&path, r#"[{"place_id":"p-1","name":"Harbor Dental"}]"#)
            .await
            .unwrap();

        let places = init_places(Some(&path)).await.unwrap();
        assert_eq!(places.len(), 1);
        assert!(init_places(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_places_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = init_places(Some(&dir.path().join("absent.json"))).await.unwrap_err();
        assert!(err.to_string().contains("absent.json"));
    }

    #[test]
    fn test_builtin_registry_lints_clean() {
        let registry = builtin_registry().unwrap();
        assert!(registry.validate_all().is_empty());
        assert!(!registry.list().is_empty());
    }
}
