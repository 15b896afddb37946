//! `siteforge prompts`

use crate::app::init::{builtin_registry, prompt_store};
use crate::app::AppConfig;
use anyhow::Context;
use clap::Subcommand;
use siteforge_core::prompts::catalog::{builtin_prompts, builtin_variant_configs};
use siteforge_core::prompts::kv::{encode_spec, encode_variant_config};
use siteforge_core::{KvSource, PromptRegistry};

#[derive(Subcommand, Debug)]
pub enum PromptsCommand {
    /// List bundled prompts
    List,
    /// Check every template for undeclared placeholders
    Lint,
    /// Load hot-patches from Redis on top of the bundled prompts and lint the result
    Sync {
        /// Only load entries for this prompt id
        #[arg(long)]
        id: Option<String>,
    },
    /// Write the bundled prompts and variant splits to Redis
    Export {
        /// Only export this prompt id
        #[arg(long)]
        id: Option<String>,
    },
}

pub async fn run(cmd: PromptsCommand, config: &AppConfig) -> anyhow::Result<()> {
    match cmd {
        PromptsCommand::List => {
            print_registry(&builtin_registry()?);
            Ok(())
        }
        PromptsCommand::Lint => lint(&builtin_registry()?),
        PromptsCommand::Sync { id } => {
            let registry = builtin_registry()?;
            let store = prompt_store(config)?;
            let loaded = registry
                .load_from_kv(&store, id.as_deref())
                .await
                .context("Failed to load prompt hot-patches")?;
            println!("🔄 Loaded {loaded} hot-patch entries\n");
            print_registry(&registry);
            lint(&registry)
        }
        PromptsCommand::Export { id } => export(config, id.as_deref()).await,
    }
}

fn print_registry(registry: &PromptRegistry) {
    let snapshot = registry.snapshot();
    for key in registry.list() {
        let Some(spec) = snapshot.get(&key) else {
            continue;
        };
        let models = if spec.models.is_empty() {
            "default model".to_string()
        } else {
            spec.models.join(", ")
        };
        println!(
            "{:<32} {:<6} {models:<24} {}",
            key.to_string(),
            spec.output.format.as_str(),
            spec.description
        );
    }
}

fn lint(registry: &PromptRegistry) -> anyhow::Result<()> {
    let findings = registry.validate_all();
    if findings.is_empty() {
        println!("✅ All prompt templates declare their placeholders");
        return Ok(());
    }
    for (key, undeclared) in &findings {
        println!("❌ {key}: undeclared {}", undeclared.join(", "));
    }
    anyhow::bail!("{} prompt(s) reference undeclared inputs", findings.len())
}

async fn export(config: &AppConfig, id: Option<&str>) -> anyhow::Result<()> {
    let store = prompt_store(config)?;
    let wanted = |prompt_id: &str| id.is_none_or(|f| f == prompt_id);
    let mut written = 0usize;

    for spec in builtin_prompts().iter().filter(|s| wanted(&s.id)) {
        let (key, value) = encode_spec(spec)?;
        store.put(&key, &value).await?;
        println!("  ⬆️  {key}");
        written += 1;
    }
    for variants in builtin_variant_configs()?.iter().filter(|c| wanted(c.prompt_id())) {
        let (key, value) = encode_variant_config(variants)?;
        store.put(&key, &value).await?;
        println!("  ⬆️  {key}");
        written += 1;
    }

    println!("\n✅ Exported {written} entries");
    Ok(())
}
