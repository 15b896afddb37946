//! Prompt Registry
//!
//! Holds every registered [`PromptSpec`] and [`VariantConfig`] inside an
//! immutable [`RegistrySnapshot`]. Readers clone the `Arc` of the last
//! committed snapshot and never block on writers for longer than that clone.
//! Writers go through a single write gate, build the next snapshot off to
//! the side and swap it in whole, so a reader sees either all of an update
//! or none of it.

use super::bucket::bucket_for;
use super::error::PromptError;
use super::kv::{self, KvSource};
use super::render::validate_template_placeholders;
use super::spec::{PromptKey, PromptSpec, VariantConfig};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info, warn};

/// A complete, consistent registry state
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    specs: HashMap<PromptKey, Arc<PromptSpec>>,
    variants: HashMap<(String, u32), VariantConfig>,
}

impl RegistrySnapshot {
    /// Empty snapshot
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a spec at its key
    pub fn insert_spec(&mut self, spec: PromptSpec) {
        self.specs.insert(spec.key(), Arc::new(spec));
    }

    /// Insert or replace the variant split for the config's `(id, version)`
    pub fn insert_variants(&mut self, config: VariantConfig) {
        self.variants
            .insert((config.prompt_id().to_string(), config.version()), config);
    }

    /// Exact lookup
    #[must_use]
    pub fn get(&self, key: &PromptKey) -> Option<Arc<PromptSpec>> {
        self.specs.get(key).cloned()
    }

    /// Variant split for `(id, version)`
    #[must_use]
    pub fn variants_for(&self, id: &str, version: u32) -> Option<&VariantConfig> {
        self.variants.get(&(id.to_string(), version))
    }

    /// Number of registered specs
    #[must_use]
    pub fn spec_count(&self) -> usize {
        self.specs.len()
    }

    /// Number of configured variant splits
    #[must_use]
    pub fn variant_config_count(&self) -> usize {
        self.variants.len()
    }
}

/// Process-wide prompt registry, shared by handle
#[derive(Debug, Default)]
pub struct PromptRegistry {
    current: RwLock<Arc<RegistrySnapshot>>,
    write_gate: Mutex<()>,
}

impl PromptRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The last committed snapshot
    #[must_use]
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Apply a batch of mutations and commit them as one snapshot
    pub fn apply<R>(&self, mutate: impl FnOnce(&mut RegistrySnapshot) -> R) -> R {
        let _gate = self.write_gate.lock().unwrap_or_else(|e| e.into_inner());
        let mut next = RegistrySnapshot::clone(&self.snapshot());
        let result = mutate(&mut next);
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(next);
        result
    }

    /// Swap in a whole snapshot, discarding the current state
    pub fn replace(&self, snapshot: RegistrySnapshot) {
        let _gate = self.write_gate.lock().unwrap_or_else(|e| e.into_inner());
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(snapshot);
    }

    /// Insert or overwrite the spec at `(id, version, variant)`; last write wins
    pub fn register(&self, spec: PromptSpec) {
        debug!(key = %spec.key(), "Registering prompt");
        self.apply(|snap| snap.insert_spec(spec));
    }

    /// Exact lookup of the base spec
    #[must_use]
    pub fn resolve(&self, id: &str, version: u32) -> Option<Arc<PromptSpec>> {
        self.resolve_exact(id, version, None)
    }

    /// Exact lookup by full identity
    #[must_use]
    pub fn resolve_exact(
        &self,
        id: &str,
        version: u32,
        variant: Option<&str>,
    ) -> Option<Arc<PromptSpec>> {
        let key = PromptKey {
            id: id.to_string(),
            version,
            variant: variant.map(str::to_string),
        };
        self.snapshot().get(&key)
    }

    /// Highest-versioned base spec for `id`; variants never participate
    #[must_use]
    pub fn resolve_latest(&self, id: &str) -> Option<Arc<PromptSpec>> {
        self.snapshot()
            .specs
            .iter()
            .filter(|(key, _)| key.id == id && key.variant.is_none())
            .max_by_key(|(key, _)| key.version)
            .map(|(_, spec)| spec.clone())
    }

    /// Validate and install a variant split, replacing any prior split
    pub fn configure_variants<I, S>(&self, id: &str, version: u32, weights: I) -> Result<(), PromptError>
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        let config = VariantConfig::new(id, version, weights)?;
        info!(prompt_id = id, version, variants = config.weights().len(), "Configured variants");
        self.apply(|snap| snap.insert_variants(config));
        Ok(())
    }

    /// Deterministically pick a variant for `seed`; `None` when unconfigured
    #[must_use]
    pub fn select_variant(&self, id: &str, version: u32, seed: &str) -> Option<String> {
        let snapshot = self.snapshot();
        let config = snapshot.variants_for(id, version)?;
        config
            .pick(bucket_for(seed, id, version))
            .map(str::to_string)
    }

    /// Selected variant spec, falling back to the base spec
    #[must_use]
    pub fn resolve_variant(&self, id: &str, version: u32, seed: &str) -> Option<Arc<PromptSpec>> {
        let snapshot = self.snapshot();
        let selected = snapshot
            .variants_for(id, version)
            .and_then(|cfg| cfg.pick(bucket_for(seed, id, version)));

        if let Some(variant) = selected {
            if let Some(spec) = snapshot.get(&PromptKey::variant(id, version, variant)) {
                return Some(spec);
            }
            debug!(prompt_id = id, version, variant, "Selected variant not registered, using base");
        }

        snapshot.get(&PromptKey::base(id, version))
    }

    /// Sorted keys of every registered spec
    #[must_use]
    pub fn list(&self) -> Vec<PromptKey> {
        let mut keys: Vec<PromptKey> = self.snapshot().specs.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Undeclared placeholders per spec, only for specs that have any
    #[must_use]
    pub fn validate_all(&self) -> Vec<(PromptKey, Vec<String>)> {
        let snapshot = self.snapshot();
        let mut findings: Vec<(PromptKey, Vec<String>)> = snapshot
            .specs
            .iter()
            .filter_map(|(key, spec)| {
                let undeclared = validate_template_placeholders(spec);
                (!undeclared.is_empty()).then(|| (key.clone(), undeclared))
            })
            .collect();
        findings.sort_by(|a, b| a.0.cmp(&b.0));
        findings
    }

    /// Remove every spec and variant configuration
    pub fn clear(&self) {
        self.replace(RegistrySnapshot::new());
    }

    /// Hot-reload prompts and variant splits from a key-value source
    ///
    /// Malformed entries are logged and skipped. Everything that parses is
    /// committed in a single snapshot. Returns the number of entries loaded.
    pub async fn load_from_kv(
        &self,
        store: &dyn KvSource,
        id_filter: Option<&str>,
    ) -> Result<usize, PromptError> {
        let wanted = |id: &str| id_filter.is_none_or(|f| f == id);

        let mut specs = Vec::new();
        let mut skipped = 0usize;
        for key in store.list_keys(kv::PROMPT_PREFIX).await? {
            let Some(parsed) = kv::parse_prompt_key(&key) else {
                warn!(key = %key, "Skipping hot-patch entry with unparseable key");
                skipped += 1;
                continue;
            };
            if !wanted(&parsed.id) {
                continue;
            }
            let Some(raw) = fetch(store, &key, &mut skipped).await else {
                continue;
            };
            match kv::decode_spec(&key, &parsed, &raw) {
                Ok(spec) => specs.push(spec),
                Err(e) => {
                    warn!(error = %e, "Skipping malformed prompt entry");
                    skipped += 1;
                }
            }
        }

        let mut configs = Vec::new();
        for key in store.list_keys(kv::VARIANT_CONFIG_PREFIX).await? {
            let Some((id, version)) = kv::parse_variant_config_key(&key) else {
                warn!(key = %key, "Skipping variant config with unparseable key");
                skipped += 1;
                continue;
            };
            if !wanted(&id) {
                continue;
            }
            let Some(raw) = fetch(store, &key, &mut skipped).await else {
                continue;
            };
            match kv::decode_variant_config(&key, &id, version, &raw) {
                Ok(config) => configs.push(config),
                Err(e) => {
                    warn!(error = %e, "Skipping malformed variant config entry");
                    skipped += 1;
                }
            }
        }

        let loaded = specs.len() + configs.len();
        self.apply(|snap| {
            for spec in specs {
                snap.insert_spec(spec);
            }
            for config in configs {
                snap.insert_variants(config);
            }
        });

        info!(loaded, skipped, filter = ?id_filter, "Hot-patch load complete");
        Ok(loaded)
    }
}

/// Read one entry; a key that vanished since listing yields `None`,
/// a read failure is logged and counted as skipped
async fn fetch(store: &dyn KvSource, key: &str, skipped: &mut usize) -> Option<String> {
    match store.get(key).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(key = %key, error = %e, "Failed to read hot-patch entry");
            *skipped += 1;
            None
        }
    }
}
