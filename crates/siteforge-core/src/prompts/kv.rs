//! Hot-patch key-value sources
//!
//! Namespace:
//! - `prompt:{id}@{version}` or `prompt:{id}@{version}:{variant}` holds a
//!   JSON [`PromptSpec`]
//! - `variant_config:{id}@{version}` holds a JSON [`VariantConfig`]
//!
//! Keys under any other prefix are ignored by the loader.

use super::error::PromptError;
use super::spec::{PromptKey, PromptSpec, VariantConfig};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Prefix of prompt entries
pub const PROMPT_PREFIX: &str = "prompt:";

/// Prefix of variant configuration entries
pub const VARIANT_CONFIG_PREFIX: &str = "variant_config:";

/// Key-value backend holding hot-patch entries
#[async_trait]
pub trait KvSource: Send + Sync {
    /// Every key starting with `prefix`
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, PromptError>;

    /// Raw value at `key`
    async fn get(&self, key: &str) -> Result<Option<String>, PromptError>;

    /// Write `value` at `key` (used to publish hot-patches)
    async fn put(&self, key: &str, value: &str) -> Result<(), PromptError>;
}

/// Key for a prompt entry
#[must_use]
pub fn prompt_key(key: &PromptKey) -> String {
    format!("{PROMPT_PREFIX}{key}")
}

/// Key for a variant configuration entry
#[must_use]
pub fn variant_config_key(prompt_id: &str, version: u32) -> String {
    format!("{VARIANT_CONFIG_PREFIX}{prompt_id}@{version}")
}

fn split_id_version(rest: &str) -> Option<(&str, &str)> {
    let (id, tail) = rest.split_once('@')?;
    (!id.is_empty()).then_some((id, tail))
}

/// Parse `prompt:{id}@{version}[:{variant}]`
#[must_use]
pub fn parse_prompt_key(key: &str) -> Option<PromptKey> {
    let (id, tail) = split_id_version(key.strip_prefix(PROMPT_PREFIX)?)?;
    let (version, variant) = match tail.split_once(':') {
        Some((v, variant)) if !variant.is_empty() => (v, Some(variant.to_string())),
        Some(_) => return None,
        None => (tail, None),
    };
    Some(PromptKey {
        id: id.to_string(),
        version: version.parse().ok()?,
        variant,
    })
}

/// Parse `variant_config:{id}@{version}`
#[must_use]
pub fn parse_variant_config_key(key: &str) -> Option<(String, u32)> {
    let (id, version) = split_id_version(key.strip_prefix(VARIANT_CONFIG_PREFIX)?)?;
    Some((id.to_string(), version.parse().ok()?))
}

/// Decode a prompt entry, requiring the body to match its key
pub fn decode_spec(key: &str, expected: &PromptKey, raw: &str) -> Result<PromptSpec, PromptError> {
    let spec: PromptSpec = serde_json::from_str(raw).map_err(|e| PromptError::MalformedEntry {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    if &spec.key() != expected {
        return Err(PromptError::MalformedEntry {
            key: key.to_string(),
            reason: format!("body describes {} but key names {}", spec.key(), expected),
        });
    }
    Ok(spec)
}

/// Decode a variant configuration entry, requiring the body to match its key
pub fn decode_variant_config(
    key: &str,
    prompt_id: &str,
    version: u32,
    raw: &str,
) -> Result<VariantConfig, PromptError> {
    let config: VariantConfig =
        serde_json::from_str(raw).map_err(|e| PromptError::MalformedEntry {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
    if config.prompt_id() != prompt_id || config.version() != version {
        return Err(PromptError::MalformedEntry {
            key: key.to_string(),
            reason: format!(
                "body describes {}@{}",
                config.prompt_id(),
                config.version()
            ),
        });
    }
    Ok(config)
}

/// Hot-patch representation of a spec: `(key, json)`
pub fn encode_spec(spec: &PromptSpec) -> Result<(String, String), PromptError> {
    let body = serde_json::to_string(spec).map_err(|e| PromptError::Store(e.to_string()))?;
    Ok((prompt_key(&spec.key()), body))
}

/// Hot-patch representation of a variant configuration: `(key, json)`
pub fn encode_variant_config(config: &VariantConfig) -> Result<(String, String), PromptError> {
    let body = serde_json::to_string(config).map_err(|e| PromptError::Store(e.to_string()))?;
    Ok((variant_config_key(config.prompt_id(), config.version()), body))
}

/// In-memory key-value source (tests and local runs)
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryKv {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvSource for MemoryKv {
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, PromptError> {
        Ok(self
            .entries
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, PromptError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), PromptError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Redis-backed key-value source
///
/// An optional namespace is prepended to every key so the hot-patch entries
/// can share a Redis database with other data.
pub struct RedisKv {
    client: redis::Client,
    namespace: String,
}

impl RedisKv {
    /// Connect to `redis_url` with no namespace
    pub fn new(redis_url: &str) -> Result<Self, PromptError> {
        Self::with_namespace(redis_url, "")
    }

    /// Connect to `redis_url`, prefixing every key with `namespace`
    pub fn with_namespace(redis_url: &str, namespace: &str) -> Result<Self, PromptError> {
        let client = redis::Client::open(redis_url).map_err(|e| PromptError::Store(e.to_string()))?;
        Ok(Self {
            client,
            namespace: namespace.to_string(),
        })
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.namespace, key)
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection, PromptError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| PromptError::Store(format!("Redis connection failed: {}", e)))
    }
}

#[async_trait]
impl KvSource for RedisKv {
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, PromptError> {
        let mut conn = self.get_connection().await?;
        let pattern = format!("{}*", self.full_key(prefix));
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(200)
                .query_async(&mut conn)
                .await
                .map_err(|e| PromptError::Store(format!("Redis SCAN failed: {}", e)))?;

            keys.extend(
                batch
                    .into_iter()
                    .filter_map(|k| k.strip_prefix(&self.namespace).map(str::to_string)),
            );
            if next == 0 {
                break;
            }
            cursor = next;
        }

        keys.sort();
        keys.dedup();
        debug!(prefix = %prefix, count = keys.len(), "Listed hot-patch keys");
        Ok(keys)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, PromptError> {
        let mut conn = self.get_connection().await?;
        redis::cmd("GET")
            .arg(self.full_key(key))
            .query_async(&mut conn)
            .await
            .map_err(|e| PromptError::Store(format!("Redis GET failed: {}", e)))
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), PromptError> {
        let mut conn = self.get_connection().await?;
        redis::cmd("SET")
            .arg(self.full_key(key))
            .arg(value)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| PromptError::Store(format!("Redis SET failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prompt_keys() {
        assert_eq!(
            parse_prompt_key("prompt:website_html@2"),
            Some(PromptKey::base("website_html", 2))
        );
        assert_eq!(
            parse_prompt_key("prompt:website_html@2:bold"),
            Some(PromptKey::variant("website_html", 2, "bold"))
        );
        assert_eq!(parse_prompt_key("prompt:website_html"), None);
        assert_eq!(parse_prompt_key("prompt:@2"), None);
        assert_eq!(parse_prompt_key("prompt:x@two"), None);
        assert_eq!(parse_prompt_key("prompt:x@2:"), None);
        assert_eq!(parse_prompt_key("session:x@2"), None);
    }

    #[test]
    fn test_parse_variant_config_key() {
        assert_eq!(
            parse_variant_config_key("variant_config:site_copy@3"),
            Some(("site_copy".to_string(), 3))
        );
        assert_eq!(parse_variant_config_key("variant_config:site_copy"), None);
    }

    #[test]
    fn test_decode_spec_rejects_mismatched_body() {
        let spec = PromptSpec::new("a", 1).with_templates("", "hi");
        let (_, body) = encode_spec(&spec).unwrap();
        let err = decode_spec("prompt:b@1", &PromptKey::base("b", 1), &body).unwrap_err();
        assert!(matches!(err, PromptError::MalformedEntry { .. }));
    }

    #[tokio::test]
    async fn test_memory_kv_prefix_listing() {
        let kv = MemoryKv::new();
        kv.put("prompt:a@1", "{}").await.unwrap();
        kv.put("variant_config:a@1", "{}").await.unwrap();
        kv.put("session:abc", "{}").await.unwrap();

        assert_eq!(kv.list_keys(PROMPT_PREFIX).await.unwrap(), vec!["prompt:a@1"]);
        assert_eq!(kv.get("session:abc").await.unwrap().as_deref(), Some("{}"));
        assert!(kv.get("missing").await.unwrap().is_none());
    }

    // Run with: cargo test --features redis-tests
    #[cfg(feature = "redis-tests")]
    #[tokio::test]
    async fn test_redis_kv_roundtrip() {
        let kv = RedisKv::with_namespace("redis://127.0.0.1:6379", "siteforge-test:").unwrap();
        kv.put("prompt:redis_smoke@1", "{}").await.unwrap();
        let keys = kv.list_keys("prompt:redis_smoke").await.unwrap();
        assert_eq!(keys, vec!["prompt:redis_smoke@1"]);
    }
}
