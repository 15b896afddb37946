//! Step Journal
//!
//! Durable record of completed step outputs and step failures per run.
//! A step whose output is journaled is replayed from here instead of
//! re-executing, which makes re-running a run id idempotent.

use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// A step that failed permanently
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepFailure {
    /// Step name
    pub step: String,
    /// Error description
    pub error: String,
    /// Attempts made
    pub attempts: u32,
    /// When the step gave up
    pub failed_at: DateTime<Utc>,
}

/// Storage for step outputs and failures
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StepJournal: Send + Sync {
    /// Journaled output of `step`, if it completed
    async fn load(&self, run_id: Uuid, step: &str) -> Result<Option<Value>>;

    /// Journal the output of `step`
    async fn save(&self, run_id: Uuid, step: &str, output: &Value) -> Result<()>;

    /// Record a permanent step failure
    async fn record_failure(&self, run_id: Uuid, failure: StepFailure) -> Result<()>;

    /// Every failure recorded for the run, oldest first
    async fn failures(&self, run_id: Uuid) -> Result<Vec<StepFailure>>;
}

#[derive(Debug, Default)]
struct RunEntries {
    outputs: HashMap<String, Value>,
    failures: Vec<StepFailure>,
}

/// In-memory journal
#[derive(Debug, Default)]
pub struct MemoryJournal {
    runs: RwLock<HashMap<Uuid, RunEntries>>,
}

impl MemoryJournal {
    /// Empty journal
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of completed steps for the run
    pub async fn completed_steps(&self, run_id: Uuid) -> Vec<String> {
        let runs = self.runs.read().await;
        let mut steps: Vec<String> = runs
            .get(&run_id)
            .map(|r| r.outputs.keys().cloned().collect())
            .unwrap_or_default();
        steps.sort();
        steps
    }
}

#[async_trait]
impl StepJournal for MemoryJournal {
    async fn load(&self, run_id: Uuid, step: &str) -> Result<Option<Value>> {
        let runs = self.runs.read().await;
        Ok(runs.get(&run_id).and_then(|r| r.outputs.get(step).cloned()))
    }

    async fn save(&self, run_id: Uuid, step: &str, output: &Value) -> Result<()> {
        let mut runs = self.runs.write().await;
        runs.entry(run_id)
            .or_default()
            .outputs
            .insert(step.to_string(), output.clone());
        Ok(())
    }

    async fn record_failure(&self, run_id: Uuid, failure: StepFailure) -> Result<()> {
        let mut runs = self.runs.write().await;
        runs.entry(run_id).or_default().failures.push(failure);
        Ok(())
    }

    async fn failures(&self, run_id: Uuid) -> Result<Vec<StepFailure>> {
        let runs = self.runs.read().await;
        Ok(runs
            .get(&run_id)
            .map(|r| r.failures.clone())
            .unwrap_or_default())
    }
}

/// File-backed journal under a data directory
///
/// Each run gets a directory `{root}/{run_id}` holding one `{step}.json`
/// per completed step and an append-only `failures.jsonl`.
#[derive(Debug, Clone)]
pub struct FsJournal {
    root: PathBuf,
}

impl FsJournal {
    /// Journal rooted at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn run_dir(&self, run_id: Uuid) -> PathBuf {
        self.root.join(run_id.to_string())
    }

    fn step_path(&self, run_id: Uuid, step: &str) -> Result<PathBuf> {
        if step.is_empty() || !step.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return Err(Error::Configuration(format!("invalid step name: {step}")));
        }
        Ok(self.run_dir(run_id).join(format!("{step}.json")))
    }
}

fn io_error(action: &str, path: &Path, e: std::io::Error) -> Error {
    Error::Storage(format!("{action} {}: {e}", path.display()))
}

#[async_trait]
impl StepJournal for FsJournal {
    async fn load(&self, run_id: Uuid, step: &str) -> Result<Option<Value>> {
        let path = self.step_path(run_id, step)?;
        match tokio::fs::read(&path).await {
            Ok(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error("read", &path, e)),
        }
    }

    async fn save(&self, run_id: Uuid, step: &str, output: &Value) -> Result<()> {
        let path = self.step_path(run_id, step)?;
        let dir = self.run_dir(run_id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_error("create", &dir, e))?;
        // write then rename so a crash never leaves a half-written entry
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec(output)?)
            .await
            .map_err(|e| io_error("write", &tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| io_error("rename", &path, e))?;
        debug!(%run_id, step, "Journaled step output");
        Ok(())
    }

    async fn record_failure(&self, run_id: Uuid, failure: StepFailure) -> Result<()> {
        let dir = self.run_dir(run_id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_error("create", &dir, e))?;
        let path = dir.join("failures.jsonl");
        let mut line = serde_json::to_vec(&failure)?;
        line.push(b'\n');
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| io_error("open", &path, e))?;
        file.write_all(&line).await.map_err(|e| io_error("append", &path, e))?;
        file.flush().await.map_err(|e| io_error("flush", &path, e))?;
        Ok(())
    }

    async fn failures(&self, run_id: Uuid) -> Result<Vec<StepFailure>> {
        let path = self.run_dir(run_id).join("failures.jsonl");
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error("read", &path, e)),
        };
        raw.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(Error::from))
            .collect()
    }
}

/// Redis-backed journal
///
/// Outputs live in a hash `{prefix}{run_id}` keyed by step name; failures
/// in a list `{prefix}{run_id}:failures`. Both expire after the TTL.
pub struct RedisJournal {
    client: redis::Client,
    prefix: String,
    ttl_seconds: u64,
}

impl RedisJournal {
    /// Journal with the default prefix and a 7 day TTL
    pub fn new(redis_url: &str) -> Result<Self> {
        Self::with_options(redis_url, "siteforge:journal:", 7 * 24 * 3600)
    }

    /// Journal with a custom key prefix and TTL
    pub fn with_options(redis_url: &str, prefix: &str, ttl_seconds: u64) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| Error::Configuration(format!("invalid redis url: {}", e)))?;
        Ok(Self {
            client,
            prefix: prefix.to_string(),
            ttl_seconds,
        })
    }

    fn outputs_key(&self, run_id: Uuid) -> String {
        format!("{}{}", self.prefix, run_id)
    }

    fn failures_key(&self, run_id: Uuid) -> String {
        format!("{}{}:failures", self.prefix, run_id)
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| Error::Storage(format!("Redis connection failed: {}", e)))
    }

    async fn touch(&self, conn: &mut redis::aio::MultiplexedConnection, key: &str) -> Result<()> {
        redis::cmd("EXPIRE")
            .arg(key)
            .arg(self.ttl_seconds)
            .query_async::<()>(conn)
            .await
            .map_err(|e| Error::Storage(format!("Redis EXPIRE failed: {}", e)))
    }
}

#[async_trait]
impl StepJournal for RedisJournal {
    async fn load(&self, run_id: Uuid, step: &str) -> Result<Option<Value>> {
        let mut conn = self.get_connection().await?;
        let raw: Option<String> = redis::cmd("HGET")
            .arg(self.outputs_key(run_id))
            .arg(step)
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Storage(format!("Redis HGET failed: {}", e)))?;

        raw.map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(Error::from)
    }

    async fn save(&self, run_id: Uuid, step: &str, output: &Value) -> Result<()> {
        let mut conn = self.get_connection().await?;
        let key = self.outputs_key(run_id);
        redis::cmd("HSET")
            .arg(&key)
            .arg(step)
            .arg(output.to_string())
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| Error::Storage(format!("Redis HSET failed: {}", e)))?;
        self.touch(&mut conn, &key).await?;

        debug!(run_id = %run_id, step, "Step output journaled to Redis");
        Ok(())
    }

    async fn record_failure(&self, run_id: Uuid, failure: StepFailure) -> Result<()> {
        let mut conn = self.get_connection().await?;
        let key = self.failures_key(run_id);
        let json = serde_json::to_string(&failure)?;
        redis::cmd("RPUSH")
            .arg(&key)
            .arg(json)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| Error::Storage(format!("Redis RPUSH failed: {}", e)))?;
        self.touch(&mut conn, &key).await
    }

    async fn failures(&self, run_id: Uuid) -> Result<Vec<StepFailure>> {
        let mut conn = self.get_connection().await?;
        let raw: Vec<String> = redis::cmd("LRANGE")
            .arg(self.failures_key(run_id))
            .arg(0)
            .arg(-1)
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Storage(format!("Redis LRANGE failed: {}", e)))?;

        raw.iter()
            .map(|json| serde_json::from_str(json).map_err(Error::from))
            .collect()
    }
}
