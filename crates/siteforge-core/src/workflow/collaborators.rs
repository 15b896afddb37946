//! External collaborators of the pipeline
//!
//! Artifact storage, site status records and the places directory are
//! specified only at their interface. In-memory and filesystem versions
//! are provided for local runs and tests.

use crate::error::{Error, Result};
use crate::fusion::PlacesResult;
use crate::workflow::RunStatus;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

/// Deterministic artifact location: `{slug}/{build_version}/{name}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactKey {
    /// Site slug
    pub slug: String,
    /// Build version
    pub build_version: u32,
    /// File name
    pub name: String,
}

impl ArtifactKey {
    /// Key for `name` in a build
    #[must_use]
    pub fn new(slug: impl Into<String>, build_version: u32, name: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            build_version,
            name: name.into(),
        }
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.slug, self.build_version, self.name)
    }
}

/// A stored artifact
#[derive(Debug, Clone, PartialEq)]
pub struct StoredArtifact {
    /// MIME type
    pub content_type: String,
    /// Body
    pub body: Vec<u8>,
}

/// Where build artifacts go; writes overwrite
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Write `body` at `key`, replacing any previous content
    async fn put(&self, key: &ArtifactKey, content_type: &str, body: Vec<u8>) -> Result<()>;

    /// Read the artifact at `key`
    async fn get(&self, key: &ArtifactKey) -> Result<Option<StoredArtifact>>;
}

/// In-memory artifact store
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    artifacts: RwLock<BTreeMap<ArtifactKey, StoredArtifact>>,
}

impl MemoryArtifactStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored key, sorted
    pub async fn keys(&self) -> Vec<ArtifactKey> {
        self.artifacts.read().await.keys().cloned().collect()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn put(&self, key: &ArtifactKey, content_type: &str, body: Vec<u8>) -> Result<()> {
        self.artifacts.write().await.insert(
            key.clone(),
            StoredArtifact {
                content_type: content_type.to_string(),
                body,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &ArtifactKey) -> Result<Option<StoredArtifact>> {
        Ok(self.artifacts.read().await.get(key).cloned())
    }
}

/// Artifact store writing files under a data directory
///
/// The content type is not persisted; reads infer it from the extension.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Store rooted at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &ArtifactKey) -> Result<PathBuf> {
        let safe = |part: &str| {
            !part.is_empty() && part != "." && part != ".." && !part.contains(['/', '\\'])
        };
        if !safe(&key.slug) || !safe(&key.name) {
            return Err(Error::Configuration(format!("unsafe artifact key: {}", key)));
        }
        Ok(self
            .root
            .join(&key.slug)
            .join(key.build_version.to_string())
            .join(&key.name))
    }
}

fn content_type_for(name: &str) -> &'static str {
    match Path::new(name).extension().and_then(|e| e.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("md") => "text/markdown; charset=utf-8",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn put(&self, key: &ArtifactKey, content_type: &str, body: Vec<u8>) -> Result<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Storage(format!("create {}: {}", parent.display(), e)))?;
        }
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| Error::Storage(format!("write {}: {}", path.display(), e)))?;
        debug!(key = %key, content_type, path = %path.display(), "Artifact written");
        Ok(())
    }

    async fn get(&self, key: &ArtifactKey) -> Result<Option<StoredArtifact>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(body) => Ok(Some(StoredArtifact {
                content_type: content_type_for(&key.name).to_string(),
                body,
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Storage(format!("read {}: {}", path.display(), e))),
        }
    }
}

/// Site status records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SiteRecords: Send + Sync {
    /// Set the status of `slug`
    async fn set_status(&self, slug: &str, status: RunStatus) -> Result<()>;
}

/// In-memory status records that also keep the transition history
#[derive(Debug, Default)]
pub struct MemorySiteRecords {
    history: RwLock<HashMap<String, Vec<RunStatus>>>,
}

impl MemorySiteRecords {
    /// Empty records
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status of `slug`
    pub async fn status(&self, slug: &str) -> Option<RunStatus> {
        self.history
            .read()
            .await
            .get(slug)
            .and_then(|h| h.last().copied())
    }

    /// Every status `slug` has been set to, in order
    pub async fn history(&self, slug: &str) -> Vec<RunStatus> {
        self.history
            .read()
            .await
            .get(slug)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl SiteRecords for MemorySiteRecords {
    async fn set_status(&self, slug: &str, status: RunStatus) -> Result<()> {
        let mut history = self.history.write().await;
        let entries = history.entry(slug.to_string()).or_default();
        if entries.last() != Some(&status) {
            entries.push(status);
        }
        Ok(())
    }
}

/// Places / business directory lookup
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlacesLookup: Send + Sync {
    /// Look up a place; `None` when the directory has no such place
    async fn lookup(&self, place_id: &str) -> Result<Option<PlacesResult>>;
}

/// Directory backed by a fixed map
#[derive(Debug, Default, Clone)]
pub struct StaticPlacesLookup {
    places: HashMap<String, PlacesResult>,
}

impl StaticPlacesLookup {
    /// Empty directory
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a place, keyed by its place id
    #[must_use]
    pub fn with_place(mut self, place: PlacesResult) -> Self {
        self.places.insert(place.place_id.clone(), place);
        self
    }

    /// Parse a JSON array of places
    pub fn from_json(json: &str) -> Result<Self> {
        let places: Vec<PlacesResult> = serde_json::from_str(json)
            .map_err(|e| Error::Configuration(format!("invalid places file: {}", e)))?;
        Ok(places.into_iter().fold(Self::new(), Self::with_place))
    }

    /// Number of known places
    #[must_use]
    pub fn len(&self) -> usize {
        self.places.len()
    }

    /// Whether the directory is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }
}

#[async_trait]
impl PlacesLookup for StaticPlacesLookup {
    async fn lookup(&self, place_id: &str) -> Result<Option<PlacesResult>> {
        Ok(self.places.get(place_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_key_display() {
        let key = ArtifactKey::new("acme-bakery", 3, "index.html");
        assert_eq!(key.to_string(), "acme-bakery/3/index.html");
    }

    #[tokio::test]
    async fn test_memory_store_overwrites() {
        let store = MemoryArtifactStore::new();
        let key = ArtifactKey::new("acme", 1, "index.html");
        store.put(&key, "text/html", b"v1".to_vec()).await.unwrap();
        store.put(&key, "text/html", b"v2".to_vec()).await.unwrap();

        assert_eq!(store.keys().await.len(), 1);
        assert_eq!(store.get(&key).await.unwrap().unwrap().body, b"v2");
    }

    #[tokio::test]
    async fn test_fs_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());
        let key = ArtifactKey::new("acme", 2, "profile.json");

        store.put(&key, "application/json", b"{}".to_vec()).await.unwrap();
        assert!(dir.path().join("acme/2/profile.json").exists());

        let artifact = store.get(&key).await.unwrap().unwrap();
        assert_eq!(artifact.body, b"{}");
        assert_eq!(artifact.content_type, "application/json");
        assert!(store
            .get(&ArtifactKey::new("acme", 2, "missing.html"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_fs_store_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());
        let err = store
            .put(&ArtifactKey::new("..", 1, "x.html"), "text/html", Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(!err.is_transient());

        let err = store
            .get(&ArtifactKey::new("acme", 1, "a/b.html"))
            .await
            .unwrap_err();
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_site_records_history() {
        let records = MemorySiteRecords::new();
        records.set_status("acme", RunStatus::Collecting).await.unwrap();
        records.set_status("acme", RunStatus::Collecting).await.unwrap();
        records.set_status("acme", RunStatus::Generating).await.unwrap();

        assert_eq!(records.status("acme").await, Some(RunStatus::Generating));
        assert_eq!(
            records.history("acme").await,
            vec![RunStatus::Collecting, RunStatus::Generating]
        );
    }

    #[tokio::test]
    async fn test_static_places_from_json() {
        let lookup = StaticPlacesLookup::from_json(
            r#"[{"place_id": "p1", "name": "Acme", "phone": "555-0100"}]"#,
        )
        .unwrap();
        assert_eq!(lookup.len(), 1);
        let place = lookup.lookup("p1").await.unwrap().unwrap();
        assert_eq!(place.phone.as_deref(), Some("555-0100"));
        assert!(lookup.lookup("p2").await.unwrap().is_none());
    }
}
