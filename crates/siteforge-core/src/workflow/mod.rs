//! Workflow - durable site build pipeline
//!
//! - `pipeline`: step sequencing, replay and retry
//! - `journal`: per-run step outputs and failures (in-memory and Redis)
//! - `collaborators`: artifact storage, site status records, places directory
//! - `output`: validation of generated HTML, legal pages and quality reviews
//! - `status`: site lifecycle status

pub mod collaborators;
pub mod journal;
pub mod output;
mod pipeline;
pub mod status;

pub use collaborators::{
    ArtifactKey, ArtifactStore, FsArtifactStore, MemoryArtifactStore, MemorySiteRecords,
    PlacesLookup, SiteRecords, StaticPlacesLookup, StoredArtifact,
};
pub use journal::{FsJournal, MemoryJournal, RedisJournal, StepFailure, StepJournal};
pub use output::{LegalPages, QualityReport};
pub use pipeline::{BuildOutcome, PipelineConfig, SiteBuildRequest, SitePipeline};
pub use status::RunStatus;
