//! SiteForge Core - Research and Generation Orchestration
//!
//! This crate provides the orchestration core of SiteForge:
//! - Prompts: versioned prompt registry, A/B variant selection, template
//!   rendering and hot-patching from a key-value store
//! - Observability: timing, input hashing and outcome logging for model calls
//! - Fusion: merging research sources into a confidence-annotated profile
//! - Workflow: the durable, step-based research and generation pipeline
//! - Utils: retry with exponential backoff

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod event_bus;
pub mod fusion;
pub mod observability;
pub mod prompts;
pub mod utils;
pub mod workflow;

pub use error::{format_error_for_cli, Error, Result, UserFriendlyError};
pub use event_bus::{EventBus, PipelineEvent};
pub use fusion::{
    BusinessProfile, Conf, ConfidenceBand, ConfidenceSummary, FusionEngine, FusionInput,
    FusionOutput, PlacesResult, Provenance, ResearchBundle, SourceKind, SourceRef, UiPolicy,
    UserInputs,
};
pub use observability::{CallObserver, CallOutcome, CallRecord, CallSink, MemoryCallSink};
pub use prompts::{
    render_prompt, validate_template_placeholders, KvSource, MemoryKv, PromptError, PromptKey,
    PromptRegistry, PromptSpec, RedisKv, RenderOptions, RenderedPrompt, VariantConfig,
};
pub use utils::{retry_with_backoff, RetryConfig, RetryError};
pub use workflow::{
    ArtifactKey, ArtifactStore, BuildOutcome, FsArtifactStore, FsJournal, MemoryArtifactStore,
    MemoryJournal, MemorySiteRecords, PipelineConfig, PlacesLookup, RedisJournal, RunStatus,
    SiteBuildRequest, SitePipeline, SiteRecords, StaticPlacesLookup, StepJournal,
};
