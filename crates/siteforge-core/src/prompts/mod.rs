//! Prompts - versioned prompt registry and template rendering
//!
//! - `spec`: prompt definitions, identity keys and variant weights
//! - `registry`: snapshot-based registry with A/B variant selection
//! - `bucket`: the deterministic bucketing hash behind variant selection
//! - `render`: `{{placeholder}}` substitution with injection-resistant delimiting
//! - `kv`: hot-patch key-value sources (in-memory and Redis)
//! - `catalog`: prompts bundled with the binary

pub mod bucket;
pub mod catalog;
mod error;
pub mod kv;
pub mod registry;
pub mod render;
pub mod spec;

pub use error::PromptError;
pub use kv::{KvSource, MemoryKv, RedisKv};
pub use registry::{PromptRegistry, RegistrySnapshot};
pub use render::{
    render_prompt, template_placeholders, validate_template_placeholders, InputValues,
    RenderOptions, RenderedPrompt,
};
pub use spec::{
    GenerationParams, InputContract, OutputContract, OutputFormat, PromptKey, PromptSpec,
    VariantConfig, VariantWeight,
};
