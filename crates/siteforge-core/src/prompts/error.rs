//! Prompt errors

use thiserror::Error;

/// Errors raised by the registry, renderer and hot-patch loader
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromptError {
    /// Variant weights do not add up to 100
    #[error("variant weights for {prompt_id}@{version} sum to {sum}, expected 100")]
    InvalidVariantWeights {
        /// Prompt id
        prompt_id: String,
        /// Prompt version
        version: u32,
        /// Actual sum of the supplied weights
        sum: u64,
    },

    /// One or more required template inputs are absent or empty
    #[error("missing required inputs for {prompt_id}: {}", keys.join(", "))]
    MissingInputs {
        /// Prompt id being rendered
        prompt_id: String,
        /// Every missing key, in declaration order
        keys: Vec<String>,
    },

    /// A hot-patch entry could not be parsed
    #[error("malformed hot-patch entry '{key}': {reason}")]
    MalformedEntry {
        /// Key-value key
        key: String,
        /// Parse failure
        reason: String,
    },

    /// The key-value backend itself failed
    #[error("key-value store error: {0}")]
    Store(String),
}
