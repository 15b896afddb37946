//! Error types for siteforge-core
//!
//! This module provides the core error type, its transient/permanent
//! classification, and user-friendly error formatting for the CLI.

use crate::prompts::PromptError;
use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Prompt configuration or rendering error
    #[error(transparent)]
    Prompt(#[from] PromptError),

    /// No prompt registered for the requested id/version
    #[error("prompt not found: {id}@{version}")]
    PromptNotFound {
        /// Prompt id
        id: String,
        /// Requested version
        version: u32,
    },

    /// LLM provider error
    #[error("llm error: {0}")]
    Llm(#[from] siteforge_llm::Error),

    /// A research document failed its schema checks
    #[error("invalid {document} research: {reason}")]
    InvalidResearch {
        /// Document kind (profile, social, brand, ...)
        document: String,
        /// What was wrong
        reason: String,
    },

    /// A generation prompt returned output in the wrong shape
    #[error("invalid output from {prompt_id}: {reason}")]
    InvalidOutput {
        /// Prompt id that produced the output
        prompt_id: String,
        /// What was wrong
        reason: String,
    },

    /// Artifact, journal or status store failure
    #[error("storage error: {0}")]
    Storage(String),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A pipeline step exhausted its retries or hit a permanent error
    #[error("step '{step}' failed after {attempts} attempt(s): {message}")]
    StepFailed {
        /// Step name
        step: String,
        /// Attempts made
        attempts: u32,
        /// Underlying error message
        message: String,
    },

    /// Internal error (serialization, poisoned state, etc.)
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the failing operation is worth retrying
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Llm(e) => e.is_transient(),
            Error::Storage(_) => true,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Internal(format!("serialization failed: {}", e))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for user-friendly error messages
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get a suggestion for how to fix the error
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for Error {
    fn user_message(&self) -> String {
        match self {
            Error::Prompt(e) => format!("Prompt configuration problem: {}", e),
            Error::PromptNotFound { id, version } => {
                format!("No prompt named '{}' at version {} is registered.", id, version)
            }
            Error::Llm(e) => format!("The language model call failed: {}", e),
            Error::InvalidResearch { document, reason } => {
                format!("The {} research came back malformed: {}", document, reason)
            }
            Error::InvalidOutput { prompt_id, reason } => {
                format!("'{}' produced unusable output: {}", prompt_id, reason)
            }
            Error::Storage(msg) => format!("Could not store results: {}", msg),
            Error::Configuration(msg) => format!("Configuration error: {}", msg),
            Error::StepFailed { step, message, .. } => {
                format!("The build stopped at step '{}': {}", step, message)
            }
            Error::Internal(msg) => format!("Internal error: {}", msg),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            Error::Prompt(PromptError::MissingInputs { .. }) => {
                Some("Supply every required input listed above.".to_string())
            }
            Error::Prompt(PromptError::InvalidVariantWeights { .. }) => {
                Some("Variant weights are percentages and must add up to 100.".to_string())
            }
            Error::PromptNotFound { .. } => Some(
                "Run `siteforge prompts list` to see registered prompts, or hot-patch the missing one."
                    .to_string(),
            ),
            Error::Llm(e) if e.is_transient() => {
                Some("Check provider availability and rate limits, then re-run the build.".to_string())
            }
            Error::Llm(_) => Some("Check the [llm] section of your configuration.".to_string()),
            Error::StepFailed { .. } => Some(
                "Re-running the same run id resumes from the failed step; completed steps are not repeated."
                    .to_string(),
            ),
            Error::Configuration(_) => {
                Some("Check config/default.toml and SITEFORGE_* environment variables.".to_string())
            }
            _ => None,
        }
    }
}

/// Format an error for display in the CLI
pub fn format_error_for_cli(error: &Error) -> String {
    let mut output = error.user_message();
    output.push('\n');

    if let Some(suggestion) = error.suggestion() {
        output.push('\n');
        output.push_str(&suggestion);
        output.push('\n');
    }

    output
}
