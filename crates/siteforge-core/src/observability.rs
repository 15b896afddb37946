//! Call Observability
//!
//! Wraps a single model invocation with timing, a deterministic input hash
//! and one structured log line per outcome. Records can also be handed to a
//! [`CallSink`] for later inspection.

use crate::prompts::PromptKey;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use siteforge_llm::{CompletionRequest, CompletionResponse, LlmProvider};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{info, warn};

/// Hex characters kept from the input digest
const INPUT_HASH_LEN: usize = 16;

/// Outcome of one observed call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CallOutcome {
    /// The provider returned a response
    Success,
    /// The provider failed
    Error {
        /// Error description
        message: String,
        /// Whether a retry could succeed
        transient: bool,
    },
}

/// Everything known about one model call
#[derive(Debug, Clone, Serialize)]
pub struct CallRecord {
    /// Prompt that was rendered
    pub prompt: PromptKey,
    /// Model requested (empty means provider default)
    pub model: String,
    /// Truncated SHA-256 over the request messages
    pub input_hash: String,
    /// When the call began
    pub started_at: DateTime<Utc>,
    /// Wall time in milliseconds
    pub duration_ms: u64,
    /// Success or failure
    pub outcome: CallOutcome,
    /// Prompt tokens, when the provider reports usage
    pub prompt_tokens: Option<u32>,
    /// Completion tokens, when the provider reports usage
    pub completion_tokens: Option<u32>,
}

/// Receiver of call records
pub trait CallSink: Send + Sync {
    /// Store one record
    fn record(&self, record: CallRecord);
}

/// Sink keeping every record in memory
#[derive(Debug, Default)]
pub struct MemoryCallSink {
    records: Mutex<Vec<CallRecord>>,
}

impl MemoryCallSink {
    /// Empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every record so far
    #[must_use]
    pub fn records(&self) -> Vec<CallRecord> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl CallSink for MemoryCallSink {
    fn record(&self, record: CallRecord) {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record);
    }
}

/// Deterministic hash of a request's messages
///
/// Equal message sequences always hash equal, so repeated calls with the
/// same rendered prompt can be correlated in logs.
#[must_use]
pub fn hash_input(request: &CompletionRequest) -> String {
    let mut hasher = Sha256::new();
    for message in &request.messages {
        hasher.update(message.role.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(message.content.as_bytes());
        hasher.update([0u8]);
    }
    hasher
        .finalize()
        .iter()
        .take(INPUT_HASH_LEN / 2)
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Wraps model calls with timing and outcome logging
#[derive(Clone, Default)]
pub struct CallObserver {
    sink: Option<Arc<dyn CallSink>>,
}

impl std::fmt::Debug for CallObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallObserver")
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

impl CallObserver {
    /// Observer that only logs
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Also forward every record to `sink`
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn CallSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Invoke `provider` once, logging and recording the outcome
    pub async fn call(
        &self,
        provider: &dyn LlmProvider,
        prompt: &PromptKey,
        request: CompletionRequest,
    ) -> siteforge_llm::Result<CompletionResponse> {
        let input_hash = hash_input(&request);
        let model = request.model.clone();
        let started_at = Utc::now();
        let start = Instant::now();

        let result = provider.complete(request).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let (outcome, usage) = match &result {
            Ok(response) => {
                info!(
                    prompt = %prompt,
                    provider = provider.name(),
                    model = %response.model,
                    input_hash = %input_hash,
                    duration_ms,
                    "Model call succeeded"
                );
                (CallOutcome::Success, response.usage.clone())
            }
            Err(e) => {
                warn!(
                    prompt = %prompt,
                    provider = provider.name(),
                    input_hash = %input_hash,
                    duration_ms,
                    error = %e,
                    "Model call failed"
                );
                (
                    CallOutcome::Error {
                        message: e.to_string(),
                        transient: e.is_transient(),
                    },
                    None,
                )
            }
        };

        if let Some(sink) = &self.sink {
            sink.record(CallRecord {
                prompt: prompt.clone(),
                model,
                input_hash,
                started_at,
                duration_ms,
                outcome,
                prompt_tokens: usage.as_ref().map(|u| u.prompt_tokens),
                completion_tokens: usage.as_ref().map(|u| u.completion_tokens),
            });
        }

        result
    }
}
