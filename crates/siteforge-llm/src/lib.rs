//! SiteForge LLM - Language Model Provider Abstraction
//!
//! This crate is the boundary between the SiteForge orchestration core and
//! whichever model service performs the completions:
//! - Provider: the `LlmProvider` trait every backend implements
//! - Completion: request/response types
//! - OpenAI-compatible: HTTP provider for `/v1/chat/completions` endpoints
//! - Mock: scripted provider for tests and offline runs

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod completion;
pub mod error;
pub mod message;
pub mod mock;
pub mod openai_compat;
pub mod provider;

pub use completion::{CompletionRequest, CompletionResponse, TokenUsage};
pub use error::{Error, Result};
pub use message::{Message, MessageRole};
pub use mock::MockProvider;
pub use openai_compat::{OpenAiCompatConfig, OpenAiCompatProvider};
pub use provider::LlmProvider;
