//! Utility modules for siteforge-core
//!
//! - retry: Retry logic with bounded exponential backoff
//! - text: Code-fence and JSON extraction from model replies

mod retry;
mod text;

pub use retry::{retry_with_backoff, RetryConfig, RetryError};
pub use text::{extract_json_object, strip_code_fences};
