//! Application wiring
//!
//! - `config`: configuration types
//! - `loader`: layered configuration loading
//! - `init`: building the registry, stores and pipeline from configuration

pub mod config;
pub mod init;
pub mod loader;

pub use config::AppConfig;
pub use loader::load_config;
