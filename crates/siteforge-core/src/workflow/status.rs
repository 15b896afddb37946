//! Site build status

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of one site build
///
/// `collecting → generating → uploading → published`; `error` is terminal
/// and reachable from any step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Research and directory lookup in progress
    Collecting,
    /// Website and legal pages being generated
    Generating,
    /// Artifacts being written
    Uploading,
    /// Site is live
    Published,
    /// Build aborted
    Error,
}

impl RunStatus {
    /// Snake-case name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Collecting => "collecting",
            Self::Generating => "generating",
            Self::Uploading => "uploading",
            Self::Published => "published",
            Self::Error => "error",
        }
    }

    /// Whether the build has finished, successfully or not
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Published | Self::Error)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
