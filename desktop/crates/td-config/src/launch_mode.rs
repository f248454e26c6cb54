use std::fmt;

use serde::{Deserialize, Serialize};

/// How the shell obtains its backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchMode {
    /// Spawn the bundled backend executable and own its lifetime.
    #[default]
    Standalone,
    /// Development: an externally managed backend is already listening.
    Attached,
}

impl fmt::Display for LaunchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchMode::Standalone => write!(f, "standalone"),
            LaunchMode::Attached => write!(f, "attached"),
        }
    }
}
