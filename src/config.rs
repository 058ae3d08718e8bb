//! Host configuration presets.

use perch_core::{TransportConfig, DEFAULT_DEPTH_LIMIT};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the scheduler transmits a new build.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Always send the complete tree.
    Full,
    /// Send the difference to the previous build as patches; full renders only when the root or
    /// the scene changed.
    Patch,
}

/// Configuration for a [`Host`](crate::Host).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HostConfig {
    pub transport: TransportConfig,
    /// Minimum pause between two transmissions.
    pub render_interval: Duration,
    /// Builds with nodes deeper than this are rejected.
    pub depth_limit: usize,
    pub strategy: Strategy,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl HostConfig {
    /// Full renders at up to ~500 per second.
    pub fn standard() -> Self {
        Self {
            transport: TransportConfig::from_env(),
            render_interval: Duration::from_millis(2),
            depth_limit: DEFAULT_DEPTH_LIMIT,
            strategy: Strategy::Full,
        }
    }

    /// Like `standard`, but sends patches after the first render.
    pub fn patching() -> Self {
        Self {
            strategy: Strategy::Patch,
            ..Self::standard()
        }
    }

    /// No pacing and no environment lookups.
    pub fn testing() -> Self {
        Self {
            transport: TransportConfig::new("perch-test"),
            render_interval: Duration::ZERO,
            depth_limit: DEFAULT_DEPTH_LIMIT,
            strategy: Strategy::Full,
        }
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }
}
