//! Connection configuration.

use crate::frame::MAX_FRAME_LEN;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Environment variable that overrides the socket path.
pub const SOCKET_ENV: &str = "PERCH_SOCKET";

/// Configuration for the channel between the two processes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Application name used in the default socket path.
    pub app_name: String,
    /// Custom socket path (overrides the generated one if set).
    pub socket_path: Option<PathBuf>,
    /// Largest frame body either side will send or accept.
    pub max_frame_len: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            app_name: "perch".to_string(),
            socket_path: None,
            max_frame_len: MAX_FRAME_LEN,
        }
    }
}

impl TransportConfig {
    /// Create a new config with the given app name.
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            ..Default::default()
        }
    }

    /// Default config with the socket path taken from `PERCH_SOCKET`, if set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(path) = env::var_os(SOCKET_ENV) {
            config.socket_path = Some(PathBuf::from(path));
        }
        config
    }

    pub fn with_socket_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.socket_path = Some(path.into());
        self
    }

    /// Get the socket path for this config.
    ///
    /// Without an explicit path, each call generates a fresh private path under the temp dir.
    pub fn socket_path(&self) -> PathBuf {
        if let Some(ref path) = self.socket_path {
            return path.clone();
        }
        env::temp_dir().join("perch").join(format!(
            "{}-{}.sock",
            self.app_name,
            uuid::Uuid::new_v4().simple()
        ))
    }
}
