// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Saved preferences for the delta node.

use std::path::PathBuf;

use delta_core::EngineConfig;
use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, ConfigService, ConfigStore};

/// Config key the node stores its preferences under.
pub const NODE_PREFS_KEY: &str = "deltad";

/// Default frame watchdog timeout.
pub const DEFAULT_FRAME_TIMEOUT_MS: u64 = 250;

/// Default throughput window, in logical steps.
pub const DEFAULT_THROUGHPUT_WINDOW: u64 = 1_000;

/// Node daemon preferences.
///
/// Every field has a default, so a partial JSON blob is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodePrefs {
    /// Unix socket to listen on; `None` picks the runtime-dir default.
    pub socket_path: Option<PathBuf>,
    /// How long a frame may sit incomplete before it is aborted. Zero disables the watchdog.
    pub frame_timeout_ms: u64,
    /// Throughput monitor window, in logical steps.
    pub throughput_window: u64,
    /// Engine construction parameters.
    pub engine: EngineConfig,
}

impl Default for NodePrefs {
    fn default() -> Self {
        Self {
            socket_path: None,
            frame_timeout_ms: DEFAULT_FRAME_TIMEOUT_MS,
            throughput_window: DEFAULT_THROUGHPUT_WINDOW,
            engine: EngineConfig::default(),
        }
    }
}

impl NodePrefs {
    /// Loads stored prefs, or defaults when none are saved.
    ///
    /// The engine section is validated by building it once.
    pub fn load<S: ConfigStore>(service: &ConfigService<S>) -> Result<Self, ConfigError> {
        let prefs: Self = service.load_or_default(NODE_PREFS_KEY)?;
        prefs.engine.build()?;
        Ok(prefs)
    }

    /// Persists these prefs.
    pub fn save<S: ConfigStore>(&self, service: &ConfigService<S>) -> Result<(), ConfigError> {
        service.save(NODE_PREFS_KEY, self)
    }
}
