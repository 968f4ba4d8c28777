// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Persisted node settings: a byte-blob store port and a JSON service over it.
//!
//! Stores only move bytes. [`ConfigService`] owns the encoding, so a filesystem
//! store and the in-memory test store hold identical documents.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Where settings documents live.
///
/// Keys are flat names such as `"deltad"`; a store may map them to files,
/// map entries, or anything else that round-trips bytes.
pub trait ConfigStore {
    /// Returns the bytes saved under `key`, or [`ConfigError::NotFound`].
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError>;
    /// Replaces whatever was saved under `key`.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError>;
}

/// Failure to read, write or interpret a settings document.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Nothing has been saved under this key.
    #[error("[CONFIG_NOT_FOUND] no document under {0:?}")]
    NotFound(String),
    /// The backing medium failed.
    #[error("[CONFIG_IO] {0}")]
    Io(#[from] std::io::Error),
    /// The document is not valid JSON for the requested type.
    #[error("[CONFIG_SERDE] {0}")]
    Serde(#[from] serde_json::Error),
    /// Stored engine parameters do not describe a valid engine.
    #[error("[CONFIG_ENGINE] {0}")]
    Engine(#[from] delta_core::EngineError),
    /// Store-specific failure with no better home.
    #[error("[CONFIG_OTHER] {0}")]
    Other(String),
}

/// JSON encoding layered over a [`ConfigStore`].
pub struct ConfigService<S> {
    store: S,
}

impl<S> ConfigService<S> {
    /// Wraps `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Unwraps the store.
    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<S> ConfigService<S>
where
    S: ConfigStore,
{
    /// Decodes the document under `key`.
    ///
    /// A missing key and an empty document both yield `Ok(None)`.
    pub fn load<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: DeserializeOwned,
    {
        match self.store.load_raw(key) {
            Ok(bytes) if bytes.is_empty() => Ok(None),
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(ConfigError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Like [`load`](Self::load), with `T::default()` for a missing document.
    pub fn load_or_default<T>(&self, key: &str) -> Result<T, ConfigError>
    where
        T: DeserializeOwned + Default,
    {
        Ok(self.load(key)?.unwrap_or_default())
    }

    /// Encodes `value` as pretty JSON and saves it under `key`.
    pub fn save<T>(&self, key: &str, value: &T) -> Result<(), ConfigError>
    where
        T: Serialize,
    {
        let data = serde_json::to_vec_pretty(value)?;
        self.store.save_raw(key, &data)
    }
}
