// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Predictor configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! work_root = "./models"
//! device = "cuda:0"
//! batch_size = 1
//! enable_profiling = true
//!
//! [fetch]
//! timeout_secs = 300
//! retries = 3
//! ```

use crate::{Device, PredictorError};
use artifact_store::FetchPolicy;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for a predictor instance.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PredictorConfig {
    /// Root under which per-model work directories are created.
    pub work_root: PathBuf,
    /// Device string: `"cuda"`, `"cuda:N"` or `"cpu"`.
    pub device: String,
    /// Samples per inference call.
    pub batch_size: usize,
    /// Download policy.
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Whether to record load and predict timings.
    #[serde(default = "default_true")]
    pub enable_profiling: bool,
}

/// Timeout and retry settings for artifact downloads.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub retries: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            retries: 3,
        }
    }
}

/// Per-load options derived from a [`PredictorConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictOptions {
    pub device: Device,
    pub batch_size: usize,
    pub enable_profiling: bool,
}

impl Default for PredictOptions {
    fn default() -> Self {
        Self {
            device: Device::Cuda { device_id: 0 },
            batch_size: 1,
            enable_profiling: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl PredictorConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, PredictorError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PredictorError::Configuration(format!(
                "cannot read config '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, PredictorError> {
        toml::from_str(toml_str)
            .map_err(|e| PredictorError::Configuration(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, PredictorError> {
        toml::to_string_pretty(self)
            .map_err(|e| PredictorError::Configuration(format!("TOML serialise error: {e}")))
    }

    /// Parses the device string and batch size into load options.
    pub fn predict_options(&self) -> Result<PredictOptions, PredictorError> {
        if self.batch_size == 0 {
            return Err(PredictorError::Configuration(
                "batch_size must be at least 1".into(),
            ));
        }
        Ok(PredictOptions {
            device: Device::parse(&self.device)?,
            batch_size: self.batch_size,
            enable_profiling: self.enable_profiling,
        })
    }

    /// Download policy for [`artifact_store::UrlFetcher`].
    pub fn fetch_policy(&self) -> FetchPolicy {
        FetchPolicy {
            timeout: Duration::from_secs(self.fetch.timeout_secs),
            retries: self.fetch.retries,
            ..FetchPolicy::default()
        }
    }
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            work_root: PathBuf::from("./models"),
            device: "cuda:0".to_string(),
            batch_size: 1,
            fetch: FetchConfig::default(),
            enable_profiling: true,
        }
    }
}
