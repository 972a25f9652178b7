// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Subcommand implementations and shared CLI plumbing.

pub mod download;
pub mod frameworks;
pub mod inspect;
pub mod predict;
pub mod status;

use predictor::{
    Engine, EngineBuilder, EngineOptions, PredictorConfig, PredictorEnv, PredictorError,
    PredictorRegistry,
};
use std::path::Path;
use std::sync::Arc;

/// Installs the tracing subscriber. `RUST_LOG` takes precedence over `-v`.
pub fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Loads the configuration file, or defaults when none is given.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<PredictorConfig> {
    match path {
        Some(p) => {
            let config = PredictorConfig::from_file(p)?;
            tracing::info!("loaded config from {}", p.display());
            Ok(config)
        }
        None => Ok(PredictorConfig::default()),
    }
}

/// The engine backend compiled into this binary, if any.
pub fn engine_builder() -> Option<Arc<dyn EngineBuilder>> {
    #[cfg(feature = "ort")]
    {
        Some(Arc::new(predictor::OrtEngineBuilder::new()))
    }
    #[cfg(not(feature = "ort"))]
    {
        None
    }
}

/// Stand-in builder for binaries compiled without an engine backend.
struct NoBackend;

impl EngineBuilder for NoBackend {
    fn name(&self) -> &'static str {
        "none"
    }

    fn build(
        &self,
        _graph: &[u8],
        _weights: &[u8],
        _options: &EngineOptions,
    ) -> Result<Box<dyn Engine>, PredictorError> {
        Err(PredictorError::EngineBuild {
            backend: "none",
            detail: "pred-rt was built without an engine backend; rebuild with --features ort"
                .into(),
        })
    }
}

/// Builds the registry the commands resolve predictors from.
pub fn build_registry(config: &PredictorConfig) -> anyhow::Result<PredictorRegistry> {
    let builder = engine_builder().unwrap_or_else(|| Arc::new(NoBackend));
    let env = PredictorEnv::from_config(config, builder)?;
    Ok(PredictorRegistry::with_defaults(env))
}

/// Truncates a string to `max` chars, adding an ellipsis if needed.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{head}...")
    }
}
