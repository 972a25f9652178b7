// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the predictor lifecycle.

use artifact_store::ArtifactError;
use tensor_core::TensorError;

/// Errors that can occur while loading, running or closing a predictor.
///
/// Lower-layer errors are wrapped with the stage they occurred in. Use
/// [`is_fatal`](Self::is_fatal) to tell the conditions that end an
/// instance from those a caller can retry with corrected input.
#[derive(Debug, thiserror::Error)]
pub enum PredictorError {
    /// Unresolvable manifest, missing checksum or bad options. Raised
    /// before any I/O.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Artifact download, extraction or verification failed.
    #[error("artifact acquisition failed: {0}")]
    Artifact(#[source] ArtifactError),

    /// No usable accelerator. There is no CPU fallback.
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The engine backend rejected the graph, weights or options.
    #[error("engine build failed ({backend}): {detail}")]
    EngineBuild {
        backend: &'static str,
        detail: String,
    },

    /// A single inference run failed. The predictor stays ready.
    #[error("inference failed: {0}")]
    Inference(String),

    /// Input batching failed.
    #[error("invalid input: {0}")]
    Tensor(#[from] TensorError),

    /// The engine output does not fit the batch size and label count.
    #[error("output length mismatch: {0}")]
    LengthMismatch(String),

    /// The operation is not valid in the predictor's current state.
    #[error("cannot {operation} in state {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },
}

impl PredictorError {
    /// No retry on this instance can succeed.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::DeviceUnavailable(_) | Self::EngineBuild { .. }
        )
    }

    /// The caller may retry with different input on the same instance.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Inference(_) => true,
            Self::Tensor(e) => e.is_input_error(),
            _ => false,
        }
    }
}

impl From<ArtifactError> for PredictorError {
    fn from(e: ArtifactError) -> Self {
        match e {
            ArtifactError::MissingChecksum { .. } | ArtifactError::InvalidChecksum(_) => {
                Self::Configuration(e.to_string())
            }
            other => Self::Artifact(other),
        }
    }
}
