// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for manifest loading and descriptor resolution.

use std::path::PathBuf;

/// Errors that can occur when reading a manifest or resolving a descriptor.
///
/// Everything except the two I/O variants is a configuration error: the
/// manifest itself is wrong and no retry will help.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// The manifest file could not be read.
    #[error("failed to read manifest: {0}")]
    ManifestReadError(#[from] std::io::Error),

    /// The manifest JSON is malformed.
    #[error("failed to parse manifest: {0}")]
    ManifestParseError(#[from] serde_json::Error),

    /// The manifest describes a model shape this predictor cannot serve
    /// (wrong input count, non-image input, missing output).
    #[error("unsupported model: {0}")]
    Unsupported(String),

    /// An input or output layer name is absent or ambiguous.
    #[error("cannot resolve {parameter}: {detail}")]
    LayerName {
        parameter: &'static str,
        detail: String,
    },

    /// A typed parameter has the wrong form.
    #[error("invalid parameter '{parameter}': {detail}")]
    InvalidParameter { parameter: String, detail: String },

    /// Batch size must be a positive integer.
    #[error("invalid batch size {0}: must be at least 1")]
    InvalidBatchSize(usize),

    /// The labels file could not be read.
    #[error("failed to read labels from '{}': {source}", path.display())]
    Labels {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
