// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for artifact acquisition.

use std::path::PathBuf;

/// Errors that can occur while acquiring model artifacts.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// A non-archive artifact has no checksum in the manifest.
    #[error("missing checksum for {artifact}: per-file artifacts must declare one")]
    MissingChecksum { artifact: String },

    /// A checksum is not a 32 (MD5) or 64 (SHA-256) character hex string.
    #[error("invalid checksum '{0}': expected 32 or 64 hex characters")]
    InvalidChecksum(String),

    /// The artifact on disk does not hash to the declared checksum.
    #[error("checksum mismatch for {artifact}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        artifact: String,
        expected: String,
        actual: String,
    },

    /// Fetching a URL failed after all retries.
    #[error("failed to download '{url}': {detail}")]
    Download { url: String, detail: String },

    /// The model archive could not be extracted.
    #[error("failed to extract archive '{}': {detail}", path.display())]
    Archive { path: PathBuf, detail: String },

    /// An expected artifact is absent after acquisition.
    #[error("artifact '{}' is missing", path.display())]
    MissingArtifact { path: PathBuf },

    /// Filesystem error on an artifact path.
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The features file could not be parsed.
    #[error(transparent)]
    Labels(#[from] model_manifest::ManifestError),
}

impl ArtifactError {
    /// Wraps an I/O error with the path it occurred on.
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
