// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! JSON model manifest parsing.
//!
//! # Format
//! ```json
//! {
//!   "name": "BVLC-GoogLeNet",
//!   "version": "1.0",
//!   "framework": { "name": "TensorRT", "version": "2.1.2" },
//!   "inputs": [{
//!     "type": "image",
//!     "layout": "CHW",
//!     "color_mode": "BGR",
//!     "parameters": {
//!       "dimensions": [3, 224, 224],
//!       "mean": [104.0, 117.0, 123.0],
//!       "input_layer": "data"
//!     }
//!   }],
//!   "output": {
//!     "type": "feature",
//!     "parameters": {
//!       "probabilities_layer": "prob",
//!       "features_url": "http://example.com/synset.txt",
//!       "features_checksum": "4d6d1fb6..."
//!     }
//!   },
//!   "model": {
//!     "base_url": "http://example.com/googlenet/",
//!     "graph_path": "deploy.prototxt",
//!     "weights_path": "bvlc_googlenet.caffemodel",
//!     "graph_checksum": "5e8e7d2c...",
//!     "weights_checksum": "61c1e2d6...",
//!     "is_archive": false
//!   }
//! }
//! ```

use crate::ManifestError;
use std::collections::BTreeMap;
use std::path::Path;
use tensor_core::{ColorMode, Layout};

/// Free-form typed parameters attached to an input or output.
pub type Parameters = BTreeMap<String, serde_json::Value>;

/// Top-level model manifest, deserialized from JSON.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ModelManifest {
    /// Model name (e.g., `"BVLC-GoogLeNet"`).
    pub name: String,
    /// Model version (e.g., `"1.0"`).
    pub version: String,
    /// Framework this model is built for.
    pub framework: FrameworkRef,
    /// Declared inputs. Exactly one image input is supported.
    #[serde(default)]
    pub inputs: Vec<ManifestInput>,
    /// The classification output.
    pub output: Option<ManifestOutput>,
    /// Artifact locations and checksums.
    pub model: ManifestModel,
    /// Inline class labels; when empty the features file supplies them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

/// Reference to the framework (and version constraint) a model targets.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FrameworkRef {
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// A single declared model input.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ManifestInput {
    /// Input modality, e.g. `"image"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Element type of the engine input node.
    #[serde(default = "default_element_type")]
    pub element_type: String,
    #[serde(default)]
    pub layout: Layout,
    #[serde(default)]
    pub color_mode: ColorMode,
    #[serde(default)]
    pub parameters: Parameters,
}

/// The model output.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ManifestOutput {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub parameters: Parameters,
}

/// Where the serialized graph and weights live.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ManifestModel {
    /// URL prefix for relative paths, or the archive URL when `is_archive`.
    #[serde(default)]
    pub base_url: String,
    pub graph_path: String,
    pub weights_path: String,
    #[serde(default)]
    pub graph_checksum: String,
    #[serde(default)]
    pub weights_checksum: String,
    /// The model ships as a single archive at `base_url`.
    #[serde(default)]
    pub is_archive: bool,
}

fn default_element_type() -> String {
    "float32".to_string()
}

impl ModelManifest {
    /// Loads a manifest from a JSON file path.
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parses a manifest from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ManifestError> {
        let manifest: Self = serde_json::from_str(json)?;
        Ok(manifest)
    }

    /// `name:version`, the key models are looked up by.
    pub fn canonical_name(&self) -> String {
        format!("{}:{}", self.name, self.version)
    }

    /// Returns the single image input.
    ///
    /// Fails unless exactly one input is declared and its type is `image`
    /// (case-insensitive).
    pub fn image_input(&self) -> Result<&ManifestInput, ManifestError> {
        if self.inputs.len() != 1 {
            return Err(ManifestError::Unsupported(format!(
                "number of inputs not supported: expected 1, found {}",
                self.inputs.len()
            )));
        }
        let input = &self.inputs[0];
        if !input.kind.eq_ignore_ascii_case("image") {
            return Err(ManifestError::Unsupported(format!(
                "input type '{}' not supported: expected 'image'",
                input.kind
            )));
        }
        Ok(input)
    }

    /// Validates that the manifest is internally consistent.
    ///
    /// Checks:
    /// - Exactly one input, of type `image`.
    /// - An output is declared.
    /// - Graph and weights paths are non-empty.
    /// - An archive model has a `base_url`.
    pub fn validate(&self) -> Result<(), ManifestError> {
        self.image_input()?;

        if self.output.is_none() {
            return Err(ManifestError::Unsupported("manifest declares no output".into()));
        }
        if self.model.graph_path.trim().is_empty() {
            return Err(ManifestError::InvalidParameter {
                parameter: "model.graph_path".into(),
                detail: "must not be empty".into(),
            });
        }
        if self.model.weights_path.trim().is_empty() {
            return Err(ManifestError::InvalidParameter {
                parameter: "model.weights_path".into(),
                detail: "must not be empty".into(),
            });
        }
        if self.model.is_archive && self.model.base_url.trim().is_empty() {
            return Err(ManifestError::InvalidParameter {
                parameter: "model.base_url".into(),
                detail: "archive models need an archive URL".into(),
            });
        }
        Ok(())
    }
}

/// Manifest shared by the unit tests in this crate.
#[cfg(test)]
pub(crate) const SAMPLE_MANIFEST: &str = r#"{
    "name": "BVLC-GoogLeNet",
    "version": "1.0",
    "framework": { "name": "TensorRT", "version": "2.1.2" },
    "inputs": [{
        "type": "image",
        "layout": "CHW",
        "color_mode": "BGR",
        "parameters": {
            "dimensions": [3, 224, 224],
            "mean": [104.0, 117.0, 123.0],
            "input_layer": "data"
        }
    }],
    "output": {
        "type": "feature",
        "parameters": {
            "probabilities_layer": "prob",
            "features_url": "http://example.com/synset.txt",
            "features_checksum": "4d6d1fb6b1c7e4e5fbbbd6a2e3a6e4a1"
        }
    },
    "model": {
        "base_url": "http://example.com/googlenet",
        "graph_path": "deploy.prototxt",
        "weights_path": "bvlc_googlenet.caffemodel",
        "graph_checksum": "5e8e7d2c6f6e4e0b0a3f0c1d2e3f4a5b",
        "weights_checksum": "61c1e2d6a7b8c9d0e1f2a3b4c5d6e7f8"
    }
}"#;
