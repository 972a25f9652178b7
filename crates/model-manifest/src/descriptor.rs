// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The resolved, read-only model view the predictor works from.

use crate::manifest::Parameters;
use crate::{ManifestError, ModelManifest};
use std::path::{Path, PathBuf};
use tensor_core::{ColorMode, DType, Layout, Normalization, Shape};

/// Parameter naming the engine input node.
const INPUT_LAYER_PARAM: &str = "input_layer";
/// Parameter naming the engine output (probabilities) node.
const OUTPUT_LAYER_PARAM: &str = "probabilities_layer";

/// One remote artifact: where to get it, what to call it locally, and the
/// checksum it must match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSource {
    pub url: String,
    /// Location inside the model work directory, always relative.
    pub local_path: PathBuf,
    /// Hex digest from the manifest; empty when the manifest omits it.
    pub checksum: String,
}

/// Immutable model metadata, resolved once from a [`ModelManifest`].
///
/// Construction fails unless exactly one input layer name and one output
/// layer name resolve, so every descriptor that exists can drive engine
/// construction.
#[derive(Debug, Clone)]
pub struct ModelDescriptor {
    pub name: String,
    pub version: String,
    pub framework: String,
    pub framework_version: String,
    pub input_layer: String,
    pub output_layer: String,
    /// Per-sample input shape in `layout` order.
    pub input_shape: Shape,
    pub element_type: DType,
    pub layout: Layout,
    pub color_mode: ColorMode,
    /// Fixed per predictor instance; always ≥ 1.
    pub batch_size: usize,
    /// One value per channel.
    pub mean: Vec<f32>,
    /// One value per channel.
    pub scale: Vec<f32>,
    /// Inline labels, index = class id. Empty when `features` supplies them.
    pub labels: Vec<String>,
    pub graph: ArtifactSource,
    pub weights: ArtifactSource,
    pub features: Option<ArtifactSource>,
    /// Archive URL for archive-distributed models.
    pub archive_url: Option<String>,
}

impl ModelDescriptor {
    /// Resolves a descriptor from `manifest` for a predictor running
    /// `batch_size` samples per inference.
    pub fn resolve(manifest: &ModelManifest, batch_size: usize) -> Result<Self, ManifestError> {
        manifest.validate()?;
        if batch_size == 0 {
            return Err(ManifestError::InvalidBatchSize(batch_size));
        }

        let input = manifest.image_input()?;
        let output = manifest
            .output
            .as_ref()
            .ok_or_else(|| ManifestError::Unsupported("manifest declares no output".into()))?;

        let input_layer = layer_name(&input.parameters, INPUT_LAYER_PARAM)?;
        let output_layer = layer_name(&output.parameters, OUTPUT_LAYER_PARAM)?;

        let element_type = DType::parse(&input.element_type).ok_or_else(|| {
            ManifestError::InvalidParameter {
                parameter: "element_type".into(),
                detail: format!("unsupported element type '{}'", input.element_type),
            }
        })?;

        let dims = usize_list(&input.parameters, "dimensions")?.ok_or_else(|| {
            ManifestError::InvalidParameter {
                parameter: "dimensions".into(),
                detail: "input dimensions are required".into(),
            }
        })?;
        if dims.len() != 3 || dims.contains(&0) {
            return Err(ManifestError::InvalidParameter {
                parameter: "dimensions".into(),
                detail: format!("expected three non-zero image dimensions, got {dims:?}"),
            });
        }
        let input_shape = Shape::new(dims);
        let channels = channel_dim(&input_shape, input.layout);

        let mean = per_channel(&input.parameters, "mean", channels, 0.0)?;
        let scale = per_channel(&input.parameters, "scale", channels, 1.0)?;
        if let Some(i) = scale.iter().position(|&s| s == 0.0) {
            return Err(ManifestError::InvalidParameter {
                parameter: "scale".into(),
                detail: format!("scale[{i}] is zero"),
            });
        }

        let model = &manifest.model;
        let base = model.base_url.as_str();
        let graph = source("model.graph_path", base, &model.graph_path, &model.graph_checksum)?;
        let weights = source(
            "model.weights_path",
            base,
            &model.weights_path,
            &model.weights_checksum,
        )?;

        let features_url = string_param(&output.parameters, "features_url")?.unwrap_or_default();
        let features = if features_url.trim().is_empty() {
            None
        } else {
            let checksum =
                string_param(&output.parameters, "features_checksum")?.unwrap_or_default();
            Some(source("features_url", base, &features_url, &checksum)?)
        };

        let archive_url = model.is_archive.then(|| model.base_url.clone());

        let descriptor = Self {
            name: manifest.name.clone(),
            version: manifest.version.clone(),
            framework: manifest.framework.name.clone(),
            framework_version: manifest.framework.version.clone(),
            input_layer,
            output_layer,
            input_shape,
            element_type,
            layout: input.layout,
            color_mode: input.color_mode,
            batch_size,
            mean,
            scale,
            labels: manifest.labels.clone(),
            graph,
            weights,
            features,
            archive_url,
        };
        tracing::debug!("resolved descriptor: {}", descriptor.summary());
        Ok(descriptor)
    }

    /// Whether the model is distributed as a single archive.
    pub fn is_archive(&self) -> bool {
        self.archive_url.is_some()
    }

    /// Number of image channels.
    pub fn channels(&self) -> usize {
        channel_dim(&self.input_shape, self.layout)
    }

    /// Image height in pixels.
    pub fn height(&self) -> usize {
        match self.layout {
            Layout::Chw => self.input_shape.dims()[1],
            Layout::Hwc => self.input_shape.dims()[0],
        }
    }

    /// Image width in pixels.
    pub fn width(&self) -> usize {
        match self.layout {
            Layout::Chw => self.input_shape.dims()[2],
            Layout::Hwc => self.input_shape.dims()[1],
        }
    }

    /// Elements in one input sample.
    pub fn sample_len(&self) -> usize {
        self.input_shape.num_elements()
    }

    /// Preprocessing parameters for [`tensor_core::preprocess`].
    pub fn normalization(&self) -> Normalization {
        Normalization {
            mean: self.mean.clone(),
            scale: self.scale.clone(),
        }
    }

    /// The per-model directory artifacts are cached in:
    /// `root/<framework>/<name>/<version>`.
    pub fn work_dir(&self, root: &Path) -> PathBuf {
        root.join(path_component(&self.framework.to_lowercase()))
            .join(path_component(&self.name))
            .join(path_component(&self.version))
    }

    /// One-line summary for logs and the CLI.
    pub fn summary(&self) -> String {
        format!(
            "{}:{} ({} {}) input '{}' {} {:?}/{:?}, output '{}', batch {}{}",
            self.name,
            self.version,
            self.framework,
            self.framework_version,
            self.input_layer,
            self.input_shape,
            self.layout,
            self.color_mode,
            self.output_layer,
            self.batch_size,
            if self.is_archive() { ", archive" } else { "" },
        )
    }
}

// ── Parameter helpers ──────────────────────────────────────────

/// Resolves a layer name: a non-empty string, or a one-element array of one.
fn layer_name(params: &Parameters, parameter: &'static str) -> Result<String, ManifestError> {
    let value = params.get(parameter).ok_or_else(|| ManifestError::LayerName {
        parameter,
        detail: "not declared in the manifest".into(),
    })?;

    let name = match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => match items.as_slice() {
            [serde_json::Value::String(s)] => s.clone(),
            [] => String::new(),
            [_] => {
                return Err(ManifestError::LayerName {
                    parameter,
                    detail: "array entry is not a string".into(),
                })
            }
            many => {
                return Err(ManifestError::LayerName {
                    parameter,
                    detail: format!("ambiguous: {} candidate names", many.len()),
                })
            }
        },
        other => {
            return Err(ManifestError::LayerName {
                parameter,
                detail: format!("expected a string, found {other}"),
            })
        }
    };

    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(ManifestError::LayerName {
            parameter,
            detail: "empty name".into(),
        });
    }
    Ok(name)
}

fn string_param(params: &Parameters, key: &str) -> Result<Option<String>, ManifestError> {
    match params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ManifestError::InvalidParameter {
            parameter: key.into(),
            detail: format!("expected a string, found {other}"),
        }),
    }
}

fn f32_list(params: &Parameters, key: &str) -> Result<Option<Vec<f32>>, ManifestError> {
    let Some(value) = params.get(key) else {
        return Ok(None);
    };
    let invalid = || ManifestError::InvalidParameter {
        parameter: key.into(),
        detail: format!("expected an array of numbers, found {value}"),
    };
    let items = value.as_array().ok_or_else(invalid)?;
    items
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32).ok_or_else(invalid))
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

fn usize_list(params: &Parameters, key: &str) -> Result<Option<Vec<usize>>, ManifestError> {
    let Some(value) = params.get(key) else {
        return Ok(None);
    };
    let invalid = || ManifestError::InvalidParameter {
        parameter: key.into(),
        detail: format!("expected an array of non-negative integers, found {value}"),
    };
    let items = value.as_array().ok_or_else(invalid)?;
    items
        .iter()
        .map(|v| v.as_u64().map(|n| n as usize).ok_or_else(invalid))
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

/// Reads a per-channel vector, broadcasting a single value and defaulting
/// to `fill` when absent.
fn per_channel(
    params: &Parameters,
    key: &str,
    channels: usize,
    fill: f32,
) -> Result<Vec<f32>, ManifestError> {
    match f32_list(params, key)? {
        None => Ok(vec![fill; channels]),
        Some(v) if v.len() == channels => Ok(v),
        Some(v) if v.len() == 1 => Ok(vec![v[0]; channels]),
        Some(v) => Err(ManifestError::InvalidParameter {
            parameter: key.into(),
            detail: format!("{} values for {channels} channels", v.len()),
        }),
    }
}

fn channel_dim(shape: &Shape, layout: Layout) -> usize {
    match layout {
        Layout::Chw => shape.dims()[0],
        Layout::Hwc => shape.dims()[2],
    }
}

// ── Artifact location helpers ──────────────────────────────────

fn source(
    parameter: &str,
    base_url: &str,
    path: &str,
    checksum: &str,
) -> Result<ArtifactSource, ManifestError> {
    Ok(ArtifactSource {
        url: join_url(base_url, path),
        local_path: local_path(parameter, path)?,
        checksum: checksum.trim().to_string(),
    })
}

/// `path` as-is when it is already absolute, otherwise `base_url/path`.
fn join_url(base_url: &str, path: &str) -> String {
    let path = path.trim();
    if path.contains("://") || base_url.trim().is_empty() {
        return path.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim().trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Where an artifact lands inside the work directory.
///
/// Relative manifest paths keep their directories, which is also where
/// archive extraction puts them. Absolute URLs keep only their last segment.
/// Leading separators and `.` are dropped; `..` is rejected.
fn local_path(parameter: &str, path: &str) -> Result<PathBuf, ManifestError> {
    let trimmed = path.trim();
    let trimmed = trimmed.split(['?', '#']).next().unwrap_or(trimmed);
    let relative = if trimmed.contains("://") {
        trimmed.trim_end_matches('/').rsplit('/').next().unwrap_or("")
    } else {
        trimmed
    };

    let mut local = PathBuf::new();
    for part in relative.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => {
                return Err(ManifestError::InvalidParameter {
                    parameter: parameter.into(),
                    detail: format!("'{path}' escapes the model work directory"),
                })
            }
            part => local.push(part),
        }
    }
    if local.as_os_str().is_empty() {
        return Err(ManifestError::InvalidParameter {
            parameter: parameter.into(),
            detail: format!("'{path}' does not name a file"),
        });
    }
    Ok(local)
}

fn path_component(s: &str) -> String {
    let cleaned: String = s
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c => c,
        })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}
