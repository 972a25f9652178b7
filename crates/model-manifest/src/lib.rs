// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # model-manifest
//!
//! Static model metadata and its resolved, immutable view.
//!
//! - [`ModelManifest`] — the JSON document describing a model: its framework,
//!   single image input, classification output, artifact locations and
//!   checksums.
//! - [`ModelDescriptor`] — what the predictor actually consumes, resolved
//!   once from a manifest plus a batch size: layer names, input shape and
//!   layout, per-channel mean/scale, and the [`ArtifactSource`]s to fetch.
//! - [`read_labels`] — loads a one-label-per-line features file.
//!
//! # Example
//! ```no_run
//! use model_manifest::{ModelDescriptor, ModelManifest};
//! use std::path::Path;
//!
//! let manifest = ModelManifest::from_file(Path::new("googlenet.json")).unwrap();
//! let descriptor = ModelDescriptor::resolve(&manifest, 1).unwrap();
//! println!("{}", descriptor.summary());
//! ```

mod descriptor;
mod error;
mod labels;
mod manifest;

pub use descriptor::{ArtifactSource, ModelDescriptor};
pub use error::ManifestError;
pub use labels::read_labels;
pub use manifest::{
    FrameworkRef, ManifestInput, ManifestModel, ManifestOutput, ModelManifest, Parameters,
};
