// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # predictor
//!
//! Drives an image-classification model through its lifecycle on an
//! accelerator:
//!
//! ```text
//! ModelManifest ─► ModelDescriptor ─► ArtifactStore::acquire ─► resolve_device
//!                                                                  │
//!      FeatureSet ◄─ decode ◄─ EngineBinding::run ◄─ assemble ◄── EngineBinding::construct
//! ```
//!
//! The predictor takes:
//! - A [`model_manifest::ModelManifest`] describing the model.
//! - A [`PredictorEnv`] with the fetch, engine-build and device-probe
//!   capabilities.
//! - [`PredictOptions`] (device, batch size).
//!
//! And exposes `load → predict → read_predicted_features → close` on
//! [`Predictor`]. Engine backends plug in through [`EngineBuilder`]; the
//! `ort` feature provides an onnxruntime one.

mod config;
mod decode;
mod device;
mod engine;
mod error;
mod lifecycle;
mod metrics;
mod registry;

pub use config::{FetchConfig, PredictOptions, PredictorConfig};
pub use decode::{decode, Feature, FeatureSet};
pub use device::{resolve_device, Device, DeviceProbe, SystemProbe};
pub use engine::{Engine, EngineBinding, EngineBuilder, EngineOptions, NodeSpec};
pub use error::PredictorError;
pub use lifecycle::{LifecycleState, Predictor, PredictorEnv};
pub use metrics::PredictorMetrics;
pub use registry::{
    is_supported_system, ContainerImages, FrameworkManifest, Modality, PredictorFactory,
    PredictorRegistry, RegistryEntry,
};

#[cfg(feature = "ort")]
pub use engine::OrtEngineBuilder;
