// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Explicit framework/predictor registry.
//!
//! The application builds one [`PredictorRegistry`] at startup and passes it
//! to whatever serves requests. Nothing registers itself as a side effect.

use crate::config::PredictOptions;
use crate::{Predictor, PredictorEnv, PredictorError};
use model_manifest::ModelManifest;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A framework a predictor can serve models for.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FrameworkManifest {
    pub name: String,
    pub version: String,
    /// Container images keyed by architecture.
    pub containers: BTreeMap<String, ContainerImages>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ContainerImages {
    pub cpu: String,
    pub gpu: String,
}

impl FrameworkManifest {
    /// The TensorRT framework this runtime serves by default.
    pub fn tensorrt() -> Self {
        let images = |cpu: &str, gpu: &str| ContainerImages {
            cpu: cpu.to_string(),
            gpu: gpu.to_string(),
        };
        Self {
            name: "TensorRT".to_string(),
            version: "2.1.2".to_string(),
            containers: BTreeMap::from([
                (
                    "amd64".to_string(),
                    images("carml-tensorrt:amd64-cpu", "carml-tensorrt:amd64-gpu"),
                ),
                (
                    "ppc64le".to_string(),
                    images("carml-tensorrt:ppc64le-gpu", "carml-tensorrt:ppc64le-gpu"),
                ),
            ]),
        }
    }

    /// Whether a manifest's framework reference selects this framework.
    ///
    /// Names compare case-insensitively. An empty or `*` version matches
    /// any; otherwise its dotted components must prefix this version's.
    pub fn matches(&self, name: &str, version: &str) -> bool {
        if !self.name.eq_ignore_ascii_case(name.trim()) {
            return false;
        }
        let version = version.trim();
        if version.is_empty() || version == "*" {
            return true;
        }
        let ours: Vec<&str> = self.version.split('.').collect();
        let wanted: Vec<&str> = version.split('.').collect();
        wanted.len() <= ours.len() && wanted.iter().zip(&ours).all(|(a, b)| a == b)
    }
}

impl fmt::Display for FrameworkManifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

/// The kind of task a predictor performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Modality {
    ImageClassification,
}

impl Modality {
    /// Infers the modality a manifest asks for.
    pub fn of(manifest: &ModelManifest) -> Option<Self> {
        let image_in = manifest.inputs.len() == 1
            && manifest.inputs[0].kind.eq_ignore_ascii_case("image");
        let classify_out = manifest.output.as_ref().is_some_and(|o| {
            o.kind.eq_ignore_ascii_case("feature") || o.kind.eq_ignore_ascii_case("classification")
        });
        (image_in && classify_out).then_some(Self::ImageClassification)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ImageClassification => "image-classification",
        }
    }
}

/// Creates a loaded predictor for a manifest.
pub type PredictorFactory =
    Arc<dyn Fn(&ModelManifest, PredictOptions) -> Result<Predictor, PredictorError> + Send + Sync>;

/// One registered (framework, modality) pair.
pub struct RegistryEntry {
    pub framework: FrameworkManifest,
    pub modality: Modality,
    factory: PredictorFactory,
}

impl fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("framework", &self.framework)
            .field("modality", &self.modality)
            .finish()
    }
}

/// Maps frameworks and modalities to predictor factories.
#[derive(Debug, Default)]
pub struct PredictorRegistry {
    entries: Vec<RegistryEntry>,
}

impl PredictorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the image-classification predictor for TensorRT, or nothing
    /// on unsupported systems.
    pub fn with_defaults(env: PredictorEnv) -> Self {
        let mut registry = Self::new();
        if !is_supported_system() {
            tracing::warn!(
                "predictor is only available on linux/x86_64 and linux/aarch64; not registering {}",
                FrameworkManifest::tensorrt()
            );
            return registry;
        }
        registry.register(
            FrameworkManifest::tensorrt(),
            Modality::ImageClassification,
            Arc::new(move |manifest: &ModelManifest, options: PredictOptions| {
                Predictor::open(env.clone(), manifest, options)
            }),
        );
        registry
    }

    /// Adds an entry. A later registration for the same framework name,
    /// version and modality replaces the earlier one.
    pub fn register(
        &mut self,
        framework: FrameworkManifest,
        modality: Modality,
        factory: PredictorFactory,
    ) {
        self.entries.retain(|e| {
            !(e.modality == modality
                && e.framework.name.eq_ignore_ascii_case(&framework.name)
                && e.framework.version == framework.version)
        });
        tracing::debug!("registered {} for {}", framework, modality.as_str());
        self.entries.push(RegistryEntry {
            framework,
            modality,
            factory,
        });
    }

    /// Finds the entry serving `manifest`.
    pub fn resolve(&self, manifest: &ModelManifest) -> Result<&RegistryEntry, PredictorError> {
        let modality = Modality::of(manifest).ok_or_else(|| {
            PredictorError::Configuration(format!(
                "{} is not an image-classification model",
                manifest.canonical_name()
            ))
        })?;
        let fw = &manifest.framework;
        self.entries
            .iter()
            .find(|e| e.modality == modality && e.framework.matches(&fw.name, &fw.version))
            .ok_or_else(|| {
                PredictorError::Configuration(format!(
                    "no predictor registered for {} {} ({})",
                    fw.name,
                    fw.version,
                    modality.as_str()
                ))
            })
    }

    /// Resolves and loads a predictor for `manifest`.
    pub fn open(
        &self,
        manifest: &ModelManifest,
        options: PredictOptions,
    ) -> Result<Predictor, PredictorError> {
        let entry = self.resolve(manifest)?;
        (entry.factory)(manifest, options)
    }

    pub fn frameworks(&self) -> Vec<&FrameworkManifest> {
        self.entries.iter().map(|e| &e.framework).collect()
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Whether this build can serve the default framework.
pub fn is_supported_system() -> bool {
    cfg!(target_os = "linux") && (cfg!(target_arch = "x86_64") || cfg!(target_arch = "aarch64"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(framework: &str, version: &str) -> ModelManifest {
        let json = format!(
            r#"{{
                "name": "m", "version": "1",
                "framework": {{ "name": "{framework}", "version": "{version}" }},
                "inputs": [{{ "type": "image" }}],
                "output": {{ "type": "feature" }},
                "model": {{ "graph_path": "g", "weights_path": "w" }}
            }}"#
        );
        ModelManifest::from_json(&json).unwrap()
    }

    fn failing_factory() -> PredictorFactory {
        Arc::new(|_: &ModelManifest, _: PredictOptions| {
            Err(PredictorError::Configuration("factory called".into()))
        })
    }

    #[test]
    fn test_version_matching() {
        let trt = FrameworkManifest::tensorrt();
        assert!(trt.matches("tensorrt", ""));
        assert!(trt.matches("TensorRT", "*"));
        assert!(trt.matches("TensorRT", "2"));
        assert!(trt.matches("TensorRT", "2.1"));
        assert!(trt.matches("TensorRT", "2.1.2"));
        assert!(!trt.matches("TensorRT", "2.1.20"));
        assert!(!trt.matches("TensorRT", "3"));
        assert!(!trt.matches("MXNet", "2.1.2"));
    }

    #[test]
    fn test_modality_of() {
        assert_eq!(
            Modality::of(&manifest("TensorRT", "2")),
            Some(Modality::ImageClassification)
        );
        let mut m = manifest("TensorRT", "2");
        m.output.as_mut().unwrap().kind = "boundingbox".into();
        assert_eq!(Modality::of(&m), None);
    }

    #[test]
    fn test_resolve_and_open() {
        let mut r = PredictorRegistry::new();
        r.register(FrameworkManifest::tensorrt(), Modality::ImageClassification, failing_factory());
        assert_eq!(r.len(), 1);

        let entry = r.resolve(&manifest("tensorrt", "2.1")).unwrap();
        assert_eq!(entry.framework.name, "TensorRT");

        let err = r.open(&manifest("TensorRT", ""), PredictOptions::default()).unwrap_err();
        assert!(err.to_string().contains("factory called"));
    }

    #[test]
    fn test_resolve_unregistered() {
        let r = PredictorRegistry::new();
        assert!(r.is_empty());
        assert!(matches!(
            r.resolve(&manifest("TensorRT", "2")),
            Err(PredictorError::Configuration(_))
        ));
    }

    #[test]
    fn test_register_replaces_same_key() {
        let mut r = PredictorRegistry::new();
        r.register(FrameworkManifest::tensorrt(), Modality::ImageClassification, failing_factory());
        r.register(FrameworkManifest::tensorrt(), Modality::ImageClassification, failing_factory());
        assert_eq!(r.frameworks().len(), 1);
    }
}
