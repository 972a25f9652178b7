// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The engine capability and the binding that owns one engine instance.
//!
//! ```text
//! ArtifactSet ──read bytes──► EngineBuilder::build ──► Box<dyn Engine>
//!                                  ▲                        │
//!            EngineOptions ────────┘                 owned by EngineBinding
//!   (device, batch, input/output NodeSpecs)           run* → close (once)
//! ```
//!
//! Backends implement [`EngineBuilder`] and [`Engine`]. The binding adds the
//! lifecycle guarantees: construction is all-or-nothing, `close` runs the
//! backend teardown exactly once, and `run` after close is a usage error.

#[cfg(feature = "ort")]
mod ort_backend;

#[cfg(feature = "ort")]
pub use ort_backend::OrtEngineBuilder;

use crate::{Device, PredictorError};
use artifact_store::ArtifactSet;
use model_manifest::ModelDescriptor;
use tensor_core::{DType, Shape};

/// Name, shape and element type of one engine input or output node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSpec {
    pub name: String,
    /// Per-sample shape; `None` lets the engine infer it at build time.
    pub shape: Option<Shape>,
    pub dtype: DType,
}

/// Everything a backend needs besides the serialized model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    pub device: Device,
    pub batch_size: usize,
    pub inputs: Vec<NodeSpec>,
    pub outputs: Vec<NodeSpec>,
    /// Ask the backend to record its own per-run profile.
    pub enable_profiling: bool,
}

impl EngineOptions {
    /// Derives node specs from `descriptor`.
    ///
    /// Input: the descriptor's input layer with its per-sample shape.
    /// Output: the probabilities layer with its shape left to the engine.
    pub fn from_descriptor(descriptor: &ModelDescriptor, device: Device, batch_size: usize) -> Self {
        Self {
            device,
            batch_size,
            inputs: vec![NodeSpec {
                name: descriptor.input_layer.clone(),
                shape: Some(descriptor.input_shape.clone()),
                dtype: DType::F32,
            }],
            outputs: vec![NodeSpec {
                name: descriptor.output_layer.clone(),
                shape: None,
                dtype: DType::F32,
            }],
            enable_profiling: false,
        }
    }

    /// Flat input length for one full batch.
    pub fn input_len(&self) -> usize {
        self.inputs
            .first()
            .and_then(|n| n.shape.as_ref())
            .map(|s| s.num_elements() * self.batch_size)
            .unwrap_or(0)
    }
}

/// A constructed inference engine.
///
/// Implementations are stateful and not re-entrant; the binding serializes
/// calls through `&mut self`.
pub trait Engine: Send {
    /// Runs one batch. `input` is `batch_size × sample_len` f32 values in
    /// row-major order; the result is the flat output of the first output
    /// node.
    fn run(&mut self, input: &[f32]) -> Result<Vec<f32>, PredictorError>;

    /// Releases native resources. Called at most once.
    fn close(&mut self) {}
}

/// Builds engines from serialized graph and weights bytes.
pub trait EngineBuilder: Send + Sync {
    /// Backend name, used in logs and errors.
    fn name(&self) -> &'static str;

    fn build(
        &self,
        graph: &[u8],
        weights: &[u8],
        options: &EngineOptions,
    ) -> Result<Box<dyn Engine>, PredictorError>;
}

/// Exclusive owner of one engine instance.
pub struct EngineBinding {
    engine: Option<Box<dyn Engine>>,
    backend: &'static str,
    options: EngineOptions,
    last_output: Option<Vec<f32>>,
}

impl EngineBinding {
    /// Reads the verified artifacts and builds an engine for `descriptor`.
    ///
    /// On failure nothing is left allocated.
    pub fn construct(
        artifacts: &ArtifactSet,
        descriptor: &ModelDescriptor,
        device: Device,
        batch_size: usize,
        builder: &dyn EngineBuilder,
    ) -> Result<Self, PredictorError> {
        let options = EngineOptions::from_descriptor(descriptor, device, batch_size);
        Self::construct_with(artifacts, options, builder)
    }

    /// Like [`construct`](Self::construct) with caller-supplied options.
    pub fn construct_with(
        artifacts: &ArtifactSet,
        options: EngineOptions,
        builder: &dyn EngineBuilder,
    ) -> Result<Self, PredictorError> {
        if !options.device.is_gpu() {
            return Err(PredictorError::DeviceUnavailable(format!(
                "engine requires a GPU, got {}",
                options.device
            )));
        }

        let graph = artifacts.read_graph()?;
        let weights = artifacts.read_weights()?;
        tracing::debug!(
            "building {} engine: graph {} bytes, weights {} bytes, batch {}",
            builder.name(),
            graph.len(),
            weights.len(),
            options.batch_size
        );

        let engine = builder.build(&graph, &weights, &options)?;
        tracing::info!(
            "{} engine ready on {} (input '{}', output '{}')",
            builder.name(),
            options.device,
            options.inputs.first().map(|n| n.name.as_str()).unwrap_or(""),
            options.outputs.first().map(|n| n.name.as_str()).unwrap_or(""),
        );

        Ok(Self {
            engine: Some(engine),
            backend: builder.name(),
            options,
            last_output: None,
        })
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn backend(&self) -> &'static str {
        self.backend
    }

    /// Runs one batch synchronously and keeps the output for
    /// [`output`](Self::output).
    pub fn run(&mut self, input: &[f32]) -> Result<&[f32], PredictorError> {
        let engine = self.engine.as_mut().ok_or(PredictorError::InvalidState {
            operation: "run",
            state: "closed",
        })?;

        let expected = self.options.input_len();
        if expected != 0 && input.len() != expected {
            return Err(PredictorError::Inference(format!(
                "input has {} elements, engine expects {expected}",
                input.len()
            )));
        }

        let output = engine.run(input)?;
        Ok(self.last_output.insert(output).as_slice())
    }

    /// Flat output of the most recent successful run.
    pub fn output(&self) -> Option<&[f32]> {
        self.last_output.as_deref()
    }

    /// Tears the engine down. Safe to call any number of times.
    pub fn close(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            engine.close();
            self.last_output = None;
            tracing::debug!("{} engine closed", self.backend);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.engine.is_none()
    }
}

impl Drop for EngineBinding {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for EngineBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineBinding")
            .field("backend", &self.backend)
            .field("options", &self.options)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Echo engine: output = input doubled. Counts closes.
    struct Echo {
        closes: Arc<AtomicUsize>,
    }

    impl Engine for Echo {
        fn run(&mut self, input: &[f32]) -> Result<Vec<f32>, PredictorError> {
            Ok(input.iter().map(|v| v * 2.0).collect())
        }

        fn close(&mut self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct EchoBuilder {
        closes: Arc<AtomicUsize>,
        seen: std::sync::Mutex<Option<(Vec<u8>, Vec<u8>, EngineOptions)>>,
    }

    impl EngineBuilder for EchoBuilder {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn build(
            &self,
            graph: &[u8],
            weights: &[u8],
            options: &EngineOptions,
        ) -> Result<Box<dyn Engine>, PredictorError> {
            *self.seen.lock().unwrap() = Some((graph.to_vec(), weights.to_vec(), options.clone()));
            Ok(Box::new(Echo {
                closes: self.closes.clone(),
            }))
        }
    }

    struct FailingBuilder;

    impl EngineBuilder for FailingBuilder {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn build(&self, _: &[u8], _: &[u8], _: &EngineOptions) -> Result<Box<dyn Engine>, PredictorError> {
            Err(PredictorError::EngineBuild {
                backend: "failing",
                detail: "unsupported layer".into(),
            })
        }
    }

    fn artifacts(dir: &std::path::Path) -> ArtifactSet {
        std::fs::write(dir.join("graph.pb"), b"GRAPH").unwrap();
        std::fs::write(dir.join("weights.bin"), b"WEIGHTS").unwrap();
        ArtifactSet {
            work_dir: dir.to_path_buf(),
            graph: dir.join("graph.pb"),
            weights: dir.join("weights.bin"),
            features: None,
        }
    }

    fn options(device: Device) -> EngineOptions {
        EngineOptions {
            device,
            batch_size: 2,
            inputs: vec![NodeSpec {
                name: "data".into(),
                shape: Some(Shape::new(vec![3])),
                dtype: DType::F32,
            }],
            outputs: vec![NodeSpec {
                name: "prob".into(),
                shape: None,
                dtype: DType::F32,
            }],
            enable_profiling: false,
        }
    }

    fn echo_builder() -> EchoBuilder {
        EchoBuilder {
            closes: Arc::new(AtomicUsize::new(0)),
            seen: std::sync::Mutex::new(None),
        }
    }

    #[test]
    fn test_construct_passes_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let builder = echo_builder();
        let cuda = Device::Cuda { device_id: 0 };
        let binding =
            EngineBinding::construct_with(&artifacts(dir.path()), options(cuda), &builder).unwrap();

        let (graph, weights, opts) = builder.seen.lock().unwrap().clone().unwrap();
        assert_eq!(graph, b"GRAPH");
        assert_eq!(weights, b"WEIGHTS");
        assert_eq!(opts.inputs[0].name, "data");
        assert!(opts.outputs[0].shape.is_none());
        assert_eq!(binding.backend(), "echo");
    }

    #[test]
    fn test_run_and_output() {
        let dir = tempfile::tempdir().unwrap();
        let builder = echo_builder();
        let mut binding = EngineBinding::construct_with(
            &artifacts(dir.path()),
            options(Device::Cuda { device_id: 0 }),
            &builder,
        )
        .unwrap();

        assert!(binding.output().is_none());
        let out = binding.run(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap().to_vec();
        assert_eq!(out, vec![2.0, 4.0, 6.0, 8.0, 10.0, 12.0]);
        assert_eq!(binding.output().unwrap(), out.as_slice());
    }

    #[test]
    fn test_run_wrong_input_len() {
        let dir = tempfile::tempdir().unwrap();
        let builder = echo_builder();
        let mut binding = EngineBinding::construct_with(
            &artifacts(dir.path()),
            options(Device::Cuda { device_id: 0 }),
            &builder,
        )
        .unwrap();
        assert!(matches!(binding.run(&[1.0]), Err(PredictorError::Inference(_))));
    }

    #[test]
    fn test_close_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let builder = echo_builder();
        let mut binding = EngineBinding::construct_with(
            &artifacts(dir.path()),
            options(Device::Cuda { device_id: 0 }),
            &builder,
        )
        .unwrap();

        binding.close();
        binding.close();
        drop(binding);
        assert_eq!(builder.closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_run_after_close() {
        let dir = tempfile::tempdir().unwrap();
        let builder = echo_builder();
        let mut binding = EngineBinding::construct_with(
            &artifacts(dir.path()),
            options(Device::Cuda { device_id: 0 }),
            &builder,
        )
        .unwrap();
        binding.close();
        assert!(binding.is_closed());
        assert!(matches!(
            binding.run(&[0.0; 6]),
            Err(PredictorError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_cpu_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = EngineBinding::construct_with(&artifacts(dir.path()), options(Device::Cpu), &echo_builder())
            .unwrap_err();
        assert!(matches!(err, PredictorError::DeviceUnavailable(_)));
    }

    #[test]
    fn test_build_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = EngineBinding::construct_with(
            &artifacts(dir.path()),
            options(Device::Cuda { device_id: 0 }),
            &FailingBuilder,
        )
        .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_missing_artifact() {
        let set = ArtifactSet {
            work_dir: PathBuf::from("/nonexistent"),
            graph: PathBuf::from("/nonexistent/g"),
            weights: PathBuf::from("/nonexistent/w"),
            features: None,
        };
        let err = EngineBinding::construct_with(
            &set,
            options(Device::Cuda { device_id: 0 }),
            &echo_builder(),
        )
        .unwrap_err();
        assert!(matches!(err, PredictorError::Artifact(_)));
    }
}
