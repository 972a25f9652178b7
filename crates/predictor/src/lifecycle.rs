// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The predictor lifecycle.
//!
//! ```text
//!            load()                 ok
//! Unloaded ─────────► Loading ─────────► Ready ◄──┐ predict()
//!                        │                 │  └───┘ read_predicted_features()
//!                        │ err             │ close()
//!                        ▼                 ▼
//!                     Failed ──close()──► Closed ◄── close() from any state
//! ```
//!
//! `load` runs each expensive step once, in order: descriptor resolution,
//! artifact acquisition, device resolution, engine construction. The engine
//! handle exists only in `Ready`; every failure before that leaves nothing
//! to release. `Failed` is terminal.
//!
//! A predictor is not re-entrant. Callers that share one across threads
//! must serialize access (e.g. behind a `Mutex`).

use crate::config::{PredictOptions, PredictorConfig};
use crate::decode::{decode, FeatureSet};
use crate::device::{resolve_device, DeviceProbe, SystemProbe};
use crate::engine::{EngineBinding, EngineBuilder, EngineOptions};
use crate::{PredictorError, PredictorMetrics};
use artifact_store::{ArtifactSet, ArtifactStore, Fetcher, UrlFetcher};
use model_manifest::{ModelDescriptor, ModelManifest};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tensor_core::{assemble, Tensor, TensorError};

/// Where a predictor is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Unloaded,
    Loading,
    Ready,
    Closed,
    Failed,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unloaded => "unloaded",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Closed => "closed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The collaborators a predictor is built from.
#[derive(Clone)]
pub struct PredictorEnv {
    pub fetcher: Arc<dyn Fetcher>,
    pub builder: Arc<dyn EngineBuilder>,
    pub probe: Arc<dyn DeviceProbe>,
    /// Root of the per-model work directories.
    pub work_root: PathBuf,
}

impl PredictorEnv {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        builder: Arc<dyn EngineBuilder>,
        probe: Arc<dyn DeviceProbe>,
        work_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            fetcher,
            builder,
            probe,
            work_root: work_root.into(),
        }
    }

    /// Network fetcher and system GPU probe configured from `config`.
    pub fn from_config(
        config: &PredictorConfig,
        builder: Arc<dyn EngineBuilder>,
    ) -> Result<Self, PredictorError> {
        let fetcher = UrlFetcher::new(config.fetch_policy())?;
        Ok(Self::new(
            Arc::new(fetcher),
            builder,
            Arc::new(SystemProbe::new()),
            config.work_root.clone(),
        ))
    }
}

impl fmt::Debug for PredictorEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredictorEnv")
            .field("builder", &self.builder.name())
            .field("work_root", &self.work_root)
            .finish()
    }
}

/// An image-classification predictor.
///
/// # Example
/// ```no_run
/// use predictor::{PredictOptions, Predictor, PredictorEnv};
/// # fn example(env: PredictorEnv, manifest: model_manifest::ModelManifest,
/// #            sample: tensor_core::Tensor) -> Result<(), predictor::PredictorError> {
/// let mut p = Predictor::open(env, &manifest, PredictOptions::default())?;
/// p.predict(&[sample])?;
/// for set in p.read_predicted_features()? {
///     println!("{:?}", set.best());
/// }
/// p.close()?;
/// # Ok(())
/// # }
/// ```
pub struct Predictor {
    env: PredictorEnv,
    state: LifecycleState,
    options: PredictOptions,
    descriptor: Option<ModelDescriptor>,
    artifacts: Option<ArtifactSet>,
    engine: Option<EngineBinding>,
    labels: Vec<String>,
    /// Samples submitted in the last successful predict.
    pending: Option<usize>,
    metrics: PredictorMetrics,
}

/// Everything `load` produces, committed only on success.
struct Loaded {
    descriptor: ModelDescriptor,
    artifacts: ArtifactSet,
    labels: Vec<String>,
    engine: EngineBinding,
}

impl Predictor {
    /// An unloaded predictor.
    pub fn new(env: PredictorEnv) -> Self {
        Self {
            env,
            state: LifecycleState::Unloaded,
            options: PredictOptions::default(),
            descriptor: None,
            artifacts: None,
            engine: None,
            labels: Vec::new(),
            pending: None,
            metrics: PredictorMetrics::new(),
        }
    }

    /// Creates and loads a predictor in one step.
    pub fn open(
        env: PredictorEnv,
        manifest: &ModelManifest,
        options: PredictOptions,
    ) -> Result<Self, PredictorError> {
        let mut predictor = Self::new(env);
        predictor.load(manifest, options)?;
        Ok(predictor)
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn descriptor(&self) -> Option<&ModelDescriptor> {
        self.descriptor.as_ref()
    }

    pub fn artifacts(&self) -> Option<&ArtifactSet> {
        self.artifacts.as_ref()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn options(&self) -> &PredictOptions {
        &self.options
    }

    pub fn metrics(&self) -> &PredictorMetrics {
        &self.metrics
    }

    // ── Unloaded → Loading → Ready | Failed ────────────────────

    /// Prepares the model for inference. Valid only once, from `Unloaded`.
    pub fn load(
        &mut self,
        manifest: &ModelManifest,
        options: PredictOptions,
    ) -> Result<(), PredictorError> {
        self.expect_state(LifecycleState::Unloaded, "load")?;
        self.state = LifecycleState::Loading;
        self.options = options;
        tracing::info!("loading {}", manifest.canonical_name());

        let start = Instant::now();
        match self.load_inner(manifest) {
            Ok(loaded) => {
                self.descriptor = Some(loaded.descriptor);
                self.artifacts = Some(loaded.artifacts);
                self.labels = loaded.labels;
                self.engine = Some(loaded.engine);
                self.state = LifecycleState::Ready;
                if self.options.enable_profiling {
                    self.metrics.record_load(start.elapsed());
                }
                tracing::info!(
                    "{} ready in {:.2}s",
                    manifest.canonical_name(),
                    start.elapsed().as_secs_f64()
                );
                Ok(())
            }
            Err(e) => {
                self.state = LifecycleState::Failed;
                tracing::warn!("loading {} failed: {}", manifest.canonical_name(), e);
                Err(e)
            }
        }
    }

    fn load_inner(&self, manifest: &ModelManifest) -> Result<Loaded, PredictorError> {
        let options = &self.options;

        // Configuration is checked before any I/O.
        let descriptor = ModelDescriptor::resolve(manifest, options.batch_size)
            .map_err(|e| PredictorError::Configuration(e.to_string()))?;
        if !options.device.is_gpu() {
            return Err(PredictorError::Configuration(format!(
                "device {} is not supported: the engine requires a GPU",
                options.device
            )));
        }

        let work_dir = descriptor.work_dir(&self.env.work_root);
        let store = ArtifactStore::new(self.env.fetcher.clone());
        let artifacts = store.acquire(&descriptor, &work_dir)?;

        let labels = if descriptor.labels.is_empty() {
            artifacts.read_labels()?
        } else {
            descriptor.labels.clone()
        };
        if labels.is_empty() {
            return Err(PredictorError::Configuration(format!(
                "{} declares no labels and no features file",
                manifest.canonical_name()
            )));
        }

        let device = resolve_device(options.device, self.env.probe.as_ref())?;

        let mut engine_options = EngineOptions::from_descriptor(&descriptor, device, options.batch_size);
        engine_options.enable_profiling = options.enable_profiling;
        let engine =
            EngineBinding::construct_with(&artifacts, engine_options, self.env.builder.as_ref())?;

        Ok(Loaded {
            descriptor,
            artifacts,
            labels,
            engine,
        })
    }

    // ── Ready ──────────────────────────────────────────────────

    /// Runs one batch of per-sample tensors.
    ///
    /// Each sample must hold exactly one input sample's worth of elements
    /// and all samples must share a shape. Fewer samples than the batch
    /// size are zero-padded; more is an error.
    pub fn predict(&mut self, samples: &[Tensor]) -> Result<(), PredictorError> {
        self.expect_state(LifecycleState::Ready, "predict")?;
        self.pending = None;

        let (sample_len, expected_shape) = match &self.descriptor {
            Some(d) => (d.sample_len(), d.input_shape.clone()),
            None => return Err(self.invalid("predict")),
        };

        let start = Instant::now();
        let batch = assemble(samples)?;
        if batch.sample_len() != sample_len {
            return Err(TensorError::ShapeMismatch {
                op: "predict",
                index: 0,
                expected: expected_shape,
                actual: batch.sample_shape().clone(),
            }
            .into());
        }
        let submitted = batch.batch();
        let batch = batch.pad_to(self.options.batch_size)?;

        let engine = self.engine.as_mut().ok_or(PredictorError::InvalidState {
            operation: "predict",
            state: "closed",
        })?;
        engine.run(batch.as_slice())?;

        self.pending = Some(submitted);
        if self.options.enable_profiling {
            self.metrics.record_predict(submitted, start.elapsed());
        }
        tracing::debug!("predicted {} sample(s) in {:?}", submitted, start.elapsed());
        Ok(())
    }

    /// Decodes the output of the last successful [`predict`](Self::predict),
    /// one [`FeatureSet`] per submitted sample.
    pub fn read_predicted_features(&self) -> Result<Vec<FeatureSet>, PredictorError> {
        self.expect_state(LifecycleState::Ready, "read predicted features")?;
        let (Some(submitted), Some(output)) =
            (self.pending, self.engine.as_ref().and_then(|e| e.output()))
        else {
            return Err(PredictorError::InvalidState {
                operation: "read predicted features",
                state: "ready without a prediction",
            });
        };

        let mut sets = decode(output, self.options.batch_size, &self.labels)?;
        sets.truncate(submitted);
        Ok(sets)
    }

    // ── Any → Closed ───────────────────────────────────────────

    /// Releases the engine. Valid from any state and idempotent.
    pub fn close(&mut self) -> Result<(), PredictorError> {
        if let Some(mut engine) = self.engine.take() {
            engine.close();
        }
        self.pending = None;
        if self.state != LifecycleState::Closed {
            tracing::debug!("predictor closed from state {}", self.state);
            self.state = LifecycleState::Closed;
        }
        Ok(())
    }

    fn expect_state(
        &self,
        expected: LifecycleState,
        operation: &'static str,
    ) -> Result<(), PredictorError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(self.invalid(operation))
        }
    }

    fn invalid(&self, operation: &'static str) -> PredictorError {
        PredictorError::InvalidState {
            operation,
            state: self.state.as_str(),
        }
    }
}

impl Drop for Predictor {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

impl fmt::Debug for Predictor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predictor")
            .field("state", &self.state)
            .field("model", &self.descriptor.as_ref().map(|d| d.summary()))
            .field("engine", &self.engine)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::Device;
    use artifact_store::{ArtifactError, Checksum};
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tensor_core::Shape;

    const GRAPH: &[u8] = b"graph";
    const WEIGHTS: &[u8] = b"weights";

    /// Writes fixed bodies for every URL and counts fetches.
    #[derive(Default)]
    struct StaticFetcher {
        calls: AtomicUsize,
    }

    impl Fetcher for StaticFetcher {
        fn fetch(&self, url: &str, dest: &Path, _: Option<&Checksum>) -> Result<(), ArtifactError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let body = if url.ends_with("graph.bin") { GRAPH } else { WEIGHTS };
            std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
            std::fs::write(dest, body).unwrap();
            Ok(())
        }
    }

    struct Probe(usize);

    impl DeviceProbe for Probe {
        fn gpu_count(&self) -> usize {
            self.0
        }
    }

    /// Softmax-free engine: class j of sample i scores `sum(sample i) + j`.
    struct SumEngine {
        classes: usize,
        sample_len: usize,
        closes: Arc<AtomicUsize>,
    }

    impl Engine for SumEngine {
        fn run(&mut self, input: &[f32]) -> Result<Vec<f32>, PredictorError> {
            Ok(input
                .chunks(self.sample_len)
                .flat_map(|s| {
                    let sum: f32 = s.iter().sum();
                    (0..self.classes).map(move |j| sum + j as f32)
                })
                .collect())
        }

        fn close(&mut self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct SumBuilder {
        builds: AtomicUsize,
        closes: Arc<AtomicUsize>,
        profiling: AtomicBool,
    }

    impl EngineBuilder for SumBuilder {
        fn name(&self) -> &'static str {
            "sum"
        }

        fn build(
            &self,
            _: &[u8],
            _: &[u8],
            options: &EngineOptions,
        ) -> Result<Box<dyn Engine>, PredictorError> {
            self.builds.fetch_add(1, Ordering::SeqCst);
            self.profiling.store(options.enable_profiling, Ordering::SeqCst);
            let sample_len = options.inputs[0].shape.as_ref().unwrap().num_elements();
            Ok(Box::new(SumEngine {
                classes: 2,
                sample_len,
                closes: self.closes.clone(),
            }))
        }
    }

    fn manifest() -> ModelManifest {
        let md5 = |b: &[u8]| format!("{:x}", md5::compute(b));
        let json = format!(
            r#"{{
                "name": "tiny", "version": "1",
                "framework": {{ "name": "TensorRT", "version": "2" }},
                "inputs": [{{ "type": "image",
                    "parameters": {{ "dimensions": [1, 2, 2], "input_layer": "data" }} }}],
                "output": {{ "type": "feature",
                    "parameters": {{ "probabilities_layer": "prob" }} }},
                "model": {{ "base_url": "http://m.test", "graph_path": "graph.bin",
                    "weights_path": "weights.bin",
                    "graph_checksum": "{}", "weights_checksum": "{}" }},
                "labels": ["even", "odd"]
            }}"#,
            md5(GRAPH),
            md5(WEIGHTS)
        );
        ModelManifest::from_json(&json).unwrap()
    }

    /// Engine with a fixed output length whose first `failures` runs fail.
    struct ScriptedEngine {
        failures: usize,
        output_len: usize,
    }

    impl Engine for ScriptedEngine {
        fn run(&mut self, _: &[f32]) -> Result<Vec<f32>, PredictorError> {
            if self.failures > 0 {
                self.failures -= 1;
                return Err(PredictorError::Inference("CUDA error: unspecified launch failure".into()));
            }
            Ok((0..self.output_len).map(|i| i as f32 / 10.0).collect())
        }
    }

    struct ScriptedBuilder {
        failures: usize,
        output_len: usize,
    }

    impl EngineBuilder for ScriptedBuilder {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn build(
            &self,
            _: &[u8],
            _: &[u8],
            _: &EngineOptions,
        ) -> Result<Box<dyn Engine>, PredictorError> {
            Ok(Box::new(ScriptedEngine {
                failures: self.failures,
                output_len: self.output_len,
            }))
        }
    }

    /// Rejects every graph, counting attempts.
    #[derive(Default)]
    struct RejectingBuilder {
        builds: AtomicUsize,
    }

    impl EngineBuilder for RejectingBuilder {
        fn name(&self) -> &'static str {
            "rejecting"
        }

        fn build(
            &self,
            _: &[u8],
            _: &[u8],
            _: &EngineOptions,
        ) -> Result<Box<dyn Engine>, PredictorError> {
            self.builds.fetch_add(1, Ordering::SeqCst);
            Err(PredictorError::EngineBuild {
                backend: "rejecting",
                detail: "unsupported layer type 'LRN'".into(),
            })
        }
    }

    fn env_with(dir: &Path, gpus: usize, builder: Arc<dyn EngineBuilder>) -> PredictorEnv {
        PredictorEnv::new(
            Arc::new(StaticFetcher::default()),
            builder,
            Arc::new(Probe(gpus)),
            dir,
        )
    }

    fn env(dir: &Path, gpus: usize, builder: Arc<SumBuilder>) -> PredictorEnv {
        env_with(dir, gpus, builder)
    }

    fn options(batch_size: usize) -> PredictOptions {
        PredictOptions {
            device: Device::Cuda { device_id: 0 },
            batch_size,
            enable_profiling: true,
        }
    }

    fn sample(fill: f32) -> Tensor {
        Tensor::from_vec(Shape::new(vec![1, 2, 2]), vec![fill; 4]).unwrap()
    }

    #[test]
    fn test_load_predict_read_close() {
        let dir = tempfile::tempdir().unwrap();
        let builder = Arc::new(SumBuilder::default());
        let mut p = Predictor::open(env(dir.path(), 1, builder.clone()), &manifest(), options(1)).unwrap();
        assert_eq!(p.state(), LifecycleState::Ready);
        assert_eq!(p.labels(), &["even".to_string(), "odd".to_string()]);

        p.predict(&[sample(1.0)]).unwrap();
        let sets = p.read_predicted_features().unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].features[0].probability, 4.0);
        assert_eq!(sets[0].features[1].probability, 5.0);
        assert_eq!(sets[0].best().unwrap().name, "odd");
        assert_eq!(p.metrics().predict_calls, 1);

        p.close().unwrap();
        assert_eq!(p.state(), LifecycleState::Closed);
        assert_eq!(builder.closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_partial_batch_is_padded_and_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let builder = Arc::new(SumBuilder::default());
        let mut p = Predictor::open(env(dir.path(), 1, builder), &manifest(), options(4)).unwrap();

        p.predict(&[sample(1.0), sample(2.0)]).unwrap();
        let sets = p.read_predicted_features().unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[1].features[0].probability, 8.0);
    }

    #[test]
    fn test_batch_overflow_is_recoverable() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = Predictor::open(env(dir.path(), 1, Arc::default()), &manifest(), options(1)).unwrap();

        let err = p.predict(&[sample(1.0), sample(2.0)]).unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(p.state(), LifecycleState::Ready);
        p.predict(&[sample(1.0)]).unwrap();
    }

    #[test]
    fn test_wrong_sample_size() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = Predictor::open(env(dir.path(), 1, Arc::default()), &manifest(), options(1)).unwrap();
        let bad = Tensor::from_vec(Shape::new(vec![3]), vec![0.0; 3]).unwrap();
        let err = p.predict(&[bad]).unwrap_err();
        assert!(matches!(err, PredictorError::Tensor(TensorError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_empty_input() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = Predictor::open(env(dir.path(), 1, Arc::default()), &manifest(), options(1)).unwrap();
        assert!(matches!(
            p.predict(&[]),
            Err(PredictorError::Tensor(TensorError::EmptyInput { .. }))
        ));
    }

    #[test]
    fn test_read_before_predict() {
        let dir = tempfile::tempdir().unwrap();
        let p = Predictor::open(env(dir.path(), 1, Arc::default()), &manifest(), options(1)).unwrap();
        assert!(matches!(
            p.read_predicted_features(),
            Err(PredictorError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_predict_before_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = Predictor::new(env(dir.path(), 1, Arc::default()));
        let err = p.predict(&[sample(0.0)]).unwrap_err();
        assert!(err.to_string().contains("unloaded"));
    }

    #[test]
    fn test_no_gpu_fails_load_fatally() {
        let dir = tempfile::tempdir().unwrap();
        let builder = Arc::new(SumBuilder::default());
        let mut p = Predictor::new(env(dir.path(), 0, builder.clone()));
        let err = p.load(&manifest(), options(1)).unwrap_err();

        assert!(matches!(err, PredictorError::DeviceUnavailable(_)));
        assert!(err.is_fatal());
        assert_eq!(p.state(), LifecycleState::Failed);
        assert_eq!(builder.builds.load(Ordering::SeqCst), 0);

        // Failed is terminal.
        assert!(p.load(&manifest(), options(1)).is_err());
        p.close().unwrap();
        assert_eq!(p.state(), LifecycleState::Closed);
    }

    #[test]
    fn test_cpu_is_configuration_error_before_io() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(StaticFetcher::default());
        let env = PredictorEnv::new(
            fetcher.clone(),
            Arc::new(SumBuilder::default()),
            Arc::new(Probe(1)),
            dir.path(),
        );
        let opts = PredictOptions {
            device: Device::Cpu,
            ..options(1)
        };
        let err = Predictor::open(env, &manifest(), opts).unwrap_err();
        assert!(matches!(err, PredictorError::Configuration(_)));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_two_inputs_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = manifest();
        m.inputs.push(m.inputs[0].clone());
        let err = Predictor::open(env(dir.path(), 1, Arc::default()), &m, options(1)).unwrap_err();
        assert!(matches!(err, PredictorError::Configuration(_)));
        assert!(err.to_string().contains("number of inputs"));
    }

    #[test]
    fn test_missing_labels() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = manifest();
        m.labels.clear();
        let err = Predictor::open(env(dir.path(), 1, Arc::default()), &m, options(1)).unwrap_err();
        assert!(matches!(err, PredictorError::Configuration(_)));
    }

    #[test]
    fn test_close_before_load_and_twice() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = Predictor::new(env(dir.path(), 1, Arc::default()));
        p.close().unwrap();
        p.close().unwrap();
        assert_eq!(p.state(), LifecycleState::Closed);
        assert!(p.load(&manifest(), options(1)).is_err());
    }

    #[test]
    fn test_inference_error_keeps_predictor_ready() {
        let dir = tempfile::tempdir().unwrap();
        let builder = Arc::new(ScriptedBuilder {
            failures: 1,
            output_len: 2,
        });
        let mut p = Predictor::open(env_with(dir.path(), 1, builder), &manifest(), options(1)).unwrap();

        let err = p.predict(&[sample(1.0)]).unwrap_err();
        assert!(matches!(err, PredictorError::Inference(_)));
        assert!(err.is_recoverable());
        assert_eq!(p.state(), LifecycleState::Ready);
        assert!(matches!(
            p.read_predicted_features(),
            Err(PredictorError::InvalidState { .. })
        ));
        assert_eq!(p.metrics().predict_calls, 0);

        p.predict(&[sample(1.0)]).unwrap();
        let sets = p.read_predicted_features().unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].features[1].probability, 0.1);
    }

    #[test]
    fn test_engine_build_failure_is_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let builder = Arc::new(RejectingBuilder::default());
        let mut p = Predictor::new(env_with(dir.path(), 1, builder.clone()));

        let err = p.load(&manifest(), options(1)).unwrap_err();
        assert!(matches!(err, PredictorError::EngineBuild { .. }));
        assert!(err.is_fatal());
        assert_eq!(p.state(), LifecycleState::Failed);
        assert!(p.descriptor().is_none());
        assert!(format!("{p:?}").contains("engine: None"));

        assert!(matches!(
            p.predict(&[sample(1.0)]),
            Err(PredictorError::InvalidState { state: "failed", .. })
        ));
        p.close().unwrap();
        p.close().unwrap();
        assert_eq!(p.state(), LifecycleState::Closed);
        assert_eq!(builder.builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_output_length_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let builder = Arc::new(ScriptedBuilder {
            failures: 0,
            output_len: 3,
        });
        let mut p = Predictor::open(env_with(dir.path(), 1, builder), &manifest(), options(1)).unwrap();

        p.predict(&[sample(1.0)]).unwrap();
        assert!(matches!(
            p.read_predicted_features(),
            Err(PredictorError::LengthMismatch(_))
        ));
        assert_eq!(p.state(), LifecycleState::Ready);
    }

    #[test]
    fn test_profiling_flag_reaches_engine() {
        let dir = tempfile::tempdir().unwrap();
        let builder = Arc::new(SumBuilder::default());
        let opts = PredictOptions {
            enable_profiling: false,
            ..options(1)
        };
        let p = Predictor::open(env(dir.path(), 1, builder.clone()), &manifest(), opts).unwrap();
        assert!(!builder.profiling.load(Ordering::SeqCst));
        assert_eq!(p.metrics().load_duration, std::time::Duration::ZERO);
        drop(p);

        let builder = Arc::new(SumBuilder::default());
        Predictor::open(env(dir.path(), 1, builder.clone()), &manifest(), options(1)).unwrap();
        assert!(builder.profiling.load(Ordering::SeqCst));
    }

    #[test]
    fn test_drop_closes_engine_once() {
        let dir = tempfile::tempdir().unwrap();
        let builder = Arc::new(SumBuilder::default());
        {
            let mut p =
                Predictor::open(env(dir.path(), 1, builder.clone()), &manifest(), options(1)).unwrap();
            p.close().unwrap();
        }
        assert_eq!(builder.closes.load(Ordering::SeqCst), 1);
    }
}
