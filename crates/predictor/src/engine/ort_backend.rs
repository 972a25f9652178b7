// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! onnxruntime backend.
//!
//! The graph artifact is the ONNX model. ONNX embeds its initializers, so
//! the weights artifact must be empty or the same file as the graph.
//!
//! With `enable_profiling` set, onnxruntime writes a JSON trace under the
//! builder's profile directory; the trace is finalized when the engine is
//! closed.

use super::{Engine, EngineBuilder, EngineOptions};
use crate::{Device, PredictorError};
use std::path::{Path, PathBuf};
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::{Session, SessionInputValue};

const BACKEND: &str = "onnxruntime";

/// Builds onnxruntime sessions on the CUDA execution provider.
#[derive(Debug, Clone)]
pub struct OrtEngineBuilder {
    profile_dir: PathBuf,
}

impl OrtEngineBuilder {
    /// Profiles, when enabled, go to the system temp directory.
    pub fn new() -> Self {
        Self {
            profile_dir: std::env::temp_dir(),
        }
    }

    /// Writes session profiles under `dir`.
    pub fn with_profile_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.profile_dir = dir.into();
        self
    }
}

impl Default for OrtEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Profile file prefix for a session, or `None` when profiling is off.
fn profile_prefix(dir: &Path, options: &EngineOptions) -> Option<PathBuf> {
    if !options.enable_profiling {
        return None;
    }
    let node = options
        .outputs
        .first()
        .map(|n| n.name.as_str())
        .unwrap_or("engine");
    let node: String = node
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    Some(dir.join(format!("pred-rt-{BACKEND}-{node}")))
}

fn build_err(detail: impl std::fmt::Display) -> PredictorError {
    PredictorError::EngineBuild {
        backend: BACKEND,
        detail: detail.to_string(),
    }
}

impl EngineBuilder for OrtEngineBuilder {
    fn name(&self) -> &'static str {
        BACKEND
    }

    fn build(
        &self,
        graph: &[u8],
        weights: &[u8],
        options: &EngineOptions,
    ) -> Result<Box<dyn Engine>, PredictorError> {
        if !weights.is_empty() && weights != graph {
            return Err(build_err(
                "separate weights are not supported; ONNX graphs embed their initializers",
            ));
        }
        let input = options
            .inputs
            .first()
            .ok_or_else(|| build_err("no input node"))?;
        let output = options
            .outputs
            .first()
            .ok_or_else(|| build_err("no output node"))?;
        let sample_shape = input
            .shape
            .as_ref()
            .ok_or_else(|| build_err("input node has no shape"))?;

        let builder = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .map_err(build_err)?;
        let builder = configure_device(builder, options.device)?;
        let builder = match profile_prefix(&self.profile_dir, options) {
            Some(prefix) => {
                tracing::debug!("onnxruntime profiling to {}*", prefix.display());
                builder.with_profiling(&prefix).map_err(build_err)?
            }
            None => builder,
        };
        let session = builder.commit_from_memory(graph).map_err(build_err)?;

        if !session.inputs.iter().any(|i| i.name == input.name) {
            return Err(build_err(format!("graph has no input named '{}'", input.name)));
        }
        if !session.outputs.iter().any(|o| o.name == output.name) {
            return Err(build_err(format!("graph has no output named '{}'", output.name)));
        }

        let mut input_shape = vec![options.batch_size];
        input_shape.extend_from_slice(sample_shape.dims());

        Ok(Box::new(OrtEngine {
            session,
            input_name: input.name.clone(),
            output_name: output.name.clone(),
            input_shape,
            profiling: options.enable_profiling,
        }))
    }
}

fn configure_device(builder: SessionBuilder, device: Device) -> Result<SessionBuilder, PredictorError> {
    match device {
        Device::Cpu => Err(PredictorError::DeviceUnavailable(
            "onnxruntime engine requires a GPU".into(),
        )),
        Device::Cuda { device_id } => configure_cuda(builder, device_id),
    }
}

fn configure_cuda(builder: SessionBuilder, device_id: u32) -> Result<SessionBuilder, PredictorError> {
    #[cfg(feature = "cuda")]
    {
        use ort::execution_providers::cuda::CUDAExecutionProvider;
        let ep = CUDAExecutionProvider::default()
            .with_device_id(device_id as i32)
            .build();
        builder
            .with_execution_providers([ep])
            .map_err(|e| PredictorError::DeviceUnavailable(format!("CUDA provider: {e}")))
    }
    #[cfg(not(feature = "cuda"))]
    {
        let _ = (builder, device_id);
        Err(PredictorError::DeviceUnavailable(
            "predictor was built without the `cuda` feature".into(),
        ))
    }
}

struct OrtEngine {
    session: Session,
    input_name: String,
    output_name: String,
    input_shape: Vec<usize>,
    profiling: bool,
}

impl Engine for OrtEngine {
    fn run(&mut self, input: &[f32]) -> Result<Vec<f32>, PredictorError> {
        let infer_err = |e: ort::Error| PredictorError::Inference(e.to_string());

        let value = ort::value::Tensor::from_array((self.input_shape.clone(), input.to_vec()))
            .map_err(infer_err)?
            .into_dyn();
        let inputs = vec![(self.input_name.clone(), SessionInputValue::from(value))];
        let outputs = self.session.run(inputs).map_err(infer_err)?;

        for (name, value) in outputs.iter() {
            if name == self.output_name {
                let array = value.try_extract_array::<f32>().map_err(infer_err)?;
                return Ok(array.iter().copied().collect());
            }
        }
        Err(PredictorError::Inference(format!(
            "output '{}' missing from session results",
            self.output_name
        )))
    }

    fn close(&mut self) {
        if !self.profiling {
            return;
        }
        match self.session.end_profiling() {
            Ok(file) => tracing::info!("onnxruntime profile written to {}", file),
            Err(e) => tracing::warn!("failed to finish onnxruntime profile: {}", e),
        }
    }
}
