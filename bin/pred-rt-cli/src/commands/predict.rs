// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `pred-rt predict` command: classify one raw image.
//!
//! ```text
//! raw RGB8 → preprocess → Predictor::load → predict → read_predicted_features → close
//! ```

use super::truncate;
use model_manifest::ModelManifest;
use predictor::{Device, PredictorConfig, PredictorError, PredictorRegistry};
use std::path::PathBuf;
use tensor_core::{preprocess, ColorMode, PixelBuffer};

/// Arguments of one predict invocation.
pub struct Request {
    pub manifest: PathBuf,
    pub image: PathBuf,
    pub width: usize,
    pub height: usize,
    pub top_k: usize,
    pub device: Option<String>,
    pub batch_size: Option<usize>,
}

pub fn execute(
    config: &PredictorConfig,
    registry: &PredictorRegistry,
    request: Request,
) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║              pred-rt · Image Classifier              ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    if super::engine_builder().is_none() {
        anyhow::bail!("no engine backend compiled in; rebuild pred-rt with `--features ort`");
    }

    // ── Configuration ──────────────────────────────────────────
    let mut options = config.predict_options()?;
    if let Some(device) = &request.device {
        options.device = Device::parse(device)?;
    }
    if let Some(batch) = request.batch_size {
        options.batch_size = batch;
    }

    let manifest = ModelManifest::from_file(&request.manifest).map_err(|e| {
        anyhow::anyhow!(
            "failed to load manifest '{}': {e}",
            request.manifest.display()
        )
    })?;

    println!("  Config:");
    println!("   Model:    {}", manifest.canonical_name());
    println!("   Device:   {}", options.device);
    println!("   Batch:    {}", options.batch_size);
    println!("   Image:    {}", truncate(&request.image.display().to_string(), 50));
    println!();

    let bytes = std::fs::read(&request.image).map_err(|e| {
        anyhow::anyhow!("cannot read image '{}': {e}", request.image.display())
    })?;
    let pixels = PixelBuffer::new(request.width, request.height, 3, ColorMode::Rgb, bytes)?;

    // ── Load ───────────────────────────────────────────────────
    println!("  [1/3] Loading predictor...");
    let mut predictor = match registry.open(&manifest, options) {
        Ok(p) => p,
        Err(e) => return Err(abort_if_fatal(e)),
    };

    let Some(descriptor) = predictor.descriptor().cloned() else {
        anyhow::bail!("predictor loaded without a descriptor");
    };
    if descriptor.width() != request.width || descriptor.height() != request.height {
        predictor.close()?;
        anyhow::bail!(
            "image is {}x{}, model expects {}x{} (resize before predicting)",
            request.width,
            request.height,
            descriptor.width(),
            descriptor.height()
        );
    }

    // ── Predict ────────────────────────────────────────────────
    println!("  [2/3] Running inference...");
    let sample = preprocess(
        &pixels,
        descriptor.layout,
        descriptor.color_mode,
        &descriptor.normalization(),
    )?;
    let result = predictor
        .predict(&[sample])
        .and_then(|()| predictor.read_predicted_features());
    let sets = match result {
        Ok(sets) => sets,
        Err(e) => {
            predictor.close()?;
            return Err(e.into());
        }
    };

    // ── Results ────────────────────────────────────────────────
    println!("  [3/3] Top {} classes:", request.top_k);
    println!();
    println!("  {:<6} {:<50} {:>10}", "Index", "Label", "Prob.");
    println!("  {}", "-".repeat(68));
    if let Some(set) = sets.first() {
        for f in set.top_k(request.top_k) {
            println!(
                "  {:<6} {:<50} {:>10.6}",
                f.index,
                truncate(&f.name, 50),
                f.probability
            );
        }
    }
    println!();
    println!("{}", predictor.metrics().summary());

    predictor.close()?;
    Ok(())
}

/// Fatal errors abort the process; everything else is returned.
fn abort_if_fatal(e: PredictorError) -> anyhow::Error {
    if e.is_fatal() {
        tracing::error!("fatal: {e}");
        eprintln!("fatal: {e}");
        std::process::exit(2);
    }
    e.into()
}
