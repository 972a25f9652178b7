// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `pred-rt inspect` command: display the resolved model descriptor.

use super::truncate;
use model_manifest::{ArtifactSource, ModelDescriptor, ModelManifest};
use predictor::PredictorConfig;
use std::path::PathBuf;

pub fn execute(config: &PredictorConfig, manifest: PathBuf) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║               pred-rt · Model Inspector              ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let model = ModelManifest::from_file(&manifest).map_err(|e| {
        anyhow::anyhow!("failed to load manifest '{}': {e}", manifest.display())
    })?;
    let d = ModelDescriptor::resolve(&model, config.batch_size.max(1))?;

    // ── Summary ────────────────────────────────────────────────
    println!("  Model:      {}", model.canonical_name());
    println!("  Framework:  {} {}", d.framework, d.framework_version);
    println!("  Batch size: {}", d.batch_size);
    println!();

    // ── Input / Output ─────────────────────────────────────────
    println!("  Input");
    println!("   Layer:    {}", d.input_layer);
    println!("   Shape:    {} ({:?})", d.input_shape, d.layout);
    println!(
        "   Image:    {}x{} with {} channels, {:?}",
        d.width(),
        d.height(),
        d.channels(),
        d.color_mode
    );
    println!("   Mean:     {:?}", d.mean);
    println!("   Scale:    {:?}", d.scale);
    println!();
    println!("  Output");
    println!("   Layer:    {}", d.output_layer);
    if d.labels.is_empty() {
        println!("   Labels:   from features file");
    } else {
        println!("   Labels:   {} inline", d.labels.len());
    }
    println!();

    // ── Artifacts ──────────────────────────────────────────────
    println!("  Artifacts");
    if let Some(url) = &d.archive_url {
        println!("   Archive:  {}", truncate(url, 60));
    }
    print_source("Graph", &d.graph);
    print_source("Weights", &d.weights);
    match &d.features {
        Some(f) => print_source("Features", f),
        None => println!("   {:<9} (none)", "Features"),
    }
    println!();
    println!("  Work dir:   {}", d.work_dir(&config.work_root).display());

    Ok(())
}

fn print_source(label: &str, source: &ArtifactSource) {
    let checksum = if source.checksum.is_empty() {
        "-".to_string()
    } else {
        truncate(&source.checksum, 16)
    };
    println!(
        "   {:<9} {:<48} {}",
        label,
        truncate(&source.url, 48),
        checksum
    );
}
