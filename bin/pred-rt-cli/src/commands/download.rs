// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `pred-rt download` command: fetch and verify artifacts only.

use artifact_store::{ArtifactStore, UrlFetcher};
use model_manifest::{ModelDescriptor, ModelManifest};
use predictor::PredictorConfig;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

pub fn execute(
    config: &PredictorConfig,
    manifest: PathBuf,
    work_root: Option<PathBuf>,
) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║             pred-rt · Artifact Download              ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let model = ModelManifest::from_file(&manifest).map_err(|e| {
        anyhow::anyhow!("failed to load manifest '{}': {e}", manifest.display())
    })?;
    let descriptor = ModelDescriptor::resolve(&model, config.batch_size.max(1))?;

    let root = work_root.unwrap_or_else(|| config.work_root.clone());
    let work_dir = descriptor.work_dir(&root);

    println!("  Model:    {}", model.canonical_name());
    println!("  Work dir: {}", work_dir.display());
    if let Some(url) = &descriptor.archive_url {
        println!("  Archive:  {url}");
    }
    println!();

    let fetcher = UrlFetcher::new(config.fetch_policy())?;
    let store = ArtifactStore::new(Arc::new(fetcher));

    let start = Instant::now();
    let set = store.download(&descriptor, &work_dir)?;

    println!("  Verified artifacts:");
    println!("   Graph:    {}", set.graph.display());
    println!("   Weights:  {}", set.weights.display());
    match &set.features {
        Some(path) => println!("   Features: {}", path.display()),
        None => println!("   Features: (none)"),
    }
    println!();
    println!("  Done in {:.2}s", start.elapsed().as_secs_f64());

    Ok(())
}
