// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Artifact acquisition: descriptor in, verified local paths out.
//!
//! # Flow
//! ```text
//! ModelDescriptor ──► check checksums declared ──► per artifact:
//!                                                    on disk + matches? ──► skip
//!                                                    else fetch ──► re-verify
//!                 ──► ArtifactSet { graph, weights, features }
//! ```
//!
//! Archive-distributed models skip per-file checksums: the archive is
//! fetched, extracted into the work directory and removed.

use crate::archive::extract_zip;
use crate::{ArtifactError, Checksum, Fetcher};
use model_manifest::{ArtifactSource, ModelDescriptor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Verified on-disk artifacts for one model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSet {
    pub work_dir: PathBuf,
    pub graph: PathBuf,
    pub weights: PathBuf,
    /// Labels file; `None` when the manifest has no features URL.
    pub features: Option<PathBuf>,
}

impl ArtifactSet {
    pub fn read_graph(&self) -> Result<Vec<u8>, ArtifactError> {
        std::fs::read(&self.graph).map_err(|e| ArtifactError::io(&self.graph, e))
    }

    pub fn read_weights(&self) -> Result<Vec<u8>, ArtifactError> {
        std::fs::read(&self.weights).map_err(|e| ArtifactError::io(&self.weights, e))
    }

    /// Labels from the features file, or an empty list when there is none.
    pub fn read_labels(&self) -> Result<Vec<String>, ArtifactError> {
        match &self.features {
            Some(path) => Ok(model_manifest::read_labels(path)?),
            None => Ok(Vec::new()),
        }
    }
}

/// Fetches and verifies model artifacts into a work directory.
pub struct ArtifactStore {
    fetcher: Arc<dyn Fetcher>,
}

/// A per-file artifact with its parsed checksum.
struct Planned<'a> {
    label: &'static str,
    source: &'a ArtifactSource,
    checksum: Checksum,
    dest: PathBuf,
}

impl ArtifactStore {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }

    /// Ensures every artifact `descriptor` names is present and verified
    /// under `work_dir`.
    ///
    /// Idempotent: artifacts already on disk with a matching checksum are
    /// not fetched again. Checksum declarations are validated before any
    /// I/O.
    pub fn acquire(
        &self,
        descriptor: &ModelDescriptor,
        work_dir: &Path,
    ) -> Result<ArtifactSet, ArtifactError> {
        let archive = descriptor.archive_url.as_deref();

        let mut planned = Vec::with_capacity(3);
        if archive.is_none() {
            planned.push(plan("graph", &descriptor.graph, work_dir)?);
            planned.push(plan("weights", &descriptor.weights, work_dir)?);
        }
        let features = match &descriptor.features {
            Some(source) => Some(plan("features", source, work_dir)?),
            None => None,
        };

        std::fs::create_dir_all(work_dir).map_err(|e| ArtifactError::io(work_dir, e))?;
        tracing::info!(
            "acquiring artifacts for {}:{} in {}",
            descriptor.name,
            descriptor.version,
            work_dir.display()
        );

        let graph = work_dir.join(&descriptor.graph.local_path);
        let weights = work_dir.join(&descriptor.weights.local_path);

        if let Some(url) = archive {
            self.acquire_archive(url, work_dir, &graph, &weights)?;
        }
        for item in planned.iter().chain(features.iter()) {
            self.acquire_file(item)?;
        }

        Ok(ArtifactSet {
            work_dir: work_dir.to_path_buf(),
            graph,
            weights,
            features: features.map(|f| f.dest),
        })
    }

    /// Downloads artifacts without building anything on top of them.
    pub fn download(
        &self,
        descriptor: &ModelDescriptor,
        work_dir: &Path,
    ) -> Result<ArtifactSet, ArtifactError> {
        self.acquire(descriptor, work_dir)
    }

    fn acquire_file(&self, item: &Planned<'_>) -> Result<(), ArtifactError> {
        if item.checksum.verify_file(&item.dest)? {
            tracing::debug!("{} up to date: {}", item.label, item.dest.display());
            return Ok(());
        }

        tracing::info!("fetching {} from {}", item.label, item.source.url);
        self.fetcher
            .fetch(&item.source.url, &item.dest, Some(&item.checksum))?;

        if !item.dest.is_file() {
            return Err(ArtifactError::MissingArtifact {
                path: item.dest.clone(),
            });
        }
        item.checksum.ensure_file(item.label, &item.dest)
    }

    fn acquire_archive(
        &self,
        url: &str,
        work_dir: &Path,
        graph: &Path,
        weights: &Path,
    ) -> Result<(), ArtifactError> {
        if graph.is_file() && weights.is_file() {
            tracing::debug!("archive already extracted in {}", work_dir.display());
            return Ok(());
        }

        let archive_name = archive_file_name(url);
        let archive_path = work_dir.join(&archive_name);
        tracing::info!("fetching model archive from {}", url);
        self.fetcher.fetch(url, &archive_path, None)?;

        let extracted = extract_zip(&archive_path, work_dir);
        if let Err(e) = std::fs::remove_file(&archive_path) {
            tracing::warn!(
                "failed to remove archive {}: {}",
                archive_path.display(),
                e
            );
        }
        extracted?;

        for path in [graph, weights] {
            if !path.is_file() {
                return Err(ArtifactError::MissingArtifact {
                    path: path.to_path_buf(),
                });
            }
        }
        Ok(())
    }
}

fn plan<'a>(
    label: &'static str,
    source: &'a ArtifactSource,
    work_dir: &Path,
) -> Result<Planned<'a>, ArtifactError> {
    if source.checksum.is_empty() {
        return Err(ArtifactError::MissingChecksum {
            artifact: label.to_string(),
        });
    }
    Ok(Planned {
        label,
        source,
        checksum: Checksum::parse(&source.checksum)?,
        dest: work_dir.join(&source.local_path),
    })
}

fn archive_file_name(url: &str) -> String {
    let name = url
        .split(['?', '#'])
        .next()
        .unwrap_or(url)
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    if name.is_empty() {
        "model.zip".to_string()
    } else {
        name.to_string()
    }
}
