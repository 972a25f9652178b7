// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Zip extraction for archive-distributed models.

use crate::ArtifactError;
use std::fs::File;
use std::path::Path;

/// Extracts every entry of the zip at `archive` into `dest`.
///
/// Entries whose names would escape `dest` are rejected. Returns the number
/// of files written.
pub fn extract_zip(archive: &Path, dest: &Path) -> Result<usize, ArtifactError> {
    let archive_err = |detail: String| ArtifactError::Archive {
        path: archive.to_path_buf(),
        detail,
    };

    let file = File::open(archive).map_err(|e| ArtifactError::io(archive, e))?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| archive_err(e.to_string()))?;

    let mut written = 0;
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(|e| archive_err(e.to_string()))?;
        let relative = entry
            .enclosed_name()
            .ok_or_else(|| archive_err(format!("unsafe entry name '{}'", entry.name())))?;
        let out = dest.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&out).map_err(|e| ArtifactError::io(&out, e))?;
            continue;
        }
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ArtifactError::io(parent, e))?;
        }
        let mut target = File::create(&out).map_err(|e| ArtifactError::io(&out, e))?;
        std::io::copy(&mut entry, &mut target).map_err(|e| ArtifactError::io(&out, e))?;
        written += 1;
    }

    tracing::debug!("extracted {} files from {}", written, archive.display());
    Ok(written)
}
