// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The fetch capability.
//!
//! [`Fetcher`] is the seam between artifact bookkeeping and transport.
//! [`UrlFetcher`] handles `http(s)://` with a blocking `reqwest` client and
//! `file://` URLs or bare paths by copying from the local filesystem.

use crate::{ArtifactError, Checksum};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Retrieves a URL into a local file.
pub trait Fetcher: Send + Sync {
    /// Fetches `url` into `dest`, verifying `checksum` when given.
    ///
    /// On error `dest` is left untouched.
    fn fetch(&self, url: &str, dest: &Path, checksum: Option<&Checksum>)
        -> Result<(), ArtifactError>;
}

/// Timeout and retry policy for [`UrlFetcher`].
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Extra attempts after the first failure.
    pub retries: u32,
    /// Backoff before retry `n` is `n * backoff`.
    pub backoff: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            retries: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

/// Network and filesystem fetcher.
pub struct UrlFetcher {
    client: reqwest::blocking::Client,
    policy: FetchPolicy,
}

impl UrlFetcher {
    pub fn new(policy: FetchPolicy) -> Result<Self, ArtifactError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(policy.timeout)
            .user_agent(concat!("pred-rt/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ArtifactError::Download {
                url: String::new(),
                detail: format!("cannot build HTTP client: {e}"),
            })?;
        Ok(Self { client, policy })
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    fn fetch_once(&self, url: &str, part: &Path) -> Result<(), ArtifactError> {
        if let Some(local) = local_path(url) {
            std::fs::copy(&local, part).map_err(|e| ArtifactError::Download {
                url: url.to_string(),
                detail: format!("copy from '{}': {e}", local.display()),
            })?;
            return Ok(());
        }

        let download_err = |detail: String| ArtifactError::Download {
            url: url.to_string(),
            detail,
        };
        let mut response = self
            .client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| download_err(e.to_string()))?;
        let mut file = File::create(part).map_err(|e| ArtifactError::io(part, e))?;
        response
            .copy_to(&mut file)
            .map_err(|e| download_err(e.to_string()))?;
        Ok(())
    }
}

impl Fetcher for UrlFetcher {
    fn fetch(
        &self,
        url: &str,
        dest: &Path,
        checksum: Option<&Checksum>,
    ) -> Result<(), ArtifactError> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ArtifactError::io(parent, e))?;
        }
        let part = part_path(dest);

        let mut attempt = 0;
        loop {
            let result = self.fetch_once(url, &part).and_then(|()| match checksum {
                Some(c) => c.ensure_file(&file_label(dest), &part),
                None => Ok(()),
            });
            match result {
                Ok(()) => break,
                Err(e) if attempt < self.policy.retries => {
                    attempt += 1;
                    tracing::warn!(
                        "fetch {} failed (attempt {}/{}): {}",
                        url,
                        attempt,
                        self.policy.retries + 1,
                        e
                    );
                    std::thread::sleep(self.policy.backoff * attempt);
                }
                Err(e) => {
                    let _ = std::fs::remove_file(&part);
                    return Err(e);
                }
            }
        }

        std::fs::rename(&part, dest).map_err(|e| ArtifactError::io(dest, e))?;
        tracing::debug!("fetched {} → {}", url, dest.display());
        Ok(())
    }
}

/// Resolves `file://` URLs and scheme-less paths to local paths.
fn local_path(url: &str) -> Option<PathBuf> {
    if let Some(rest) = url.strip_prefix("file://") {
        return Some(PathBuf::from(rest));
    }
    (!url.contains("://")).then(|| PathBuf::from(url))
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
