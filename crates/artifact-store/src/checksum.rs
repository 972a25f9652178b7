// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Content checksums.
//!
//! Manifests carry bare hex digests; the algorithm is implied by length:
//! 32 characters is MD5, 64 is SHA-256.

use crate::ArtifactError;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const READ_CHUNK: usize = 64 * 1024;

/// An expected content digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Checksum {
    Md5(String),
    Sha256(String),
}

impl Checksum {
    /// Parses a hex digest, inferring the algorithm from its length.
    pub fn parse(hex_digest: &str) -> Result<Self, ArtifactError> {
        let digest = hex_digest.trim().to_ascii_lowercase();
        if hex::decode(&digest).is_err() {
            return Err(ArtifactError::InvalidChecksum(hex_digest.to_string()));
        }
        match digest.len() {
            32 => Ok(Self::Md5(digest)),
            64 => Ok(Self::Sha256(digest)),
            _ => Err(ArtifactError::InvalidChecksum(hex_digest.to_string())),
        }
    }

    /// Lower-case hex of the expected digest.
    pub fn hex(&self) -> &str {
        match self {
            Self::Md5(h) | Self::Sha256(h) => h,
        }
    }

    pub fn algorithm(&self) -> &'static str {
        match self {
            Self::Md5(_) => "md5",
            Self::Sha256(_) => "sha256",
        }
    }

    /// Hashes `path` with this checksum's algorithm, streaming the file.
    pub fn of_file(&self, path: &Path) -> Result<String, ArtifactError> {
        let mut file = File::open(path).map_err(|e| ArtifactError::io(path, e))?;
        let mut buf = vec![0u8; READ_CHUNK];

        match self {
            Self::Md5(_) => {
                let mut ctx = md5::Context::new();
                loop {
                    let n = file.read(&mut buf).map_err(|e| ArtifactError::io(path, e))?;
                    if n == 0 {
                        break;
                    }
                    ctx.consume(&buf[..n]);
                }
                Ok(format!("{:x}", ctx.compute()))
            }
            Self::Sha256(_) => {
                let mut hasher = Sha256::new();
                loop {
                    let n = file.read(&mut buf).map_err(|e| ArtifactError::io(path, e))?;
                    if n == 0 {
                        break;
                    }
                    hasher.update(&buf[..n]);
                }
                Ok(hex::encode(hasher.finalize()))
            }
        }
    }

    /// Whether `path` exists and hashes to this checksum.
    pub fn verify_file(&self, path: &Path) -> Result<bool, ArtifactError> {
        if !path.is_file() {
            return Ok(false);
        }
        Ok(self.of_file(path)? == self.hex())
    }

    /// Verifies `path`, failing with [`ArtifactError::ChecksumMismatch`].
    pub fn ensure_file(&self, artifact: &str, path: &Path) -> Result<(), ArtifactError> {
        let actual = self.of_file(path)?;
        if actual != self.hex() {
            return Err(ArtifactError::ChecksumMismatch {
                artifact: artifact.to_string(),
                expected: self.hex().to_string(),
                actual,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm(), self.hex())
    }
}
