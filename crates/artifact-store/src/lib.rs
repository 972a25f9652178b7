// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # artifact-store
//!
//! Resolves a model's graph, weights and features files to verified local
//! paths, fetching them on demand.
//!
//! - [`Checksum`] — MD5 / SHA-256 content digests.
//! - [`Fetcher`] — the transport capability; [`UrlFetcher`] is the default.
//! - [`ArtifactStore`] — idempotent acquisition into a per-model work
//!   directory, producing an [`ArtifactSet`].

mod archive;
mod checksum;
mod error;
mod fetch;
mod store;

pub use archive::extract_zip;
pub use checksum::Checksum;
pub use error::ArtifactError;
pub use fetch::{FetchPolicy, Fetcher, UrlFetcher};
pub use store::{ArtifactSet, ArtifactStore};
