// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Acquisition tests against an in-memory fetcher that counts calls.

use artifact_store::{ArtifactError, ArtifactStore, Checksum, Fetcher};
use model_manifest::{ModelDescriptor, ModelManifest};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const GRAPH: &[u8] = b"name: \"GoogleNet\"\nlayer { name: \"data\" }\n";
const WEIGHTS: &[u8] = &[7u8; 4096];
const SYNSET: &[u8] = b"n01440764 tench\nn01443537 goldfish\nn01484850 great white shark\n";

/// Serves fixed bodies by URL and records how many fetches happen.
#[derive(Default)]
struct CountingFetcher {
    bodies: Mutex<HashMap<String, Vec<u8>>>,
    calls: AtomicUsize,
}

impl CountingFetcher {
    fn serve(&self, url: &str, body: &[u8]) {
        self.bodies.lock().unwrap().insert(url.to_string(), body.to_vec());
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Fetcher for CountingFetcher {
    fn fetch(
        &self,
        url: &str,
        dest: &Path,
        checksum: Option<&Checksum>,
    ) -> Result<(), ArtifactError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let body = self
            .bodies
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| ArtifactError::Download {
                url: url.to_string(),
                detail: "404 Not Found".into(),
            })?;
        std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
        std::fs::write(dest, &body).unwrap();
        if let Some(c) = checksum {
            c.ensure_file("fetched", dest)?;
        }
        Ok(())
    }
}

fn md5_hex(bytes: &[u8]) -> String {
    format!("{:x}", md5::compute(bytes))
}

fn manifest(features_url: &str, features_checksum: &str) -> ModelManifest {
    let json = format!(
        r#"{{
            "name": "BVLC-GoogLeNet",
            "version": "1.0",
            "framework": {{ "name": "TensorRT", "version": "2.1.2" }},
            "inputs": [{{
                "type": "image",
                "parameters": {{ "dimensions": [3, 224, 224], "input_layer": "data" }}
            }}],
            "output": {{
                "type": "feature",
                "parameters": {{
                    "probabilities_layer": "prob",
                    "features_url": "{features_url}",
                    "features_checksum": "{features_checksum}"
                }}
            }},
            "model": {{
                "base_url": "http://models.test/googlenet",
                "graph_path": "deploy.prototxt",
                "weights_path": "bvlc_googlenet.caffemodel",
                "graph_checksum": "{}",
                "weights_checksum": "{}"
            }}
        }}"#,
        md5_hex(GRAPH),
        md5_hex(WEIGHTS),
    );
    ModelManifest::from_json(&json).unwrap()
}

fn descriptor() -> ModelDescriptor {
    ModelDescriptor::resolve(
        &manifest("http://models.test/synset.txt", &md5_hex(SYNSET)),
        1,
    )
    .unwrap()
}

fn serving_fetcher() -> Arc<CountingFetcher> {
    let fetcher = Arc::new(CountingFetcher::default());
    fetcher.serve("http://models.test/googlenet/deploy.prototxt", GRAPH);
    fetcher.serve("http://models.test/googlenet/bvlc_googlenet.caffemodel", WEIGHTS);
    fetcher.serve("http://models.test/synset.txt", SYNSET);
    fetcher
}

#[test]
fn test_acquire_fetches_all_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = serving_fetcher();
    let store = ArtifactStore::new(fetcher.clone());

    let set = store.acquire(&descriptor(), dir.path()).unwrap();

    assert_eq!(fetcher.calls(), 3);
    assert_eq!(set.read_graph().unwrap(), GRAPH);
    assert_eq!(set.read_weights().unwrap(), WEIGHTS);
    assert_eq!(set.read_labels().unwrap().len(), 3);
    assert_eq!(set.graph, dir.path().join("deploy.prototxt"));
}

#[test]
fn test_acquire_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = serving_fetcher();
    let store = ArtifactStore::new(fetcher.clone());
    let d = descriptor();

    let first = store.acquire(&d, dir.path()).unwrap();
    assert_eq!(fetcher.calls(), 3);

    let second = store.acquire(&d, dir.path()).unwrap();
    assert_eq!(fetcher.calls(), 3, "second acquire must not fetch");
    assert_eq!(first, second);
}

#[test]
fn test_corrupted_cache_is_refetched() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = serving_fetcher();
    let store = ArtifactStore::new(fetcher.clone());
    let d = descriptor();

    store.acquire(&d, dir.path()).unwrap();
    std::fs::write(dir.path().join("bvlc_googlenet.caffemodel"), b"truncated").unwrap();

    store.acquire(&d, dir.path()).unwrap();
    assert_eq!(fetcher.calls(), 4);
}

#[test]
fn test_missing_checksum_is_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = serving_fetcher();
    let store = ArtifactStore::new(fetcher.clone());

    let mut d = descriptor();
    d.weights.checksum.clear();

    let err = store.acquire(&d, dir.path()).unwrap_err();
    assert!(matches!(err, ArtifactError::MissingChecksum { ref artifact } if artifact == "weights"));
    assert_eq!(fetcher.calls(), 0, "no I/O before configuration is validated");
}

#[test]
fn test_checksum_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = serving_fetcher();
    fetcher.serve("http://models.test/googlenet/deploy.prototxt", b"tampered");
    let store = ArtifactStore::new(fetcher);

    let err = store.acquire(&descriptor(), dir.path()).unwrap_err();
    assert!(matches!(err, ArtifactError::ChecksumMismatch { .. }));
}

#[test]
fn test_features_are_optional() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = serving_fetcher();
    let store = ArtifactStore::new(fetcher.clone());
    let d = ModelDescriptor::resolve(&manifest("", ""), 1).unwrap();

    let set = store.acquire(&d, dir.path()).unwrap();
    assert!(set.features.is_none());
    assert_eq!(fetcher.calls(), 2);
}

#[test]
fn test_download_error_propagates() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(Arc::new(CountingFetcher::default()));
    let err = store.acquire(&descriptor(), dir.path()).unwrap_err();
    assert!(matches!(err, ArtifactError::Download { .. }));
}

fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut cursor);
        for (name, body) in entries {
            zip.start_file(*name, zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(body).unwrap();
        }
        zip.finish().unwrap();
    }
    cursor.into_inner()
}

fn archive_descriptor() -> ModelDescriptor {
    let mut m = manifest("", "");
    m.model.is_archive = true;
    m.model.base_url = "http://models.test/googlenet.zip".into();
    m.model.graph_checksum.clear();
    m.model.weights_checksum.clear();
    ModelDescriptor::resolve(&m, 1).unwrap()
}

#[test]
fn test_archive_extracted_without_checksums() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(CountingFetcher::default());
    fetcher.serve(
        "http://models.test/googlenet.zip",
        &zip_bytes(&[("deploy.prototxt", GRAPH), ("bvlc_googlenet.caffemodel", WEIGHTS)]),
    );
    let store = ArtifactStore::new(fetcher.clone());
    let d = archive_descriptor();

    let set = store.acquire(&d, dir.path()).unwrap();
    assert_eq!(set.read_weights().unwrap(), WEIGHTS);
    assert!(!dir.path().join("googlenet.zip").exists(), "archive is removed");

    store.acquire(&d, dir.path()).unwrap();
    assert_eq!(fetcher.calls(), 1);
}

#[test]
fn test_archive_missing_member() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(CountingFetcher::default());
    fetcher.serve(
        "http://models.test/googlenet.zip",
        &zip_bytes(&[("deploy.prototxt", GRAPH)]),
    );
    let store = ArtifactStore::new(fetcher);

    let err = store.acquire(&archive_descriptor(), dir.path()).unwrap_err();
    assert!(matches!(err, ArtifactError::MissingArtifact { .. }));
}

#[test]
fn test_archive_members_in_subdirectory() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(CountingFetcher::default());
    fetcher.serve(
        "http://models.test/googlenet.zip",
        &zip_bytes(&[
            ("googlenet/deploy.prototxt", GRAPH),
            ("googlenet/bvlc_googlenet.caffemodel", WEIGHTS),
        ]),
    );
    let store = ArtifactStore::new(fetcher.clone());

    let mut m = manifest("", "");
    m.model.is_archive = true;
    m.model.base_url = "http://models.test/googlenet.zip".into();
    m.model.graph_path = "googlenet/deploy.prototxt".into();
    m.model.weights_path = "googlenet/bvlc_googlenet.caffemodel".into();
    let d = ModelDescriptor::resolve(&m, 1).unwrap();

    let set = store.acquire(&d, dir.path()).unwrap();
    assert_eq!(set.graph, dir.path().join("googlenet").join("deploy.prototxt"));
    assert_eq!(set.read_graph().unwrap(), GRAPH);
    assert_eq!(set.read_weights().unwrap(), WEIGHTS);

    store.acquire(&d, dir.path()).unwrap();
    assert_eq!(fetcher.calls(), 1);
}

#[test]
fn test_same_file_name_in_different_directories() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(CountingFetcher::default());
    fetcher.serve("http://models.test/googlenet/graph/model.bin", GRAPH);
    fetcher.serve("http://models.test/googlenet/weights/model.bin", WEIGHTS);
    let store = ArtifactStore::new(fetcher);

    let mut m = manifest("", "");
    m.model.graph_path = "graph/model.bin".into();
    m.model.weights_path = "weights/model.bin".into();
    let d = ModelDescriptor::resolve(&m, 1).unwrap();

    let set = store.acquire(&d, dir.path()).unwrap();
    assert_ne!(set.graph, set.weights);
    assert_eq!(set.read_graph().unwrap(), GRAPH);
    assert_eq!(set.read_weights().unwrap(), WEIGHTS);
}
