// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Flat engine output → per-sample classification features.

use crate::PredictorError;

/// One class and its score for one sample.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Feature {
    pub index: usize,
    pub name: String,
    pub probability: f32,
}

/// All class scores for one sample, in class-index order.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FeatureSet {
    pub features: Vec<Feature>,
}

impl FeatureSet {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// The `k` highest-probability features, descending. Ties keep class
    /// order.
    pub fn top_k(&self, k: usize) -> Vec<&Feature> {
        let mut ranked: Vec<&Feature> = self.features.iter().collect();
        ranked.sort_by(|a, b| b.probability.total_cmp(&a.probability));
        ranked.truncate(k);
        ranked
    }

    /// The highest-probability feature.
    pub fn best(&self) -> Option<&Feature> {
        self.top_k(1).into_iter().next()
    }
}

/// Splits `flat` into `batch_size` samples of `labels.len()` classes each.
///
/// Sample `i`, class `j` reads `flat[i * classes + j]`. No ranking is
/// applied.
pub fn decode(
    flat: &[f32],
    batch_size: usize,
    labels: &[String],
) -> Result<Vec<FeatureSet>, PredictorError> {
    if batch_size == 0 || flat.len() % batch_size != 0 {
        return Err(PredictorError::LengthMismatch(format!(
            "{} output values do not divide into batch size {batch_size}",
            flat.len()
        )));
    }
    let classes = flat.len() / batch_size;
    if classes != labels.len() {
        return Err(PredictorError::LengthMismatch(format!(
            "{classes} classes per sample but {} labels",
            labels.len()
        )));
    }
    if classes == 0 {
        return Ok(vec![FeatureSet { features: Vec::new() }; batch_size]);
    }

    Ok(flat
        .chunks_exact(classes)
        .map(|row| FeatureSet {
            features: row
                .iter()
                .zip(labels)
                .enumerate()
                .map(|(index, (&probability, name))| Feature {
                    index,
                    name: name.clone(),
                    probability,
                })
                .collect(),
        })
        .collect())
}
