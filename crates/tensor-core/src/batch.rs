// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Batch assembly: N per-sample tensors → one flat engine input buffer.
//!
//! ```text
//! samples[0]: [h, w, c] ─┐
//! samples[1]: [h, w, c] ─┼─ concat on new axis 0 ─▶ [n, h, w, c] ─▶ flat f32
//! samples[n-1]          ─┘
//! ```
//!
//! The flat buffer is batch-major: element `k` of sample `i` lives at
//! `i * sample_len + k`. Each sample keeps its own row-major layout.

use crate::{Shape, Tensor, TensorError};

/// A batched, flattened engine input.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchTensor {
    sample_shape: Shape,
    batch: usize,
    data: Vec<f32>,
}

/// Concatenates `samples` along a new leading axis and flattens the result.
///
/// Fails with [`TensorError::EmptyInput`] when `samples` is empty and with
/// [`TensorError::ShapeMismatch`] when any sample's shape differs from
/// `samples[0]`.
///
/// # Examples
/// ```
/// use tensor_core::{assemble, Shape, Tensor};
/// let a = Tensor::from_vec(Shape::vector(2), vec![1.0, 2.0]).unwrap();
/// let b = Tensor::from_vec(Shape::vector(2), vec![3.0, 4.0]).unwrap();
/// let batch = assemble(&[a, b]).unwrap();
/// assert_eq!(batch.shape().dims(), &[2, 2]);
/// assert_eq!(batch.as_slice(), &[1.0, 2.0, 3.0, 4.0]);
/// ```
pub fn assemble(samples: &[Tensor]) -> Result<BatchTensor, TensorError> {
    let first = samples
        .first()
        .ok_or(TensorError::EmptyInput { op: "assemble" })?;
    let sample_shape = first.shape().clone();

    for (index, sample) in samples.iter().enumerate().skip(1) {
        if sample.shape() != &sample_shape {
            return Err(TensorError::ShapeMismatch {
                op: "assemble",
                index,
                expected: sample_shape,
                actual: sample.shape().clone(),
            });
        }
    }

    let sample_len = sample_shape.num_elements();
    let mut data = Vec::with_capacity(sample_len * samples.len());
    for sample in samples {
        data.extend_from_slice(sample.as_slice());
    }

    Ok(BatchTensor {
        sample_shape,
        batch: samples.len(),
        data,
    })
}

impl BatchTensor {
    /// Number of samples in the batch.
    pub fn batch(&self) -> usize {
        self.batch
    }

    /// Shape shared by every sample.
    pub fn sample_shape(&self) -> &Shape {
        &self.sample_shape
    }

    /// Logical shape `[batch, ...sample_shape]`.
    pub fn shape(&self) -> Shape {
        self.sample_shape.prepend(self.batch)
    }

    /// Elements per sample.
    pub fn sample_len(&self) -> usize {
        self.sample_shape.num_elements()
    }

    /// The flat, batch-major buffer.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Consumes the batch, returning the flat buffer.
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Zero-fills trailing samples so the batch holds exactly `capacity`.
    ///
    /// Engines built for a fixed batch size read `capacity * sample_len`
    /// elements regardless of how many real samples were submitted.
    pub fn pad_to(mut self, capacity: usize) -> Result<Self, TensorError> {
        if self.batch > capacity {
            return Err(TensorError::BatchOverflow {
                capacity,
                actual: self.batch,
            });
        }
        self.data.resize(capacity * self.sample_len(), 0.0);
        self.batch = capacity;
        Ok(self)
    }
}
