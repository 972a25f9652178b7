// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for tensor construction, batching and preprocessing.

use crate::Shape;

/// Errors that can occur while building or batching tensors.
#[derive(Debug, thiserror::Error)]
pub enum TensorError {
    /// The provided buffer length does not match the shape's element count.
    #[error("buffer size mismatch: shape {shape} needs {expected} elements, got {actual}")]
    BufferSizeMismatch {
        shape: Shape,
        expected: usize,
        actual: usize,
    },

    /// Two tensors that must agree in shape do not.
    #[error("shape mismatch in {op}: expected {expected}, got {actual} (sample {index})")]
    ShapeMismatch {
        op: &'static str,
        index: usize,
        expected: Shape,
        actual: Shape,
    },

    /// An operation that needs at least one sample received none.
    #[error("empty input: {op} requires at least one sample")]
    EmptyInput { op: &'static str },

    /// More samples were submitted than the engine batch can hold.
    #[error("batch overflow: {actual} samples exceed batch size {capacity}")]
    BatchOverflow { capacity: usize, actual: usize },

    /// Pixel preprocessing received inconsistent parameters.
    #[error("preprocess error: {0}")]
    Preprocess(String),
}

impl TensorError {
    /// Returns `true` for errors the caller can fix by resubmitting
    /// corrected input.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            TensorError::ShapeMismatch { .. }
                | TensorError::EmptyInput { .. }
                | TensorError::BatchOverflow { .. }
                | TensorError::BufferSizeMismatch { .. }
        )
    }
}
