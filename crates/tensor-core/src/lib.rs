// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-core
//!
//! Host-side tensor types for feeding an accelerator inference engine.
//!
//! This crate provides:
//! - [`Tensor`] — an owned, row-major `f32` tensor.
//! - [`Shape`] — dimension descriptors with row-major stride computation.
//! - [`DType`] — element types an engine node may declare.
//! - [`assemble`] — merges per-sample tensors into one [`BatchTensor`].
//! - [`preprocess`] — turns an 8-bit interleaved pixel buffer into a
//!   normalized tensor in the layout the model expects.
//!
//! # Memory Layout
//! Everything handed to an engine is a flat `f32` buffer in batch-major
//! order: sample 0's elements first, in its own row-major layout, then
//! sample 1, and so on. Nothing at runtime can detect a transposed batch,
//! so the shape checks in [`assemble`] are the only guard.

mod batch;
mod dtype;
mod error;
mod preprocess;
mod shape;
mod tensor;

pub use batch::{assemble, BatchTensor};
pub use dtype::DType;
pub use error::TensorError;
pub use preprocess::{preprocess, ColorMode, Layout, Normalization, PixelBuffer};
pub use shape::Shape;
pub use tensor::Tensor;
