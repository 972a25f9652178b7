// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Pixel buffer → normalized model input.
//!
//! Decoding and resizing happen elsewhere; this module starts from an 8-bit,
//! interleaved (HWC) pixel buffer of known size and channel order and
//! produces the `f32` tensor a classification model consumes:
//!
//! ```text
//! out[c] = (pixel[src(c)] - mean[c]) / scale[c]
//! ```
//!
//! `mean` and `scale` are indexed by *output* channel, i.e. after any
//! RGB ↔ BGR swap.

use crate::{Shape, Tensor, TensorError};

/// Memory layout of a single image sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum Layout {
    /// Channels-first: `[channels, height, width]`.
    #[default]
    #[serde(rename = "CHW", alias = "chw", alias = "NCHW")]
    Chw,
    /// Channels-last: `[height, width, channels]`.
    #[serde(rename = "HWC", alias = "hwc", alias = "NHWC")]
    Hwc,
}

/// Channel order of a colour image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum ColorMode {
    #[serde(rename = "RGB", alias = "rgb")]
    Rgb,
    #[default]
    #[serde(rename = "BGR", alias = "bgr")]
    Bgr,
}

/// Per-channel normalization parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalization {
    pub mean: Vec<f32>,
    pub scale: Vec<f32>,
}

impl Normalization {
    /// Identity normalization (mean 0, scale 1) for `channels` channels.
    pub fn identity(channels: usize) -> Self {
        Self {
            mean: vec![0.0; channels],
            scale: vec![1.0; channels],
        }
    }
}

/// An interleaved 8-bit pixel buffer.
#[derive(Debug, Clone)]
pub struct PixelBuffer {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    /// Channel order of `data`; ignored for single-channel buffers.
    pub order: ColorMode,
    /// Row-major HWC pixels, `height * width * channels` bytes.
    pub data: Vec<u8>,
}

impl PixelBuffer {
    /// Wraps raw interleaved pixels, validating the buffer length.
    pub fn new(
        width: usize,
        height: usize,
        channels: usize,
        order: ColorMode,
        data: Vec<u8>,
    ) -> Result<Self, TensorError> {
        let expected = width * height * channels;
        if data.len() != expected {
            return Err(TensorError::Preprocess(format!(
                "pixel buffer is {} bytes, expected {width}x{height}x{channels} = {expected}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            channels,
            order,
            data,
        })
    }
}

/// Converts `pixels` into a normalized tensor in `layout` and `mode`.
///
/// Output shape is `[c, h, w]` for [`Layout::Chw`] and `[h, w, c]` for
/// [`Layout::Hwc`].
pub fn preprocess(
    pixels: &PixelBuffer,
    layout: Layout,
    mode: ColorMode,
    norm: &Normalization,
) -> Result<Tensor, TensorError> {
    let (h, w, c) = (pixels.height, pixels.width, pixels.channels);
    if norm.mean.len() != c || norm.scale.len() != c {
        return Err(TensorError::Preprocess(format!(
            "normalization has {} mean / {} scale values for {c} channels",
            norm.mean.len(),
            norm.scale.len()
        )));
    }
    if let Some(i) = norm.scale.iter().position(|&s| s == 0.0) {
        return Err(TensorError::Preprocess(format!("scale[{i}] is zero")));
    }
    if pixels.data.len() != h * w * c {
        return Err(TensorError::Preprocess(format!(
            "pixel buffer is {} bytes, expected {}",
            pixels.data.len(),
            h * w * c
        )));
    }

    let swap = c == 3 && pixels.order != mode;
    let plane = h * w;
    let mut out = vec![0.0f32; plane * c];

    for y in 0..h {
        for x in 0..w {
            let src = (y * w + x) * c;
            for oc in 0..c {
                let ic = if swap { c - 1 - oc } else { oc };
                let v = (pixels.data[src + ic] as f32 - norm.mean[oc]) / norm.scale[oc];
                let dst = match layout {
                    Layout::Chw => oc * plane + y * w + x,
                    Layout::Hwc => src + oc,
                };
                out[dst] = v;
            }
        }
    }

    let shape = match layout {
        Layout::Chw => Shape::new(vec![c, h, w]),
        Layout::Hwc => Shape::new(vec![h, w, c]),
    };
    Tensor::from_vec(shape, out)
}
