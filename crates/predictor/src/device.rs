// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Accelerator selection.
//!
//! The engine has no CPU path. [`resolve_device`] turns a requested
//! [`Device`] into a usable GPU ordinal or fails with
//! [`PredictorError::DeviceUnavailable`], which callers treat as fatal.
//!
//! GPU presence is read from `/proc/driver/nvidia/gpus/`, one directory per
//! board, filtered by `CUDA_VISIBLE_DEVICES`.

use crate::PredictorError;
use std::fmt;
use std::path::{Path, PathBuf};

/// Default procfs directory listing NVIDIA boards.
const NVIDIA_GPUS_PATH: &str = "/proc/driver/nvidia/gpus";

/// A compute device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Cuda { device_id: u32 },
}

impl Device {
    /// Parses `"cpu"`, `"cuda"`, `"gpu"` or `"cuda:N"` (case-insensitive).
    pub fn parse(s: &str) -> Result<Self, PredictorError> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "cpu" => return Ok(Self::Cpu),
            "cuda" | "gpu" => return Ok(Self::Cuda { device_id: 0 }),
            _ => {}
        }
        let id = s
            .strip_prefix("cuda:")
            .or_else(|| s.strip_prefix("gpu:"))
            .ok_or_else(|| PredictorError::Configuration(format!("unknown device '{s}'")))?;
        let device_id = id.parse::<u32>().map_err(|_| {
            PredictorError::Configuration(format!("invalid device ordinal in '{s}'"))
        })?;
        Ok(Self::Cuda { device_id })
    }

    pub fn is_gpu(&self) -> bool {
        matches!(self, Self::Cuda { .. })
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda { device_id } => write!(f, "cuda:{device_id}"),
        }
    }
}

/// Reports how many accelerators are usable.
pub trait DeviceProbe: Send + Sync {
    fn gpu_count(&self) -> usize;
}

/// Probes the host through procfs and the environment.
#[derive(Debug, Clone)]
pub struct SystemProbe {
    gpus_dir: PathBuf,
    visible_devices: Option<String>,
}

impl SystemProbe {
    /// Probes the real system.
    pub fn new() -> Self {
        Self {
            gpus_dir: PathBuf::from(NVIDIA_GPUS_PATH),
            visible_devices: std::env::var("CUDA_VISIBLE_DEVICES").ok(),
        }
    }

    /// Probes an alternative GPU directory with an explicit
    /// `CUDA_VISIBLE_DEVICES` value.
    pub fn with_root(gpus_dir: impl Into<PathBuf>, visible_devices: Option<String>) -> Self {
        Self {
            gpus_dir: gpus_dir.into(),
            visible_devices,
        }
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceProbe for SystemProbe {
    fn gpu_count(&self) -> usize {
        let present = count_entries(&self.gpus_dir);
        match self.visible_devices.as_deref().map(str::trim) {
            None => present,
            Some("") | Some("-1") => 0,
            Some(list) => present.min(list.split(',').filter(|s| !s.trim().is_empty()).count()),
        }
    }
}

fn count_entries(dir: &Path) -> usize {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(Result::ok).count(),
        Err(_) => 0,
    }
}

/// Checks that `requested` names an existing GPU.
pub fn resolve_device(requested: Device, probe: &dyn DeviceProbe) -> Result<Device, PredictorError> {
    let Device::Cuda { device_id } = requested else {
        return Err(PredictorError::Configuration(
            "the engine requires a GPU device; cpu is not supported".into(),
        ));
    };

    let count = probe.gpu_count();
    if count == 0 {
        return Err(PredictorError::DeviceUnavailable(
            "no GPU detected on this host".into(),
        ));
    }
    if device_id as usize >= count {
        return Err(PredictorError::DeviceUnavailable(format!(
            "cuda:{device_id} requested but only {count} GPU(s) visible"
        )));
    }
    tracing::info!("using device {} ({} visible)", requested, count);
    Ok(requested)
}
