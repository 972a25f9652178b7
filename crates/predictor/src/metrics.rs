// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Load and predict timing for one predictor instance.

use std::time::Duration;

/// Aggregate timings collected while profiling is enabled.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct PredictorMetrics {
    /// Wall-clock time of `load`, including downloads and engine build.
    pub load_duration: Duration,
    /// Number of successful `predict` calls.
    pub predict_calls: usize,
    /// Samples submitted across all calls, excluding batch padding.
    pub samples: usize,
    pub total_predict_duration: Duration,
    pub last_predict_duration: Duration,
}

impl PredictorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_load(&mut self, duration: Duration) {
        self.load_duration = duration;
    }

    /// Records one successful predict call over `samples` samples.
    pub fn record_predict(&mut self, samples: usize, duration: Duration) {
        self.predict_calls += 1;
        self.samples += samples;
        self.total_predict_duration += duration;
        self.last_predict_duration = duration;
    }

    /// Mean predict latency.
    pub fn mean_predict_duration(&self) -> Duration {
        if self.predict_calls == 0 {
            return Duration::ZERO;
        }
        self.total_predict_duration / self.predict_calls as u32
    }

    /// Returns samples per second throughput.
    pub fn samples_per_second(&self) -> f64 {
        let secs = self.total_predict_duration.as_secs_f64();
        if secs <= 0.0 || self.samples == 0 {
            return 0.0;
        }
        self.samples as f64 / secs
    }

    /// Returns a human-readable summary suitable for CLI output.
    pub fn summary(&self) -> String {
        format!(
            "Predictor: load {:.2}ms, {} predict calls, {} samples, \
             {:.2}ms mean / {:.2}ms last ({:.1} samples/s)",
            self.load_duration.as_secs_f64() * 1000.0,
            self.predict_calls,
            self.samples,
            self.mean_predict_duration().as_secs_f64() * 1000.0,
            self.last_predict_duration.as_secs_f64() * 1000.0,
            self.samples_per_second(),
        )
    }
}
