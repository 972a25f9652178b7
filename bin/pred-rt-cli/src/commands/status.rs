// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `pred-rt status` command: GPU availability and platform support.

use predictor::{
    is_supported_system, resolve_device, Device, DeviceProbe, PredictorConfig, SystemProbe,
};

pub fn execute(config: &PredictorConfig) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║                pred-rt · System Status               ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let probe = SystemProbe::new();

    // ── Platform ───────────────────────────────────────────────
    println!("  Platform");
    println!(
        "   Target:      {}/{}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    println!(
        "   Supported:   {}",
        if is_supported_system() { "yes" } else { "no" }
    );
    println!();

    // ── Accelerators ───────────────────────────────────────────
    println!("  Accelerators");
    println!("   GPUs:        {}", probe.gpu_count());
    match std::env::var("CUDA_VISIBLE_DEVICES") {
        Ok(v) => println!("   Visible:     {v}"),
        Err(_) => println!("   Visible:     (unset)"),
    }
    println!();

    // ── Configured device ──────────────────────────────────────
    println!("  Configured device: {}", config.device);
    match Device::parse(&config.device).and_then(|d| resolve_device(d, &probe)) {
        Ok(device) => println!("   ✓ {device} is available"),
        Err(e) => println!("   ✗ {e}"),
    }

    Ok(())
}
