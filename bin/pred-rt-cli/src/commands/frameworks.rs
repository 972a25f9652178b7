// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `pred-rt frameworks` command: list registered predictors.

use predictor::PredictorRegistry;

pub fn execute(registry: &PredictorRegistry) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║             pred-rt · Registered Frameworks          ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    if registry.is_empty() {
        println!("  No frameworks registered on this platform.");
        return Ok(());
    }

    for entry in registry.entries() {
        println!("  {} ({})", entry.framework, entry.modality.as_str());
        for (arch, images) in &entry.framework.containers {
            println!("   {:<8} cpu: {}", arch, images.cpu);
            println!("   {:<8} gpu: {}", "", images.gpu);
        }
        println!();
    }
    println!("  {} registered", registry.len());

    Ok(())
}
