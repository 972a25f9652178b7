// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # pred-rt
//!
//! Command-line interface for the predictor runtime.
//!
//! ## Usage
//! ```bash
//! # Fetch and verify a model's artifacts
//! pred-rt download --manifest ./manifests/googlenet.json
//!
//! # Classify a raw RGB8 image
//! pred-rt predict --manifest ./manifests/googlenet.json --image cat.rgb --width 224 --height 224
//!
//! # Inspect a manifest
//! pred-rt inspect --manifest ./manifests/googlenet.json
//! ```

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "pred-rt",
    about = "Image-classification predictor runtime for GPU inference engines",
    version,
    author
)]
struct Cli {
    /// Path to a TOML configuration file. Command-line flags override it.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download and verify a model's artifacts without building an engine.
    Download {
        /// Path to the model manifest (JSON).
        #[arg(short, long)]
        manifest: PathBuf,

        /// Root directory for per-model work directories.
        #[arg(short, long)]
        work_root: Option<PathBuf>,
    },

    /// Print the resolved model descriptor.
    Inspect {
        /// Path to the model manifest (JSON).
        #[arg(short, long)]
        manifest: PathBuf,
    },

    /// Classify one raw interleaved RGB8 image.
    Predict {
        /// Path to the model manifest (JSON).
        #[arg(short, long)]
        manifest: PathBuf,

        /// Raw RGB8 pixel file, `width × height × 3` bytes.
        #[arg(short, long)]
        image: PathBuf,

        /// Image width in pixels.
        #[arg(long)]
        width: usize,

        /// Image height in pixels.
        #[arg(long)]
        height: usize,

        /// Number of ranked classes to print.
        #[arg(short = 'k', long, default_value_t = 5)]
        top_k: usize,

        /// Device, e.g. "cuda:0".
        #[arg(short, long)]
        device: Option<String>,

        /// Engine batch size.
        #[arg(short, long)]
        batch_size: Option<usize>,
    },

    /// Display GPU availability and platform support.
    Status,

    /// List registered frameworks.
    Frameworks,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging based on verbosity.
    commands::init_tracing(cli.verbose);

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Download {
            manifest,
            work_root,
        } => commands::download::execute(&config, manifest, work_root),
        Commands::Inspect { manifest } => commands::inspect::execute(&config, manifest),
        Commands::Predict {
            manifest,
            image,
            width,
            height,
            top_k,
            device,
            batch_size,
        } => {
            let registry = commands::build_registry(&config)?;
            let request = commands::predict::Request {
                manifest,
                image,
                width,
                height,
                top_k,
                device,
                batch_size,
            };
            commands::predict::execute(&config, &registry, request)
        }
        Commands::Status => commands::status::execute(&config),
        Commands::Frameworks => {
            let registry = commands::build_registry(&config)?;
            commands::frameworks::execute(&registry)
        }
    }
}
