// SPDX-FileCopyrightText: 2026 Director Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Director - quality-tier routing with resource-aware fallback.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod inspect;
mod route;
mod serve;
mod shutdown;
mod simulated;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use director_config::DirectorConfig;
use director_core::QualityTier;

/// Director - quality-tier routing with resource-aware fallback.
#[derive(Parser, Debug)]
#[command(name = "director", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Route JSON-lines requests from stdin on a simulated backend.
    Serve,
    /// Print one routing decision against the configured tier table.
    Route {
        #[arg(long)]
        capability: String,

        /// Requested tier: low, standard or high.
        #[arg(long)]
        tier: QualityTier,

        /// Override free units for a pool, e.g. `--available gpu=10`.
        #[arg(long = "available", value_name = "POOL=UNITS", value_parser = route::parse_available)]
        available: Vec<(String, u64)>,

        /// Print the decision as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Validate configuration and print a summary.
    Check,
    /// Print the registered tier table.
    Tiers {
        #[arg(long)]
        capability: Option<String>,
    },
}

fn load_config(path: Option<&std::path::Path>) -> DirectorConfig {
    let loaded = match path {
        Some(path) => director_config::load_and_validate_path(path),
        None => director_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            director_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());

    match cli.command {
        Some(Commands::Serve) => {
            // Exit explicitly: a pending blocking stdin read would otherwise
            // hold up runtime shutdown after a signal.
            match serve::run_serve(config, cli.config).await {
                Ok(()) => std::process::exit(0),
                Err(e) => {
                    eprintln!("error: {e}");
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Route {
            capability,
            tier,
            available,
            json,
        }) => {
            let code = route::run_route(&config, &capability, tier, &available, json);
            std::process::exit(code);
        }
        Some(Commands::Check) => {
            print!("{}", inspect::check_summary(&config));
        }
        Some(Commands::Tiers { capability }) => {
            print!("{}", inspect::tier_table(&config, capability.as_deref()));
        }
        None => {
            println!("director: use --help for available commands");
        }
    }
}
