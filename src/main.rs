//! nginx configuration renderer.
//!
//! # Architecture Overview
//!
//! ```text
//!   snapshot.toml ──▶ config::loader ──▶ Snapshot
//!                                           │
//!                                           ▼
//!                                  ┌──────────────────┐
//!                                  │  render::Renderer │
//!                                  │                  │
//!                                  │  synthesis::*    │──▶ Directive ──▶ text
//!                                  │  (pure builders) │
//!                                  └────────┬─────────┘
//!                                           │
//!                                           ▼
//!                               post-process (squeeze) ──▶ stdout
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use ingress_directives::config::loader::load_snapshot;
use ingress_directives::config::{ObservabilityConfig, RenderSettings};
use ingress_directives::observability::logging;
use ingress_directives::{DenySlugCache, Renderer};

#[derive(Parser)]
#[command(name = "ingress-directives")]
#[command(about = "Render nginx configuration from a routing snapshot", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a snapshot to stdout
    Render {
        /// Path to the snapshot (TOML)
        snapshot: PathBuf,

        /// Route every location through the shared dynamic upstream
        #[arg(long)]
        dynamic_upstreams: bool,

        /// Skip blank-line squeezing
        #[arg(long)]
        raw: bool,

        /// Seed for deny variable slugs (reproducible output)
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Load and validate a snapshot without rendering
    Check {
        /// Path to the snapshot (TOML)
        snapshot: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let observability = ObservabilityConfig {
        log_level: cli.log_level.clone(),
        json_logs: cli.json_logs,
    };
    logging::init(&observability);

    match cli.command {
        Commands::Render {
            snapshot,
            dynamic_upstreams,
            raw,
            seed,
        } => {
            let snapshot = match load_snapshot(&snapshot) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::error!(path = %snapshot.display(), error = %e, "Failed to load snapshot");
                    return ExitCode::FAILURE;
                }
            };

            let settings = RenderSettings {
                dynamic_upstreams,
                squeeze_blank_lines: !raw,
                observability,
            };

            let mut renderer = Renderer::new(settings);
            if let Some(seed) = seed {
                renderer = renderer.with_slug_cache(DenySlugCache::with_seed(seed));
            }

            match renderer.render(&snapshot) {
                Ok(conf) => {
                    print!("{}", conf);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    tracing::error!(error = %e, "Render failed");
                    ExitCode::FAILURE
                }
            }
        }
        Commands::Check { snapshot } => match load_snapshot(&snapshot) {
            Ok(loaded) => {
                tracing::info!(
                    path = %snapshot.display(),
                    servers = loaded.servers.len(),
                    backends = loaded.backends.len(),
                    "Snapshot is valid"
                );
                ExitCode::SUCCESS
            }
            Err(e) => {
                tracing::error!(path = %snapshot.display(), error = %e, "Snapshot is invalid");
                ExitCode::FAILURE
            }
        },
    }
}
