//! Request composer service.
//!
//! # Architecture Overview
//!
//! ```text
//!     UI POST /cgi-bin/composer
//!     ──────────────▶ http ──▶ compose ──▶ classify ──┬──▶ tunnel    ─┐
//!                                                     ├──▶ websocket ─┼──▶ local proxy
//!                                                     └──▶ http      ─┘
//!     ◀────────────── {ec, em, res} ◀── completion ◀──────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use request_composer::config::{load_config, ComposerConfig};
use request_composer::lifecycle::startup;
use request_composer::observability::logging;

#[derive(Parser)]
#[command(name = "request-composer")]
#[command(about = "Compose requests and forward them through a local debugging proxy", long_about = None)]
struct Args {
    /// TOML configuration file; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ComposerConfig::default(),
    };

    logging::init_tracing(&config.observability.log_level);
    tracing::info!("request-composer v{} starting", env!("CARGO_PKG_VERSION"));

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
