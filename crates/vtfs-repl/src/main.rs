//! vtfs REPL entry point.
//!
//! Launch the interactive shell:
//! ```bash
//! cargo run -p vtfs-repl -- [--config store.json]
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "vtfs", version)]
#[command(about = "Interactive shell over an in-memory vtfs store", long_about = None)]
struct Args {
    /// Store configuration (JSON). Defaults to $XDG_CONFIG_HOME/vtfs/config.json when present.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let config = vtfs_repl::paths::load_config(args.config.as_deref())?;
    vtfs_repl::run(config)
}
