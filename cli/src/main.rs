//! chatsync command-line client.
//!
//! Usage:
//!   chatsync --api-url https://chat.example.com --token $TOKEN list prompt u1
//!   chatsync move conversation "u1/My%20Chat" archive
//!   chatsync upload u1/docs/report.pdf ./report.pdf
//!
//! Logging follows `RUST_LOG`; `--verbose` raises the default to debug.

use anyhow::Result;
use chatsync_cli::{run, Cli};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let mut stdout = std::io::stdout().lock();
    run(cli, &mut stdout).await
}
