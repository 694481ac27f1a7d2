//! Seatguard license tool
//!
//! Usage:
//!   seatguard check
//!   seatguard activate <KEY>
//!   seatguard status | remove | hwid
//!
//! Store credentials come from `--store-url`/`--store-key` or the
//! `SEATGUARD_STORE_URL`/`SEATGUARD_STORE_KEY` environment variables.

use anyhow::Result;
use clap::Parser;
use seatguard_cli::{run, Args};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let mut stdout = std::io::stdout().lock();
    run(&args, &mut stdout).await
}
