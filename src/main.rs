//! Environment health monitor (v1)
//!
//! Watches the reachability of hosted data-platform environments.
//!
//! # Architecture Overview
//!
//! ```text
//!   config.toml ──▶ config (loader, validation, watcher)
//!                        │ environments
//!                        ▼
//!                 health::active (one poller per enabled environment)
//!                        │ every interval
//!                        ▼
//!                 health::probe ──▶ resilience::timeouts ──▶ gateway (POST /api/sql)
//!                        │                 interim: booting
//!                        │                 terminal: cancel, crashed
//!                        ▼
//!                 health::classifier (failures → HealthError)
//!                        │ snapshot + cycle id
//!                        ▼
//!                 health::state (stale-result rejection)
//!                        │
//!                        ▼
//!                 admin API, metrics, logs
//! ```

use clap::Parser;
use std::path::PathBuf;

use environment_health::lifecycle::startup;

#[derive(Parser)]
#[command(name = "health-monitor")]
#[command(about = "Environment connectivity health monitor", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "ENVIRONMENT_HEALTH_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    startup::run(args.config).await?;
    Ok(())
}
