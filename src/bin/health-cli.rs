use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use url::Url;

use environment_health::gateway::HttpGateway;
use environment_health::health::{HealthProbe, ProbeSettings};
use environment_health::{Credential, Environment, EnvironmentId, LifecycleState};

#[derive(Parser)]
#[command(name = "health-cli")]
#[command(about = "Query the environment health monitor or probe a gateway directly", long_about = None)]
struct Cli {
    /// Admin API base URL.
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    /// Admin API key.
    #[arg(short, long, env = "ENVIRONMENT_HEALTH_ADMIN_KEY", default_value = "")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show monitor status and health counts
    Status,
    /// List every tracked environment snapshot
    Environments,
    /// Show one environment snapshot
    Environment { id: String },
    /// Run a single probe against a query gateway and print the snapshot
    Probe {
        /// Base URL of the query gateway.
        #[arg(long)]
        endpoint: String,
        /// Bearer token for the gateway.
        #[arg(long, env = "ENVIRONMENT_HEALTH_TOKEN")]
        token: String,
        /// Environment creation time (unix seconds); defaults to now.
        #[arg(long)]
        created_at: Option<u64>,
        #[arg(long, default_value_t = 5_000)]
        request_timeout_ms: u64,
        #[arg(long, default_value_t = 600)]
        boot_budget_secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let path = match cli.command {
        Commands::Status => "/admin/status".to_string(),
        Commands::Environments => "/admin/environments".to_string(),
        Commands::Environment { id } => format!("/admin/environments/{}", id),
        Commands::Probe {
            endpoint,
            token,
            created_at,
            request_timeout_ms,
            boot_budget_secs,
        } => {
            let created_at = match created_at {
                Some(secs) => UNIX_EPOCH + Duration::from_secs(secs),
                None => SystemTime::now(),
            };
            let environment = Environment {
                id: EnvironmentId::from("cli"),
                provider: String::new(),
                region: String::new(),
                created_at,
                query_endpoint: Url::parse(&endpoint)?,
                lifecycle: LifecycleState::Enabled,
            };
            let settings = ProbeSettings {
                request_timeout: Duration::from_millis(request_timeout_ms),
                max_boot_budget: Duration::from_secs(boot_budget_secs),
                ..ProbeSettings::default()
            };
            let probe = HealthProbe::new(HttpGateway::new()?, settings);
            let snapshot = probe.check_health(&environment, &Credential::new(token)).await;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
            return Ok(());
        }
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let res = reqwest::Client::new()
        .get(format!("{}{}", cli.url.trim_end_matches('/'), path))
        .headers(headers)
        .send()
        .await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("{}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
