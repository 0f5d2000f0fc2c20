
use crate::config::{Config, load_config};
use crate::errors::ProxyResult;
use crate::gateway;
use crate::gateway::governor::validate_request_url;
use crate::proxy::resolver::{HickoryLookup, HostValidator};
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "imageguard")]
#[command(about = "SSRF-hardened remote image proxy")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the image proxy server
    Serve {
        /// Path to config.json (default: ~/.imageguard/config.json)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Validate a URL and print the addresses it would be fetched from
    Check {
        url: String,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, host, port } => {
            serve(config, host, port).await?;
        }
        Commands::Check { url } => {
            let validator = HostValidator::new(Arc::new(HickoryLookup::from_system()));
            check(&url, &validator).await?;
        }
    }

    Ok(())
}

fn apply_overrides(config: &mut Config, host: Option<String>, port: Option<u16>) {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
}

async fn serve(config_path: Option<PathBuf>, host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = load_config(config_path.as_deref())?;
    apply_overrides(&mut config, host, port);
    config
        .validate()
        .with_context(|| "Invalid command-line overrides")?;

    let lookup = Arc::new(HickoryLookup::from_system());
    let (handle, addr) = gateway::start(&config, lookup, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
        println!("\nShutting down...");
    })
    .await?;
    info!(
        "serving /api/news-image on http://{} (max {} concurrent, {} req/{}s per client)",
        addr,
        config.limits.max_concurrent_fetches,
        config.limits.rate_limit_per_window,
        config.limits.rate_limit_window_secs
    );

    handle.await.with_context(|| "Server task panicked")?;
    Ok(())
}

/// Run inbound validation and resolution for `raw`, without fetching.
async fn resolve_target(raw: &str, validator: &HostValidator) -> ProxyResult<Vec<IpAddr>> {
    let url = validate_request_url(raw)?;
    let host = url.host_str().unwrap_or_default();
    validator.resolve_and_validate(host).await
}

async fn check(raw: &str, validator: &HostValidator) -> Result<()> {
    match resolve_target(raw, validator).await {
        Ok(addrs) => {
            println!("allowed: {}", raw);
            for (i, addr) in addrs.iter().enumerate() {
                let marker = if i == 0 { " (pinned)" } else { "" };
                println!("  {}{}", addr, marker);
            }
            Ok(())
        }
        Err(e) => {
            println!("rejected: {} ({})", e.public_message(), e);
            bail!("{} rejected: {}", raw, e.public_message())
        }
    }
}
