//! taproot-dns binary entry point.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use taproot_dns::{telemetry, Config, DnsServer, Resolver, StaticOverrides, TcpExchanger};
use tracing::{error, info};

/// Recursive DNS resolver that walks the public hierarchy from the roots.
#[derive(Parser, Debug)]
#[command(name = "taproot-dns")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML).
    #[arg(short, long, default_value = "taproot-dns.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration; the file is optional, defaults serve a bare setup
    let config: Config = config::Config::builder()
        .add_source(config::File::from(args.config.clone()).required(false))
        .add_source(
            config::Environment::with_prefix("TAPROOT_DNS")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;

    // Initialize telemetry
    telemetry::init(&config.telemetry).map_err(|e| e as Box<dyn std::error::Error>)?;

    info!(
        config_file = %args.config.display(),
        listen_addr = %config.dns.listen_addr,
        static_records = %config.dns.static_records.display(),
        "Starting taproot-dns"
    );

    // Static overrides are required at startup
    let overrides = Arc::new(StaticOverrides::load(&config.dns.static_records)?);
    info!(entries = overrides.len(), "static overrides loaded");

    let resolver = Arc::new(Resolver::new(overrides, Arc::new(TcpExchanger::new())));

    // Run the listener forever
    let server = DnsServer::bind(config.dns, resolver).await?;
    if let Err(e) = server.run().await {
        error!("DNS server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
