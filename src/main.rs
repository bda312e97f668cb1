//! Channel relay - Entry Point
//!
//! Parses the command line, binds the listener on an ephemeral port and
//! reports the port on stdout, then serves connections forever.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use channel_relay::{Config, Server};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Socket address to bind; overrides the config file. Use port 0 for an ephemeral port.
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// JSON config file with channels, default channel and name rewrites.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so stdout only carries the port line.
    // Use RUST_LOG env var to control log level,
    // e.g. RUST_LOG=debug or RUST_LOG=channel_relay=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("channel_relay=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(bind) = cli.bind {
        config.bind = bind;
    }

    let server = Server::bind(config).await?;
    let addr = server.local_addr()?;
    info!("Relay listening on {}", addr);
    println!("Running at port: {}", addr.port());

    server.run().await;
    Ok(())
}
