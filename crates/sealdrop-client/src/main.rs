//! Sealdrop client binary.
//!
//! # Usage
//!
//! ```bash
//! # Fetch into ./receivedData.txt from the default port
//! sealdrop-client 192.168.1.20
//!
//! # Custom port and destination
//! sealdrop-client files.example.com --port 9000 --output notes.txt
//! ```

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use sealdrop_client::{ClientConfig, DEFAULT_DESTINATION, DEFAULT_PORT, fetch};
use sealdrop_proto::{ChannelConfig, DEFAULT_MAX_FRAME_SIZE};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Sealdrop file client
#[derive(Parser, Debug)]
#[command(name = "sealdrop-client")]
#[command(about = "Fetch a file from a sealdrop server over an RSA/AES encrypted channel")]
#[command(version)]
struct Args {
    /// Server host name or IP address
    host: String,

    /// Server port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Where to write the received file
    #[arg(short, long, default_value = DEFAULT_DESTINATION)]
    output: PathBuf,

    /// Largest frame accepted from the server, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_FRAME_SIZE)]
    max_frame_size: usize,

    /// Connect and per-read/write timeout in seconds (unset waits forever)
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let timeout = args.timeout_secs.map(Duration::from_secs);
    let config = ClientConfig {
        server_host: args.host,
        port: args.port,
        destination: args.output,
        channel: ChannelConfig {
            max_frame_size: args.max_frame_size,
            io_timeout: timeout,
            ..Default::default()
        },
        connect_timeout: timeout,
    };

    let report = fetch(&config).await.inspect_err(|e| tracing::error!("Transfer failed: {}", e))?;
    tracing::info!(
        server = %report.server,
        path = %report.destination.display(),
        bytes = report.plaintext_bytes,
        "Transfer complete"
    );

    Ok(())
}
