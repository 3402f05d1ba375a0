//! Sealdrop server binary.
//!
//! # Usage
//!
//! ```bash
//! # Serve a file on the default port, keys in the working directory
//! sealdrop-server notes.txt
//!
//! # Custom bind address and key directory, refuse half key pairs
//! sealdrop-server notes.txt --bind 127.0.0.1:9000 --key-dir /var/lib/sealdrop --strict-keys
//! ```

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use sealdrop_proto::ChannelConfig;
use sealdrop_server::{
    DEFAULT_MAX_CLIENT_FRAME_SIZE, DEFAULT_PORT, HalfPairPolicy, Server, ServerConfig,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Sealdrop file server
#[derive(Parser, Debug)]
#[command(name = "sealdrop-server")]
#[command(about = "Serve a file to clients over an RSA/AES encrypted channel")]
#[command(version)]
struct Args {
    /// File to send to every client
    file: PathBuf,

    /// Address to bind to
    #[arg(short, long, default_value_t = format!("0.0.0.0:{DEFAULT_PORT}"))]
    bind: String,

    /// Directory holding privatekey.pem and publickey.pem
    #[arg(long, default_value = ".")]
    key_dir: PathBuf,

    /// RSA modulus size for newly generated keys
    #[arg(long, default_value_t = sealdrop_crypto::DEFAULT_RSA_BITS)]
    key_bits: usize,

    /// Fail instead of regenerating when only one key file exists
    #[arg(long)]
    strict_keys: bool,

    /// Largest frame accepted from a client, in bytes (does not limit the served file)
    #[arg(long, default_value_t = DEFAULT_MAX_CLIENT_FRAME_SIZE)]
    max_frame_size: usize,

    /// Timeout in seconds for each socket read or write call (unset waits forever)
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Exit after this many sessions
    #[arg(long)]
    max_sessions: Option<usize>,

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

    tracing::info!("Sealdrop server starting");

    if !args.file.is_file() {
        tracing::warn!(
            "{} is not a readable file yet; sessions will fail until it exists",
            args.file.display()
        );
    }

    let config = ServerConfig {
        bind_address: args.bind,
        file_path: args.file,
        key_dir: args.key_dir,
        key_bits: args.key_bits,
        half_pair_policy: if args.strict_keys {
            HalfPairPolicy::FailFast
        } else {
            HalfPairPolicy::Regenerate
        },
        channel: ChannelConfig {
            max_frame_size: args.max_frame_size,
            io_timeout: args.timeout_secs.map(Duration::from_secs),
            ..Default::default()
        },
        max_sessions: args.max_sessions,
    };

    let server = Server::bind(config).await?;
    server.run().await?;

    Ok(())
}
