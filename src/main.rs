use std::path::PathBuf;

use clap::Parser;
use parley_server::ServerConfig;

/// Realtime group chat server.
#[derive(Parser)]
#[command(name = "parley", version)]
struct Args {
    /// Listen port.
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Durable ban store, rewritten on every ban mutation.
    #[arg(long, default_value = "bans.json")]
    bans_file: PathBuf,

    /// Directory of static client assets.
    #[arg(long, default_value = "public")]
    public_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = ServerConfig {
        port: args.port,
        bans_file: args.bans_file,
        public_dir: args.public_dir,
        ..Default::default()
    };

    let handle = parley_server::start(config).await?;
    tracing::info!(port = handle.port, "Parley server ready");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    Ok(())
}
