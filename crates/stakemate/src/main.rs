//! The `stakemate` server binary.

use clap::Parser;
use stakemate::prelude::*;
use tracing_subscriber::EnvFilter;

/// Stakemate - two-player chess with escrowed secrets
#[derive(Parser)]
#[command(name = "stakemate")]
#[command(about = "Two-player chess server with a winner-only secret reveal", long_about = None)]
#[command(version)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "STAKEMATE_BIND", default_value = DEFAULT_BIND_ADDR)]
    bind: String,

    /// Base64-encoded 32-byte key that seals player secrets
    #[arg(long, env = "STAKEMATE_MASTER_KEY", hide_env_values = true)]
    master_key: Option<String>,

    /// Deployment profile (development or production)
    #[arg(long, env = "STAKEMATE_PROFILE", default_value_t = Profile::Development)]
    profile: Profile,

    /// Length of generated room codes
    #[arg(
        long,
        env = "STAKEMATE_CODE_LENGTH",
        default_value_t = 6,
        value_parser = clap::value_parser!(u8).range(4..=12)
    )]
    code_length: u8,
}

#[tokio::main]
async fn main() -> Result<(), StakemateError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = ServerConfig::default()
        .with_bind(cli.bind)
        .with_profile(cli.profile)
        .with_code_length(usize::from(cli.code_length));
    if let Some(key) = cli.master_key {
        config = config.with_master_key(key);
    }

    let server = StakemateServerBuilder::new()
        .config(config)
        .build(ChessRules::new())
        .await?;
    server.run().await
}
