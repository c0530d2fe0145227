//! Order keeper - Entry Point

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Order keeper bot running against the paper exchange
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "KEEPER_CONFIG", default_value = "config/default.toml")]
    config: String,

    /// Bot to run (defaults to the only bot in the config file)
    #[arg(short, long)]
    bot: Option<String>,

    /// Stop after this many ticks (runs until Ctrl-C otherwise)
    #[arg(long)]
    ticks: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    keeper_telemetry::init_logging(None)?;

    info!("Starting order keeper v{}", env!("CARGO_PKG_VERSION"));
    info!(config_path = %args.config, "Loading configuration");

    let config = keeper_bot::AppConfig::from_file(&args.config)?;
    let bot = config.select_bot(args.bot.as_deref())?;
    info!(bot = %bot, safe_mode = config.safe_mode, state_dir = %config.state_dir.display(), "Configuration loaded");

    let mut app = keeper_bot::Application::new(config, &bot)?;
    app.run(args.ticks).await?;

    Ok(())
}
