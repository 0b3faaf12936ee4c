use clap::Parser;
use coinbt::cli::{Cli, Commands};
use coinbt::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
        eprintln!("Using default configuration");
        toml::from_str(include_str!("../config.toml.example")).expect("Invalid default config")
    });

    // Initialize telemetry
    coinbt::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Backtest(args) => {
            tracing::info!("Starting backtest");
            args.execute(&config).await?;
        }
        Commands::Fetch(args) => {
            tracing::info!("Starting cache pre-warm");
            args.execute(&config).await?;
        }
        Commands::Config => {
            println!("Current configuration:");
            println!("  Cache dir: {}", config.cache.dir.display());
            println!(
                "  Gateway: {} (min delay {}ms)",
                config.gateway.base_url, config.gateway.min_delay_ms
            );
            println!(
                "  Backtest: fee={}, initial=${}",
                config.backtest.fee_percent, config.backtest.initial_usd
            );
        }
    }

    Ok(())
}
