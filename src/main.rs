//! Command-line entry point for the crypto price pipeline

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use crypto_owl::{Pipeline, PipelineConfig, Stage};
use log::info;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "Cryptocurrency price analysis and LSTM forecasting", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply to every key it omits
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Root of the raw/processed/plots/reports/models tree
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Comma-separated CoinGecko coin ids
    #[arg(short, long, value_delimiter = ',')]
    assets: Option<Vec<String>>,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Fetch price history into raw CSV files
    Collect,
    /// Clean raw data and compute features and indicators
    Preprocess,
    /// Statistical analysis, plots and the correlation report
    Analyze,
    /// Train and evaluate the LSTM forecaster
    Forecast,
    /// Every stage in order
    Run,
}

impl Commands {
    fn stages(self) -> Vec<Stage> {
        match self {
            Commands::Collect => vec![Stage::Collect],
            Commands::Preprocess => vec![Stage::Preprocess],
            Commands::Analyze => vec![Stage::Analyze],
            Commands::Forecast => vec![Stage::Forecast],
            Commands::Run => Stage::ALL.to_vec(),
        }
    }
}

fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config = config.with_data_dir(dir);
    }
    if let Some(assets) = &cli.assets {
        let assets = assets.iter().map(|a| a.trim().to_string()).collect();
        config = config.with_assets(assets);
    }
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = load_config(&cli)?;
    info!(
        "Assets: {} | data dir: {}",
        config.assets.join(", "),
        config.data_dir.display()
    );

    let pipeline = Pipeline::new(config).context("Invalid configuration")?;
    let summary = pipeline
        .run(&cli.command.stages())
        .context("Pipeline run failed")?;

    println!("{}", summary.render());
    if summary.all_failed() {
        bail!("every asset failed");
    }
    Ok(())
}
