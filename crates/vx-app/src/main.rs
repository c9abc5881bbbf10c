use anyhow::{Context, Result};
use clap::Parser;

use vx_emotion::EmotionService;

pub mod cli;
pub mod commands;

use cli::Command;

fn main() -> Result<()> {
    // 1. CLI
    let cli = cli::Cli::parse();

    // 2. Logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    // 3. Config (defaults when the file is missing)
    let config = vx_core::config::load_or_default(&cli.config)?;

    // 4. Service
    let service = EmotionService::open(&config).with_context(|| {
        format!(
            "Cannot open training log {}",
            config.training.store_path.display()
        )
    })?;

    let output = match cli.command {
        Command::Analyze {
            file,
            duration,
            record,
        } => commands::analyze(&service, &file, duration, record),
        Command::Record {
            features,
            emotions,
            duration,
        } => commands::record(&service, &features, &emotions, duration),
        Command::Stats => commands::stats(&service),
        Command::Retrain => commands::retrain(&service),
    };

    // A record may have kicked off a background retrain; let it finish.
    service.wait_for_background_retrain();

    println!("{}", output?);
    Ok(())
}
