//! gamerec-train - Player-count model training
//!
//! Fits one regressor per player-count target on a reference dataset and
//! writes `model_<target>.json` plus `model_training_stats.json` to the model
//! directory.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use gamerec_clean::dataset::load_records;
use gamerec_clean::features::FeatureExtractor;
use gamerec_clean::training::{Trainer, TrainerConfig};
use gamerec_common::config::{load_toml_config, resolve_model_dir, RootFolderResolver};
use tracing::{info, warn};

/// Command-line arguments for gamerec-train
#[derive(Parser, Debug)]
#[command(name = "gamerec-train")]
#[command(about = "Train player-count models from a reference dataset")]
#[command(version)]
struct Args {
    /// Reference dataset (CSV with header row)
    #[arg(long)]
    reference: PathBuf,

    /// Directory to write models into
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Working folder
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Config file [default: platform config dir]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Year game ages are measured against [default: current year]
    #[arg(long)]
    reference_year: Option<i32>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config =
        load_toml_config(args.config.as_deref()).context("Failed to load configuration")?;
    gamerec_clean::init_logging(&toml_config.logging.level);
    gamerec_clean::log_build_info("gamerec-train");

    let root_folder = RootFolderResolver::new()
        .with_cli_override(args.root_folder.clone())
        .with_toml(&toml_config)
        .resolve();
    let model_dir = resolve_model_dir(args.model_dir.as_deref(), &toml_config, &root_folder);

    let dataset = load_records(&args.reference)
        .with_context(|| format!("Failed to load reference dataset {}", args.reference.display()))?;

    let extractor = match args.reference_year {
        Some(year) => FeatureExtractor::new(year),
        None => FeatureExtractor::default(),
    };
    let trainer = Trainer::new(TrainerConfig::default(), extractor);
    let outcome = trainer.train(&dataset.records);

    if outcome.bank.is_empty() {
        warn!("No target had enough samples; cleaning will rely on heuristics");
    }

    let written = outcome
        .bank
        .save(&model_dir)
        .with_context(|| format!("Failed to save models to {}", model_dir.display()))?;
    let stats_path = outcome
        .stats
        .save(&model_dir)
        .context("Failed to save training statistics")?;

    info!(
        models = written.len(),
        skipped = outcome.stats.skipped.len(),
        model_dir = %model_dir.display(),
        stats = %stats_path.display(),
        "Training finished"
    );
    Ok(())
}
