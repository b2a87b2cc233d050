//! gamerec-clean - Record completion and gating
//!
//! Reads a game dataset, fills missing critical fields from external sources,
//! trained models and heuristics, drops records that cannot be completed, and
//! writes the survivors with the input's column layout.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use gamerec_clean::config::CleanerSettings;
use gamerec_clean::dataset::{default_output_path, load_records, write_records, Dataset};
use gamerec_clean::features::FeatureExtractor;
use gamerec_clean::ml::load_model_bank;
use gamerec_clean::sources::{
    AggregateStatsLookup, ExternalCompletion, HistoricalPeaksLookup, NoLookup, StoreLookup,
    SteamChartsClient, SteamSpyClient, SteamStoreClient,
};
use gamerec_clean::workflow::{ClusterEstimator, CompletionOrchestrator};
use gamerec_common::config::{load_toml_config, resolve_model_dir, RootFolderResolver};
use tracing::info;

/// Command-line arguments for gamerec-clean
#[derive(Parser, Debug)]
#[command(name = "gamerec-clean")]
#[command(about = "Complete or drop game records with missing critical fields")]
#[command(version)]
struct Args {
    /// Dataset to clean (CSV with header row)
    #[arg(short, long)]
    input: PathBuf,

    /// Output path [default: <input stem>_cleaned.csv]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory holding trained models
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Working folder
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Config file [default: platform config dir]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Skip every external lookup
    #[arg(long)]
    offline: bool,

    /// Year game ages are measured against [default: current year]
    #[arg(long)]
    reference_year: Option<i32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config =
        load_toml_config(args.config.as_deref()).context("Failed to load configuration")?;
    gamerec_clean::init_logging(&toml_config.logging.level);
    gamerec_clean::log_build_info("gamerec-clean");

    let settings = CleanerSettings::from_toml(&toml_config).context("Invalid cleaner settings")?;
    let root_folder = RootFolderResolver::new()
        .with_cli_override(args.root_folder.clone())
        .with_toml(&toml_config)
        .resolve();
    let model_dir = resolve_model_dir(args.model_dir.as_deref(), &toml_config, &root_folder);
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.input));

    info!(
        input = %args.input.display(),
        output = %output.display(),
        model_dir = %model_dir.display(),
        offline = args.offline,
        "Configuration resolved"
    );

    let dataset = load_records(&args.input)
        .with_context(|| format!("Failed to load dataset {}", args.input.display()))?;

    let bank = Arc::new(load_model_bank(&model_dir));
    info!(models = bank.len(), "Model bank loaded");

    let extractor = match args.reference_year {
        Some(year) => FeatureExtractor::new(year),
        None => FeatureExtractor::default(),
    };
    info!(reference_year = extractor.reference_year(), "Feature extractor ready");

    let external = build_external(&settings, args.offline)?;
    let orchestrator = CompletionOrchestrator::from_settings(
        &settings,
        external,
        ClusterEstimator::new(bank, extractor),
    );

    let Dataset {
        headers,
        roles,
        records,
    } = dataset;
    let layout = Dataset {
        headers,
        roles,
        records: Vec::new(),
    };
    let outcome = orchestrator.run_batch(records).await;

    write_records(&output, &layout, &outcome.kept)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    let report =
        serde_json::to_string_pretty(&outcome.stats).context("Failed to serialise statistics")?;
    println!("{}", report);
    info!(kept = outcome.kept.len(), output = %output.display(), "Done");

    Ok(())
}

/// HTTP-backed cascade, or one that never looks anything up
fn build_external(settings: &CleanerSettings, offline: bool) -> Result<ExternalCompletion> {
    if offline {
        info!("Offline mode: external lookups disabled");
        let none = Arc::new(NoLookup);
        return Ok(ExternalCompletion::new(none.clone(), none.clone(), none));
    }

    let store: Arc<dyn StoreLookup> =
        Arc::new(SteamStoreClient::new(settings).context("Failed to build storefront client")?);
    let stats: Arc<dyn AggregateStatsLookup> =
        Arc::new(SteamSpyClient::new(settings).context("Failed to build SteamSpy client")?);
    let charts: Arc<dyn HistoricalPeaksLookup> = Arc::new(
        SteamChartsClient::new(settings, stats.clone())
            .context("Failed to build SteamCharts client")?,
    );

    Ok(ExternalCompletion::new(store, stats, charts)
        .with_courtesy_pause(settings.courtesy_pause(), settings.courtesy_jitter())
        .with_free_sentinel(settings.free_sentinel.clone()))
}
