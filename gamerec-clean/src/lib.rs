//! gamerec-clean library
//!
//! Fills missing critical fields in a game dataset, or drops the records
//! that cannot be completed:
//! - [`classifier`]: which critical fields are missing
//! - [`sources`]: storefront, aggregate stats and charts lookups
//! - [`ml`] / [`training`]: per-target regression models and their trainer
//! - [`heuristic`]: age-banded ratio estimates when no model applies
//! - [`workflow`]: the per-record state machine and batch runner
//! - [`dataset`]: CSV in and out

pub mod classifier;
pub mod config;
pub mod dataset;
pub mod error;
pub mod features;
pub mod heuristic;
pub mod ml;
pub mod sources;
pub mod training;
pub mod types;
pub mod workflow;

pub use error::{CompletionError, LookupError, TrainingError};
pub use types::{CriticalField, Decision, FieldValue, PlayerTarget, Record, Verdict};
pub use workflow::{BatchOutcome, CompletionOrchestrator};

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber; `RUST_LOG` overrides `default_directive`
pub fn init_logging(default_directive: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Log build identification captured by `build.rs`
pub fn log_build_info(binary: &str) {
    info!(
        binary,
        version = env!("CARGO_PKG_VERSION"),
        git_hash = env!("GIT_HASH"),
        built = env!("BUILD_TIMESTAMP"),
        profile = env!("BUILD_PROFILE"),
        "Starting"
    );
}
