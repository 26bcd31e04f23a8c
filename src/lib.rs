//! Assayer: commit/advisory matching statistics.
//!
//! Assayer matches source-code commits against vulnerability advisories
//! and scores them via extracted boolean/numeric features (path overlap,
//! timestamp proximity, reference mentions). Every measurement taken
//! during a run is recorded into a hierarchical statistics store; when the
//! run ends, the tree is handed to the reporting layer read-only.
//!
//! # Crate Structure
//!
//! - [`core::stats`]: hierarchical statistics store (the core)
//! - [`core::model`]: commit, advisory, and feature records
//! - [`core::features`]: feature extraction and store population
//! - [`core::report`]: read-only flattening and rendering
//!
//! # Examples
//!
//! ```bash
//! # Score candidates against an advisory, JSON report on stdout
//! assayer score --commits candidates.json --advisory advisory.json
//!
//! # Same run, colored flat listing instead
//! assayer score --commits candidates.json --advisory advisory.json --format text
//! ```

pub mod core;

use core::{error::AssayerError, features, model, report, stats::StatStore};

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "assayer",
    version = env!("CARGO_PKG_VERSION"),
    about = "Match and score source commits against vulnerability advisories"
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct ScoreCli {
    /// JSON file holding the candidate commits (array of commit records).
    #[clap(long)]
    commits: PathBuf,
    /// JSON file holding the advisory record.
    #[clap(long)]
    advisory: PathBuf,
    /// Output format: 'json' or 'text'.
    #[clap(long, default_value = "json")]
    format: String,
    /// Extra measurements recorded into the run statistics. Each value is
    /// a JSON object with `path` (string or string array) and `value`.
    #[clap(long)]
    annotate: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score candidate commits against an advisory record
    #[clap(name = "score", visible_alias = "s")]
    Score(ScoreCli),

    /// Show version information
    #[clap(name = "version")]
    Version,
}

pub fn run() -> Result<(), AssayerError> {
    let cli = Cli::parse();
    match cli.command {
        Command::Version => {
            println!("v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Command::Score(score_cli) => run_score(score_cli),
    }
}

fn run_score(cli: ScoreCli) -> Result<(), AssayerError> {
    let commits = model::load_commits(&cli.commits)?;
    let advisory = model::load_advisory(&cli.advisory)?;

    let (mut store, ranked) = features::score_candidates(&commits, &advisory)?;
    for raw in &cli.annotate {
        apply_annotation(&mut store, raw)?;
    }

    match cli.format.as_str() {
        "json" => {
            let envelope = report::render_envelope(&advisory.vulnerability_id, &store, &ranked);
            println!("{}", serde_json::to_string_pretty(&envelope).unwrap());
        }
        "text" => report::print_text(&advisory.vulnerability_id, &store, &ranked),
        other => {
            return Err(AssayerError::ValidationError(format!(
                "unknown format '{}', expected 'json' or 'text'",
                other
            )));
        }
    }
    Ok(())
}

fn apply_annotation(store: &mut StatStore, raw: &str) -> Result<(), AssayerError> {
    let parsed: serde_json::Value = serde_json::from_str(raw)?;
    let path = parsed.get("path").ok_or_else(|| {
        AssayerError::ValidationError("annotation is missing 'path'".to_string())
    })?;
    let value = parsed.get("value").ok_or_else(|| {
        AssayerError::ValidationError("annotation is missing 'value'".to_string())
    })?;
    store.record_json(path, value, true)
}
