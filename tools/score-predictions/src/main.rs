//! Score a `slots<TAB>intents` prediction file against gold labels.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use jointnlu_core::data::read_label_lines;
use jointnlu_core::{score, Scores};
use serde::Serialize;
use tracing::info;

#[derive(Parser)]
#[command(name = "jointnlu-score")]
#[command(about = "Compare predicted slot tags and intents with gold labels")]
#[command(version)]
struct Cli {
    /// Gold label file (e.g. hw1_labels_dev.txt)
    #[arg(short, long, default_value = "hw1_labels_dev.txt")]
    gold: PathBuf,

    /// Prediction file (e.g. prediction_dev.txt)
    #[arg(short, long, default_value = "prediction_dev.txt")]
    predicted: PathBuf,

    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,
}

#[derive(Debug, Serialize)]
struct ScoreReport {
    gold: PathBuf,
    predicted: PathBuf,
    #[serde(flatten)]
    scores: Scores,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let gold = read_label_lines(&cli.gold)
        .with_context(|| format!("Failed to read gold labels {}", cli.gold.display()))?;
    let predicted = read_label_lines(&cli.predicted)
        .with_context(|| format!("Failed to read predictions {}", cli.predicted.display()))?;
    info!("Scoring {} utterances", gold.len());

    let report = ScoreReport {
        scores: score(&gold, &predicted)?,
        gold: cli.gold,
        predicted: cli.predicted,
    };

    let json = if cli.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{json}");
    Ok(())
}
