//! Fine-tune a joint intent/slot model and write prediction files.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use jointnlu_core::{IntentDecoding, SlotReadout};
use jointnlu_trainer::config::DEFAULT_MODEL_ID;
use jointnlu_trainer::{run, TrainConfig};
use tracing::{error, info};

#[derive(Clone, Copy, ValueEnum)]
enum IntentRule {
    /// Every intent with probability >= the threshold
    Threshold,
    /// The single most likely intent
    Argmax,
}

impl IntentRule {
    fn decoding(self, threshold: f32) -> IntentDecoding {
        match self {
            IntentRule::Threshold => IntentDecoding::Threshold(threshold),
            IntentRule::Argmax => IntentDecoding::ArgMax,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Readout {
    Leading,
    FirstPiece,
}

impl From<Readout> for SlotReadout {
    fn from(readout: Readout) -> Self {
        match readout {
            Readout::Leading => SlotReadout::Leading,
            Readout::FirstPiece => SlotReadout::FirstPiece,
        }
    }
}

/// CLI arguments
#[derive(Parser)]
#[command(name = "jointnlu-train")]
#[command(about = "Train a joint intent classifier and slot tagger on ATIS-style CSV data")]
#[command(version)]
struct Cli {
    /// Labeled CSV (utterances, IOB Slot tags, Core Relations)
    #[arg(long, env = "JOINTNLU_TRAIN", default_value = "data/train.csv")]
    train: PathBuf,

    /// Unlabeled CSV to predict for the submission file
    #[arg(long, env = "JOINTNLU_TEST", default_value = "data/test.csv")]
    test: PathBuf,

    /// Directory for hw1_labels_dev.txt, prediction_dev.txt and submission.txt
    #[arg(short, long, env = "JOINTNLU_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Pretrained encoder on the model hub
    #[arg(short, long, env = "JOINTNLU_MODEL", default_value = DEFAULT_MODEL_ID)]
    model: String,

    /// Local model directory (config.json, tokenizer.json, model.safetensors)
    #[arg(long, env = "JOINTNLU_MODEL_DIR")]
    model_dir: Option<PathBuf>,

    #[arg(short, long, default_value_t = 3)]
    epochs: usize,

    #[arg(short, long, default_value_t = 1)]
    batch_size: usize,

    #[arg(long, default_value_t = 5e-5)]
    learning_rate: f64,

    #[arg(long, default_value_t = 0.2)]
    dropout: f32,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Train on at most this many examples
    #[arg(long)]
    max_train_examples: Option<usize>,

    /// Intent threshold used by the threshold rule
    #[arg(long, default_value_t = 0.4)]
    threshold: f32,

    #[arg(long, value_enum, default_value = "threshold")]
    dev_intents: IntentRule,

    #[arg(long, value_enum, default_value = "argmax")]
    test_intents: IntentRule,

    #[arg(long, value_enum, default_value = "leading")]
    slot_readout: Readout,

    /// Force CPU even if CUDA is available
    #[arg(long)]
    cpu: bool,
}

fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let config = TrainConfig::new()
        .with_model_id(cli.model)
        .with_model_dir(cli.model_dir)
        .with_data(cli.train, cli.test)
        .with_output_dir(cli.output_dir)
        .with_epochs(cli.epochs)
        .with_batch_size(cli.batch_size)
        .with_learning_rate(cli.learning_rate)
        .with_dropout(cli.dropout)
        .with_seed(cli.seed)
        .with_max_train_examples(cli.max_train_examples)
        .with_intent_rules(
            cli.dev_intents.decoding(cli.threshold),
            cli.test_intents.decoding(cli.threshold),
        )
        .with_slot_readout(cli.slot_readout.into())
        .with_gpu(!cli.cpu);

    match run(&config) {
        Ok(summary) => info!(
            "Done: {} train, {} dev, {} test utterances",
            summary.train_examples, summary.dev_examples, summary.test_utterances
        ),
        Err(e) => {
            error!("Training failed: {:#}", e);
            std::process::exit(1);
        }
    }
}
