//! Run configuration for training and prediction.

use std::path::{Path, PathBuf};

use jointnlu_core::encode::DEFAULT_INTENT_THRESHOLD;
use jointnlu_core::{IntentDecoding, SlotReadout};
use serde::{Deserialize, Serialize};

/// Default pretrained encoder on the model hub.
pub const DEFAULT_MODEL_ID: &str = "distilbert-base-uncased";

pub const DEV_LABELS_FILE: &str = "hw1_labels_dev.txt";
pub const DEV_PREDICTIONS_FILE: &str = "prediction_dev.txt";
pub const SUBMISSION_FILE: &str = "submission.txt";

/// Configuration for one training + prediction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Model hub id of the pretrained encoder and its tokenizer.
    pub model_id: String,
    /// Local directory with `config.json`, `tokenizer.json` and
    /// `model.safetensors`; bypasses the hub when set.
    pub model_dir: Option<PathBuf>,
    pub train_path: PathBuf,
    pub test_path: PathBuf,
    pub output_dir: PathBuf,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub weight_decay: f64,
    pub dropout: f32,
    /// Share of the labeled file held out as dev split.
    pub dev_fraction: f64,
    pub seed: u64,
    /// Sub-word sequence length cap, special tokens included.
    pub max_length: usize,
    /// Train on at most this many examples of the train split.
    pub max_train_examples: Option<usize>,
    pub dev_intent_rule: IntentDecoding,
    pub test_intent_rule: IntentDecoding,
    pub slot_readout: SlotReadout,
    /// Use CUDA when available.
    pub use_gpu: bool,
    /// Log a running loss every this many steps (0 disables).
    pub log_every: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            model_dir: None,
            train_path: PathBuf::from("data/train.csv"),
            test_path: PathBuf::from("data/test.csv"),
            output_dir: PathBuf::from("."),
            epochs: 3,
            batch_size: 1,
            learning_rate: 5e-5,
            weight_decay: 0.0,
            dropout: 0.2,
            dev_fraction: 0.25,
            seed: 42,
            max_length: 512,
            max_train_examples: None,
            dev_intent_rule: IntentDecoding::Threshold(DEFAULT_INTENT_THRESHOLD),
            test_intent_rule: IntentDecoding::ArgMax,
            slot_readout: SlotReadout::Leading,
            use_gpu: true,
            log_every: 500,
        }
    }
}

impl TrainConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    pub fn with_model_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.model_dir = dir;
        self
    }

    pub fn with_data(mut self, train: impl Into<PathBuf>, test: impl Into<PathBuf>) -> Self {
        self.train_path = train.into();
        self.test_path = test.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_dropout(mut self, dropout: f32) -> Self {
        self.dropout = dropout;
        self
    }

    /// Set the threshold of the dev-split intent rule.
    pub fn with_intent_threshold(mut self, threshold: f32) -> Self {
        self.dev_intent_rule = IntentDecoding::Threshold(threshold);
        self
    }

    pub fn with_intent_rules(mut self, dev: IntentDecoding, test: IntentDecoding) -> Self {
        self.dev_intent_rule = dev;
        self.test_intent_rule = test;
        self
    }

    pub fn with_slot_readout(mut self, readout: SlotReadout) -> Self {
        self.slot_readout = readout;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_train_examples(mut self, limit: Option<usize>) -> Self {
        self.max_train_examples = limit;
        self
    }

    pub fn with_gpu(mut self, enabled: bool) -> Self {
        self.use_gpu = enabled;
        self
    }

    /// Check value ranges before any work starts.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.epochs == 0 {
            anyhow::bail!("epochs must be > 0");
        }
        if self.batch_size == 0 {
            anyhow::bail!("batch size must be > 0");
        }
        if !(self.learning_rate > 0.0) {
            anyhow::bail!("learning rate must be > 0, got {}", self.learning_rate);
        }
        if !(0.0..1.0).contains(&self.dropout) {
            anyhow::bail!("dropout must be in [0, 1), got {}", self.dropout);
        }
        if !(0.0..1.0).contains(&self.dev_fraction) {
            anyhow::bail!("dev fraction must be in [0, 1), got {}", self.dev_fraction);
        }
        if self.max_length < 2 {
            anyhow::bail!("max length must leave room for special tokens");
        }
        for rule in [self.dev_intent_rule, self.test_intent_rule] {
            if let IntentDecoding::Threshold(t) = rule {
                if !(0.0..=1.0).contains(&t) {
                    anyhow::bail!("intent threshold must be in [0, 1], got {t}");
                }
            }
        }
        Ok(())
    }

    pub fn dev_labels_path(&self) -> PathBuf {
        self.output_path(DEV_LABELS_FILE)
    }

    pub fn dev_predictions_path(&self) -> PathBuf {
        self.output_path(DEV_PREDICTIONS_FILE)
    }

    pub fn submission_path(&self) -> PathBuf {
        self.output_path(SUBMISSION_FILE)
    }

    fn output_path(&self, name: impl AsRef<Path>) -> PathBuf {
        self.output_dir.join(name)
    }
}
