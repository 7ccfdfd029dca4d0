//! # JointNLU Trainer
//!
//! Fine-tunes a pretrained DistilBERT encoder for joint intent
//! classification and BIO slot tagging with candle, then writes dev and
//! test predictions as `slots<TAB>intents` lines.

pub mod config;
pub mod encoder;
pub mod hub;
pub mod inference;
pub mod model;
pub mod pipeline;
pub mod trainer;

pub use config::TrainConfig;
pub use inference::Predictor;
pub use model::{JointModel, JointOutput};
pub use pipeline::{run, RunSummary};
pub use trainer::{EpochStats, Trainer};
