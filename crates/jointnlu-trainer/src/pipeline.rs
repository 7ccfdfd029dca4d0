//! End-to-end run: split, train, predict dev and test, write label files.

use std::path::PathBuf;

use anyhow::Context;
use jointnlu_core::data::{
    load_labeled, load_utterances, train_dev_split, write_gold_labels, write_label_lines,
};
use jointnlu_core::{
    score, AtisDataset, LabelKind, LabelLine, LabelVocab, Scores, SubwordTokenizer,
};
use serde::Serialize;
use tracing::info;

use crate::config::TrainConfig;
use crate::encoder::DistilBertConfig;
use crate::hub::{resolve_model, select_device};
use crate::inference::Predictor;
use crate::model::build_model;
use crate::trainer::{EpochStats, Trainer};

/// What one run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub train_examples: usize,
    pub dev_examples: usize,
    pub test_utterances: usize,
    pub slot_labels: usize,
    pub intent_labels: usize,
    pub epochs: Vec<EpochStats>,
    /// Absent when the dev split is empty.
    pub dev_scores: Option<Scores>,
    pub dev_labels_path: PathBuf,
    pub dev_predictions_path: PathBuf,
    pub submission_path: PathBuf,
}

/// Train on the labeled file and write dev and test predictions.
pub fn run(config: &TrainConfig) -> anyhow::Result<RunSummary> {
    config.validate()?;
    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!("Failed to create output dir {}", config.output_dir.display())
    })?;

    let records = load_labeled(&config.train_path)?;
    let (mut train, dev) = train_dev_split(records, config.dev_fraction, config.seed)?;
    info!("Split {} train / {} dev examples", train.len(), dev.len());

    write_gold_labels(config.dev_labels_path(), &dev)?;

    if let Some(limit) = config.max_train_examples {
        if train.len() > limit {
            info!("Capping training set at {} examples", limit);
            train.truncate(limit);
        }
    }

    let slot_vocab =
        LabelVocab::from_sequences(LabelKind::Slot, train.iter().map(|r| &r.slot_tags));
    let intent_vocab =
        LabelVocab::from_sequences(LabelKind::Intent, train.iter().map(|r| &r.intents));
    info!(
        "{} slot labels, {} intent labels",
        slot_vocab.len(),
        intent_vocab.len()
    );

    let files = resolve_model(&config.model_id, config.model_dir.as_deref())?;
    let device = select_device(config.use_gpu)?;

    let tokenizer = SubwordTokenizer::from_file(&files.tokenizer_path, config.max_length)?;
    let dataset = AtisDataset::build(&train, &tokenizer, &slot_vocab, &intent_vocab)?;

    let encoder_config = DistilBertConfig::from_file(&files.config_path)?;
    let (model, varmap) = build_model(
        &encoder_config,
        &files.weights_path,
        config.dropout,
        intent_vocab.len(),
        slot_vocab.len(),
        &device,
    )?;

    let mut trainer = Trainer::new(model, varmap, device.clone(), config)?;
    let epochs = trainer.fit(&dataset, tokenizer.pad_id())?;
    let model = trainer.into_model();

    let predictor = Predictor::new(&model, &tokenizer, &slot_vocab, &intent_vocab, device)
        .with_readout(config.slot_readout);

    let dev_words: Vec<&[String]> = dev.iter().map(|r| r.words.as_slice()).collect();
    let dev_predictions = predictor.predict_all(&dev_words, config.dev_intent_rule)?;
    write_label_lines(config.dev_predictions_path(), &dev_predictions)?;

    let dev_scores = if dev.is_empty() {
        None
    } else {
        let gold: Vec<LabelLine> = dev.iter().map(LabelLine::from).collect();
        let scores = score(&gold, &dev_predictions)?;
        info!(
            "Dev: slot F1 {:.4}, slot accuracy {:.4}, intent F1 {:.4}, intent exact {:.4}",
            scores.slot_spans.f1,
            scores.slot_token_accuracy,
            scores.intents.f1,
            scores.intent_exact_match
        );
        Some(scores)
    };

    let test_utterances = load_utterances(&config.test_path)?;
    let submission = predictor.predict_all(&test_utterances, config.test_intent_rule)?;
    write_label_lines(config.submission_path(), &submission)?;
    info!(
        "Wrote {} predictions to {}",
        submission.len(),
        config.submission_path().display()
    );

    Ok(RunSummary {
        train_examples: train.len(),
        dev_examples: dev.len(),
        test_utterances: test_utterances.len(),
        slot_labels: slot_vocab.len(),
        intent_labels: intent_vocab.len(),
        epochs,
        dev_scores,
        dev_labels_path: config.dev_labels_path(),
        dev_predictions_path: config.dev_predictions_path(),
        submission_path: config.submission_path(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::DistilBertEncoder;
    use crate::model::tests::TINY_CONFIG;
    use crate::tests::TINY_TOKENIZER_JSON;
    use candle_core::{DType, Device};
    use candle_nn::{VarBuilder, VarMap};
    use jointnlu_core::data::read_label_lines;
    use jointnlu_core::IntentDecoding;
    use std::path::Path;

    const TRAIN_CSV: &str = "\
ID,utterances,IOB Slot tags,Core Relations
1,who directed titanic,O O B-movie.name,movie.directed_by
2,show flights to boston,O O O B-city,
3,flights from denver,O O B-city,flight.origin
4,who directed avatar,O O B-movie.name,movie.directed_by
5,show flights from boston to denver,O O O B-city O B-city,flight.origin flight.destination
6,titanic,B-movie.name,movie.name
7,flights to denver,O O B-city,flight.destination
8,who directed,O O,movie.directed_by
";

    const TEST_CSV: &str = "\
ID,utterances
1,who directed titanic
2,flights from boston
3,show denver
";

    /// Model directory holding a randomly initialised tiny encoder.
    fn write_tiny_model(dir: &Path) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join("config.json"), TINY_CONFIG).unwrap();
        std::fs::write(dir.join("tokenizer.json"), TINY_TOKENIZER_JSON).unwrap();

        let config = DistilBertConfig::from_json(TINY_CONFIG).unwrap();
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        DistilBertEncoder::new(&config, vb.pp("distilbert")).unwrap();
        varmap.save(dir.join("model.safetensors")).unwrap();
    }

    #[test]
    fn test_run_writes_all_outputs() {
        let root = std::env::temp_dir().join(format!("jointnlu-pipeline-{}", std::process::id()));
        let model_dir = root.join("model");
        write_tiny_model(&model_dir);
        std::fs::write(root.join("train.csv"), TRAIN_CSV).unwrap();
        std::fs::write(root.join("test.csv"), TEST_CSV).unwrap();

        let config = TrainConfig::new()
            .with_model_dir(Some(model_dir))
            .with_data(root.join("train.csv"), root.join("test.csv"))
            .with_output_dir(root.join("out"))
            .with_epochs(1)
            .with_learning_rate(1e-3)
            .with_intent_rules(IntentDecoding::Threshold(0.4), IntentDecoding::ArgMax)
            .with_gpu(false);

        let summary = run(&config).unwrap();
        assert_eq!(summary.dev_examples, 2);
        assert_eq!(summary.train_examples, 6);
        assert_eq!(summary.test_utterances, 3);
        assert_eq!(summary.epochs.len(), 1);
        assert!(summary.dev_scores.is_some());

        let gold = read_label_lines(&summary.dev_labels_path).unwrap();
        let dev = read_label_lines(&summary.dev_predictions_path).unwrap();
        assert_eq!(gold.len(), 2);
        for (g, p) in gold.iter().zip(&dev) {
            assert_eq!(g.slots.len(), p.slots.len());
            assert!(!p.intents.is_empty());
        }

        let submission = read_label_lines(&summary.submission_path).unwrap();
        assert_eq!(submission.len(), 3);
        assert_eq!(submission[0].slots.len(), 3);
        assert_eq!(submission[2].slots.len(), 2);
        assert!(submission.iter().all(|l| l.intents.len() == 1));

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_run_rejects_invalid_config() {
        let config = TrainConfig::new().with_epochs(0);
        assert!(run(&config).is_err());
    }
}
