//! # ATIS CSV Loading
//!
//! Reads the `utterances` / `IOB Slot tags` / `Core Relations` CSV files into
//! whitespace-tokenized records, and splits labeled data into train/dev.

use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{JointNluError, Result};
use crate::labels::NO_INTENT;

pub const UTTERANCE_COLUMN: &str = "utterances";
pub const SLOT_COLUMN: &str = "IOB Slot tags";
pub const INTENT_COLUMN: &str = "Core Relations";

/// A labeled utterance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtisRecord {
    /// Whitespace tokens of the utterance.
    pub words: Vec<String>,
    /// One BIO tag per word.
    pub slot_tags: Vec<String>,
    /// Intent labels; `[no_intent]` when the source cell is empty.
    pub intents: Vec<String>,
}

impl AtisRecord {
    pub fn new(words: Vec<String>, slot_tags: Vec<String>, intents: Vec<String>) -> Self {
        Self {
            words,
            slot_tags,
            intents,
        }
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }
}

fn split_words(cell: &str) -> Vec<String> {
    cell.split_whitespace().map(str::to_string).collect()
}

fn open_reader(path: &Path) -> Result<csv::Reader<File>> {
    let file = File::open(path).map_err(|e| JointNluError::io(path, e))?;
    Ok(csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file))
}

fn column_index(headers: &csv::StringRecord, column: &str, path: &Path) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| JointNluError::MissingColumn {
            column: column.to_string(),
            path: path.to_path_buf(),
        })
}

/// Load a labeled CSV file.
///
/// Empty intent cells are filled with [`NO_INTENT`]. A row whose slot tag
/// count differs from its word count is rejected.
pub fn load_labeled<P: AsRef<Path>>(path: P) -> Result<Vec<AtisRecord>> {
    let path = path.as_ref();
    let mut reader = open_reader(path)?;
    let headers = reader.headers()?.clone();
    let utt_idx = column_index(&headers, UTTERANCE_COLUMN, path)?;
    let slot_idx = column_index(&headers, SLOT_COLUMN, path)?;
    let intent_idx = column_index(&headers, INTENT_COLUMN, path)?;

    let mut records = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let row_record = result?;
        let cell = |idx: usize| row_record.get(idx).unwrap_or("");

        let words = split_words(cell(utt_idx));
        let slot_tags = split_words(cell(slot_idx));
        if words.len() != slot_tags.len() {
            return Err(JointNluError::TagCountMismatch {
                row: row + 1,
                words: words.len(),
                tags: slot_tags.len(),
            });
        }

        let mut intents = split_words(cell(intent_idx));
        if intents.is_empty() {
            intents.push(NO_INTENT.to_string());
        }

        records.push(AtisRecord::new(words, slot_tags, intents));
    }

    debug!("Loaded {} labeled rows from {}", records.len(), path.display());
    Ok(records)
}

/// Load only the utterance column of a CSV file (e.g. the unlabeled test set).
pub fn load_utterances<P: AsRef<Path>>(path: P) -> Result<Vec<Vec<String>>> {
    let path = path.as_ref();
    let mut reader = open_reader(path)?;
    let headers = reader.headers()?.clone();
    let utt_idx = column_index(&headers, UTTERANCE_COLUMN, path)?;

    let mut utterances = Vec::new();
    for result in reader.records() {
        let record = result?;
        utterances.push(split_words(record.get(utt_idx).unwrap_or("")));
    }

    debug!("Loaded {} utterances from {}", utterances.len(), path.display());
    Ok(utterances)
}

/// Shuffle with a seeded RNG and split off `dev_fraction` of the items.
///
/// The dev share is rounded up, like scikit-learn's `train_test_split`.
/// Returns `(train, dev)`.
pub fn train_dev_split<T>(items: Vec<T>, dev_fraction: f64, seed: u64) -> Result<(Vec<T>, Vec<T>)> {
    if !(0.0..1.0).contains(&dev_fraction) {
        return Err(JointNluError::InvalidConfig(format!(
            "dev fraction must be in [0, 1), got {dev_fraction}"
        )));
    }

    let mut items = items;
    shuffle(&mut items, seed);

    let dev_len = (items.len() as f64 * dev_fraction).ceil() as usize;
    let train = items.split_off(dev_len);
    Ok((train, items))
}

/// Seeded Fisher-Yates shuffle.
pub fn shuffle<T>(items: &mut [T], seed: u64) {
    let mut rng = oorandom::Rand64::new(u128::from(seed));
    for i in (1..items.len()).rev() {
        let j = rng.rand_range(0..(i as u64 + 1)) as usize;
        items.swap(i, j);
    }
}
