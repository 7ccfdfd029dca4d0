//! # Training Dataset and Batching
//!
//! Encodes labeled records into model-ready examples and groups them into
//! padded batches.

use tracing::debug;

use crate::data::corpus::{shuffle, AtisRecord};
use crate::encode::{align_slot_labels, encode_intents};
use crate::error::{JointNluError, Result};
use crate::labels::{LabelVocab, IGNORE_INDEX};
use crate::tokenize::SubwordTokenizer;

/// One encoded training example.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedExample {
    pub input_ids: Vec<u32>,
    pub attention_mask: Vec<u32>,
    /// Aligned slot label per sub-word, [`IGNORE_INDEX`] where masked.
    pub slot_labels: Vec<i64>,
    /// One-hot intent vector over the intent vocabulary.
    pub intent_labels: Vec<f32>,
}

impl EncodedExample {
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }
}

/// Encoded training split.
#[derive(Debug, Clone, Default)]
pub struct AtisDataset {
    examples: Vec<EncodedExample>,
}

impl AtisDataset {
    pub fn new(examples: Vec<EncodedExample>) -> Self {
        Self { examples }
    }

    /// Tokenize records, align slot tags and one-hot encode intents.
    pub fn build(
        records: &[AtisRecord],
        tokenizer: &SubwordTokenizer,
        slot_vocab: &LabelVocab,
        intent_vocab: &LabelVocab,
    ) -> Result<Self> {
        let mut examples = Vec::with_capacity(records.len());

        for record in records {
            let encoding = tokenizer.encode_words(&record.words)?;
            let tag_ids = slot_vocab.encode(&record.slot_tags)?;
            let slot_labels = align_slot_labels(&tag_ids, &encoding.offsets)?;
            let intent_labels = encode_intents(&record.intents, intent_vocab)?;

            examples.push(EncodedExample {
                input_ids: encoding.ids,
                attention_mask: encoding.attention_mask,
                slot_labels,
                intent_labels,
            });
        }

        debug!("Encoded {} training examples", examples.len());
        Ok(Self { examples })
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&EncodedExample> {
        self.examples.get(idx)
    }

    pub fn examples(&self) -> &[EncodedExample] {
        &self.examples
    }
}

/// Row-major padded batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub batch_size: usize,
    pub seq_len: usize,
    pub num_intents: usize,
    /// `[batch_size * seq_len]`
    pub input_ids: Vec<u32>,
    /// `[batch_size * seq_len]`, 0 on padding.
    pub attention_mask: Vec<u32>,
    /// `[batch_size * seq_len]`, [`IGNORE_INDEX`] on padding.
    pub slot_labels: Vec<i64>,
    /// `[batch_size * num_intents]`
    pub intent_labels: Vec<f32>,
}

impl Batch {
    /// Pad examples to the longest one.
    pub fn collate(examples: &[&EncodedExample], pad_id: u32) -> Result<Self> {
        let seq_len = examples.iter().map(|e| e.len()).max().unwrap_or(0);
        let num_intents = examples.first().map_or(0, |e| e.intent_labels.len());
        let batch_size = examples.len();

        let mut batch = Batch {
            batch_size,
            seq_len,
            num_intents,
            input_ids: Vec::with_capacity(batch_size * seq_len),
            attention_mask: Vec::with_capacity(batch_size * seq_len),
            slot_labels: Vec::with_capacity(batch_size * seq_len),
            intent_labels: Vec::with_capacity(batch_size * num_intents),
        };

        for example in examples {
            if example.intent_labels.len() != num_intents {
                return Err(JointNluError::InvalidConfig(format!(
                    "intent vector length {} differs from {} within one batch",
                    example.intent_labels.len(),
                    num_intents
                )));
            }
            let pad = seq_len - example.len();
            batch.input_ids.extend_from_slice(&example.input_ids);
            batch.input_ids.extend(std::iter::repeat(pad_id).take(pad));
            batch.attention_mask.extend_from_slice(&example.attention_mask);
            batch.attention_mask.extend(std::iter::repeat(0).take(pad));
            batch.slot_labels.extend_from_slice(&example.slot_labels);
            batch.slot_labels.extend(std::iter::repeat(IGNORE_INDEX).take(pad));
            batch.intent_labels.extend_from_slice(&example.intent_labels);
        }

        Ok(batch)
    }
}

/// Iterator over batches of a dataset, optionally shuffled with a seed.
pub struct BatchLoader<'a> {
    dataset: &'a AtisDataset,
    order: Vec<usize>,
    batch_size: usize,
    pad_id: u32,
    pos: usize,
}

impl<'a> BatchLoader<'a> {
    pub fn new(
        dataset: &'a AtisDataset,
        batch_size: usize,
        pad_id: u32,
        shuffle_seed: Option<u64>,
    ) -> Result<Self> {
        if batch_size == 0 {
            return Err(JointNluError::InvalidConfig("batch size must be > 0".into()));
        }

        let mut order: Vec<usize> = (0..dataset.len()).collect();
        if let Some(seed) = shuffle_seed {
            shuffle(&mut order, seed);
        }

        Ok(Self {
            dataset,
            order,
            batch_size,
            pad_id,
            pos: 0,
        })
    }

    /// Number of batches per pass.
    pub fn num_batches(&self) -> usize {
        self.order.len().div_ceil(self.batch_size)
    }
}

impl Iterator for BatchLoader<'_> {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.order.len() {
            return None;
        }
        let end = (self.pos + self.batch_size).min(self.order.len());
        let examples: Vec<&EncodedExample> = self.order[self.pos..end]
            .iter()
            .filter_map(|&i| self.dataset.get(i))
            .collect();
        self.pos = end;
        Some(Batch::collate(&examples, self.pad_id))
    }
}
