//! # Sub-word Tokenizer
//!
//! Thin wrapper over a Hugging Face `tokenizers` model that encodes
//! pre-split words and keeps the per-word offset mapping used for label
//! alignment.

use std::path::Path;

use tokenizers::{Tokenizer as HfTokenizer, TruncationParams};

use crate::error::{JointNluError, Result};

/// Sub-word encoding of one utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordEncoding {
    pub ids: Vec<u32>,
    pub attention_mask: Vec<u32>,
    /// Per token `(start, end)` within its originating word; `(0, 0)` for
    /// special tokens.
    pub offsets: Vec<(usize, usize)>,
    /// Number of words in the source utterance.
    pub word_count: usize,
}

impl WordEncoding {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Tokenizer for already whitespace-split utterances.
pub struct SubwordTokenizer {
    inner: HfTokenizer,
    pad_id: u32,
}

impl SubwordTokenizer {
    /// Wrap a loaded tokenizer, truncating encodings to `max_length` tokens.
    pub fn new(mut inner: HfTokenizer, max_length: usize) -> Result<Self> {
        inner
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(|e| JointNluError::Tokenizer(e.to_string()))?;
        // Padding is applied per batch by the loader.
        inner.with_padding(None);

        let pad_id = ["[PAD]", "<pad>"]
            .iter()
            .find_map(|t| inner.token_to_id(t))
            .unwrap_or(0);

        Ok(Self { inner, pad_id })
    }

    /// Load a `tokenizer.json` file.
    pub fn from_file<P: AsRef<Path>>(path: P, max_length: usize) -> Result<Self> {
        let inner = HfTokenizer::from_file(path.as_ref())
            .map_err(|e| JointNluError::Tokenizer(e.to_string()))?;
        Self::new(inner, max_length)
    }

    /// Load tokenizer JSON already in memory.
    pub fn from_bytes<B: AsRef<[u8]>>(bytes: B, max_length: usize) -> Result<Self> {
        let inner = HfTokenizer::from_bytes(bytes)
            .map_err(|e| JointNluError::Tokenizer(e.to_string()))?;
        Self::new(inner, max_length)
    }

    /// Encode pre-split words, adding the model's special tokens.
    pub fn encode_words<S: AsRef<str>>(&self, words: &[S]) -> Result<WordEncoding> {
        if words.is_empty() {
            return Err(JointNluError::EmptyInput);
        }

        let pieces: Vec<&str> = words.iter().map(AsRef::as_ref).collect();
        let encoding = self
            .inner
            .encode(pieces, true)
            .map_err(|e| JointNluError::Tokenizer(e.to_string()))?;

        Ok(WordEncoding {
            ids: encoding.get_ids().to_vec(),
            attention_mask: encoding.get_attention_mask().to_vec(),
            offsets: encoding.get_offsets().to_vec(),
            word_count: words.len(),
        })
    }

    pub fn pad_id(&self) -> u32 {
        self.pad_id
    }

    pub fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(true)
    }
}
