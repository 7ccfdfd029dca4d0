use std::path::PathBuf;

use thiserror::Error;

/// Which label inventory a label was looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    Slot,
    Intent,
}

impl std::fmt::Display for LabelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LabelKind::Slot => write!(f, "slot"),
            LabelKind::Intent => write!(f, "intent"),
        }
    }
}

/// Errors that can occur while preparing, aligning or decoding data.
#[derive(Debug, Error)]
pub enum JointNluError {
    /// A file could not be opened, read or written.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CSV reader/writer failed.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// A required column is absent from a CSV header.
    #[error("column {column:?} not found in {path}")]
    MissingColumn { column: String, path: PathBuf },

    /// A row has a different number of slot tags than words.
    #[error("row {row}: {words} words but {tags} slot tags")]
    TagCountMismatch {
        /// 1-based data row (header excluded).
        row: usize,
        words: usize,
        tags: usize,
    },

    /// A label is not part of the vocabulary built from the training split.
    #[error("unknown {kind} label {label:?}")]
    UnknownLabel { kind: LabelKind, label: String },

    /// Word tags could not be projected onto sub-word positions.
    #[error("cannot align {tags} word tags onto {starts} word-start sub-words")]
    AlignmentMismatch { tags: usize, starts: usize },

    /// The sub-word tokenizer failed to load or encode.
    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    /// An utterance had no words.
    #[error("input is empty or whitespace-only")]
    EmptyInput,

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A prediction or gold label line could not be parsed.
    #[error("line {line}: {reason}")]
    MalformedLine { line: usize, reason: String },
}

impl JointNluError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        JointNluError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for jointnlu operations.
pub type Result<T> = std::result::Result<T, JointNluError>;
