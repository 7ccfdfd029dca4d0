//! Tab-separated label files: `space-joined slots<TAB>space-joined intents`.
//!
//! Gold dev labels and model predictions share this layout, so one reader
//! serves both.

use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data::corpus::AtisRecord;
use crate::error::{JointNluError, Result};

/// Slot tags and intents of one utterance.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LabelLine {
    pub slots: Vec<String>,
    pub intents: Vec<String>,
}

impl LabelLine {
    pub fn new(slots: Vec<String>, intents: Vec<String>) -> Self {
        Self { slots, intents }
    }
}

impl From<&AtisRecord> for LabelLine {
    fn from(record: &AtisRecord) -> Self {
        Self::new(record.slot_tags.clone(), record.intents.clone())
    }
}

/// Write one line per utterance.
pub fn write_label_lines<P: AsRef<Path>>(path: P, lines: &[LabelLine]) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| JointNluError::io(path, e))?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .has_headers(false)
        .from_writer(file);

    for line in lines {
        writer.write_record([line.slots.join(" "), line.intents.join(" ")])?;
    }
    writer.flush().map_err(|e| JointNluError::io(path, e))?;
    Ok(())
}

/// Write the gold slot/intent strings of labeled records.
pub fn write_gold_labels<P: AsRef<Path>>(path: P, records: &[AtisRecord]) -> Result<()> {
    let lines: Vec<LabelLine> = records.iter().map(LabelLine::from).collect();
    write_label_lines(path, &lines)
}

/// Read a label file written by [`write_label_lines`].
pub fn read_label_lines<P: AsRef<Path>>(path: P) -> Result<Vec<LabelLine>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| JointNluError::io(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .quoting(false)
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    let mut lines = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() != 2 {
            return Err(JointNluError::MalformedLine {
                line: i + 1,
                reason: format!("expected 2 tab-separated fields, found {}", record.len()),
            });
        }
        let split = |s: &str| -> Vec<String> { s.split_whitespace().map(str::to_string).collect() };
        lines.push(LabelLine::new(split(&record[0]), split(&record[1])));
    }
    Ok(lines)
}
