//! # BIO Slot Tags
//!
//! Parsing of `O` / `B-<slot>` / `I-<slot>` tag strings, transition rules and
//! span extraction for slot scoring.

use std::fmt;

/// A parsed BIO slot tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SlotTag {
    /// Token outside any slot (`O`).
    Outside,
    /// First token of a slot (`B-<slot>`).
    Begin(String),
    /// Continuation of a slot (`I-<slot>`).
    Inside(String),
}

impl SlotTag {
    /// Parse a tag string. Anything that is not `B-x` or `I-x` is treated as
    /// outside, which covers `O` and the `PAD` sentinel.
    pub fn parse(tag: &str) -> Self {
        if let Some(slot) = tag.strip_prefix("B-") {
            SlotTag::Begin(slot.to_string())
        } else if let Some(slot) = tag.strip_prefix("I-") {
            SlotTag::Inside(slot.to_string())
        } else {
            SlotTag::Outside
        }
    }

    /// Slot name carried by this tag.
    pub fn slot(&self) -> Option<&str> {
        match self {
            SlotTag::Begin(s) | SlotTag::Inside(s) => Some(s),
            SlotTag::Outside => None,
        }
    }

    pub fn is_begin(&self) -> bool {
        matches!(self, SlotTag::Begin(_))
    }

    pub fn is_inside(&self) -> bool {
        matches!(self, SlotTag::Inside(_))
    }

    /// Check if `to` may follow `from`. `from == None` means sequence start.
    pub fn is_valid_transition(from: Option<&SlotTag>, to: &SlotTag) -> bool {
        match to {
            SlotTag::Inside(slot) => match from {
                Some(SlotTag::Begin(prev)) | Some(SlotTag::Inside(prev)) => prev == slot,
                Some(SlotTag::Outside) | None => false,
            },
            _ => true,
        }
    }
}

impl fmt::Display for SlotTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotTag::Outside => write!(f, "O"),
            SlotTag::Begin(s) => write!(f, "B-{s}"),
            SlotTag::Inside(s) => write!(f, "I-{s}"),
        }
    }
}

/// A slot span over word indices, `end` exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotSpan {
    pub slot: String,
    pub start: usize,
    pub end: usize,
}

/// Extract slot spans from a tag sequence.
///
/// An `I-x` that does not continue an open `x` span opens a new one, the
/// same way conlleval treats ill-formed sequences.
pub fn extract_spans<S: AsRef<str>>(tags: &[S]) -> Vec<SlotSpan> {
    let mut spans = Vec::new();
    let mut open: Option<SlotSpan> = None;

    for (i, raw) in tags.iter().enumerate() {
        let tag = SlotTag::parse(raw.as_ref());
        match tag {
            SlotTag::Inside(slot)
                if open.as_ref().is_some_and(|span| span.slot == slot) =>
            {
                if let Some(span) = open.as_mut() {
                    span.end = i + 1;
                }
            }
            SlotTag::Begin(slot) | SlotTag::Inside(slot) => {
                spans.extend(open.take());
                open = Some(SlotSpan {
                    slot,
                    start: i,
                    end: i + 1,
                });
            }
            SlotTag::Outside => spans.extend(open.take()),
        }
    }
    spans.extend(open);
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display_roundtrip() {
        for raw in ["O", "B-city", "I-fromloc.city_name"] {
            assert_eq!(SlotTag::parse(raw).to_string(), raw);
        }
        assert_eq!(SlotTag::parse("PAD"), SlotTag::Outside);
    }

    #[test]
    fn test_valid_transitions() {
        let b_city = SlotTag::parse("B-city");
        let i_city = SlotTag::parse("I-city");

        assert!(SlotTag::is_valid_transition(Some(&b_city), &i_city));
        assert!(SlotTag::is_valid_transition(Some(&i_city), &i_city));
        assert!(SlotTag::is_valid_transition(None, &b_city));
        assert!(SlotTag::is_valid_transition(Some(&i_city), &SlotTag::Outside));
    }

    #[test]
    fn test_invalid_transitions() {
        let b_city = SlotTag::parse("B-city");
        let i_date = SlotTag::parse("I-date");

        assert!(!SlotTag::is_valid_transition(None, &i_date));
        assert!(!SlotTag::is_valid_transition(Some(&SlotTag::Outside), &i_date));
        assert!(!SlotTag::is_valid_transition(Some(&b_city), &i_date));
    }

    #[test]
    fn test_extract_spans() {
        let tags = ["O", "B-city", "I-city", "O", "B-date", "B-time"];
        let spans = extract_spans(&tags);
        assert_eq!(
            spans,
            vec![
                SlotSpan { slot: "city".into(), start: 1, end: 3 },
                SlotSpan { slot: "date".into(), start: 4, end: 5 },
                SlotSpan { slot: "time".into(), start: 5, end: 6 },
            ]
        );
    }

    #[test]
    fn test_stray_inside_opens_span() {
        let spans = extract_spans(&["O", "I-city", "I-city", "I-date"]);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0], SlotSpan { slot: "city".into(), start: 1, end: 3 });
        assert_eq!(spans[1].slot, "date");
    }
}
