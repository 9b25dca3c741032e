//! DMTUID classification identifiers
//!
//! A part identifier packs four 2-digit classification segments
//! (domain, family, class, style) and a 3-digit sequence number into a
//! fixed-width string with a literal prefix: `DMT-01020000001`.
//! Segments are immutable once a part is persisted and sequence
//! numbers are never recycled.

use std::fmt;
use thiserror::Error;

/// Default identifier prefix; overridable via config
pub const DEFAULT_PREFIX: &str = "DMT";

/// Digits in the identifier body: four 2-digit segments + 3-digit sequence
pub const BODY_LEN: usize = 11;

/// Highest sequence number the 3-digit field can carry
pub const MAX_SEQUENCE: u16 = 999;

/// Input column labels for the four classification segments, in
/// most-general to most-specific order. These are the case-sensitive
/// keys bulk input uses and the names validation errors report.
pub const SEGMENT_KEYS: [&str; 4] = ["TT", "FF", "CC", "SS"];

/// Input column label for a pre-assigned full identifier
pub const ID_KEY: &str = "DMTUID";

/// Input column label for an explicit sequence value (reserved, never
/// routed as an attribute; the allocator owns sequence assignment)
pub const SEQ_KEY: &str = "Seq";

/// Errors from classification segment validation
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SegmentError {
    #[error("segment {key} is empty")]
    Empty { key: &'static str },

    #[error("segment {key} is non-numeric: '{value}'")]
    NonNumeric { key: &'static str, value: String },

    #[error("segment {key} is longer than two digits: '{value}'")]
    TooLong { key: &'static str, value: String },
}

/// The four classification segments of a part, without the sequence.
///
/// Values are held as numbers and rendered zero-padded, so `"1"` and
/// `"01"` parse to the same segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassSegments {
    pub domain: u8,
    pub family: u8,
    pub class: u8,
    pub style: u8,
}

impl ClassSegments {
    /// Parse the four raw segment strings, in segment order, returning
    /// the first validation failure found. Does not validate the
    /// sequence (the allocator's job) and does not consult the schema
    /// catalog (a separate check callers may layer on).
    pub fn parse(domain: &str, family: &str, class: &str, style: &str) -> Result<Self, SegmentError> {
        let raw = [domain, family, class, style];
        let mut parsed = [0u8; 4];

        for (i, value) in raw.iter().enumerate() {
            parsed[i] = parse_segment(SEGMENT_KEYS[i], value)?;
        }

        Ok(Self {
            domain: parsed[0],
            family: parsed[1],
            class: parsed[2],
            style: parsed[3],
        })
    }

    /// Two-digit domain code
    pub fn domain_code(&self) -> String {
        format!("{:02}", self.domain)
    }

    /// Two-digit family code
    pub fn family_code(&self) -> String {
        format!("{:02}", self.family)
    }

    /// Two-digit class code
    pub fn class_code(&self) -> String {
        format!("{:02}", self.class)
    }

    /// Two-digit style code
    pub fn style_code(&self) -> String {
        format!("{:02}", self.style)
    }

    /// Classification group key (`DDFFCCSS`) - the namespace within
    /// which sequence numbers are allocated
    pub fn group_key(&self) -> String {
        format!(
            "{:02}{:02}{:02}{:02}",
            self.domain, self.family, self.class, self.style
        )
    }

    /// Family key (`DDFF`) - the namespace template and guideline
    /// lookups use
    pub fn family_key(&self) -> String {
        format!("{:02}{:02}", self.domain, self.family)
    }
}

impl fmt::Display for ClassSegments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.group_key())
    }
}

fn parse_segment(key: &'static str, value: &str) -> Result<u8, SegmentError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SegmentError::Empty { key });
    }
    if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SegmentError::NonNumeric {
            key,
            value: trimmed.to_string(),
        });
    }
    if trimmed.len() > 2 {
        return Err(SegmentError::TooLong {
            key,
            value: trimmed.to_string(),
        });
    }
    // Two ASCII digits always fit in u8
    Ok(trimmed.parse().unwrap_or(0))
}

/// A complete classification code: four segments plus the per-group
/// sequence number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassCode {
    pub segments: ClassSegments,
    pub sequence: u16,
}

impl ClassCode {
    pub fn new(segments: ClassSegments, sequence: u16) -> Self {
        Self { segments, sequence }
    }

    /// The 11-digit identifier body, without prefix
    pub fn body(&self) -> String {
        format!("{}{:03}", self.segments.group_key(), self.sequence)
    }

    /// Encode the full identifier string with the given prefix
    pub fn encode(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.body())
    }

    /// Decode an identifier string. Soft fail: returns `None` when the
    /// text does not start with `<prefix>-` or the body is not exactly
    /// eleven ASCII digits. Callers treat `None` as "not an existing
    /// identifier, fall back to synthesis".
    pub fn decode(prefix: &str, text: &str) -> Option<Self> {
        let body = text.strip_prefix(prefix)?.strip_prefix('-')?;
        if body.len() != BODY_LEN || !body.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        let segments = ClassSegments {
            domain: body[0..2].parse().ok()?,
            family: body[2..4].parse().ok()?,
            class: body[4..6].parse().ok()?,
            style: body[6..8].parse().ok()?,
        };
        let sequence: u16 = body[8..11].parse().ok()?;

        Some(Self { segments, sequence })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segs(d: u8, f: u8, c: u8, s: u8) -> ClassSegments {
        ClassSegments {
            domain: d,
            family: f,
            class: c,
            style: s,
        }
    }

    #[test]
    fn test_encode_pads_segments() {
        let code = ClassCode::new(segs(1, 2, 0, 0), 1);
        assert_eq!(code.encode("DMT"), "DMT-01020000001");
    }

    #[test]
    fn test_decode_roundtrip() {
        let code = ClassCode::new(segs(12, 34, 56, 78), 901);
        let text = code.encode("DMT");
        assert_eq!(ClassCode::decode("DMT", &text), Some(code));
    }

    #[test]
    fn test_decode_example_from_docs() {
        let code = ClassCode::decode("DMT", "DMT-01010100001").unwrap();
        assert_eq!(code.segments, segs(1, 1, 1, 0));
        assert_eq!(code.sequence, 1);
    }

    #[test]
    fn test_decode_soft_fails_on_garbage() {
        for text in [
            "",
            "DMT",
            "DMT-",
            "DMT-0101010000",   // too short
            "DMT-010101000012", // too long
            "DMT-0101010000x",  // non-digit
            "XYZ-01010100001",  // wrong prefix
            "DMT_01010100001",  // wrong separator
            "R001",
        ] {
            assert_eq!(ClassCode::decode("DMT", text), None, "input: {:?}", text);
        }
    }

    #[test]
    fn test_parse_accepts_unpadded_segments() {
        let parsed = ClassSegments::parse("1", "02", "0", "00").unwrap();
        assert_eq!(parsed, segs(1, 2, 0, 0));
        assert_eq!(parsed.group_key(), "01020000");
        assert_eq!(parsed.family_key(), "0102");
    }

    #[test]
    fn test_parse_reports_first_failure_in_segment_order() {
        let err = ClassSegments::parse("", "abc", "01", "01").unwrap_err();
        assert_eq!(err, SegmentError::Empty { key: "TT" });
    }

    #[test]
    fn test_parse_non_numeric_names_column() {
        let err = ClassSegments::parse("01", "abc", "01", "01").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("FF"));
        assert!(msg.contains("non-numeric"));
    }

    #[test]
    fn test_parse_rejects_oversized_segment() {
        let err = ClassSegments::parse("01", "02", "123", "01").unwrap_err();
        assert_eq!(
            err,
            SegmentError::TooLong {
                key: "CC",
                value: "123".to_string()
            }
        );
    }
}
