//! Line grammar.
//!
//! A log line is free text with an optional `[YYYY-MM-DDTHH:MM:SSZ]`
//! timestamp and a severity keyword. Error lines may carry an
//! `ERROR: <token>` signature used for clustering.

use crate::error::ParseError;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bucket for ERROR lines without an `ERROR: <token>` signature
pub const UNKNOWN_ERROR_PATTERN: &str = "Unknown error";

const ERROR_MARKER: &str = "ERROR: ";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Coarse severity classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Error,
    Info,
    Debug,
    Other,
}

impl Severity {
    /// All severities, in classification priority order
    pub const ALL: [Severity; 4] = [Severity::Error, Severity::Info, Severity::Debug, Severity::Other];

    /// Classify a line by case-sensitive keyword containment.
    ///
    /// ERROR wins over INFO, which wins over DEBUG; anything else is OTHER.
    pub fn classify(line: &str) -> Self {
        if line.contains("ERROR") {
            Severity::Error
        } else if line.contains("INFO") {
            Severity::Info
        } else if line.contains("DEBUG") {
            Severity::Debug
        } else {
            Severity::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "ERROR",
            Severity::Info => "INFO",
            Severity::Debug => "DEBUG",
            Severity::Other => "OTHER",
        }
    }

    /// Position in [`Severity::ALL`], usable as an array index
    pub fn index(&self) -> usize {
        match self {
            Severity::Error => 0,
            Severity::Info => 1,
            Severity::Debug => 2,
            Severity::Other => 3,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of looking for a bracketed timestamp
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimestampField {
    /// No `[...]` pair in the line
    Absent,
    Parsed(DateTime<Utc>),
    /// A bracket was found but its content is not a valid timestamp
    Malformed(ParseError),
}

/// Error signature of an ERROR line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPattern<'a> {
    Token(&'a str),
    Unknown,
}

impl<'a> ErrorPattern<'a> {
    pub fn as_str(&self) -> &'a str {
        match self {
            ErrorPattern::Token(token) => token,
            ErrorPattern::Unknown => UNKNOWN_ERROR_PATTERN,
        }
    }
}

/// Everything the aggregator extracts from one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine<'a> {
    pub timestamp: TimestampField,
    pub severity: Severity,
    /// Only set for [`Severity::Error`] lines
    pub error_pattern: Option<ErrorPattern<'a>>,
}

impl<'a> ParsedLine<'a> {
    pub fn parse(line: &'a str) -> Self {
        let timestamp = match bracketed(line) {
            None => TimestampField::Absent,
            Some(raw) => match parse_timestamp(raw) {
                Ok(ts) => TimestampField::Parsed(ts),
                Err(e) => TimestampField::Malformed(e),
            },
        };

        let severity = Severity::classify(line);
        let error_pattern = (severity == Severity::Error).then(|| match error_token(line) {
            Some(token) => ErrorPattern::Token(token),
            None => ErrorPattern::Unknown,
        });

        Self {
            timestamp,
            severity,
            error_pattern,
        }
    }
}

/// Content of the first `[...]` pair, if any
pub fn bracketed(line: &str) -> Option<&str> {
    let start = line.find('[')?;
    let rest = &line[start + 1..];
    let end = rest.find(']')?;
    Some(&rest[..end])
}

/// Parse a `YYYY-MM-DDTHH:MM:SSZ` timestamp
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ParseError> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| ParseError::Timestamp {
            value: raw.to_string(),
            reason: e.to_string(),
        })
}

/// Signature following the first `ERROR: ` marker.
///
/// The first character after the marker is always taken (even whitespace),
/// then everything up to the next whitespace or the end of the line.
pub fn error_token(line: &str) -> Option<&str> {
    let start = line.find(ERROR_MARKER)? + ERROR_MARKER.len();
    let after = &line[start..];
    let first = after.chars().next()?;
    let head = first.len_utf8();
    let end = after[head..]
        .find(char::is_whitespace)
        .map(|i| i + head)
        .unwrap_or(after.len());
    Some(&after[..end])
}
