//! `"<sequence> <text>"` records stored in the command and response slots.

use std::fmt;
use std::str::FromStr;

use crate::{WireError, WireResult};

/// Payload the host writes when an instruction produced no value.
pub const NO_VALUE_MARKER: &str = "None";

/// Prefix the host writes in front of an interpreter diagnostic.
pub const ERROR_MARKER: &str = "ERROR:";

/// Instruction addressed to the host, tagged with its sequence number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandRecord {
    pub sequence: u32,
    pub instruction: String,
}

impl CommandRecord {
    pub fn new(sequence: u32, instruction: impl Into<String>) -> Self {
        Self {
            sequence,
            instruction: instruction.into(),
        }
    }

    /// Parses a command slot's contents.
    ///
    /// Everything after the first space is the instruction, spaces included.
    pub fn parse(text: &str) -> WireResult<Self> {
        let (sequence, instruction) = split_record(text)?;
        let instruction = instruction.ok_or(WireError::MissingSeparator)?;
        Ok(Self::new(sequence, instruction))
    }
}

impl fmt::Display for CommandRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.sequence, self.instruction)
    }
}

impl FromStr for CommandRecord {
    type Err = WireError;

    fn from_str(s: &str) -> WireResult<Self> {
        Self::parse(s)
    }
}

/// Result of executing one instruction on the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The instruction produced a value (possibly empty text).
    Value(String),
    /// The instruction ran and produced nothing.
    NoValue,
    /// The interpreter rejected the instruction. Holds the outcome text
    /// verbatim, marker included.
    Error(String),
}

impl Outcome {
    /// Builds an error outcome, adding the marker when `diagnostic` lacks it.
    pub fn error(diagnostic: impl AsRef<str>) -> Self {
        let diagnostic = diagnostic.as_ref();
        if is_error_text(diagnostic) {
            Outcome::Error(diagnostic.to_owned())
        } else {
            Outcome::Error(format!("{ERROR_MARKER} {diagnostic}"))
        }
    }

    /// Classifies the outcome half of a response record.
    pub fn from_text(text: &str) -> Self {
        if is_error_text(text) {
            Outcome::Error(text.to_owned())
        } else if text == NO_VALUE_MARKER {
            Outcome::NoValue
        } else {
            Outcome::Value(text.to_owned())
        }
    }

    pub fn as_text(&self) -> &str {
        match self {
            Outcome::Value(value) => value,
            Outcome::NoValue => NO_VALUE_MARKER,
            Outcome::Error(diagnostic) => diagnostic,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Error(_))
    }
}

/// Host answer correlated to a [`CommandRecord`] by sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseRecord {
    pub sequence: u32,
    pub outcome: Outcome,
}

impl ResponseRecord {
    pub fn new(sequence: u32, outcome: Outcome) -> Self {
        Self { sequence, outcome }
    }

    /// Parses a response slot's contents.
    ///
    /// Trailing whitespace is not part of the outcome, so an empty value
    /// (`"6 "`) reads back as a bare sequence number.
    pub fn parse(text: &str) -> WireResult<Self> {
        let (sequence, outcome) = split_record(text)?;
        Ok(Self::new(sequence, Outcome::from_text(outcome.unwrap_or(""))))
    }
}

impl fmt::Display for ResponseRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.sequence, self.outcome.as_text())
    }
}

impl FromStr for ResponseRecord {
    type Err = WireError;

    fn from_str(s: &str) -> WireResult<Self> {
        Self::parse(s)
    }
}

fn is_error_text(text: &str) -> bool {
    text.trim_start().starts_with(ERROR_MARKER)
}

/// Whitespace, NUL padding and a byte order mark around a record are left
/// behind by the host's file writer and carry no meaning.
fn is_padding(c: char) -> bool {
    c.is_whitespace() || c == '\0' || c == '\u{feff}'
}

/// Splits `"<sequence> <rest>"` after trimming padding from both ends.
/// `rest` is `None` when the record is a bare sequence number.
fn split_record(text: &str) -> WireResult<(u32, Option<&str>)> {
    let body = text.trim_matches(is_padding);
    if body.is_empty() {
        return Err(WireError::Empty);
    }

    let (sequence, rest) = match body.split_once(' ') {
        Some((sequence, rest)) => (sequence, Some(rest)),
        None => (body, None),
    };
    if sequence.is_empty() || !sequence.bytes().all(|b| b.is_ascii_digit()) {
        return Err(WireError::BadSequence(sequence.to_owned()));
    }
    let sequence = sequence
        .parse::<u32>()
        .map_err(|_| WireError::BadSequence(sequence.to_owned()))?;
    Ok((sequence, rest))
}
