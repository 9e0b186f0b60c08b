use thiserror::Error;

pub type WireResult<T> = Result<T, WireError>;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("record is empty")]
    Empty,

    #[error("record has no separator after the sequence number")]
    MissingSeparator,

    #[error("invalid sequence number {0:?}")]
    BadSequence(String),

    #[error("sequence modulus must be at least 2, got {0}")]
    InvalidModulus(u32),

    #[error("instruction is empty")]
    EmptyInstruction,

    #[error("instruction spans more than one line")]
    MultiLineInstruction,
}
