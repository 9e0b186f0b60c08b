use std::time::Duration;

use mailbox_store::StoreError;
use mailbox_wire::WireError;
use thiserror::Error;

pub type ChannelResult<T> = Result<T, ChannelError>;

#[derive(Debug, Error)]
pub enum ChannelError {
    /// No response carrying the awaited sequence arrived in time.
    #[error("no response to command {sequence} within {waited:?}")]
    Timeout {
        sequence: u32,
        waited: Duration,
        /// Last unreadable poll observed while waiting, if any.
        last_fault: Option<String>,
    },

    /// The host answered with an error marker. `diagnostic` is verbatim.
    #[error("host rejected command {sequence}: {diagnostic}")]
    Command { sequence: u32, diagnostic: String },

    #[error("malformed record: {0}")]
    Framing(#[from] WireError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to write command {sequence} after {attempts} attempt(s): {source}")]
    Storage {
        sequence: u32,
        attempts: u32,
        #[source]
        source: StoreError,
    },

    #[error("invalid instruction: {0}")]
    InvalidInstruction(WireError),
}

/// Discriminant of [`ChannelError`] for callers that only branch on the kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelErrorKind {
    Timeout,
    Command,
    Framing,
    Config,
    Storage,
    InvalidInstruction,
}

impl ChannelError {
    pub fn config(msg: impl Into<String>) -> Self {
        ChannelError::Config(msg.into())
    }

    pub fn kind(&self) -> ChannelErrorKind {
        match self {
            ChannelError::Timeout { .. } => ChannelErrorKind::Timeout,
            ChannelError::Command { .. } => ChannelErrorKind::Command,
            ChannelError::Framing(_) => ChannelErrorKind::Framing,
            ChannelError::Config(_) => ChannelErrorKind::Config,
            ChannelError::Storage { .. } => ChannelErrorKind::Storage,
            ChannelError::InvalidInstruction(_) => ChannelErrorKind::InvalidInstruction,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind() == ChannelErrorKind::Timeout
    }

    pub fn is_command_failure(&self) -> bool {
        self.kind() == ChannelErrorKind::Command
    }

    pub fn is_config(&self) -> bool {
        self.kind() == ChannelErrorKind::Config
    }

    /// Host diagnostic carried by a command failure.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            ChannelError::Command { diagnostic, .. } => Some(diagnostic),
            _ => None,
        }
    }
}
