use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mailbox_store::{MailboxPaths, TextEncoding};
use serde::{Deserialize, Serialize};

use crate::{HostError, HostResult};

/// Values consumed by [`crate::HostPollLoop`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub comm_dir: PathBuf,
    pub command_file: String,
    pub response_file: String,
    pub poll_interval_ms: u64,
    /// Instruction that ends the loop after it is answered.
    pub terminal_instruction: String,
    pub encoding: TextEncoding,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            comm_dir: PathBuf::from("communication_files"),
            command_file: "command".into(),
            response_file: "response".into(),
            poll_interval_ms: 200,
            terminal_instruction: "Exit".into(),
            encoding: TextEncoding::Utf16,
        }
    }
}

impl HostConfig {
    pub fn from_json_str(text: &str) -> HostResult<Self> {
        serde_json::from_str(text)
            .map_err(|err| HostError::config(format!("invalid host configuration: {err}")))
    }

    pub fn load(path: impl AsRef<Path>) -> HostResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|err| HostError::config(format!("cannot read {}: {err}", path.display())))?;
        Self::from_json_str(&text)
    }

    pub fn with_comm_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.comm_dir = dir.into();
        self
    }

    pub fn validate(&self) -> HostResult<()> {
        if self.command_file.trim().is_empty() || self.response_file.trim().is_empty() {
            return Err(HostError::config("mailbox file names must not be empty"));
        }
        if self.command_file == self.response_file {
            return Err(HostError::config("command and response files must differ"));
        }
        if self.poll_interval_ms == 0 {
            return Err(HostError::config("poll interval must be positive"));
        }
        if self.terminal_instruction.trim().is_empty() {
            return Err(HostError::config("terminal instruction must not be empty"));
        }
        Ok(())
    }

    pub fn paths(&self) -> MailboxPaths {
        MailboxPaths::new(&self.comm_dir, &self.command_file, &self.response_file)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
