use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mailbox_store::{MailboxPaths, TextEncoding};
use mailbox_wire::{SeqSpace, DEFAULT_MODULUS};
use serde::{Deserialize, Serialize};

use crate::{ChannelError, ChannelResult};

/// Values consumed by [`crate::ControllerClient`].
///
/// Every field has a default, so a JSON file only needs the fields it changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Directory holding the command and response files.
    pub comm_dir: PathBuf,
    pub command_file: String,
    pub response_file: String,
    /// Sequence ring size `N`; must match the host side.
    pub modulus: u32,
    pub default_timeout_ms: u64,
    pub poll_interval_ms: u64,
    /// Pause between command write attempts.
    pub retry_delay_ms: u64,
    /// Attempts for a command write, and consecutive unreadable polls
    /// tolerated before a wait gives up.
    pub max_retries: u32,
    /// Pause after writing the baseline record.
    pub settle_ms: u64,
    /// Run the connection test while connecting.
    pub test_on_init: bool,
    /// Log every exchange at info level instead of debug.
    pub verbose: bool,
    pub encoding: TextEncoding,
    /// Refuse to share the mailbox directory with another controller.
    pub exclusive: bool,
    /// Instruction that ends the host loop.
    pub terminal_instruction: String,
    /// No-op instruction carried by the baseline record.
    pub baseline_instruction: String,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            comm_dir: PathBuf::from("communication_files"),
            command_file: "command".into(),
            response_file: "response".into(),
            modulus: DEFAULT_MODULUS,
            default_timeout_ms: 5_000,
            poll_interval_ms: 100,
            retry_delay_ms: 100,
            max_retries: 10,
            settle_ms: 500,
            test_on_init: false,
            verbose: false,
            encoding: TextEncoding::Utf16,
            exclusive: true,
            terminal_instruction: "Exit".into(),
            baseline_instruction: "last_command_number = 0".into(),
        }
    }
}

impl ChannelConfig {
    pub fn from_json_str(text: &str) -> ChannelResult<Self> {
        serde_json::from_str(text)
            .map_err(|err| ChannelError::config(format!("invalid channel configuration: {err}")))
    }

    /// Reads a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> ChannelResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| {
            ChannelError::config(format!("cannot read {}: {err}", path.display()))
        })?;
        Self::from_json_str(&text)
    }

    pub fn with_comm_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.comm_dir = dir.into();
        self
    }

    pub fn validate(&self) -> ChannelResult<()> {
        self.seq_space()?;
        if self.command_file.trim().is_empty() || self.response_file.trim().is_empty() {
            return Err(ChannelError::config("mailbox file names must not be empty"));
        }
        if self.command_file == self.response_file {
            return Err(ChannelError::config(
                "command and response files must differ",
            ));
        }
        if self.default_timeout_ms == 0 {
            return Err(ChannelError::config("default timeout must be positive"));
        }
        if self.poll_interval_ms == 0 {
            return Err(ChannelError::config("poll interval must be positive"));
        }
        if self.max_retries == 0 {
            return Err(ChannelError::config("max_retries must be at least 1"));
        }
        if self.terminal_instruction.trim().is_empty() {
            return Err(ChannelError::config("terminal instruction must not be empty"));
        }
        Ok(())
    }

    pub fn seq_space(&self) -> ChannelResult<SeqSpace> {
        SeqSpace::new(self.modulus).map_err(|err| ChannelError::config(err.to_string()))
    }

    pub fn paths(&self) -> MailboxPaths {
        MailboxPaths::new(&self.comm_dir, &self.command_file, &self.response_file)
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = ChannelConfig::default();
        config.validate().unwrap();
        assert_eq!(config.modulus, 256);
        assert_eq!(config.default_timeout(), Duration::from_secs(5));
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
        assert_eq!(config.encoding, TextEncoding::Utf16);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ChannelConfig::from_json_str(
            r#"{ "comm_dir": "C:/lab/mailbox", "modulus": 64, "encoding": "utf8", "verbose": true }"#,
        )
        .unwrap();
        assert_eq!(config.comm_dir, PathBuf::from("C:/lab/mailbox"));
        assert_eq!(config.modulus, 64);
        assert_eq!(config.encoding, TextEncoding::Utf8);
        assert!(config.verbose);
        assert_eq!(config.command_file, "command");
        assert_eq!(config.max_retries, 10);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = ChannelConfig::from_json_str("{ modulus: }").unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("channel.json");
        fs::write(&path, r#"{ "default_timeout_ms": 750 }"#).unwrap();
        let config = ChannelConfig::load(&path).unwrap();
        assert_eq!(config.default_timeout(), Duration::from_millis(750));

        assert!(ChannelConfig::load(dir.path().join("missing.json"))
            .unwrap_err()
            .is_config());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let cases = [
            ChannelConfig {
                modulus: 1,
                ..ChannelConfig::default()
            },
            ChannelConfig {
                default_timeout_ms: 0,
                ..ChannelConfig::default()
            },
            ChannelConfig {
                poll_interval_ms: 0,
                ..ChannelConfig::default()
            },
            ChannelConfig {
                max_retries: 0,
                ..ChannelConfig::default()
            },
            ChannelConfig {
                response_file: "command".into(),
                ..ChannelConfig::default()
            },
            ChannelConfig {
                command_file: " ".into(),
                ..ChannelConfig::default()
            },
        ];
        for config in cases {
            assert!(config.validate().unwrap_err().is_config(), "{config:?}");
        }
    }
}
