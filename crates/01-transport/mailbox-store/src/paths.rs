use std::fs;
use std::path::{Path, PathBuf};

use crate::{FileSlot, StoreError, StoreResult, TextEncoding, CLAIM_FILE};

/// Locations of one command/response slot pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MailboxPaths {
    pub dir: PathBuf,
    pub command: PathBuf,
    pub response: PathBuf,
}

impl MailboxPaths {
    pub fn new(dir: impl Into<PathBuf>, command_file: &str, response_file: &str) -> Self {
        let dir = dir.into();
        Self {
            command: dir.join(command_file),
            response: dir.join(response_file),
            dir,
        }
    }

    /// Creates the mailbox directory if needed.
    pub fn ensure_dir(&self) -> StoreResult<()> {
        fs::create_dir_all(&self.dir).map_err(|err| StoreError::io(&self.dir, err))
    }

    pub fn claim_path(&self) -> PathBuf {
        self.dir.join(CLAIM_FILE)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Opens `(command, response)` file slots.
    pub fn open(&self, encoding: TextEncoding) -> (FileSlot, FileSlot) {
        (
            FileSlot::new(&self.command, encoding),
            FileSlot::new(&self.response, encoding),
        )
    }
}
