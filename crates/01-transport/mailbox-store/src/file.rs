use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::trace;

use crate::encoding::{decode_text, TextEncoding};
use crate::{MailboxSlot, StoreError, StoreResult};

/// Slot backed by a single file.
///
/// Writes land in a temporary sibling that is synced and then renamed over
/// the slot, so a reader sees either the previous record or the new one and
/// never a half-written file.
#[derive(Clone, Debug)]
pub struct FileSlot {
    path: PathBuf,
    staging: PathBuf,
    encoding: TextEncoding,
}

impl FileSlot {
    pub fn new(path: impl Into<PathBuf>, encoding: TextEncoding) -> Self {
        let path = path.into();
        let staging = staging_path(&path);
        Self {
            path,
            staging,
            encoding,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// Creates an empty slot file if none exists; existing content is kept.
    pub fn touch(&self) -> StoreResult<()> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map(|_| ())
            .map_err(|err| StoreError::io(&self.path, err))
    }

    fn write_staging(&self, bytes: &[u8]) -> io::Result<()> {
        let mut file = fs::File::create(&self.staging)?;
        file.write_all(bytes)?;
        file.sync_all()
    }
}

impl MailboxSlot for FileSlot {
    fn read(&self) -> StoreResult<Option<String>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StoreError::io(&self.path, err)),
        };
        if bytes.is_empty() {
            return Ok(None);
        }

        let text = decode_text(&bytes).ok_or_else(|| StoreError::Decode(self.describe()))?;
        if text
            .trim_matches(|c: char| c.is_whitespace() || c == '\0' || c == '\u{feff}')
            .is_empty()
        {
            return Ok(None);
        }
        Ok(Some(text))
    }

    fn replace(&self, text: &str) -> StoreResult<()> {
        let bytes = self.encoding.encode(text);
        if let Err(err) = self.write_staging(&bytes) {
            let _ = fs::remove_file(&self.staging);
            return Err(StoreError::io(&self.staging, err));
        }
        if let Err(err) = fs::rename(&self.staging, &self.path) {
            let _ = fs::remove_file(&self.staging);
            return Err(StoreError::io(&self.path, err));
        }
        trace!("replaced {} ({} bytes)", self.path.display(), bytes.len());
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(".tmp");
    path.with_file_name(name)
}
