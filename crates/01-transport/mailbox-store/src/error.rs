use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("slot {0} holds undecodable text")]
    Decode(String),

    #[error(
        "mailbox {} is already claimed by another controller; \
         release a stale claim with `mailbox unlock`",
        .0.display()
    )]
    Claimed(PathBuf),

    #[error("injected fault on {0}")]
    Injected(String),
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}
