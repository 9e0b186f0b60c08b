use mailbox_store::StoreError;
use thiserror::Error;

pub type HostResult<T> = Result<T, HostError>;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("mailbox storage: {0}")]
    Storage(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl HostError {
    pub fn config(msg: impl Into<String>) -> Self {
        HostError::Config(msg.into())
    }
}
