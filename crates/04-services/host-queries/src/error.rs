use std::time::Duration;

use mailbox_controller::{ChannelError, NO_VALUE_MARKER};
use thiserror::Error;

pub type QueryResult<T> = Result<T, QueryError>;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// The exchange succeeded but the payload is not what the query returns.
    #[error("unexpected payload {payload:?} for `{query}`")]
    UnexpectedPayload { query: String, payload: String },

    #[error("modules not ready after {waited:?}: {states}")]
    NotReady { waited: Duration, states: String },
}

impl QueryError {
    pub(crate) fn unexpected(query: &str, payload: Option<&str>) -> Self {
        QueryError::UnexpectedPayload {
            query: query.to_owned(),
            payload: payload.unwrap_or(NO_VALUE_MARKER).to_owned(),
        }
    }
}
