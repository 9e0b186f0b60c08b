//! Typed helpers for host queries that sit on top of a successful exchange.
//!
//! Each helper is one instruction on a [`mailbox_controller::ControllerClient`];
//! the host's own interpreter evaluates the expression and the helper parses
//! the payload.

mod error;
mod queries;
mod status;

pub use error::{QueryError, QueryResult};
pub use queries::{HostQueries, DEFAULT_RUN_MODULE};
pub use status::{AcquisitionStatus, ModuleState};
