//! Controller side of the file mailbox.
//!
//! [`ControllerClient`] formats each instruction with the next sequence
//! number, replaces the command slot, and polls the response slot until the
//! matching response appears or the timeout elapses. It owns the channel's
//! sequence state, and `send` takes `&mut self`, so one client never has two
//! requests in flight. [`SharedController`] serialises callers across threads.

mod client;
mod config;
mod error;
mod shared;

pub use client::{ControllerClient, CONNECTION_TEST_TOKEN, PING_TIMEOUT};
pub use config::ChannelConfig;
pub use error::{ChannelError, ChannelErrorKind, ChannelResult};
pub use shared::SharedController;

pub use mailbox_wire::{Instruction, Outcome, ResponseRecord, NO_VALUE_MARKER};
