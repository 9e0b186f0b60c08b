//! Host side of the file mailbox.
//!
//! [`HostPollLoop`] is the loop the host application runs inside its own
//! scripting environment, rebuilt here so the controller can be exercised
//! against a faithful peer and so operators can check a mailbox without the
//! real host.

mod config;
mod error;
mod interpreter;
mod poll_loop;

pub use config::HostConfig;
pub use error::{HostError, HostResult};
pub use interpreter::{EchoInterpreter, Interpreter};
pub use poll_loop::{HostPollLoop, HostState, PollOutcome};
