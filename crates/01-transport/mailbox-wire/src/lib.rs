//! Text framing and sequence numbering for the file mailbox protocol.
//!
//! Both sides of the mailbox agree on three things defined here:
//! * [`SeqSpace`] – the cyclic `[1, N]` sequence ring used to correlate a
//!   response with the command that produced it.
//! * [`CommandRecord`] / [`ResponseRecord`] – the `"<sequence> <text>"` record
//!   layout written into the command and response slots.
//! * [`Instruction`] – the instruction convention that separates value-returning
//!   instructions from fire-and-forget ones.

mod error;
mod instruction;
mod record;
mod seq;

pub use error::{WireError, WireResult};
pub use instruction::{Instruction, RESPONSE_MARKER, RESPONSE_VARIABLE};
pub use record::{CommandRecord, Outcome, ResponseRecord, ERROR_MARKER, NO_VALUE_MARKER};
pub use seq::{SeqSpace, BASELINE_SEQ, DEFAULT_MODULUS};
