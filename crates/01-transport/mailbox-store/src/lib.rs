//! Mailbox storage: two overwritable text slots visible to both processes.
//!
//! * [`MailboxSlot`] – whole-record read/replace; no locking primitive is
//!   assumed, so atomicity comes from replacing the entire record at once.
//! * [`FileSlot`] – file-backed slot (temporary sibling + rename) with a
//!   configurable [`TextEncoding`].
//! * [`MemorySlot`] – in-process slot with fault injection for tests.
//! * [`MailboxPaths`] / [`MailboxClaim`] – the command/response pair and the
//!   single-controller claim on its directory.

mod claim;
mod encoding;
mod error;
mod file;
mod memory;
mod paths;

use std::sync::Arc;

pub use claim::{MailboxClaim, CLAIM_FILE};
pub use encoding::{decode_text, TextEncoding};
pub use error::{StoreError, StoreResult};
pub use file::FileSlot;
pub use memory::MemorySlot;
pub use paths::MailboxPaths;

/// Single overwritable record shared between the controller and the host.
pub trait MailboxSlot: Send + Sync {
    /// Reads the whole record. `Ok(None)` when the slot is absent or empty.
    fn read(&self) -> StoreResult<Option<String>>;

    /// Replaces the whole record with `text`.
    fn replace(&self, text: &str) -> StoreResult<()>;

    /// Human-readable location used in logs.
    fn describe(&self) -> String;
}

impl<T> MailboxSlot for Arc<T>
where
    T: MailboxSlot + ?Sized,
{
    fn read(&self) -> StoreResult<Option<String>> {
        (**self).read()
    }

    fn replace(&self, text: &str) -> StoreResult<()> {
        (**self).replace(text)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
