use std::sync::Arc;
use std::time::Duration;

use mailbox_pacing::{Clock, SystemClock};
use mailbox_store::{FileSlot, MailboxSlot};
use mailbox_wire::Instruction;
use parking_lot::Mutex;

use crate::{ChannelResult, ControllerClient};

/// Cloneable handle that serialises sends from several threads onto one
/// client. A caller blocks until the exchange ahead of it completes.
pub struct SharedController<S = FileSlot, C = SystemClock>
where
    S: MailboxSlot,
    C: Clock,
{
    inner: Arc<Mutex<ControllerClient<S, C>>>,
}

impl<S, C> Clone for SharedController<S, C>
where
    S: MailboxSlot,
    C: Clock,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, C> SharedController<S, C>
where
    S: MailboxSlot,
    C: Clock,
{
    pub fn new(client: ControllerClient<S, C>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(client)),
        }
    }

    pub fn send(&self, instruction: impl Into<Instruction>) -> ChannelResult<Option<String>> {
        self.inner.lock().send(instruction)
    }

    pub fn send_with_timeout(
        &self,
        instruction: impl Into<Instruction>,
        timeout: Duration,
    ) -> ChannelResult<Option<String>> {
        self.inner.lock().send_with_timeout(instruction, timeout)
    }

    pub fn query(&self, expression: impl AsRef<str>) -> ChannelResult<Option<String>> {
        self.inner.lock().query(expression)
    }

    /// Runs `f` with exclusive access, e.g. for a sequence of sends that
    /// must not interleave with other callers.
    pub fn with_client<R>(&self, f: impl FnOnce(&mut ControllerClient<S, C>) -> R) -> R {
        f(&mut self.inner.lock())
    }
}
