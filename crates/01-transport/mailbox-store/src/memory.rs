use std::sync::Arc;

use parking_lot::Mutex;

use crate::{MailboxSlot, StoreError, StoreResult};

#[derive(Default)]
struct MemoryState {
    text: Option<String>,
    writes: u64,
    failing_reads: u32,
    failing_writes: u32,
}

/// In-process slot. Clones share the same record.
///
/// Used as the mailbox in tests; `fail_next_reads` / `fail_next_writes`
/// inject transient storage faults.
#[derive(Clone)]
pub struct MemorySlot {
    name: Arc<str>,
    state: Arc<Mutex<MemoryState>>,
}

impl MemorySlot {
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            state: Arc::default(),
        }
    }

    /// Current record, bypassing fault injection.
    pub fn snapshot(&self) -> Option<String> {
        self.state.lock().text.clone()
    }

    /// Overwrites the record, bypassing fault injection and the write counter.
    pub fn set(&self, text: impl Into<String>) {
        self.state.lock().text = Some(text.into());
    }

    pub fn clear(&self) {
        self.state.lock().text = None;
    }

    /// Number of successful `replace` calls.
    pub fn writes(&self) -> u64 {
        self.state.lock().writes
    }

    pub fn fail_next_reads(&self, count: u32) {
        self.state.lock().failing_reads = count;
    }

    pub fn fail_next_writes(&self, count: u32) {
        self.state.lock().failing_writes = count;
    }
}

impl MailboxSlot for MemorySlot {
    fn read(&self) -> StoreResult<Option<String>> {
        let mut state = self.state.lock();
        if state.failing_reads > 0 {
            state.failing_reads -= 1;
            return Err(StoreError::Injected(self.describe()));
        }
        Ok(state.text.clone().filter(|text| !text.is_empty()))
    }

    fn replace(&self, text: &str) -> StoreResult<()> {
        let mut state = self.state.lock();
        if state.failing_writes > 0 {
            state.failing_writes -= 1;
            return Err(StoreError::Injected(self.describe()));
        }
        state.text = Some(text.to_owned());
        state.writes += 1;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("memory:{}", self.name)
    }
}
