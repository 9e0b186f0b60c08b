//! Cyclic sequence numbering shared by the controller and the host loop.

use crate::{WireError, WireResult};

/// Sequence carried by the baseline record written when a channel starts.
///
/// It sits outside `[1, N]`, so it can never be confused with a real request.
pub const BASELINE_SEQ: u32 = 0;

/// Ring size used when nothing else is configured.
pub const DEFAULT_MODULUS: u32 = 256;

/// Fixed-size ring of sequence numbers `[1, N]`.
///
/// Both sides of a mailbox must agree on `N`; it is configuration, not
/// something negotiated at runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SeqSpace {
    modulus: u32,
}

impl SeqSpace {
    /// Creates a ring of `modulus` sequence numbers.
    pub fn new(modulus: u32) -> WireResult<Self> {
        if modulus < 2 {
            return Err(WireError::InvalidModulus(modulus));
        }
        Ok(Self { modulus })
    }

    /// Number of distinct sequence values in the ring.
    pub fn modulus(&self) -> u32 {
        self.modulus
    }

    /// Whether `seq` is a valid request sequence (excludes the baseline).
    pub fn contains(&self, seq: u32) -> bool {
        (1..=self.modulus).contains(&seq)
    }

    /// Returns the sequence that follows `current`.
    ///
    /// `N` wraps back to `1`. The baseline sequence behaves like `N`, so the
    /// first request after a (re)initialisation is always `1`.
    pub fn next(&self, current: u32) -> u32 {
        if current >= self.modulus {
            1
        } else {
            current + 1
        }
    }

    /// Forward steps needed to travel from `from` to `to` around the ring.
    ///
    /// Returns `None` when either value lies outside the ring.
    pub fn distance(&self, from: u32, to: u32) -> Option<u32> {
        let from = self.position(from)?;
        let to = self.position(to)?;
        Some((to + self.modulus - from) % self.modulus)
    }

    /// Whether `candidate` is newer than `reference`.
    ///
    /// Newer means advancing from `reference` lands on `candidate` in fewer
    /// than `N / 2` steps. A plain `>` breaks at the wrap boundary.
    pub fn is_newer(&self, candidate: u32, reference: u32) -> bool {
        match self.distance(reference, candidate) {
            Some(steps) => steps > 0 && steps.saturating_mul(2) < self.modulus,
            None => false,
        }
    }

    // Position on the ring in `[1, N]`; the baseline shares `N`'s slot.
    fn position(&self, seq: u32) -> Option<u32> {
        match seq {
            BASELINE_SEQ => Some(self.modulus),
            seq if seq <= self.modulus => Some(seq),
            _ => None,
        }
    }
}

impl Default for SeqSpace {
    fn default() -> Self {
        Self {
            modulus: DEFAULT_MODULUS,
        }
    }
}
