//! Wraparound properties of the sequence ring.

use mailbox_wire::{CommandRecord, Outcome, ResponseRecord, SeqSpace, BASELINE_SEQ};

#[test]
fn n_plus_one_exchanges_return_to_start() {
    let space = SeqSpace::default();
    let mut current = BASELINE_SEQ;
    let mut issued = Vec::new();
    for _ in 0..=space.modulus() {
        current = space.next(current);
        issued.push(current);
    }
    assert_eq!(issued.first(), Some(&1));
    assert_eq!(issued[255], 256);
    assert_eq!(issued.last(), Some(&1));
}

#[test]
fn consecutive_sequences_never_collide_within_a_cycle() {
    let space = SeqSpace::new(16).unwrap();
    let mut current = BASELINE_SEQ;
    let mut seen = std::collections::HashSet::new();
    for _ in 0..space.modulus() {
        current = space.next(current);
        assert!(seen.insert(current), "sequence {current} reused inside one cycle");
    }
}

#[test]
fn records_keep_sequence_through_text() {
    let command = CommandRecord::new(42, "response$ = \"a b\"");
    assert_eq!(CommandRecord::parse(&command.to_string()).unwrap(), command);

    let response = ResponseRecord::new(42, Outcome::Value("a b".into()));
    assert_eq!(ResponseRecord::parse(&response.to_string()).unwrap(), response);
}

#[cfg(feature = "proptest")]
mod prop {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// `next` stays inside the ring and `is_newer` holds for one step ahead.
        #[test]
        fn next_is_newer_and_in_range(modulus in 3u32..4096, start in 0u32..4096) {
            let space = SeqSpace::new(modulus).unwrap();
            let current = start % (modulus + 1);
            let next = space.next(current);
            prop_assert!(space.contains(next));
            prop_assert!(space.is_newer(next, current));
            prop_assert!(!space.is_newer(current, next) || current == BASELINE_SEQ);
        }
    }
}
