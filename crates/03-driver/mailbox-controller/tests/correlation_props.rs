//! A response is only ever returned to the request carrying its sequence.

#![cfg(feature = "proptest")]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mailbox_controller::{ChannelConfig, ChannelError, ControllerClient};
use mailbox_pacing::ManualClock;
use mailbox_store::{MailboxSlot, MemorySlot};
use mailbox_wire::{CommandRecord, BASELINE_SEQ};
use proptest::prelude::*;

const MODULUS: u32 = 16;

/// Host stand-in that answers every new command, either with the command's
/// own sequence or with a sequence `offset` steps further round the ring.
fn answering_host(
    clock: &ManualClock,
    command: MemorySlot,
    response: MemorySlot,
    honest: Arc<AtomicBool>,
    offset: u32,
) {
    clock.on_sleep(move |_| {
        let Ok(Some(text)) = command.read() else {
            return;
        };
        let Ok(record) = CommandRecord::parse(&text) else {
            return;
        };
        if record.sequence == BASELINE_SEQ {
            return;
        }
        let sequence = if honest.load(Ordering::Relaxed) {
            record.sequence
        } else {
            (record.sequence - 1 + offset) % MODULUS + 1
        };
        let _ = response.replace(&format!("{sequence} {}", record.instruction));
    });
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn mismatched_sequence_is_never_returned(
        warmup in 0usize..40,
        offset in 1u32..MODULUS,
    ) {
        let command = MemorySlot::new("command");
        let response = MemorySlot::new("response");
        let clock = ManualClock::new();
        let config = ChannelConfig {
            modulus: MODULUS,
            ..ChannelConfig::default()
        };
        let mut client =
            ControllerClient::with_parts(command.clone(), response.clone(), clock.clone(), config)
                .unwrap();
        client.initialize().unwrap();

        let honest = Arc::new(AtomicBool::new(true));
        answering_host(&clock, command, response, Arc::clone(&honest), offset);

        // Walk the ring (wrapping when warmup exceeds the modulus) with
        // correctly tagged answers first.
        for i in 0..warmup {
            let payload = client.send(format!("STEP{i}")).unwrap();
            prop_assert_eq!(payload, Some(format!("STEP{i}")));
        }

        honest.store(false, Ordering::Relaxed);
        let expected = client.seq_space().next(client.last_issued());
        let err = client
            .send_with_timeout("MISMATCH", Duration::from_secs(2))
            .unwrap_err();
        prop_assert!(
            matches!(err, ChannelError::Timeout { sequence, .. } if sequence == expected),
            "unexpected result: {}",
            err
        );
    }
}
