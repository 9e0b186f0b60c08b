#![cfg(all(test, not(target_arch = "wasm32")))]
//! Two controllers on one mailbox, bypassing the exclusive claim.

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use mailbox_controller::{ChannelConfig, ControllerClient};
use mailbox_host::EchoInterpreter;
use mailbox_store::{FileSlot, MailboxSlot, TextEncoding};
use mailbox_wire::CommandRecord;
use parking_lot::Mutex;

use crate::support::{channel_config, init_logging, spawn_host};

fn unclaimed(dir: &Path) -> ControllerClient {
    ControllerClient::connect(ChannelConfig {
        exclusive: false,
        ..channel_config(dir)
    })
    .unwrap()
}

fn wait_for_command(dir: &Path, instruction: &str) {
    let slot = FileSlot::new(dir.join("command"), TextEncoding::Utf16);
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if let Ok(Some(text)) = slot.read() {
            if CommandRecord::parse(&text).is_ok_and(|record| record.instruction == instruction) {
                return;
            }
        }
        thread::sleep(Duration::from_millis(5));
    }
    panic!("command {instruction:?} never reached the slot");
}

#[test]
fn second_writer_overwrites_pending_request() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let mut first = unclaimed(dir.path());
    let mut second = unclaimed(dir.path());
    let answers = Arc::new(Mutex::new(Vec::new()));

    // Both controllers believe they are alone and issue sequence 1 before the
    // host looks at the slot.
    let first_answers = Arc::clone(&answers);
    let a = thread::spawn(move || {
        let got = first.query("\"from first\"").unwrap();
        first_answers.lock().push(("first", got));
        first
    });
    wait_for_command(dir.path(), "response$ = \"from first\"");

    let second_answers = Arc::clone(&answers);
    let b = thread::spawn(move || {
        let got = second.query("\"from second\"").unwrap();
        second_answers.lock().push(("second", got));
        second
    });
    wait_for_command(dir.path(), "response$ = \"from second\"");

    let host = spawn_host(dir.path(), EchoInterpreter::new());
    let first = a.join().unwrap();
    b.join().unwrap();

    // The first request was never executed and its caller got the second
    // caller's answer.
    let mut answers = answers.lock().clone();
    answers.sort();
    assert_eq!(
        answers,
        [
            ("first", Some("from second".to_owned())),
            ("second", Some("from second".to_owned())),
        ]
    );

    first.shutdown(Duration::from_secs(5)).unwrap();
    assert_eq!(host.join().unwrap().history(), ["response$ = \"from second\""]);
}
