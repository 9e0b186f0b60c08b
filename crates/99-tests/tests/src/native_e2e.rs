#![cfg(all(test, not(target_arch = "wasm32")))]

use std::fs;
use std::thread;
use std::time::{Duration, Instant};

use host_queries::HostQueries;
use mailbox_controller::{ChannelConfig, ChannelError, ControllerClient, Instruction, SharedController};
use mailbox_host::{EchoInterpreter, Interpreter};
use mailbox_store::{FileSlot, MailboxSlot, TextEncoding, CLAIM_FILE};

use crate::support::{channel_config, connect, init_logging, spawn_host};

#[test]
fn echo_host_round_trip_over_files() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let host = spawn_host(dir.path(), EchoInterpreter::new());

    let mut client = ControllerClient::connect(ChannelConfig {
        test_on_init: true,
        ..channel_config(dir.path())
    })
    .unwrap();

    assert_eq!(client.query("\"OK\"").unwrap().as_deref(), Some("OK"));
    assert_eq!(client.send("AbortRun").unwrap(), None);

    let err = client.send("ERROR bad instruction").unwrap_err();
    assert!(err.is_command_failure());
    assert_eq!(err.diagnostic(), Some("ERROR: bad instruction"));

    // Both slots are UTF-16 with a byte order mark on disk.
    let raw = fs::read(dir.path().join("command")).unwrap();
    assert_eq!(&raw[..2], &[0xFF, 0xFE]);

    client.shutdown(Duration::from_secs(5)).unwrap();
    let echo = host.join().unwrap();
    assert_eq!(
        echo.history(),
        [
            "response$ = \"CONNECTION_TEST\"",
            "response$ = \"OK\"",
            "AbortRun",
            "ERROR bad instruction",
        ]
    );
}

#[test]
fn silent_host_times_out_within_one_interval() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let mut client = connect(dir.path());
    let timeout = Duration::from_millis(500);

    let started = Instant::now();
    let err = client.send_with_timeout("SLOW", timeout).unwrap_err();
    let elapsed = started.elapsed();

    assert!(err.is_timeout(), "{err}");
    assert!(elapsed >= timeout, "returned early after {elapsed:?}");
    // One poll interval plus scheduling slack.
    assert!(
        elapsed < timeout + Duration::from_millis(10) + Duration::from_millis(400),
        "returned late after {elapsed:?}"
    );
}

#[test]
fn sequence_wraps_on_small_ring() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let host = spawn_host(dir.path(), EchoInterpreter::new());
    let mut client = ControllerClient::connect(ChannelConfig {
        modulus: 4,
        ..channel_config(dir.path())
    })
    .unwrap();

    let mut issued = Vec::new();
    for i in 0..9 {
        let payload = client.query(format!("\"step {i}\"")).unwrap();
        assert_eq!(payload, Some(format!("step {i}")));
        issued.push(client.last_issued());
    }
    assert_eq!(issued, [1, 2, 3, 4, 1, 2, 3, 4, 1]);

    client.shutdown(Duration::from_secs(5)).unwrap();
    assert_eq!(host.join().unwrap().history().len(), 9);
}

#[test]
fn late_answer_is_not_taken_by_next_request() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let mut echo = EchoInterpreter::new();
    let host = spawn_host(dir.path(), move |instruction: &str| {
        if instruction.contains("SLOW") {
            thread::sleep(Duration::from_millis(400));
        }
        echo.execute(instruction)
    });
    let mut client = connect(dir.path());

    let err = client
        .send_with_timeout(Instruction::query("\"SLOW\""), Duration::from_millis(100))
        .unwrap_err();
    assert!(matches!(err, ChannelError::Timeout { sequence: 1, .. }));

    assert_eq!(client.query("\"next\"").unwrap().as_deref(), Some("next"));
    let latest = client.peek_response().unwrap().unwrap();
    assert_eq!(latest.sequence, 2);

    client.shutdown(Duration::from_secs(5)).unwrap();
    host.join().unwrap();
}

#[test]
fn reinitialize_after_host_restart() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let first = spawn_host(dir.path(), EchoInterpreter::new());
    let mut client = connect(dir.path());

    for _ in 0..3 {
        client.query("\"before\"").unwrap();
    }
    assert_eq!(client.send("Exit").unwrap(), None);
    assert_eq!(first.join().unwrap().history().len(), 3);

    client.reinitialize().unwrap();
    let second = spawn_host(dir.path(), EchoInterpreter::new());
    assert_eq!(client.query("\"after\"").unwrap().as_deref(), Some("after"));
    assert_eq!(client.last_issued(), 1);

    client.shutdown(Duration::from_secs(5)).unwrap();
    assert_eq!(second.join().unwrap().history(), ["response$ = \"after\""]);
}

#[test]
fn connection_test_ignores_answer_from_previous_session() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    FileSlot::new(dir.path().join("response"), TextEncoding::Utf16)
        .replace("1 CONNECTION_TEST")
        .unwrap();

    // No host is running, so the old answer must not pass the connection test.
    let err = ControllerClient::connect(ChannelConfig {
        test_on_init: true,
        ..channel_config(dir.path())
    })
    .unwrap_err();
    assert!(err.is_config(), "{err}");
}

#[test]
fn exclusive_claim_rejects_second_controller() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let first = connect(dir.path());
    assert!(dir.path().join(CLAIM_FILE).exists());

    let err = ControllerClient::connect(channel_config(dir.path())).unwrap_err();
    assert!(err.is_config(), "{err}");

    drop(first);
    assert!(!dir.path().join(CLAIM_FILE).exists());
    connect(dir.path());
}

#[cfg(unix)]
#[test]
fn claim_left_by_killed_controller_is_taken_over() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let mut gone = std::process::Command::new("true").spawn().unwrap();
    let pid = gone.id();
    gone.wait().unwrap();
    fs::write(dir.path().join(CLAIM_FILE), format!("{pid}\n")).unwrap();

    let client = connect(dir.path());
    assert_eq!(
        fs::read_to_string(dir.path().join(CLAIM_FILE)).unwrap().trim(),
        std::process::id().to_string()
    );
    drop(client);
    assert!(!dir.path().join(CLAIM_FILE).exists());
}

#[test]
fn unwritable_mailbox_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    fs::write(&blocker, b"file").unwrap();

    let err = ControllerClient::connect(channel_config(&blocker.join("mailbox"))).unwrap_err();
    assert!(err.is_config(), "{err}");
}

#[test]
fn shared_controller_serialises_threads() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let host = spawn_host(dir.path(), EchoInterpreter::new());
    let shared = SharedController::new(connect(dir.path()));

    let workers: Vec<_> = (0..3)
        .map(|worker| {
            let shared = shared.clone();
            thread::spawn(move || {
                for i in 0..5 {
                    let expected = format!("w{worker}-{i}");
                    let got = shared.query(format!("\"{expected}\"")).unwrap();
                    assert_eq!(got.as_deref(), Some(expected.as_str()));
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    shared.send("Exit").unwrap();
    assert_eq!(host.join().unwrap().history().len(), 15);
}

#[test]
fn wait_for_ready_over_files() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let mut polls = 0;
    let host = spawn_host(dir.path(), move |instruction: &str| {
        if instruction.contains("ACQSTATUS$") {
            polls += 1;
            let status = if polls < 2 { "POSTRUN" } else { "STANDBY" };
            Ok(Some(status.to_owned()))
        } else {
            Ok(None)
        }
    });
    let mut client = connect(dir.path());

    assert!(HostQueries::new(&mut client)
        .wait_for_ready(Duration::from_secs(10))
        .unwrap());

    client.shutdown(Duration::from_secs(5)).unwrap();
    host.join().unwrap();
}
