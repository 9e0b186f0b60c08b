use std::path::Path;
use std::thread;
use std::time::Duration;

use mailbox_controller::{ChannelConfig, ControllerClient};
use mailbox_host::{HostConfig, HostPollLoop, Interpreter};
use mailbox_store::TextEncoding;

pub const HOST_BUDGET: Duration = Duration::from_secs(30);

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Fast-polling controller configuration for a scratch mailbox.
pub fn channel_config(dir: &Path) -> ChannelConfig {
    ChannelConfig {
        poll_interval_ms: 10,
        settle_ms: 50,
        default_timeout_ms: 5_000,
        encoding: TextEncoding::Utf16,
        ..ChannelConfig::default()
    }
    .with_comm_dir(dir)
}

pub fn host_config(dir: &Path) -> HostConfig {
    HostConfig {
        poll_interval_ms: 10,
        ..HostConfig::default()
    }
    .with_comm_dir(dir)
}

pub fn connect(dir: &Path) -> ControllerClient {
    ControllerClient::connect(channel_config(dir)).expect("connect controller")
}

/// Runs a host loop on `dir` until it receives the terminal instruction and
/// hands the interpreter back.
pub fn spawn_host<I>(dir: &Path, interpreter: I) -> thread::JoinHandle<I>
where
    I: Interpreter + Send + 'static,
{
    let config = host_config(dir);
    thread::spawn(move || {
        let mut host = HostPollLoop::open(&config, interpreter).expect("open host mailbox");
        assert!(
            host.run_for(HOST_BUDGET),
            "host loop never received the terminal instruction"
        );
        host.into_interpreter()
    })
}
