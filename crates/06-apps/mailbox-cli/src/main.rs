//! Operator utility for a controller/host file mailbox.

mod script;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use host_queries::{HostQueries, DEFAULT_RUN_MODULE};
use log::{info, LevelFilter};
use mailbox_controller::{ChannelConfig, ControllerClient, Instruction};
use mailbox_host::{EchoInterpreter, HostConfig, HostPollLoop};
use mailbox_pacing::SystemClock;
use mailbox_store::{MailboxClaim, TextEncoding};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Text rendering helpers used by the CLI commands.
mod render {
    use host_queries::AcquisitionStatus;
    use mailbox_controller::ResponseRecord;
    use std::fmt::Write;
    use std::path::Path;

    /// Everything the `status` command reports.
    pub struct StatusReport {
        pub acquisition: AcquisitionStatus,
        pub method_running: bool,
        pub module: String,
        pub run_state: String,
        pub elapsed_min: f64,
        pub total_min: f64,
        pub remaining_min: f64,
    }

    pub fn payload(value: Option<&str>) -> String {
        match value {
            Some(value) => format!("{value}\n"),
            None => "(no value)\n".to_owned(),
        }
    }

    pub fn ping(alive: bool, dir: &Path) -> String {
        if alive {
            format!("host answering on {}\n", dir.display())
        } else {
            format!("no answer from host on {}\n", dir.display())
        }
    }

    pub fn status(report: &StatusReport) -> String {
        let mut out = String::new();
        writeln!(out, "Acquisition: {}", report.acquisition).expect("write acquisition");
        writeln!(
            out,
            "Method running: {}",
            if report.method_running { "yes" } else { "no" }
        )
        .expect("write method flag");
        writeln!(out, "{} run state: {}", report.module, report.run_state).expect("write run state");
        writeln!(
            out,
            "Analysis: {:.2} / {:.2} min ({:.2} min remaining)",
            report.elapsed_min, report.total_min, report.remaining_min
        )
        .expect("write timing");
        out
    }

    pub fn peek(record: Option<&ResponseRecord>) -> String {
        match record {
            Some(record) if record.outcome.is_error() => {
                format!("response {}: error {:?}\n", record.sequence, record.outcome.as_text())
            }
            Some(record) => {
                format!("response {}: {:?}\n", record.sequence, record.outcome.as_text())
            }
            None => "response slot empty\n".to_owned(),
        }
    }

    pub fn host_summary(executed: u64, dir: &Path) -> String {
        format!("host loop on {} stopped after {executed} instruction(s)\n", dir.display())
    }

    /// Instructions for starting the polling script inside the host.
    pub fn install_hint(script: &Path, comm_dir: &Path) -> String {
        let mut out = String::new();
        writeln!(out, "Mailbox directory: {}", comm_dir.display()).expect("write dir");
        writeln!(out, "Paste into the host command line:").expect("write prompt");
        writeln!(out, "    macro \"{}\"; Python_Run", script.display()).expect("write macro");
        out
    }
}

/// Drive a host application through its command/response file mailbox.
#[derive(Parser, Debug)]
#[command(author, version, about = "Talk to a host through a file mailbox", long_about = None)]
struct Cli {
    /// JSON channel configuration; missing fields use the defaults.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Mailbox directory (overrides the configuration file).
    #[arg(long, global = true, value_name = "DIR")]
    comm_dir: Option<PathBuf>,

    /// Text encoding of the mailbox files.
    #[arg(long, global = true, value_enum)]
    encoding: Option<EncodingArg>,

    /// Per-command timeout in milliseconds.
    #[arg(long, global = true, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Log every exchange; repeat for more detail.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send an instruction and print its payload.
    Send {
        /// Instruction text; several words are joined with spaces.
        #[arg(required = true, num_args = 1.., value_name = "INSTRUCTION")]
        instruction: Vec<String>,
    },
    /// Evaluate an expression on the host and print its value.
    Query {
        #[arg(value_name = "EXPR")]
        expression: String,
    },
    /// Check that the host loop answers.
    Ping,
    /// Print acquisition status, run state and analysis timing.
    Status {
        /// RC module whose run state is reported.
        #[arg(long, default_value = DEFAULT_RUN_MODULE)]
        module: String,
    },
    /// Block until the host is ready for a new analysis.
    WaitReady {
        #[arg(long, default_value_t = 60)]
        timeout_secs: u64,
    },
    /// Abort the current run.
    Abort,
    /// Write a fresh baseline record.
    Reset,
    /// Ask the host loop to stop.
    Shutdown,
    /// Print the record currently in the response slot.
    Peek,
    /// Remove a controller claim left behind on the mailbox.
    Unlock,
    /// Run a local echo host loop on the mailbox until it is shut down.
    Host {
        #[arg(long, default_value_t = 200)]
        poll_ms: u64,
    },
    /// Point the host polling script at the mailbox directory.
    InstallScript {
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,
    },
}

impl Command {
    /// Commands that should fail fast when the host is not answering.
    fn tests_connection(&self) -> bool {
        matches!(
            self,
            Command::Send { .. }
                | Command::Query { .. }
                | Command::Status { .. }
                | Command::WaitReady { .. }
                | Command::Abort
        )
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EncodingArg {
    /// UTF-16 with byte order mark.
    Utf16,
    Utf8,
}

impl From<EncodingArg> for TextEncoding {
    fn from(arg: EncodingArg) -> Self {
        match arg {
            EncodingArg::Utf16 => TextEncoding::Utf16,
            EncodingArg::Utf8 => TextEncoding::Utf8,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = channel_config(&cli)?;

    match &cli.command {
        Command::InstallScript { script } => handle_install(script, &config.comm_dir),
        Command::Host { poll_ms } => handle_host(&config, *poll_ms),
        Command::Peek => {
            // Inspect without connecting, which would overwrite the command slot.
            let (command, response) = config.paths().open(config.encoding);
            let client =
                ControllerClient::with_parts(command, response, SystemClock::new(), config.clone())?;
            print!("{}", render::peek(client.peek_response()?.as_ref()));
            Ok(())
        }
        Command::Unlock => {
            if MailboxClaim::force_release(&config.comm_dir)? {
                println!("released claim on {}", config.comm_dir.display());
            } else {
                println!("{} is not claimed", config.comm_dir.display());
            }
            Ok(())
        }
        Command::Ping => {
            let mut client = connect(&config, false)?;
            let alive = client.ping()?;
            print!("{}", render::ping(alive, &config.comm_dir));
            if !alive {
                bail!("host did not answer");
            }
            Ok(())
        }
        Command::Shutdown => {
            let client = connect(&config, true)?;
            let timeout = client.config().default_timeout();
            client.shutdown(timeout)?;
            println!("host loop stopped");
            Ok(())
        }
        Command::Reset => {
            // Connecting writes the baseline record.
            connect(&config, false)?;
            println!("baseline written to {}", config.comm_dir.display());
            Ok(())
        }
        command => {
            let mut client = connect(&config, command.tests_connection())?;
            handle_exchange(&mut client, command)
        }
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn channel_config(cli: &Cli) -> Result<ChannelConfig> {
    let mut config = match &cli.config {
        Some(path) => ChannelConfig::load(path)?,
        None => ChannelConfig::default(),
    };
    if let Some(dir) = &cli.comm_dir {
        config.comm_dir = dir.clone();
    }
    if let Some(encoding) = cli.encoding {
        config.encoding = encoding.into();
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.default_timeout_ms = timeout_ms;
    }
    config.verbose |= cli.verbose > 0;
    config.validate()?;
    Ok(config)
}

fn connect(config: &ChannelConfig, test_connection: bool) -> Result<ControllerClient> {
    let config = ChannelConfig {
        test_on_init: test_connection,
        ..config.clone()
    };
    let dir = config.comm_dir.clone();
    ControllerClient::connect(config)
        .with_context(|| format!("failed to open mailbox {}", dir.display()))
}

fn handle_exchange(client: &mut ControllerClient, command: &Command) -> Result<()> {
    match command {
        Command::Send { instruction } => {
            let payload = client.send(Instruction::command(instruction.join(" ")))?;
            print!("{}", render::payload(payload.as_deref()));
        }
        Command::Query { expression } => {
            let payload = client.query(expression)?;
            print!("{}", render::payload(payload.as_deref()));
        }
        Command::Status { module } => {
            let mut queries = HostQueries::new(client);
            let report = render::StatusReport {
                acquisition: queries.acquisition_status()?,
                method_running: queries.method_running()?,
                module: module.clone(),
                run_state: queries.run_state(module)?,
                elapsed_min: queries.elapsed_analysis_minutes()?,
                total_min: queries.total_analysis_minutes()?,
                remaining_min: queries.remaining_analysis_minutes()?,
            };
            print!("{}", render::status(&report));
        }
        Command::WaitReady { timeout_secs } => {
            let ready =
                HostQueries::new(client).wait_for_ready(Duration::from_secs(*timeout_secs))?;
            if !ready {
                bail!("host not ready after {timeout_secs}s");
            }
            println!("ready");
        }
        Command::Abort => {
            HostQueries::new(client).abort_run()?;
            println!("run aborted");
        }
        other => bail!("{other:?} is not an exchange"),
    }
    Ok(())
}

fn handle_host(config: &ChannelConfig, poll_ms: u64) -> Result<()> {
    let host_config = HostConfig {
        comm_dir: config.comm_dir.clone(),
        command_file: config.command_file.clone(),
        response_file: config.response_file.clone(),
        poll_interval_ms: poll_ms,
        terminal_instruction: config.terminal_instruction.clone(),
        encoding: config.encoding,
    };
    let mut host = HostPollLoop::open(&host_config, EchoInterpreter::new())
        .with_context(|| format!("failed to open mailbox {}", config.comm_dir.display()))?;
    info!("echo host running; send `{}` to stop", config.terminal_instruction);
    let executed = host.run();
    print!("{}", render::host_summary(executed, &config.comm_dir));
    Ok(())
}

fn handle_install(script: &Path, comm_dir: &Path) -> Result<()> {
    let (script, comm_dir) = script::install(script, comm_dir)?;
    print!("{}", render::install_hint(&script, &comm_dir));
    Ok(())
}
