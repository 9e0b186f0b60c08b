use std::fmt;
use std::time::Duration;

use log::{debug, info, trace, warn};
use mailbox_pacing::{Clock, Deadline, SystemClock};
use mailbox_store::{FileSlot, MailboxClaim, MailboxSlot};
use mailbox_wire::{
    CommandRecord, Instruction, Outcome, ResponseRecord, SeqSpace, BASELINE_SEQ,
};

use crate::{ChannelConfig, ChannelError, ChannelResult};

/// Payload echoed back by the host during a connection test.
pub const CONNECTION_TEST_TOKEN: &str = "CONNECTION_TEST";

/// Timeout applied to the connection test.
pub const PING_TIMEOUT: Duration = Duration::from_secs(3);

/// Result of reading the response slot once.
enum ResponsePoll {
    Matched(Outcome),
    Pending,
    Stale(u32),
    Fault(String),
}

/// Controller end of one mailbox pair.
///
/// Owns the channel state (`last_issued`). All sends go through `&mut self`,
/// which keeps a single request outstanding per mailbox.
pub struct ControllerClient<S = FileSlot, C = SystemClock>
where
    S: MailboxSlot,
    C: Clock,
{
    command: S,
    response: S,
    clock: C,
    config: ChannelConfig,
    seq: SeqSpace,
    last_issued: u32,
    _claim: Option<MailboxClaim>,
}

impl<S, C> fmt::Debug for ControllerClient<S, C>
where
    S: MailboxSlot,
    C: Clock,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerClient")
            .field("command", &self.command.describe())
            .field("response", &self.response.describe())
            .field("last_issued", &self.last_issued)
            .field("modulus", &self.seq.modulus())
            .field("claimed", &self._claim.is_some())
            .finish()
    }
}

impl ControllerClient<FileSlot, SystemClock> {
    /// Opens the file mailbox described by `config` and writes the baseline
    /// record.
    ///
    /// Fails with [`ChannelError::Config`] when the directory cannot be
    /// created or written, when another controller holds the mailbox, or when
    /// `test_on_init` is set and the host does not answer.
    pub fn connect(config: ChannelConfig) -> ChannelResult<Self> {
        config.validate()?;
        let paths = config.paths();
        paths.ensure_dir().map_err(|err| {
            ChannelError::config(format!("mailbox directory unavailable: {err}"))
        })?;
        let claim = if config.exclusive {
            Some(
                MailboxClaim::acquire(paths.dir())
                    .map_err(|err| ChannelError::config(err.to_string()))?,
            )
        } else {
            None
        };

        let (command, response) = paths.open(config.encoding);
        response.touch().map_err(|err| {
            ChannelError::config(format!("response slot unavailable: {err}"))
        })?;

        let mut client = Self::with_parts(command, response, SystemClock::new(), config)?;
        client._claim = claim;
        client.initialize()?;

        if client.config.test_on_init && !client.ping()? {
            return Err(ChannelError::config(format!(
                "host did not answer the connection test on {}; make sure the host \
                 application is running and its polling script watches that directory",
                client.config.comm_dir.display()
            )));
        }
        Ok(client)
    }
}

impl<S, C> ControllerClient<S, C>
where
    S: MailboxSlot,
    C: Clock,
{
    /// Assembles a client from explicit slots and clock without touching
    /// the mailbox. Call [`Self::initialize`] before the first send.
    pub fn with_parts(command: S, response: S, clock: C, config: ChannelConfig) -> ChannelResult<Self> {
        config.validate()?;
        let seq = config.seq_space()?;
        Ok(Self {
            command,
            response,
            clock,
            config,
            seq,
            last_issued: BASELINE_SEQ,
            _claim: None,
        })
    }

    /// Clears the response slot, writes the baseline record and resets the
    /// sequence.
    ///
    /// The host absorbs the baseline instead of executing whatever a previous
    /// session left in the command slot. The response slot is reset first so
    /// an answer from that session cannot match the next sequence numbers.
    pub fn initialize(&mut self) -> ChannelResult<()> {
        let cleared = ResponseRecord::new(BASELINE_SEQ, Outcome::NoValue);
        self.response.replace(&cleared.to_string()).map_err(|err| {
            ChannelError::config(format!(
                "cannot reset {}: {err}",
                self.response.describe()
            ))
        })?;

        let baseline = CommandRecord::new(BASELINE_SEQ, self.config.baseline_instruction.as_str());
        self.command.replace(&baseline.to_string()).map_err(|err| {
            ChannelError::config(format!(
                "cannot write baseline to {}: {err}",
                self.command.describe()
            ))
        })?;
        self.last_issued = BASELINE_SEQ;
        self.log_exchange(format_args!("wrote baseline to {}", self.command.describe()));
        self.clock.sleep(self.config.settle());
        Ok(())
    }

    /// Re-sends the baseline; later sends behave like a fresh session.
    pub fn reinitialize(&mut self) -> ChannelResult<()> {
        debug!("reinitialising channel after command {}", self.last_issued);
        self.initialize()
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn seq_space(&self) -> SeqSpace {
        self.seq
    }

    /// Sequence of the most recent command, or the baseline.
    pub fn last_issued(&self) -> u32 {
        self.last_issued
    }

    /// Sends with the configured default timeout.
    pub fn send(&mut self, instruction: impl Into<Instruction>) -> ChannelResult<Option<String>> {
        let timeout = self.config.default_timeout();
        self.send_with_timeout(instruction, timeout)
    }

    /// Sends one instruction and blocks until its response or `timeout`.
    ///
    /// Returns the payload, or `None` for the no-value marker. A host error
    /// marker becomes [`ChannelError::Command`]; no matching response in time
    /// becomes [`ChannelError::Timeout`]. A response that arrives after a
    /// timeout is never matched to a later request, since every send
    /// advances the sequence first.
    pub fn send_with_timeout(
        &mut self,
        instruction: impl Into<Instruction>,
        timeout: Duration,
    ) -> ChannelResult<Option<String>> {
        let instruction = instruction.into();
        instruction
            .validate()
            .map_err(ChannelError::InvalidInstruction)?;
        if timeout.is_zero() {
            return Err(ChannelError::config("timeout must be positive"));
        }

        let sequence = self.seq.next(self.last_issued);
        let record = CommandRecord::new(sequence, instruction.as_str());
        self.write_command(&record)?;
        self.last_issued = sequence;
        self.log_exchange(format_args!("sent command {sequence}: {instruction}"));

        match self.await_response(sequence, timeout)? {
            Outcome::Value(payload) => {
                self.log_exchange(format_args!("received response {sequence}: {payload}"));
                Ok(Some(payload))
            }
            Outcome::NoValue => {
                self.log_exchange(format_args!("received response {sequence}: no value"));
                Ok(None)
            }
            Outcome::Error(diagnostic) => {
                self.log_exchange(format_args!("command {sequence} failed: {diagnostic}"));
                Err(ChannelError::Command {
                    sequence,
                    diagnostic,
                })
            }
        }
    }

    /// Evaluates `expression` on the host and returns its value.
    pub fn query(&mut self, expression: impl AsRef<str>) -> ChannelResult<Option<String>> {
        self.send(Instruction::query(expression))
    }

    /// Round-trips a marker value to check the host loop is alive.
    ///
    /// A timeout or host error reads as `false`; storage and configuration
    /// problems are returned.
    pub fn ping(&mut self) -> ChannelResult<bool> {
        let probe = Instruction::query(format!("\"{CONNECTION_TEST_TOKEN}\""));
        match self.send_with_timeout(probe, PING_TIMEOUT) {
            Ok(payload) => Ok(payload.is_some_and(|p| p.contains(CONNECTION_TEST_TOKEN))),
            Err(err) if err.is_timeout() || err.is_command_failure() => {
                debug!("connection test failed: {err}");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    /// Sends the terminal instruction so the host loop stops, then releases
    /// the mailbox.
    pub fn shutdown(mut self, timeout: Duration) -> ChannelResult<()> {
        let terminal = Instruction::command(self.config.terminal_instruction.clone());
        self.send_with_timeout(terminal, timeout)?;
        info!("host loop on {} shut down", self.command.describe());
        Ok(())
    }

    /// Reads the response slot once without waiting.
    ///
    /// Unlike `send`, a malformed record is reported as
    /// [`ChannelError::Framing`].
    pub fn peek_response(&self) -> ChannelResult<Option<ResponseRecord>> {
        let text = self.response.read().map_err(|err| ChannelError::Storage {
            sequence: self.last_issued,
            attempts: 1,
            source: err,
        })?;
        match text {
            Some(text) => Ok(Some(ResponseRecord::parse(&text)?)),
            None => Ok(None),
        }
    }

    fn write_command(&self, record: &CommandRecord) -> ChannelResult<()> {
        let text = record.to_string();
        let attempts = self.config.max_retries;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.command.replace(&text) {
                Ok(()) => return Ok(()),
                Err(err) if attempt < attempts => {
                    warn!(
                        "write of command {} failed (attempt {attempt}/{attempts}): {err}",
                        record.sequence
                    );
                    self.clock.sleep(self.config.retry_delay());
                }
                Err(source) => {
                    return Err(ChannelError::Storage {
                        sequence: record.sequence,
                        attempts: attempt,
                        source,
                    })
                }
            }
        }
    }

    fn await_response(&self, sequence: u32, timeout: Duration) -> ChannelResult<Outcome> {
        let deadline = Deadline::after(&self.clock, timeout);
        let interval = self.config.poll_interval();
        let mut faults = 0u32;
        let mut last_fault = None;
        let mut last_stale = None;

        loop {
            match self.poll_response(sequence) {
                ResponsePoll::Matched(outcome) => return Ok(outcome),
                ResponsePoll::Pending => faults = 0,
                ResponsePoll::Stale(other) => {
                    faults = 0;
                    if last_stale != Some(other) {
                        self.note_stale(other, sequence);
                        last_stale = Some(other);
                    }
                }
                ResponsePoll::Fault(reason) => {
                    faults += 1;
                    trace!("unreadable response while awaiting {sequence}: {reason}");
                    last_fault = Some(reason);
                    if faults > self.config.max_retries {
                        warn!(
                            "giving up on command {sequence} after {faults} unreadable polls"
                        );
                        return Err(ChannelError::Timeout {
                            sequence,
                            waited: deadline.elapsed(&self.clock),
                            last_fault,
                        });
                    }
                }
            }

            if !deadline.pause(&self.clock, interval) {
                return Err(ChannelError::Timeout {
                    sequence,
                    waited: deadline.elapsed(&self.clock),
                    last_fault,
                });
            }
        }
    }

    fn poll_response(&self, expected: u32) -> ResponsePoll {
        let text = match self.response.read() {
            Ok(Some(text)) => text,
            Ok(None) => return ResponsePoll::Pending,
            Err(err) => return ResponsePoll::Fault(err.to_string()),
        };
        match ResponseRecord::parse(&text) {
            Ok(record) if record.sequence == expected => ResponsePoll::Matched(record.outcome),
            Ok(record) => ResponsePoll::Stale(record.sequence),
            Err(err) => ResponsePoll::Fault(err.to_string()),
        }
    }

    fn note_stale(&self, other: u32, expected: u32) {
        if self.seq.is_newer(other, expected) {
            warn!(
                "response {other} is ahead of awaited command {expected} on {}; \
                 another controller may be writing this mailbox",
                self.response.describe()
            );
        } else {
            trace!("ignoring stale response {other} while awaiting {expected}");
        }
    }

    fn log_exchange(&self, message: fmt::Arguments<'_>) {
        if self.config.verbose {
            info!("{message}");
        } else {
            debug!("{message}");
        }
    }
}
