use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use log::{debug, info, trace, warn};
use mailbox_pacing::{Clock, Deadline, SystemClock};
use mailbox_store::{FileSlot, MailboxSlot};
use mailbox_wire::{CommandRecord, Instruction, Outcome, ResponseRecord, BASELINE_SEQ};

use crate::{HostConfig, HostResult, Interpreter};

/// Where the loop is in handling the command slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostState {
    Idle,
    Detected,
    Executing,
    Responded,
    Stopped,
}

/// What a single [`HostPollLoop::poll_once`] did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    /// Nothing new in the command slot.
    Idle,
    /// A baseline record reset `last_processed`.
    Baseline,
    /// An instruction ran and its response was written.
    Executed { sequence: u32, outcome: Outcome },
    /// The response could not be written yet; it is retried next poll.
    ResponsePending { sequence: u32 },
    /// The terminal instruction was answered; the loop has stopped.
    Terminated { sequence: u32 },
    /// The loop had already stopped.
    Stopped,
}

/// Host poll loop over a command/response slot pair.
///
/// A command is new when its sequence differs from `last_processed`. The
/// loop relies on the controller keeping one request outstanding, so plain
/// inequality is enough; it does not order sequences on the ring.
pub struct HostPollLoop<S, I, C = SystemClock>
where
    S: MailboxSlot,
    I: Interpreter,
    C: Clock,
{
    command: S,
    response: S,
    interpreter: I,
    clock: C,
    poll_interval: Duration,
    terminal: String,
    last_processed: u32,
    state: HostState,
    pending: Option<ResponseRecord>,
    stopping: bool,
    executed: u64,
}

impl<I> HostPollLoop<FileSlot, I, SystemClock>
where
    I: Interpreter,
{
    /// Opens the file mailbox in `config`, creating the directory and empty
    /// slot files when missing.
    pub fn open(config: &HostConfig, interpreter: I) -> HostResult<Self> {
        config.validate()?;
        let paths = config.paths();
        paths.ensure_dir()?;
        let (command, response) = paths.open(config.encoding);
        command.touch()?;
        response.touch()?;
        info!("host loop watching {}", paths.dir().display());
        Self::new(command, response, interpreter, SystemClock::new(), config)
    }
}

impl<S, I, C> HostPollLoop<S, I, C>
where
    S: MailboxSlot,
    I: Interpreter,
    C: Clock,
{
    pub fn new(command: S, response: S, interpreter: I, clock: C, config: &HostConfig) -> HostResult<Self> {
        config.validate()?;
        Ok(Self {
            command,
            response,
            interpreter,
            clock,
            poll_interval: config.poll_interval(),
            terminal: config.terminal_instruction.trim().to_owned(),
            last_processed: BASELINE_SEQ,
            state: HostState::Idle,
            pending: None,
            stopping: false,
            executed: 0,
        })
    }

    pub fn last_processed(&self) -> u32 {
        self.last_processed
    }

    pub fn state(&self) -> HostState {
        self.state
    }

    /// Instructions handed to the interpreter so far.
    pub fn executed(&self) -> u64 {
        self.executed
    }

    pub fn interpreter(&self) -> &I {
        &self.interpreter
    }

    pub fn interpreter_mut(&mut self) -> &mut I {
        &mut self.interpreter
    }

    pub fn into_interpreter(self) -> I {
        self.interpreter
    }

    /// Reads the command slot once and handles at most one new command.
    pub fn poll_once(&mut self) -> PollOutcome {
        if self.state == HostState::Stopped {
            return PollOutcome::Stopped;
        }
        if let Some(record) = self.pending.take() {
            return self.deliver(record);
        }

        let text = match self.command.read() {
            Ok(Some(text)) => text,
            Ok(None) => return self.idle(),
            Err(err) => {
                trace!("command slot unreadable: {err}");
                return self.idle();
            }
        };
        let record = match CommandRecord::parse(&text) {
            Ok(record) => record,
            Err(err) => {
                trace!("ignoring malformed command record: {err}");
                return self.idle();
            }
        };
        if record.sequence == self.last_processed {
            return self.idle();
        }

        self.state = HostState::Detected;
        self.last_processed = record.sequence;

        if record.sequence == BASELINE_SEQ {
            debug!("baseline record absorbed");
            return match self.deliver(ResponseRecord::new(BASELINE_SEQ, Outcome::NoValue)) {
                PollOutcome::Executed { .. } => PollOutcome::Baseline,
                other => other,
            };
        }

        if record.instruction.trim() == self.terminal {
            info!("terminal instruction {} received", record.sequence);
            self.stopping = true;
            return self.deliver(ResponseRecord::new(record.sequence, Outcome::NoValue));
        }

        let outcome = self.execute(&record);
        self.deliver(ResponseRecord::new(record.sequence, outcome))
    }

    /// Polls until the terminal instruction is answered. Returns the number
    /// of executed instructions.
    pub fn run(&mut self) -> u64 {
        while !self.step() {}
        self.executed
    }

    /// Like [`Self::run`] but gives up after `budget`. Returns whether the
    /// loop stopped.
    pub fn run_for(&mut self, budget: Duration) -> bool {
        let deadline = Deadline::after(&self.clock, budget);
        loop {
            if self.step() {
                return true;
            }
            if deadline.expired(&self.clock) {
                return false;
            }
        }
    }

    fn step(&mut self) -> bool {
        match self.poll_once() {
            PollOutcome::Terminated { .. } | PollOutcome::Stopped => true,
            _ => {
                self.clock.sleep(self.poll_interval);
                false
            }
        }
    }

    fn execute(&mut self, record: &CommandRecord) -> Outcome {
        self.state = HostState::Executing;
        self.executed += 1;
        debug!("executing {}: {}", record.sequence, record.instruction);

        let interpreter = &mut self.interpreter;
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            interpreter.execute(&record.instruction)
        }))
        .unwrap_or_else(|payload| Err(panic_message(&*payload)));

        match result {
            Ok(value) if Instruction::from(record.instruction.as_str()).expects_value() => {
                value.map_or(Outcome::NoValue, Outcome::Value)
            }
            Ok(value) => {
                if value.is_some() {
                    trace!("dropping value of fire-and-forget instruction {}", record.sequence);
                }
                Outcome::NoValue
            }
            Err(diagnostic) => {
                debug!("instruction {} failed: {diagnostic}", record.sequence);
                Outcome::error(diagnostic)
            }
        }
    }

    fn deliver(&mut self, record: ResponseRecord) -> PollOutcome {
        let sequence = record.sequence;
        if let Err(err) = self.response.replace(&record.to_string()) {
            warn!("could not write response {sequence}: {err}");
            self.pending = Some(record);
            return PollOutcome::ResponsePending { sequence };
        }
        if self.stopping {
            self.state = HostState::Stopped;
            return PollOutcome::Terminated { sequence };
        }
        self.state = HostState::Responded;
        PollOutcome::Executed {
            sequence,
            outcome: record.outcome,
        }
    }

    fn idle(&mut self) -> PollOutcome {
        self.state = HostState::Idle;
        PollOutcome::Idle
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        format!("interpreter panicked: {text}")
    } else if let Some(text) = payload.downcast_ref::<String>() {
        format!("interpreter panicked: {text}")
    } else {
        "interpreter panicked".to_owned()
    }
}
