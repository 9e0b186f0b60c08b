use std::time::Duration;

use log::{debug, warn};
use mailbox_controller::{ChannelError, ControllerClient, Instruction};
use mailbox_pacing::{Clock, Deadline};
use mailbox_store::MailboxSlot;

use crate::{AcquisitionStatus, ModuleState, QueryError, QueryResult};

/// RC module queried when none is named.
pub const DEFAULT_RUN_MODULE: &str = "CE1";

const STATUS_TIMEOUT: Duration = Duration::from_secs(10);
const RUN_STATE_TIMEOUT: Duration = Duration::from_secs(20);
const STATUS_ATTEMPTS: u32 = 3;
const READY_POLL: Duration = Duration::from_secs(1);
const SETTLE: Duration = Duration::from_secs(2);

/// Status and timing queries against the host, borrowed from one client.
pub struct HostQueries<'a, S, C>
where
    S: MailboxSlot,
    C: Clock,
{
    client: &'a mut ControllerClient<S, C>,
}

impl<'a, S, C> HostQueries<'a, S, C>
where
    S: MailboxSlot,
    C: Clock,
{
    pub fn new(client: &'a mut ControllerClient<S, C>) -> Self {
        Self { client }
    }

    pub fn acquisition_status(&mut self) -> QueryResult<AcquisitionStatus> {
        let expr = "ACQSTATUS$";
        let payload = self.query_retrying(expr, STATUS_TIMEOUT)?;
        let payload = payload.ok_or_else(|| QueryError::unexpected(expr, None))?;
        Ok(AcquisitionStatus::from_payload(&payload))
    }

    /// Whether a method is executing (`_MethodOn`).
    pub fn method_running(&mut self) -> QueryResult<bool> {
        let expr = "VAL$(_MethodOn)";
        match self.client.query(expr)?.as_deref().map(str::trim) {
            Some("1") => Ok(true),
            Some("0") => Ok(false),
            other => Err(QueryError::unexpected(expr, other)),
        }
    }

    /// Raw `RunState` header of an RC module, e.g. `Idle` or `Run`.
    pub fn run_state(&mut self, module: &str) -> QueryResult<String> {
        let expr = format!("ObjHdrText$(RC{module}Status[1], \"RunState\")");
        let payload = self.query_retrying(&expr, RUN_STATE_TIMEOUT)?;
        payload
            .map(|state| state.trim().to_owned())
            .ok_or_else(|| QueryError::unexpected(&expr, None))
    }

    /// Run state and not-ready description of each module, in one exchange.
    pub fn module_states(&mut self, modules: &[&str]) -> QueryResult<Vec<ModuleState>> {
        let expr = module_states_expr(modules);
        let payload = self.query_retrying(&expr, STATUS_TIMEOUT)?.unwrap_or_default();
        let values: Vec<&str> = if payload.is_empty() {
            Vec::new()
        } else {
            payload.split('|').map(str::trim).collect()
        };

        Ok(modules
            .iter()
            .enumerate()
            .map(|(i, module)| {
                let run_state = values.get(i * 2).copied().unwrap_or("Unknown");
                let not_ready = values.get(i * 2 + 1).copied().unwrap_or_default();
                ModuleState {
                    module: (*module).to_owned(),
                    run_state: run_state.to_owned(),
                    not_ready: (!not_ready.is_empty()).then(|| not_ready.to_owned()),
                }
            })
            .collect())
    }

    /// Polls every second until `STANDBY` or `PRERUN`. Returns `false` when
    /// `timeout` runs out first.
    pub fn wait_for_ready(&mut self, timeout: Duration) -> QueryResult<bool> {
        let deadline = Deadline::after(self.client.clock(), timeout);
        loop {
            let status = self.acquisition_status()?;
            if status.is_ready() {
                return Ok(true);
            }
            debug!("host not ready ({status})");
            if !deadline.pause(self.client.clock(), READY_POLL) {
                return Ok(false);
            }
        }
    }

    /// Polls every second until every module is idle with no not-ready
    /// condition, then waits for the instrument to settle.
    pub fn wait_for_modules_ready(&mut self, modules: &[&str], timeout: Duration) -> QueryResult<()> {
        let deadline = Deadline::after(self.client.clock(), timeout);
        loop {
            let states = self.module_states(modules)?;
            if states.iter().all(ModuleState::is_ready) {
                self.client.clock().sleep(SETTLE);
                return Ok(());
            }
            if !deadline.pause(self.client.clock(), READY_POLL) {
                let states = states
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(QueryError::NotReady {
                    waited: deadline.elapsed(self.client.clock()),
                    states,
                });
            }
        }
    }

    /// Minutes since the separation started.
    pub fn elapsed_analysis_minutes(&mut self) -> QueryResult<f64> {
        self.query_minutes("VAL$(ObjHdrVal(RCCE1Status[1], \"Runtime\"))")
    }

    /// Programmed run time of the loaded method, in minutes.
    pub fn total_analysis_minutes(&mut self) -> QueryResult<f64> {
        self.query_minutes("VAL$(ObjHdrVal(RCCE1Status[1], \"MethodRuntime\"))")
    }

    pub fn remaining_analysis_minutes(&mut self) -> QueryResult<f64> {
        self.query_minutes(
            "VAL$(ObjHdrVal(RCCE1Status[1], \"MethodRuntime\") - ObjHdrVal(RCCE1Status[1], \"Runtime\"))",
        )
    }

    /// Stops the current run and waits for the instrument to settle.
    pub fn abort_run(&mut self) -> QueryResult<()> {
        self.client.send(Instruction::command("AbortRun"))?;
        self.client.clock().sleep(SETTLE);
        Ok(())
    }

    fn query_minutes(&mut self, expr: &str) -> QueryResult<f64> {
        let payload = self.client.query(expr)?;
        payload
            .as_deref()
            .and_then(|text| text.trim().parse::<f64>().ok())
            .ok_or_else(|| QueryError::unexpected(expr, payload.as_deref()))
    }

    fn query_retrying(&mut self, expr: &str, timeout: Duration) -> Result<Option<String>, ChannelError> {
        let mut attempt = 1;
        loop {
            match self.client.send_with_timeout(Instruction::query(expr), timeout) {
                Err(err) if err.is_timeout() && attempt < STATUS_ATTEMPTS => {
                    warn!("`{expr}` timed out (attempt {attempt}/{STATUS_ATTEMPTS})");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

fn module_states_expr(modules: &[&str]) -> String {
    let mut parts = Vec::with_capacity(modules.len() * 4);
    for (i, module) in modules.iter().enumerate() {
        if i > 0 {
            parts.push("\"|\"".to_owned());
        }
        parts.push(format!("ObjHdrText$(RC{module}Status[1], \"RunState\")"));
        parts.push("\"|\"".to_owned());
        parts.push(format!(
            "ObjHdrText$(RC{module}Status[1], \"NotReadyState_Description\")"
        ));
    }
    parts.join(" + ")
}
