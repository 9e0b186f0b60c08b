use std::fmt;

/// Acquisition status reported by the host (`ACQSTATUS$`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AcquisitionStatus {
    Standby,
    PreRun,
    Run,
    PostRun,
    Error,
    Abort,
    Other(String),
}

impl AcquisitionStatus {
    pub fn from_payload(payload: &str) -> Self {
        match payload.trim() {
            "STANDBY" => AcquisitionStatus::Standby,
            "PRERUN" => AcquisitionStatus::PreRun,
            "RUN" => AcquisitionStatus::Run,
            "POSTRUN" => AcquisitionStatus::PostRun,
            "ERROR" => AcquisitionStatus::Error,
            "ABORT" => AcquisitionStatus::Abort,
            other => AcquisitionStatus::Other(other.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AcquisitionStatus::Standby => "STANDBY",
            AcquisitionStatus::PreRun => "PRERUN",
            AcquisitionStatus::Run => "RUN",
            AcquisitionStatus::PostRun => "POSTRUN",
            AcquisitionStatus::Error => "ERROR",
            AcquisitionStatus::Abort => "ABORT",
            AcquisitionStatus::Other(raw) => raw,
        }
    }

    /// Whether a new analysis can start.
    pub fn is_ready(&self) -> bool {
        matches!(self, AcquisitionStatus::Standby | AcquisitionStatus::PreRun)
    }
}

impl fmt::Display for AcquisitionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run state of one RC module plus its not-ready description.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleState {
    pub module: String,
    pub run_state: String,
    pub not_ready: Option<String>,
}

impl ModuleState {
    /// Idle with no not-ready condition.
    pub fn is_ready(&self) -> bool {
        self.not_ready.is_none() && self.run_state == "Idle"
    }
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.module, self.run_state)?;
        if let Some(reason) = &self.not_ready {
            write!(f, " (NotReady: {reason})")?;
        }
        Ok(())
    }
}
