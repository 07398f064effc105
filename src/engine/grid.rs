//! The execution capability consumed by the sweep engine.
//!
//! The real work of scheduling jobs across workers belongs to whatever sits
//! behind this trait (an in-process grid here, a cluster in production).
//! The engine only ever uses this narrow surface: submit, one blocking wait
//! per resolution attempt, reattach by opaque session id, close.

use std::error::Error;
use std::fmt;
use std::io;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::{Input, Output};

/// Opaque session token. The engine never looks inside - it only hands it
/// back to the grid (or prints it so a later run can reattach).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque per-submission token.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct JobHandle(pub String);

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How one job resolved on the grid.
#[derive(Debug, Clone)]
pub enum JobOutcome {
    Success(Output),
    Failure { code: i32, message: String },
}

/// Result of one blocking wait over a whole batch.
#[derive(Debug, Clone)]
pub enum WaitOutcome {
    /// Every job resolved. Outcomes are in submission order, regardless of
    /// completion order.
    Ready(Vec<JobOutcome>),
    /// The timeout expired first. `resolved` of the batch are done; nothing
    /// was consumed, so a later wait continues on the rest.
    NotReady { resolved: usize },
}

/// What closing a session means for its state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseMode {
    /// Abandon waiting but keep the session resolvable later.
    Detach,
    /// Throw the session and all its jobs away.
    Discard,
}

/// Grid-level failures (not per-job failures - those are `JobOutcome::Failure`).
#[derive(Debug)]
pub enum GridError {
    UnknownSession(String),
    /// Session state on the grid side is unreadable.
    Corrupt { session: String, detail: String },
    Io(io::Error),
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridError::UnknownSession(id) => write!(f, "unknown session: {}", id),
            GridError::Corrupt { session, detail } => {
                write!(f, "session {} state is corrupt: {}", session, detail)
            }
            GridError::Io(e) => write!(f, "grid I/O failed: {}", e),
        }
    }
}

impl Error for GridError {}

impl From<io::Error> for GridError {
    fn from(e: io::Error) -> Self {
        GridError::Io(e)
    }
}

/// The grid rejected one submission. Fatal to that job only - the engine
/// keeps submitting the remaining sweep points.
#[derive(Debug, Clone)]
pub struct SubmitError {
    pub message: String,
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "submission rejected: {}", self.message)
    }
}

impl Error for SubmitError {}

/// A job as seen after reattaching to an existing session. `rho` is NaN for
/// grids that cannot recover it (the Output echoes rho either way).
#[derive(Debug, Clone)]
pub struct ReattachedJob {
    pub handle: JobHandle,
    pub rho: f64,
}

pub trait ComputeGrid {
    /// Open a fresh session to submit a batch into.
    fn create_session(&self) -> Result<SessionId, GridError>;

    /// Hand one job to the grid. Returns the opaque handle tracking it.
    fn submit(&self, session: &SessionId, input: &Input) -> Result<JobHandle, SubmitError>;

    /// Block until the first `count` jobs of the session resolve, or the
    /// timeout expires. `None` waits indefinitely. A timed-out wait must
    /// not lose progress: unresolved jobs stay pending and waitable.
    fn wait(
        &self,
        session: &SessionId,
        count: usize,
        timeout: Option<Duration>,
    ) -> Result<WaitOutcome, GridError>;

    /// Reproduce the ordered job sequence of an existing session.
    fn reattach(&self, session: &SessionId) -> Result<Vec<ReattachedJob>, GridError>;

    fn close(&self, session: &SessionId, mode: CloseMode) -> Result<(), GridError>;
}
