//! Bookkeeping types for one sweep batch and its aggregate report.

use std::error::Error;
use std::fmt;

use crate::models::Output;

use super::grid::{GridError, JobHandle, JobOutcome, SessionId};

/// How far one sweep job has gotten.
#[derive(Debug, Clone)]
pub enum JobResolution {
    Pending,
    Succeeded(Output),
    Failed { code: i32, message: String },
}

/// One sweep point: the rho it stands for, the grid handle tracking it
/// (None if the grid rejected the submission), and its resolution.
#[derive(Debug, Clone)]
pub struct SweepJob {
    pub rho: f64,
    pub handle: Option<JobHandle>,
    pub resolution: JobResolution,
}

impl SweepJob {
    pub fn pending(rho: f64, handle: JobHandle) -> Self {
        Self {
            rho,
            handle: Some(handle),
            resolution: JobResolution::Pending,
        }
    }

    pub fn rejected(rho: f64, message: String) -> Self {
        Self {
            rho,
            handle: None,
            resolution: JobResolution::Failed { code: 0, message },
        }
    }
}

/// One batch of sweep jobs created from a single base input.
#[derive(Debug)]
pub struct SweepSession {
    pub id: SessionId,
    /// Submission order. Append-only during submission, read-only after.
    pub jobs: Vec<SweepJob>,
    pub attached: bool,
}

/// One line of the aggregate report, in submission order.
#[derive(Debug, Clone)]
pub struct SweepEntry {
    pub rho: f64,
    pub outcome: JobOutcome,
}

/// The aggregate report for a fully resolved batch.
///
/// Failed jobs do not evict their successful siblings: every Output is
/// here, in submission order, even when the report as a whole is failed.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    pub entries: Vec<SweepEntry>,
}

impl SweepReport {
    /// True if at least one job failed.
    pub fn failed(&self) -> bool {
        self.entries
            .iter()
            .any(|e| matches!(e.outcome, JobOutcome::Failure { .. }))
    }

    /// Successful outputs, submission order.
    pub fn outputs(&self) -> impl Iterator<Item = &Output> {
        self.entries.iter().filter_map(|e| match &e.outcome {
            JobOutcome::Success(output) => Some(output),
            JobOutcome::Failure { .. } => None,
        })
    }

    /// Failed entries as (rho, code, message), submission order.
    pub fn failures(&self) -> impl Iterator<Item = (f64, i32, &str)> {
        self.entries.iter().filter_map(|e| match &e.outcome {
            JobOutcome::Success(_) => None,
            JobOutcome::Failure { code, message } => Some((e.rho, *code, message.as_str())),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of one blocking wait on a batch.
#[derive(Debug)]
pub enum WaitResult {
    Ready(SweepReport),
    /// Timed out with work still outstanding. Retryable: nothing was lost,
    /// a later wait continues on the unresolved subset.
    NotReady { resolved: usize, total: usize },
}

/// Fatal sweep failures. Per-job problems never show up here - they are
/// folded into the report so siblings survive.
#[derive(Debug)]
pub enum SweepError {
    /// The base input is missing a covariance entry for a pair of declared
    /// investments. Nothing gets submitted.
    Validation { first: String, second: String },
    Grid(GridError),
}

impl fmt::Display for SweepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepError::Validation { first, second } => {
                write!(f, "no covariance for {} and {}", first, second)
            }
            SweepError::Grid(e) => write!(f, "grid error: {}", e),
        }
    }
}

impl Error for SweepError {}

impl From<GridError> for SweepError {
    fn from(e: GridError) -> Self {
        SweepError::Grid(e)
    }
}
