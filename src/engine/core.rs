//! The sweep engine: one base problem plus a rho range in, one aggregate
//! report out.
//!
//! The engine validates the base input once, derives one Input per sweep
//! point, submits them all, and then resolves the batch with a single
//! blocking wait per attempt. It never schedules or parallelizes work
//! itself - that is the grid's business.

use std::time::Duration;

use crate::domain::RhoRange;
use crate::models::Input;

use super::grid::{CloseMode, ComputeGrid, GridError, JobOutcome, SessionId, WaitOutcome};
use super::messages::{
    JobResolution, SweepEntry, SweepError, SweepJob, SweepReport, SweepSession, WaitResult,
};

pub struct SweepEngine<G: ComputeGrid> {
    grid: G,
}

impl<G: ComputeGrid> SweepEngine<G> {
    pub fn new(grid: G) -> Self {
        Self { grid }
    }

    pub fn grid(&self) -> &G {
        &self.grid
    }

    /// Check that every unordered pair of declared investments (diagonal
    /// included) has a defined covariance entry. Runs once, before any
    /// submission - an incomplete matrix means the batch must not start.
    pub fn validate(base: &Input) -> Result<(), SweepError> {
        for (i, a) in base.investments.iter().enumerate() {
            for b in &base.investments[i..] {
                if base.covariance.get(a.id, b.id).is_nan() {
                    return Err(SweepError::Validation {
                        first: a.name.clone(),
                        second: b.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Build and submit the whole batch. One job per sweep point, in
    /// enumeration order. A rejected submission marks that one job failed
    /// and moves on - the remaining sweep points still go out.
    pub fn submit_sweep(&self, base: &Input, range: &RhoRange) -> Result<SweepSession, SweepError> {
        Self::validate(base)?;

        let id = self.grid.create_session()?;
        let points = range.points();

        let mut jobs = Vec::with_capacity(points.len());
        for rho in points {
            let variant = base.with_rho(rho);
            match self.grid.submit(&id, &variant) {
                Ok(handle) => {
                    log::info!("task submitted with handle {}", handle);
                    jobs.push(SweepJob::pending(rho, handle));
                }
                Err(e) => {
                    // Fatal to this sweep point only.
                    log::error!("submission failed for rho {}: {}", rho, e);
                    jobs.push(SweepJob::rejected(rho, e.message));
                }
            }
        }

        let submitted = jobs.iter().filter(|j| j.handle.is_some()).count();
        log::info!(
            "session {}: submitted {} of {} sweep points",
            id,
            submitted,
            jobs.len()
        );

        Ok(SweepSession {
            id,
            jobs,
            attached: true,
        })
    }

    /// Rebuild a session from its id. The grid reproduces the ordered
    /// handle sequence; resolutions start over as Pending and are filled
    /// in by the next wait.
    pub fn reattach(&self, id: SessionId) -> Result<SweepSession, SweepError> {
        let jobs = self
            .grid
            .reattach(&id)?
            .into_iter()
            .map(|j| SweepJob::pending(j.rho, j.handle))
            .collect();
        Ok(SweepSession {
            id,
            jobs,
            attached: true,
        })
    }

    /// Stop waiting without giving up the batch. The session id is the
    /// ticket back in.
    pub fn detach(&self, session: &mut SweepSession) -> Result<(), SweepError> {
        self.grid.close(&session.id, CloseMode::Detach)?;
        session.attached = false;
        Ok(())
    }

    /// Throw the batch away entirely.
    pub fn discard(&self, session: SweepSession) -> Result<(), SweepError> {
        self.grid.close(&session.id, CloseMode::Discard)?;
        Ok(())
    }

    /// One blocking wait over the whole batch. `None` waits indefinitely.
    ///
    /// Timeout: `WaitResult::NotReady` with the resolved-so-far count;
    /// unresolved jobs stay pending and a later call continues on exactly
    /// the unresolved subset. All resolved: the aggregate report, in
    /// submission order.
    pub fn wait(
        &self,
        session: &mut SweepSession,
        timeout: Option<Duration>,
    ) -> Result<WaitResult, SweepError> {
        let total = session.jobs.len();
        let submitted = session.jobs.iter().filter(|j| j.handle.is_some()).count();
        let rejected = total - submitted;

        if submitted == 0 {
            // Every submission was rejected; there is nothing to wait on.
            return Ok(WaitResult::Ready(Self::fold_report(session, Vec::new())?));
        }

        match self.grid.wait(&session.id, submitted, timeout)? {
            WaitOutcome::NotReady { resolved } => Ok(WaitResult::NotReady {
                // Rejected submissions are already resolved (as failures).
                resolved: resolved + rejected,
                total,
            }),
            WaitOutcome::Ready(outcomes) => {
                Ok(WaitResult::Ready(Self::fold_report(session, outcomes)?))
            }
        }
    }

    // Merge grid outcomes (for submitted jobs, in submission order) with
    // the jobs that never made it onto the grid, preserving the original
    // sweep order throughout.
    fn fold_report(
        session: &mut SweepSession,
        outcomes: Vec<JobOutcome>,
    ) -> Result<SweepReport, SweepError> {
        let mut outcomes = outcomes.into_iter();
        let mut entries = Vec::with_capacity(session.jobs.len());

        for job in &mut session.jobs {
            let outcome = if job.handle.is_some() {
                outcomes.next().ok_or_else(|| {
                    SweepError::Grid(GridError::Corrupt {
                        session: session.id.0.clone(),
                        detail: "grid returned fewer outcomes than submitted jobs".to_string(),
                    })
                })?
            } else {
                match &job.resolution {
                    JobResolution::Failed { code, message } => JobOutcome::Failure {
                        code: *code,
                        message: message.clone(),
                    },
                    // A job without a handle can only be a rejected one.
                    _ => unreachable!("job without handle is not failed"),
                }
            };

            job.resolution = match &outcome {
                JobOutcome::Success(output) => JobResolution::Succeeded(output.clone()),
                JobOutcome::Failure { code, message } => JobResolution::Failed {
                    code: *code,
                    message: message.clone(),
                },
            };
            entries.push(SweepEntry {
                rho: job.rho,
                outcome,
            });
        }

        Ok(SweepReport { entries })
    }
}
