//! In-process implementation of the execution capability.
//!
//! Session state lives on disk so detach/reattach works across runs:
//!
//!   <root>/<session-id>/manifest.json   ordered tasks (seq, handle, rho)
//!   <root>/<session-id>/task-N.in       wire-encoded Input
//!   <root>/<session-id>/task-N.out      wire-encoded Output
//!   <root>/<session-id>/task-N.err      "<code>\n<message>"
//!
//! A single worker thread pulls work items off an mpsc channel, decodes the
//! input with the wire codec, runs the solver and records the outcome. The
//! files on disk are the source of truth: a timed-out wait consumes
//! nothing, and reattaching re-dispatches any task without a recorded
//! outcome. Result files are written to a temp name and renamed, so a
//! concurrent reader never sees partial bytes.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::{MANIFEST_FILENAME, task_error};
use crate::data::wire::{decode_from_slice, encode_to_vec};
use crate::models::{Input, Output};

use super::grid::{
    CloseMode, ComputeGrid, GridError, JobHandle, JobOutcome, ReattachedJob, SessionId,
    SubmitError, WaitOutcome,
};
use super::solver::{Solution, Solver};

#[derive(Serialize, Deserialize, Debug, Clone)]
struct Manifest {
    session: SessionId,
    created_ms: i64,
    tasks: Vec<ManifestTask>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct ManifestTask {
    seq: i64,
    handle: JobHandle,
    rho: f64,
}

struct WorkItem {
    session_dir: PathBuf,
    seq: i64,
}

// Wakeup plumbing between the worker and blocked wait() callers. The disk
// holds the actual resolution state; this only exists so wait() does not
// have to poll.
struct Progress {
    lock: Mutex<()>,
    cond: Condvar,
}

pub struct LocalGrid {
    root: PathBuf,
    job_tx: Sender<WorkItem>,
    progress: Arc<Progress>,
    // Guards manifest read-modify-write during submission.
    submit_lock: Mutex<()>,
    session_counter: AtomicU64,
}

fn task_filename(seq: i64, kind: &str) -> String {
    format!("task-{}.{}", seq, kind)
}

// Write-then-rename so readers never observe a partial file.
fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)
}

fn write_task_error(dir: &Path, seq: i64, code: i32, message: &str) -> io::Result<()> {
    let body = format!("{}\n{}", code, message);
    write_atomic(&dir.join(task_filename(seq, "err")), body.as_bytes())
}

fn is_resolved(dir: &Path, seq: i64) -> bool {
    dir.join(task_filename(seq, "out")).exists() || dir.join(task_filename(seq, "err")).exists()
}

fn solve_to_output(input: &Input, solver: &dyn Solver) -> Output {
    match solver.solve(
        &input.investments,
        &input.covariance,
        input.wealth,
        input.rho,
    ) {
        Solution::Feasible {
            objective_value,
            total_return,
            total_variance,
            allocations,
        } => {
            let mut investments = input.investments.clone();
            for (inv, allocation) in investments.iter_mut().zip(allocations) {
                inv.allocation = allocation;
            }
            Output {
                optimal: true,
                wealth: input.wealth,
                rho: input.rho,
                objective_value,
                total_return,
                total_variance,
                investments,
            }
        }
        Solution::Infeasible => Output::infeasible(input.wealth, input.rho),
    }
}

fn run_task(item: &WorkItem, solver: &dyn Solver) -> io::Result<()> {
    let dir = &item.session_dir;
    let bytes = fs::read(dir.join(task_filename(item.seq, "in")))?;
    match decode_from_slice::<Input>(&bytes) {
        Ok(input) => {
            let output = solve_to_output(&input, solver);
            let out_bytes = encode_to_vec(&output)?;
            write_atomic(&dir.join(task_filename(item.seq, "out")), &out_bytes)
        }
        Err(e) => write_task_error(dir, item.seq, task_error::BAD_INPUT, &e.to_string()),
    }
}

fn spawn_worker_thread(rx: Receiver<WorkItem>, solver: Arc<dyn Solver>, progress: Arc<Progress>) {
    thread::spawn(move || {
        while let Ok(item) = rx.recv() {
            if let Err(e) = run_task(&item, solver.as_ref()) {
                log::error!(
                    "task {} in {} could not be recorded: {}",
                    item.seq,
                    item.session_dir.display(),
                    e
                );
                let _ =
                    write_task_error(&item.session_dir, item.seq, task_error::LOST, &e.to_string());
            }
            // Take the progress lock before notifying so a wait() caller
            // cannot scan, miss this result, and sleep through the wakeup.
            let _guard = progress.lock.lock().unwrap();
            progress.cond.notify_all();
        }
    });
}

impl LocalGrid {
    /// Open (or create) a grid rooted at `root` and start its worker.
    pub fn new(root: impl Into<PathBuf>, solver: Arc<dyn Solver>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;

        let (job_tx, job_rx) = channel::<WorkItem>();
        let progress = Arc::new(Progress {
            lock: Mutex::new(()),
            cond: Condvar::new(),
        });
        spawn_worker_thread(job_rx, solver, progress.clone());

        Ok(Self {
            root,
            job_tx,
            progress,
            submit_lock: Mutex::new(()),
            session_counter: AtomicU64::new(0),
        })
    }

    fn session_dir(&self, session: &SessionId) -> PathBuf {
        self.root.join(&session.0)
    }

    fn load_manifest(&self, dir: &Path, session: &SessionId) -> Result<Manifest, GridError> {
        let bytes = match fs::read(dir.join(MANIFEST_FILENAME)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(GridError::UnknownSession(session.0.clone()));
            }
            Err(e) => return Err(GridError::Io(e)),
        };
        serde_json::from_slice(&bytes).map_err(|e| GridError::Corrupt {
            session: session.0.clone(),
            detail: e.to_string(),
        })
    }

    fn store_manifest(&self, dir: &Path, manifest: &Manifest) -> Result<(), GridError> {
        let bytes = serde_json::to_vec_pretty(manifest).map_err(|e| GridError::Corrupt {
            session: manifest.session.0.clone(),
            detail: e.to_string(),
        })?;
        write_atomic(&dir.join(MANIFEST_FILENAME), &bytes)?;
        Ok(())
    }

    fn try_submit(&self, session: &SessionId, input: &Input) -> Result<JobHandle, GridError> {
        let _guard = self.submit_lock.lock().unwrap();

        let dir = self.session_dir(session);
        let mut manifest = self.load_manifest(&dir, session)?;

        let seq = manifest.tasks.len() as i64;
        let bytes = encode_to_vec(input)?;
        write_atomic(&dir.join(task_filename(seq, "in")), &bytes)?;

        let handle = JobHandle(format!("t{}", seq));
        manifest.tasks.push(ManifestTask {
            seq,
            handle: handle.clone(),
            rho: input.rho,
        });
        self.store_manifest(&dir, &manifest)?;

        // If the receiver is gone the grid is shutting down; the task stays
        // on disk and a reattach will pick it up.
        let _ = self.job_tx.send(WorkItem {
            session_dir: dir,
            seq,
        });

        Ok(handle)
    }

    fn collect_outcomes(&self, dir: &Path, tasks: &[ManifestTask]) -> Vec<JobOutcome> {
        tasks
            .iter()
            .map(|task| {
                let err_path = dir.join(task_filename(task.seq, "err"));
                if let Ok(body) = fs::read_to_string(&err_path) {
                    let (code_line, message) = body.split_once('\n').unwrap_or((body.as_str(), ""));
                    let code = code_line.trim().parse().unwrap_or(task_error::LOST);
                    return JobOutcome::Failure {
                        code,
                        message: message.to_string(),
                    };
                }
                match fs::read(dir.join(task_filename(task.seq, "out"))) {
                    Ok(bytes) => match decode_from_slice::<Output>(&bytes) {
                        Ok(output) => JobOutcome::Success(output),
                        Err(e) => JobOutcome::Failure {
                            code: task_error::BAD_OUTPUT,
                            message: e.to_string(),
                        },
                    },
                    Err(e) => JobOutcome::Failure {
                        code: task_error::LOST,
                        message: e.to_string(),
                    },
                }
            })
            .collect()
    }
}

impl ComputeGrid for LocalGrid {
    fn create_session(&self) -> Result<SessionId, GridError> {
        let n = self.session_counter.fetch_add(1, Ordering::Relaxed);
        let id = format!("s{}-{}-{}", Utc::now().timestamp_millis(), process::id(), n);
        let dir = self.root.join(&id);
        fs::create_dir_all(&dir)?;
        self.store_manifest(
            &dir,
            &Manifest {
                session: SessionId(id.clone()),
                created_ms: Utc::now().timestamp_millis(),
                tasks: Vec::new(),
            },
        )?;
        log::info!("created session {}", id);
        Ok(SessionId(id))
    }

    fn submit(&self, session: &SessionId, input: &Input) -> Result<JobHandle, SubmitError> {
        self.try_submit(session, input).map_err(|e| SubmitError {
            message: e.to_string(),
        })
    }

    fn wait(
        &self,
        session: &SessionId,
        count: usize,
        timeout: Option<Duration>,
    ) -> Result<WaitOutcome, GridError> {
        let dir = self.session_dir(session);
        let manifest = self.load_manifest(&dir, session)?;
        let tasks = &manifest.tasks[..count.min(manifest.tasks.len())];

        let deadline = timeout.map(|t| Instant::now() + t);
        let mut guard = self.progress.lock.lock().unwrap();
        loop {
            // Disk is the source of truth; scan under the lock so a result
            // landing right now cannot slip past us.
            let resolved = tasks.iter().filter(|t| is_resolved(&dir, t.seq)).count();
            if resolved == tasks.len() {
                drop(guard);
                return Ok(WaitOutcome::Ready(self.collect_outcomes(&dir, tasks)));
            }

            match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(WaitOutcome::NotReady { resolved });
                    }
                    let (g, _) = self
                        .progress
                        .cond
                        .wait_timeout(guard, deadline - now)
                        .unwrap();
                    guard = g;
                }
                None => {
                    guard = self.progress.cond.wait(guard).unwrap();
                }
            }
        }
    }

    fn reattach(&self, session: &SessionId) -> Result<Vec<ReattachedJob>, GridError> {
        let dir = self.session_dir(session);
        let manifest = self.load_manifest(&dir, session)?;

        let mut jobs = Vec::with_capacity(manifest.tasks.len());
        for task in &manifest.tasks {
            if !is_resolved(&dir, task.seq) {
                // Re-dispatch anything without a recorded outcome. A
                // duplicate dispatch is harmless: the atomic rename just
                // replaces the result with an identical one.
                let _ = self.job_tx.send(WorkItem {
                    session_dir: dir.clone(),
                    seq: task.seq,
                });
            }
            jobs.push(ReattachedJob {
                handle: task.handle.clone(),
                rho: task.rho,
            });
        }
        log::info!("reattached to session {} ({} tasks)", session, jobs.len());
        Ok(jobs)
    }

    fn close(&self, session: &SessionId, mode: CloseMode) -> Result<(), GridError> {
        match mode {
            CloseMode::Detach => {
                // Nothing to do: state lives on disk until discarded.
                log::info!("detached from session {}", session);
                Ok(())
            }
            CloseMode::Discard => {
                let dir = self.session_dir(session);
                match fs::remove_dir_all(&dir) {
                    Ok(()) => Ok(()),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {
                        Err(GridError::UnknownSession(session.0.clone()))
                    }
                    Err(e) => Err(GridError::Io(e)),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Covariance, Investment};
    use tempfile::TempDir;

    fn tiny_input(rho: f64) -> Input {
        let mut cov = Covariance::new();
        cov.set(0, 0, 2.0);
        cov.set(0, 1, 0.5);
        cov.set(1, 1, 3.0);
        Input::new(
            vec![
                Investment::new(0, "Stock A", 1.1),
                Investment::new(1, "Stock B", 1.2),
            ],
            cov,
            100.0,
            rho,
        )
    }

    fn new_grid(dir: &TempDir, solver: Arc<dyn Solver>) -> LocalGrid {
        LocalGrid::new(dir.path().join("sessions"), solver).unwrap()
    }

    /// Solver that sleeps first, to exercise timeouts.
    struct SlowSolver {
        delay: Duration,
        inner: super::super::solver::ReferenceSolver,
    }

    impl Solver for SlowSolver {
        fn solve(
            &self,
            investments: &[Investment],
            covariance: &Covariance,
            wealth: f64,
            rho: f64,
        ) -> Solution {
            thread::sleep(self.delay);
            self.inner.solve(investments, covariance, wealth, rho)
        }
    }

    #[test]
    fn test_submit_wait_round_trip() {
        let dir = TempDir::new().unwrap();
        let grid = new_grid(&dir, Arc::new(super::super::solver::ReferenceSolver));

        let session = grid.create_session().unwrap();
        for rho in [0.0, 0.5, 1.0] {
            grid.submit(&session, &tiny_input(rho)).unwrap();
        }

        match grid.wait(&session, 3, None).unwrap() {
            WaitOutcome::Ready(outcomes) => {
                assert_eq!(outcomes.len(), 3);
                // Submission order survives, and each output echoes its rho.
                let rhos: Vec<f64> = outcomes
                    .iter()
                    .map(|o| match o {
                        JobOutcome::Success(out) => out.rho,
                        JobOutcome::Failure { message, .. } => panic!("failed: {}", message),
                    })
                    .collect();
                assert_eq!(rhos, vec![0.0, 0.5, 1.0]);
            }
            WaitOutcome::NotReady { .. } => panic!("indefinite wait returned NotReady"),
        }
    }

    #[test]
    fn test_timeout_keeps_jobs_pending() {
        let dir = TempDir::new().unwrap();
        let grid = new_grid(
            &dir,
            Arc::new(SlowSolver {
                delay: Duration::from_millis(400),
                inner: super::super::solver::ReferenceSolver,
            }),
        );

        let session = grid.create_session().unwrap();
        grid.submit(&session, &tiny_input(0.01)).unwrap();

        // Far too short: must come back NotReady without consuming the job.
        match grid
            .wait(&session, 1, Some(Duration::from_millis(10)))
            .unwrap()
        {
            WaitOutcome::NotReady { resolved } => assert_eq!(resolved, 0),
            WaitOutcome::Ready(_) => panic!("400ms job finished in 10ms?"),
        }

        // Second wait on the same session picks the job up and finishes.
        match grid.wait(&session, 1, None).unwrap() {
            WaitOutcome::Ready(outcomes) => assert_eq!(outcomes.len(), 1),
            WaitOutcome::NotReady { .. } => panic!("job never resolved"),
        }
    }

    #[test]
    fn test_reattach_from_fresh_grid_instance() {
        let dir = TempDir::new().unwrap();
        let session;
        {
            let grid = new_grid(&dir, Arc::new(super::super::solver::ReferenceSolver));
            session = grid.create_session().unwrap();
            grid.submit(&session, &tiny_input(0.1)).unwrap();
            grid.submit(&session, &tiny_input(0.2)).unwrap();
            match grid.wait(&session, 2, None).unwrap() {
                WaitOutcome::Ready(outcomes) => assert_eq!(outcomes.len(), 2),
                WaitOutcome::NotReady { .. } => panic!("jobs never resolved"),
            }
        }

        // A brand new grid over the same root sees the session.
        let grid = new_grid(&dir, Arc::new(super::super::solver::ReferenceSolver));
        let jobs = grid.reattach(&session).unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].handle, JobHandle("t0".to_string()));
        assert_eq!(jobs[0].rho, 0.1);
        assert_eq!(jobs[1].rho, 0.2);

        // Results are already on disk, so this resolves immediately.
        match grid
            .wait(&session, 2, Some(Duration::from_secs(5)))
            .unwrap()
        {
            WaitOutcome::Ready(outcomes) => match &outcomes[1] {
                JobOutcome::Success(out) => assert_eq!(out.rho, 0.2),
                JobOutcome::Failure { message, .. } => panic!("failed: {}", message),
            },
            WaitOutcome::NotReady { .. } => panic!("resolved session reported NotReady"),
        }
    }

    #[test]
    fn test_reattach_redispatches_unresolved_tasks() {
        let dir = TempDir::new().unwrap();
        let session;
        {
            // This grid's solver is so slow the task will not finish here.
            let grid = new_grid(
                &dir,
                Arc::new(SlowSolver {
                    delay: Duration::from_secs(60),
                    inner: super::super::solver::ReferenceSolver,
                }),
            );
            session = grid.create_session().unwrap();
            grid.submit(&session, &tiny_input(0.3)).unwrap();
        }

        let grid = new_grid(&dir, Arc::new(super::super::solver::ReferenceSolver));
        let jobs = grid.reattach(&session).unwrap();
        assert_eq!(jobs.len(), 1);

        match grid.wait(&session, 1, Some(Duration::from_secs(10))).unwrap() {
            WaitOutcome::Ready(outcomes) => match &outcomes[0] {
                JobOutcome::Success(out) => assert_eq!(out.rho, 0.3),
                JobOutcome::Failure { message, .. } => panic!("failed: {}", message),
            },
            WaitOutcome::NotReady { .. } => panic!("re-dispatched task never resolved"),
        }
    }

    #[test]
    fn test_manifest_json_round_trip() {
        let manifest = Manifest {
            session: SessionId("s1".to_string()),
            created_ms: 1_700_000_000_000,
            tasks: vec![ManifestTask {
                seq: 0,
                handle: JobHandle("t0".to_string()),
                rho: 0.25,
            }],
        };

        let bytes = serde_json::to_vec_pretty(&manifest).unwrap();
        let back: Manifest = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(back.session, SessionId("s1".to_string()));
        assert_eq!(back.tasks[0].handle, JobHandle("t0".to_string()));
        assert_eq!(back.tasks[0].rho, 0.25);
    }

    #[test]
    fn test_unknown_session_is_an_error() {
        let dir = TempDir::new().unwrap();
        let grid = new_grid(&dir, Arc::new(super::super::solver::ReferenceSolver));
        let bogus = SessionId("no-such-session".to_string());
        assert!(matches!(
            grid.wait(&bogus, 1, None),
            Err(GridError::UnknownSession(_))
        ));
        assert!(matches!(
            grid.reattach(&bogus),
            Err(GridError::UnknownSession(_))
        ));
    }

    #[test]
    fn test_close_discard_removes_state() {
        let dir = TempDir::new().unwrap();
        let grid = new_grid(&dir, Arc::new(super::super::solver::ReferenceSolver));
        let session = grid.create_session().unwrap();
        grid.submit(&session, &tiny_input(0.01)).unwrap();

        grid.close(&session, CloseMode::Discard).unwrap();
        assert!(matches!(
            grid.reattach(&session),
            Err(GridError::UnknownSession(_))
        ));
    }
}
