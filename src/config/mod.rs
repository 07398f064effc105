//! Configuration constants for the sweep client.

/// Directory where the local grid keeps its session state.
pub const SESSIONS_PATH: &str = "sweep_sessions";

/// Per-session manifest file (session id, creation time, ordered tasks).
pub const MANIFEST_FILENAME: &str = "manifest.json";

/// Per-job codes the local grid reports in `JobOutcome::Failure`.
pub mod task_error {
    /// The submitted input bytes did not decode.
    pub const BAD_INPUT: i32 = 1;
    /// The recorded result bytes did not decode.
    pub const BAD_OUTPUT: i32 = 2;
    /// The job's files could not be read.
    pub const LOST: i32 = 3;
}
