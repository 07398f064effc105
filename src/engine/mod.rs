pub mod core;
pub mod grid;
pub mod local;
pub mod messages;
pub mod solver;

// Re-export key components
pub use self::core::SweepEngine;
pub use grid::{CloseMode, ComputeGrid, GridError, JobHandle, JobOutcome, SessionId, WaitOutcome};
pub use local::LocalGrid;
pub use messages::{SweepError, SweepReport, SweepSession, WaitResult};
pub use solver::{ReferenceSolver, Solution, Solver};
