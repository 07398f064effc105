// Core modules
pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod models;

// Re-export commonly used types
pub use data::{DEFAULT_RHO, DEFAULT_WEALTH, example_input};
pub use domain::{RangeError, RhoRange};
pub use engine::{ComputeGrid, LocalGrid, ReferenceSolver, SweepEngine, SweepReport, WaitResult};
pub use models::{Covariance, Input, Investment, Output};

// CLI argument parsing
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Problem file (I/C lines); uses the built-in example when omitted
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Total wealth to allocate across the investments
    #[arg(long)]
    pub wealth: Option<f64>,

    /// Risk aversion: a single value, or `min,max` for a sweep
    #[arg(long)]
    pub rho: Option<String>,

    /// Sweep increment; required with a `min,max` rho range
    #[arg(long)]
    pub step: Option<f64>,

    /// Submit the batch and detach instead of waiting for results
    #[arg(long, default_value_t = false)]
    pub no_wait: bool,

    /// Reattach to a previously detached session by id
    #[arg(long)]
    pub session: Option<String>,

    /// Wait at most this many seconds; zero or less waits indefinitely
    #[arg(long)]
    pub timeout: Option<i64>,
}
