//! The rho sweep range: one base problem is submitted once per point.

use std::error::Error;
use std::fmt;

/// Rejected rho/step combinations. These map to their own CLI exit code so
/// scripts can tell "bad range" apart from "run failed".
#[derive(Debug, Clone, PartialEq)]
pub enum RangeError {
    /// A data-file run must give a rho max and a step width together or not
    /// at all (without a data file a partial pair just degenerates).
    PartialRange,
    /// rho max must be > rho min and > 0.
    InvalidBounds { min: f64, max: f64 },
    /// Step width must be > 0.
    InvalidStep(f64),
    /// The `min` or `min,max` argument did not parse as numbers.
    BadNumber(String),
}

impl fmt::Display for RangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeError::PartialRange => {
                write!(f, "a rho range needs both an upper bound and a step width")
            }
            RangeError::InvalidBounds { min, max } => write!(
                f,
                "invalid rho range {},{}: max must be > min and > 0",
                min, max
            ),
            RangeError::InvalidStep(step) => write!(f, "invalid step {}: must be > 0", step),
            RangeError::BadNumber(s) => write!(f, "cannot parse rho value: {}", s),
        }
    }
}

impl Error for RangeError {}

/// A validated closed range [min, max] walked in `step` increments.
///
/// A single rho value - or a partial max/step pair - degenerates to
/// min == max with step 1, which yields exactly one point.
#[derive(Debug, Clone, PartialEq)]
pub struct RhoRange {
    min: f64,
    max: f64,
    step: f64,
}

impl RhoRange {
    pub fn new(min: f64, max: Option<f64>, step: Option<f64>) -> Result<Self, RangeError> {
        match (max, step) {
            (Some(max), Some(step)) => {
                if !(max > min && max > 0.0) {
                    return Err(RangeError::InvalidBounds { min, max });
                }
                if !(step > 0.0) {
                    return Err(RangeError::InvalidStep(step));
                }
                Ok(Self { min, max, step })
            }
            // Anything short of a full max+step pair degenerates to the
            // single point `min`. Benign values: one pass of the loop.
            _ => Ok(Self {
                min,
                max: min,
                step: 1.0,
            }),
        }
    }

    /// Parse the CLI shape: `min` or `min,max`, plus the separate step flag.
    pub fn from_args(rho: &str, step: Option<f64>) -> Result<Self, RangeError> {
        let bad = || RangeError::BadNumber(rho.to_string());
        match rho.split_once(',') {
            Some((min_tok, max_tok)) => {
                let min: f64 = min_tok.trim().parse().map_err(|_| bad())?;
                let max: f64 = max_tok.trim().parse().map_err(|_| bad())?;
                Self::new(min, Some(max), step)
            }
            None => {
                let min: f64 = rho.trim().parse().map_err(|_| bad())?;
                Self::new(min, None, step)
            }
        }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    /// Enumerate the sweep points in submission order.
    ///
    /// Plain repeated addition with a raw `<=` comparison. Accumulated
    /// rounding CAN drop or admit the boundary point for some ranges; callers
    /// who care pick step values that divide the range exactly.
    pub fn points(&self) -> Vec<f64> {
        let mut points = Vec::new();
        let mut rho = self.min;
        while rho <= self.max {
            points.push(rho);
            rho += self.step;
        }
        points
    }
}
