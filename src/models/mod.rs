// Message model for the portfolio service.
// Pure data holders - no validation, no I/O. The codecs live in `data`,
// problem-level validation lives in `engine`.

pub mod covariance;
pub mod investment;
pub mod messages;

// Re-export key types for convenience
pub use covariance::Covariance;
pub use investment::Investment;
pub use messages::{Input, Output};
