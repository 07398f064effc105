// Domain types and value objects
pub mod rho_range;

// Re-export commonly used types
pub use rho_range::{RangeError, RhoRange};
