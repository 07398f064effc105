//! The solver capability consumed by the grid workers.
//!
//! The objective is the classic Markowitz trade-off:
//!
//!   maximize  sum(r[i] * a[i])  -  (rho/2) * sum(cov[i][j] * a[i] * a[j])
//!   subject to  sum(a[i]) == wealth
//!
//! Solving that quadratic program is somebody else's job, behind this trait.

use crate::models::{Covariance, Investment};

/// What a solver reports for one problem instance.
#[derive(Debug, Clone)]
pub enum Solution {
    Feasible {
        objective_value: f64,
        total_return: f64,
        total_variance: f64,
        /// One allocation per investment, same order as the input.
        allocations: Vec<f64>,
    },
    Infeasible,
}

pub trait Solver: Send + Sync {
    fn solve(
        &self,
        investments: &[Investment],
        covariance: &Covariance,
        wealth: f64,
        rho: f64,
    ) -> Solution;
}

/// Stand-in solver for local runs and tests.
///
/// Allocates wealth proportionally to expected return and then evaluates
/// the objective at that point. Always feasible for a non-empty problem
/// (the allocations sum to wealth by construction). This is NOT a QP
/// solver and the point it picks is generally not optimal.
pub struct ReferenceSolver;

impl Solver for ReferenceSolver {
    fn solve(
        &self,
        investments: &[Investment],
        covariance: &Covariance,
        wealth: f64,
        rho: f64,
    ) -> Solution {
        if investments.is_empty() || !wealth.is_finite() {
            return Solution::Infeasible;
        }

        // Weight by expected return, clamped at zero so a short position
        // never sneaks in. Fall back to an equal split if nothing is left.
        let weights: Vec<f64> = investments
            .iter()
            .map(|inv| inv.expected_return.max(0.0))
            .collect();
        let total_weight: f64 = weights.iter().sum();
        let n = investments.len() as f64;

        let allocations: Vec<f64> = if total_weight > 0.0 && total_weight.is_finite() {
            weights.iter().map(|w| wealth * w / total_weight).collect()
        } else {
            investments.iter().map(|_| wealth / n).collect()
        };

        let total_return: f64 = investments
            .iter()
            .zip(&allocations)
            .map(|(inv, a)| inv.expected_return * a)
            .sum();

        let mut total_variance = 0.0;
        for (inv_i, a_i) in investments.iter().zip(&allocations) {
            for (inv_j, a_j) in investments.iter().zip(&allocations) {
                total_variance += covariance.get(inv_i.id, inv_j.id) * a_i * a_j;
            }
        }

        let objective_value = total_return - 0.5 * rho * total_variance;

        Solution::Feasible {
            objective_value,
            total_return,
            total_variance,
            allocations,
        }
    }
}
