use super::covariance::Covariance;
use super::investment::Investment;

/// Input message for the portfolio service.
///
/// Carries everything the service needs to compute one optimal allocation:
/// the investments (in declaration order - NOT sorted by id), the covariance
/// matrix, the wealth to allocate and the risk-aversion factor rho.
///
/// The model itself does no validation. Pairwise covariance completeness is
/// checked by the sweep engine before anything is submitted.
#[derive(Debug, Clone)]
pub struct Input {
    pub investments: Vec<Investment>,
    pub covariance: Covariance,
    pub wealth: f64,
    pub rho: f64,
}

impl Input {
    pub fn new(investments: Vec<Investment>, covariance: Covariance, wealth: f64, rho: f64) -> Self {
        Self {
            investments,
            covariance,
            wealth,
            rho,
        }
    }

    /// Derive the variant for one sweep point: same problem, different rho.
    pub fn with_rho(&self, rho: f64) -> Self {
        let mut variant = self.clone();
        variant.rho = rho;
        variant
    }
}

impl Default for Input {
    fn default() -> Self {
        Self {
            investments: Vec::new(),
            covariance: Covariance::new(),
            wealth: f64::NAN,
            rho: f64::NAN,
        }
    }
}

/// Output message from the portfolio service.
///
/// Either an optimal allocation, or `optimal == false` meaning no feasible
/// allocation was found. In the infeasible case all scalar results are NaN
/// and the investment list is empty.
#[derive(Debug, Clone)]
pub struct Output {
    pub optimal: bool,
    pub wealth: f64,
    pub rho: f64,
    pub objective_value: f64,
    pub total_return: f64,
    pub total_variance: f64,
    pub investments: Vec<Investment>,
}

impl Default for Output {
    fn default() -> Self {
        Self {
            optimal: false,
            wealth: f64::NAN,
            rho: f64::NAN,
            objective_value: f64::NAN,
            total_return: f64::NAN,
            total_variance: f64::NAN,
            investments: Vec::new(),
        }
    }
}

impl Output {
    /// The infeasible result for a given problem: rho and wealth are echoed,
    /// everything else stays at the NaN/empty defaults.
    pub fn infeasible(wealth: f64, rho: f64) -> Self {
        Self {
            wealth,
            rho,
            ..Self::default()
        }
    }
}
