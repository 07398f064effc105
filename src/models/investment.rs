/// A single investment option.
///
/// Used both as input to the optimization service (allocation is NaN,
/// meaning "not yet computed") and as output (allocation is the amount of
/// this investment in the optimal portfolio).
///
/// The `id` is the unique key within a problem instance. The `name` is for
/// display only - never use it for lookups.
#[derive(Debug, Clone)]
pub struct Investment {
    pub id: i64,
    pub name: String,
    pub expected_return: f64,
    pub allocation: f64,
}

impl Investment {
    pub fn new(id: i64, name: impl Into<String>, expected_return: f64) -> Self {
        Self {
            id,
            name: name.into(),
            expected_return,
            allocation: f64::NAN,
        }
    }
}

impl Default for Investment {
    // The reset state: sentinel id, NaN numerics.
    fn default() -> Self {
        Self {
            id: -1,
            name: String::new(),
            expected_return: f64::NAN,
            allocation: f64::NAN,
        }
    }
}
