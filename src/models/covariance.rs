use std::collections::BTreeMap;

/// Sparse symmetric covariance matrix, indexed by pairs of investment ids.
///
/// Only one of (i,j) and (j,i) is ever stored: keys are canonicalized to
/// (min, max) on every set AND every get, so `get(i, j) == get(j, i)` holds
/// by construction. No other code may bypass this canonicalization.
///
/// A missing entry means "undefined" and is reported as NaN. That is NOT the
/// same as a stored covariance of 0.0.
#[derive(Debug, Clone, Default)]
pub struct Covariance {
    // BTreeMap keeps triples sorted by (lo, hi), which makes the wire
    // encoding deterministic.
    map: BTreeMap<(i64, i64), f64>,
}

// Canonical key: unordered pair -> ordered pair.
fn key(i1: i64, i2: i64) -> (i64, i64) {
    if i1 > i2 { (i2, i1) } else { (i1, i2) }
}

impl Covariance {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the covariance for a pair of investments. Order does not matter.
    pub fn set(&mut self, i1: i64, i2: i64, covariance: f64) {
        self.map.insert(key(i1, i2), covariance);
    }

    /// Look up the covariance for a pair of investments. Order does not
    /// matter. Returns NaN if no value is stored for the pair.
    pub fn get(&self, i1: i64, i2: i64) -> f64 {
        self.map.get(&key(i1, i2)).copied().unwrap_or(f64::NAN)
    }

    /// Delete all entries.
    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Remove every entry that involves the investment identified by `id`.
    pub fn remove(&mut self, id: i64) {
        self.map.retain(|&(lo, hi), _| lo != id && hi != id);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate the stored triples as (lo, hi, value) with lo <= hi,
    /// sorted by (lo, hi).
    pub fn triples(&self) -> impl Iterator<Item = (i64, i64, f64)> + '_ {
        self.map.iter().map(|(&(lo, hi), &v)| (lo, hi, v))
    }
}
