use serde::Serialize;

/// A point on the unit simplex: non-negative entries summing to 1.
///
/// Only constructed through [`crate::design::normalize`] or
/// [`ProportionVector::uniform`], so the invariant holds for every value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ProportionVector(Vec<f64>);

impl ProportionVector {
    /// Tolerance on the entry sum
    pub const TOLERANCE: f64 = 1e-9;

    pub(crate) fn from_normalized(values: Vec<f64>) -> Self {
        debug_assert!(!values.is_empty());
        debug_assert!(values.iter().all(|v| *v >= 0.0));
        debug_assert!((values.iter().sum::<f64>() - 1.0).abs() < Self::TOLERANCE);
        Self(values)
    }

    /// Equal share for each of `n` classes
    pub fn uniform(n: usize) -> Self {
        let n = n.max(1);
        Self(vec![1.0 / n as f64; n])
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.0.get(index).copied()
    }
}

/// Integer vehicle counts per class, summing exactly to the target total
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AllocationVector(Vec<u64>);

impl AllocationVector {
    pub(crate) fn new(counts: Vec<u64>) -> Self {
        Self(counts)
    }

    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<u64> {
        self.0.get(index).copied()
    }
}
