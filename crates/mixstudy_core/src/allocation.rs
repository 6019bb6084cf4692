//! Exact-sum integer apportionment (largest remainder / Hamilton method).
//!
//! Every ideal share is floored, then the units lost to flooring go one
//! each to the entries with the largest fractional remainders. Ties go to
//! the lower index. The result always sums to the requested total, and
//! each entry differs from its ideal share by less than one unit.

use crate::model::{AllocationVector, ProportionVector};

/// Split `total` vehicles across classes according to `proportions`
pub fn allocate(proportions: &ProportionVector, total: u64) -> AllocationVector {
    let ideal: Vec<f64> = proportions
        .as_slice()
        .iter()
        .map(|p| p * total as f64)
        .collect();
    AllocationVector::new(round_shares(&ideal, total))
}

/// Split `total` across entries proportionally to non-negative `weights`
/// that need not be normalized. Returns `None` when the weights do not sum
/// to a positive finite value.
pub fn apportion(weights: &[f64], total: u64) -> Option<Vec<u64>> {
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return None;
    }
    let sum: f64 = weights.iter().sum();
    if sum <= 0.0 || !sum.is_finite() {
        return None;
    }
    let ideal: Vec<f64> = weights
        .iter()
        .map(|w| w / sum * total as f64)
        .collect();
    Some(round_shares(&ideal, total))
}

/// Round real-valued shares that sum to `total` into integers that sum to
/// `total` exactly
fn round_shares(ideal: &[f64], total: u64) -> Vec<u64> {
    let mut counts: Vec<u64> = ideal.iter().map(|x| x.max(0.0).floor() as u64).collect();
    let remainders: Vec<f64> = ideal
        .iter()
        .zip(&counts)
        .map(|(x, c)| x.max(0.0) - *c as f64)
        .collect();

    // Largest remainder first, lower index first among equals
    let mut order: Vec<usize> = (0..ideal.len()).collect();
    order.sort_by(|&a, &b| remainders[b].total_cmp(&remainders[a]).then(a.cmp(&b)));

    let assigned: u64 = counts.iter().sum();
    if assigned <= total {
        let deficit = (total - assigned) as usize;
        for &i in order.iter().cycle().take(deficit) {
            counts[i] += 1;
        }
    } else {
        // Only reachable through floating-point excess in the shares
        let mut surplus = assigned - total;
        while surplus > 0 {
            for &i in order.iter().rev() {
                if surplus == 0 {
                    break;
                }
                if counts[i] > 0 {
                    counts[i] -= 1;
                    surplus -= 1;
                }
            }
        }
    }

    counts
}
