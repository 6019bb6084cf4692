//! Saltelli cross-sampling over a Sobol base sequence.
//!
//! For `k` factors every base point is a `2k`-dimensional Sobol point split
//! into two halves `A` and `B`. Each base point expands into the rows
//! `A, AB_1..AB_k, [BA_1..BA_k], B`, where `AB_j` is `A` with column `j`
//! taken from `B` and `BA_j` is `B` with column `j` taken from `A`. The
//! `BA` block is only emitted when interaction (second-order) terms are
//! requested.

use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::DesignError;
use crate::model::Factor;

use super::DesignMatrix;
use super::sobol::{MAX_DIMENSIONS, SobolSequence};

/// Settings for the Saltelli design
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Number of base points (N)
    pub base_samples: usize,
    /// Emit the `BA` block needed for second-order indices
    pub second_order: bool,
    /// Leading Sobol points to discard. `None` skips the next power of two
    /// at or above `base_samples`.
    pub skip: Option<u64>,
    /// Apply a random digital shift to the base sequence
    pub scramble: bool,
    /// Seed for the digital shift. When scrambling without a seed the shift
    /// comes from OS entropy and the design is not reproducible.
    pub seed: Option<u64>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            base_samples: 512,
            second_order: true,
            skip: None,
            scramble: false,
            seed: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SaltelliSampler {
    config: SamplerConfig,
}

impl SaltelliSampler {
    pub fn new(config: SamplerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Rows produced per base point
    pub fn rows_per_base_point(&self, factor_count: usize) -> usize {
        if self.config.second_order {
            2 * factor_count + 2
        } else {
            factor_count + 2
        }
    }

    pub fn row_count(&self, factor_count: usize) -> usize {
        self.config.base_samples * self.rows_per_base_point(factor_count)
    }

    fn skip_count(&self) -> u64 {
        self.config
            .skip
            .unwrap_or_else(|| (self.config.base_samples as u64).next_power_of_two())
    }

    /// Build the design matrix, scaling each column onto its factor bounds
    pub fn generate(&self, factors: &[Factor]) -> Result<DesignMatrix, DesignError> {
        let k = factors.len();
        let n = self.config.base_samples;
        if n == 0 {
            return Err(DesignError::InvalidBaseSamples);
        }
        if k == 0 {
            return Err(DesignError::NoFactors);
        }
        if 2 * k > MAX_DIMENSIONS {
            return Err(DesignError::TooManyFactors {
                factors: k,
                dimensions: 2 * k,
                supported: MAX_DIMENSIONS,
            });
        }
        if !n.is_power_of_two() {
            tracing::warn!(
                base_samples = n,
                "base sample size is not a power of two; Sobol balance properties are weakened"
            );
        }

        let mut sequence = SobolSequence::new(2 * k)?;
        if let Some(shift) = self.digital_shift(2 * k) {
            sequence = sequence.with_digital_shift(shift);
        }
        sequence.skip(self.skip_count());

        let scale = |row: Vec<f64>| -> Vec<f64> {
            row.into_iter()
                .zip(factors)
                .map(|(u, factor)| factor.scale(u))
                .collect()
        };

        let mut rows = Vec::with_capacity(self.row_count(k));
        for _ in 0..n {
            let base = sequence.next_point();
            let (a, b) = base.split_at(k);

            rows.push(scale(a.to_vec()));
            for j in 0..k {
                let mut ab = a.to_vec();
                ab[j] = b[j];
                rows.push(scale(ab));
            }
            if self.config.second_order {
                for j in 0..k {
                    let mut ba = b.to_vec();
                    ba[j] = a[j];
                    rows.push(scale(ba));
                }
            }
            rows.push(scale(b.to_vec()));
        }

        tracing::debug!(
            factors = k,
            base_samples = n,
            rows = rows.len(),
            "generated Saltelli design"
        );
        DesignMatrix::new(k, rows)
    }

    fn digital_shift(&self, dimensions: usize) -> Option<Vec<u32>> {
        if !self.config.scramble {
            return None;
        }
        let seed = match self.config.seed {
            Some(seed) => seed,
            None => {
                let seed = rand::rng().next_u64();
                tracing::info!(seed, "design scrambling seeded from entropy; design is not reproducible without this seed");
                seed
            }
        };
        let mut rng = SmallRng::seed_from_u64(seed);
        Some((0..dimensions).map(|_| rng.next_u32()).collect())
    }
}

/// Unscrambled design on the unit hypercube with the default skip
pub fn generate(
    factor_count: usize,
    base_samples: usize,
    second_order: bool,
) -> Result<DesignMatrix, DesignError> {
    let factors: Vec<Factor> = (0..factor_count)
        .map(|i| Factor::new(format!("x{i}")))
        .collect();
    SaltelliSampler::new(SamplerConfig {
        base_samples,
        second_order,
        ..Default::default()
    })
    .generate(&factors)
}
