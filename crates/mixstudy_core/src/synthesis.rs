//! Randomized trip generation for one vehicle mix.
//!
//! Each trip gets a uniform departure in `[0, duration]`, a vehicle class,
//! and two distinct edges drawn uniformly from the network. The returned
//! [`TripSet`] is ordered by departure, as the simulator expects.

use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::seq::SliceRandom;
use rand::seq::index;
use serde::{Deserialize, Serialize};

use crate::error::SynthesisError;
use crate::model::{AllocationVector, Trip, TripSet};

/// How vehicle classes are assigned to trips
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassMode {
    /// Independent weighted draws using the proportions as weights
    #[default]
    Weighted,
    /// Exactly the allocated number of trips per class, in shuffled order
    Exact,
}

/// Class source for one synthesis call
#[derive(Debug, Clone, Copy)]
pub enum ClassAssignment<'a> {
    /// Weights need not be normalized; probability of class `i` is
    /// `weights[i] / sum(weights)`
    Weighted(&'a [f64]),
    Exact(&'a AllocationVector),
}

/// Trip generator bound to one network and simulation horizon
#[derive(Debug, Clone)]
pub struct TripSynthesizer {
    vehicle_types: Vec<String>,
    edges: Vec<String>,
    duration: f64,
}

impl TripSynthesizer {
    pub fn new(
        vehicle_types: Vec<String>,
        edges: Vec<String>,
        duration: f64,
    ) -> Result<Self, SynthesisError> {
        if edges.len() < 2 {
            return Err(SynthesisError::InsufficientNetwork { found: edges.len() });
        }
        if !duration.is_finite() || duration < 0.0 {
            return Err(SynthesisError::InvalidDuration(duration));
        }
        Ok(Self {
            vehicle_types,
            edges,
            duration,
        })
    }

    pub fn vehicle_types(&self) -> &[String] {
        &self.vehicle_types
    }

    pub fn edges(&self) -> &[String] {
        &self.edges
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Generate `total` trips
    pub fn synthesize<R: Rng + ?Sized>(
        &self,
        assignment: ClassAssignment<'_>,
        total: u64,
        rng: &mut R,
    ) -> Result<TripSet, SynthesisError> {
        let classes = self.class_sequence(assignment, total, rng)?;

        let trips = classes
            .into_iter()
            .enumerate()
            .map(|(i, class)| {
                let depart = self.draw_departure(rng);
                let pair = index::sample(rng, self.edges.len(), 2);
                let vehicle_type = &self.vehicle_types[class];
                Trip {
                    id: format!("{vehicle_type}_{i}"),
                    vehicle_type: vehicle_type.clone(),
                    depart,
                    from: self.edges[pair.index(0)].clone(),
                    to: self.edges[pair.index(1)].clone(),
                }
            })
            .collect();

        Ok(TripSet::from_unsorted(trips))
    }

    /// Class index for each trip, in generation order
    fn class_sequence<R: Rng + ?Sized>(
        &self,
        assignment: ClassAssignment<'_>,
        total: u64,
        rng: &mut R,
    ) -> Result<Vec<usize>, SynthesisError> {
        let classes = self.vehicle_types.len();
        match assignment {
            ClassAssignment::Weighted(weights) => {
                if weights.len() != classes {
                    return Err(SynthesisError::ClassMismatch {
                        classes,
                        weights: weights.len(),
                    });
                }
                if total == 0 {
                    return Ok(Vec::new());
                }
                let dist = WeightedIndex::new(weights)
                    .map_err(|e| SynthesisError::InvalidWeights(e.to_string()))?;
                Ok((0..total).map(|_| dist.sample(rng)).collect())
            }
            ClassAssignment::Exact(allocation) => {
                if allocation.len() != classes {
                    return Err(SynthesisError::ClassMismatch {
                        classes,
                        weights: allocation.len(),
                    });
                }
                if allocation.total() != total {
                    return Err(SynthesisError::AllocationTotal {
                        allocated: allocation.total(),
                        expected: total,
                    });
                }
                let mut labels: Vec<usize> = allocation
                    .as_slice()
                    .iter()
                    .enumerate()
                    .flat_map(|(class, &count)| std::iter::repeat_n(class, count as usize))
                    .collect();
                labels.shuffle(rng);
                Ok(labels)
            }
        }
    }

    /// Uniform in `[0, duration]`, rounded to centiseconds
    fn draw_departure<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let raw = rng.random_range(0.0..=self.duration);
        ((raw * 100.0).round() / 100.0).clamp(0.0, self.duration)
    }
}
