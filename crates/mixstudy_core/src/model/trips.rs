use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// One vehicle departure between two network edges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub id: String,
    pub vehicle_type: String,
    /// Seconds from simulation start
    pub depart: f64,
    pub from: String,
    pub to: String,
}

/// Trips ordered by ascending departure time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripSet {
    trips: Vec<Trip>,
}

impl TripSet {
    /// Sort trips by departure. The sort is stable so equal departures keep
    /// their generation order.
    pub fn from_unsorted(mut trips: Vec<Trip>) -> Self {
        trips.sort_by(|a, b| a.depart.total_cmp(&b.depart));
        Self { trips }
    }

    pub fn len(&self) -> usize {
        self.trips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trips.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Trip> {
        self.trips.iter()
    }

    pub fn as_slice(&self) -> &[Trip] {
        &self.trips
    }

    /// Number of trips per vehicle type
    pub fn class_counts(&self) -> FxHashMap<&str, usize> {
        let mut counts = FxHashMap::default();
        for trip in &self.trips {
            *counts.entry(trip.vehicle_type.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// First and last departure, `None` when empty
    pub fn departure_span(&self) -> Option<(f64, f64)> {
        Some((self.trips.first()?.depart, self.trips.last()?.depart))
    }
}

impl<'a> IntoIterator for &'a TripSet {
    type Item = &'a Trip;
    type IntoIter = std::slice::Iter<'a, Trip>;

    fn into_iter(self) -> Self::IntoIter {
        self.trips.iter()
    }
}
