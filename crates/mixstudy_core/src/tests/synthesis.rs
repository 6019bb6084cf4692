//! Tests for trip synthesis
//!
//! These tests verify:
//! - Exactly `total` trips with unique ids and distinct endpoints
//! - Departures fall inside the horizon and come out sorted
//! - Weighted draws converge on the proportions; exact mode matches counts

use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::allocation::allocate;
use crate::design::normalize;
use crate::synthesis::{ClassAssignment, TripSynthesizer};

const TYPES: [&str; 4] = ["car", "bus", "scooter", "bike"];

fn synthesizer(duration: f64) -> TripSynthesizer {
    TripSynthesizer::new(
        TYPES.map(String::from).to_vec(),
        ["E0", "E1", "E2", "E3", "E4"].map(String::from).to_vec(),
        duration,
    )
    .unwrap()
}

#[test]
fn test_trip_set_shape() {
    let synth = synthesizer(3600.0);
    let mut rng = SmallRng::seed_from_u64(42);
    let trips = synth
        .synthesize(ClassAssignment::Weighted(&[0.4, 0.1, 0.3, 0.2]), 500, &mut rng)
        .unwrap();

    assert_eq!(trips.len(), 500);

    let mut ids: Vec<&str> = trips.iter().map(|t| t.id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 500, "trip ids must be unique");

    for trip in &trips {
        assert_ne!(trip.from, trip.to);
        assert!(synth.edges().contains(&trip.from));
        assert!(synth.edges().contains(&trip.to));
        assert!((0.0..=3600.0).contains(&trip.depart));
        assert!(TYPES.contains(&trip.vehicle_type.as_str()));
    }

    let departs: Vec<f64> = trips.iter().map(|t| t.depart).collect();
    assert!(departs.windows(2).all(|w| w[0] <= w[1]), "departures not sorted");
    let (first, last) = trips.departure_span().unwrap();
    assert!(first <= last);
}

#[test]
fn test_same_seed_same_trips() {
    let synth = synthesizer(600.0);
    let weights = [0.25; 4];
    let a = synth
        .synthesize(ClassAssignment::Weighted(&weights), 50, &mut SmallRng::seed_from_u64(9))
        .unwrap();
    let b = synth
        .synthesize(ClassAssignment::Weighted(&weights), 50, &mut SmallRng::seed_from_u64(9))
        .unwrap();
    let c = synth
        .synthesize(ClassAssignment::Weighted(&weights), 50, &mut SmallRng::seed_from_u64(10))
        .unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn test_weighted_frequencies_converge() {
    let synth = synthesizer(3600.0);
    let weights = [0.1, 0.2, 0.3, 0.4];
    let total = 40_000;
    let trips = synth
        .synthesize(ClassAssignment::Weighted(&weights), total, &mut SmallRng::seed_from_u64(2024))
        .unwrap();

    let counts = trips.class_counts();
    for (name, weight) in TYPES.iter().zip(weights) {
        let share = counts.get(name).copied().unwrap_or(0) as f64 / total as f64;
        assert!(
            (share - weight).abs() < 0.015,
            "{name}: share {share:.4}, expected {weight}"
        );
    }
}

#[test]
fn test_zero_weight_class_never_drawn() {
    let synth = synthesizer(100.0);
    let trips = synth
        .synthesize(ClassAssignment::Weighted(&[1.0, 0.0, 0.0, 3.0]), 1000, &mut SmallRng::seed_from_u64(5))
        .unwrap();
    let counts = trips.class_counts();
    assert!(!counts.contains_key("bus"));
    assert!(!counts.contains_key("scooter"));
}

#[test]
fn test_exact_mode_matches_allocation() {
    let synth = synthesizer(3600.0);
    let proportions = normalize(&[0.613, 0.072, 0.158, 0.157]).unwrap();
    let allocation = allocate(&proportions, 1000);

    let trips = synth
        .synthesize(ClassAssignment::Exact(&allocation), 1000, &mut SmallRng::seed_from_u64(1))
        .unwrap();

    let counts = trips.class_counts();
    for (name, expected) in TYPES.iter().zip(allocation.as_slice()) {
        assert_eq!(counts.get(name).copied().unwrap_or(0) as u64, *expected, "{name}");
    }
}

#[test]
fn test_exact_mode_rejects_wrong_total() {
    let synth = synthesizer(100.0);
    let allocation = allocate(&normalize(&[1.0, 1.0, 1.0, 1.0]).unwrap(), 8);
    let err = synth
        .synthesize(ClassAssignment::Exact(&allocation), 10, &mut SmallRng::seed_from_u64(1))
        .unwrap_err();
    assert_eq!(err.to_string(), "allocation sums to 8, expected 10 trips");
}
