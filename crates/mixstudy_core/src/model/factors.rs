use serde::{Deserialize, Serialize};

/// A continuous study variable, one per vehicle class.
///
/// `name` labels the factor in design and results tables; `vehicle_type`
/// is the simulator's vehicle type id used in route files and defaults to
/// the name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_type: Option<String>,
    #[serde(default)]
    pub lower: f64,
    #[serde(default = "default_upper")]
    pub upper: f64,
}

fn default_upper() -> f64 {
    1.0
}

impl Factor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vehicle_type: None,
            lower: 0.0,
            upper: 1.0,
        }
    }

    pub fn with_vehicle_type(mut self, vehicle_type: impl Into<String>) -> Self {
        self.vehicle_type = Some(vehicle_type.into());
        self
    }

    /// Vehicle type id written into route files
    pub fn vehicle_type_id(&self) -> &str {
        self.vehicle_type.as_deref().unwrap_or(&self.name)
    }

    /// Map a unit-interval sample onto this factor's bounds
    pub fn scale(&self, unit: f64) -> f64 {
        self.lower + unit * (self.upper - self.lower)
    }
}

/// The four vehicle classes of the default study
pub fn default_factors() -> Vec<Factor> {
    ["car", "bus", "scooter", "bike"]
        .into_iter()
        .map(Factor::new)
        .collect()
}

pub fn factor_names(factors: &[Factor]) -> Vec<String> {
    factors.iter().map(|f| f.name.clone()).collect()
}

pub fn vehicle_types(factors: &[Factor]) -> Vec<String> {
    factors
        .iter()
        .map(|f| f.vehicle_type_id().to_string())
        .collect()
}
