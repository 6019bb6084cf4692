use serde::{Deserialize, Serialize};

/// Emission totals accumulated over one simulation run.
///
/// Units are whatever the simulator reports per vehicle and timestep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EmissionSummary {
    pub co2: f64,
    pub co: f64,
    pub hc: f64,
    pub nox: f64,
    pub pmx: f64,
    pub fuel: f64,
}

impl EmissionSummary {
    /// Column names, in table order
    pub const COLUMNS: [&'static str; 6] = ["co2", "co", "hc", "nox", "pmx", "fuel"];

    /// Simulator attribute names, aligned with [`Self::COLUMNS`]
    pub const ATTRIBUTES: [&'static str; 6] = ["CO2", "CO", "HC", "NOx", "PMx", "fuel"];

    pub fn values(&self) -> [f64; 6] {
        [self.co2, self.co, self.hc, self.nox, self.pmx, self.fuel]
    }

    pub fn from_values(values: [f64; 6]) -> Self {
        let [co2, co, hc, nox, pmx, fuel] = values;
        Self {
            co2,
            co,
            hc,
            nox,
            pmx,
            fuel,
        }
    }

    /// Look up a total by column name
    pub fn get(&self, column: &str) -> Option<f64> {
        Self::COLUMNS
            .iter()
            .position(|c| *c == column)
            .map(|i| self.values()[i])
    }

    /// Add one vehicle record, in [`Self::ATTRIBUTES`] order
    pub fn accumulate(&mut self, record: [f64; 6]) {
        self.co2 += record[0];
        self.co += record[1];
        self.hc += record[2];
        self.nox += record[3];
        self.pmx += record[4];
        self.fuel += record[5];
    }
}
