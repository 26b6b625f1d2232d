//! The six normalized attributes stored alongside a part.

use serde::{Deserialize, Serialize};

use super::{
    Dielectric, Quantity, parse_capacitance, parse_current, parse_dielectric, parse_inductance,
    parse_resistance, parse_voltage,
};

/// Structured electrical attributes derived from a part description.
///
/// Each field is computed independently; a normalizer that finds nothing
/// leaves only its own field empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartAttributes {
    pub resistance: Option<Quantity>,
    pub capacitance: Option<Quantity>,
    pub inductance: Option<Quantity>,
    pub voltage: Option<Quantity>,
    pub current: Option<Quantity>,
    pub dielectric: Option<Dielectric>,
}

impl PartAttributes {
    /// Runs every normalizer over `description`.
    #[must_use]
    pub fn from_description(description: &str) -> Self {
        Self {
            resistance: parse_resistance(description),
            capacitance: parse_capacitance(description),
            inductance: parse_inductance(description),
            voltage: parse_voltage(description),
            current: parse_current(description),
            dielectric: parse_dielectric(description),
        }
    }

    /// Number of attributes that were recognized.
    #[must_use]
    pub fn recognized_count(&self) -> usize {
        [
            self.resistance.is_some(),
            self.capacitance.is_some(),
            self.inductance.is_some(),
            self.voltage.is_some(),
            self.current.is_some(),
            self.dielectric.is_some(),
        ]
        .into_iter()
        .filter(|present| *present)
        .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recognized_count() == 0
    }
}
