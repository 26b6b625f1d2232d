//! Voltage ratings such as `50V`, `6.3V` or `1kV`.

use std::sync::LazyLock;

use regex::Regex;

use super::quantity::{Quantity, Unit, first_quantity};

#[allow(clippy::expect_used)]
static VOLTAGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d+(?:\.\d+)?)\s?([mkK]?)V\b").expect("voltage regex is valid") // Static pattern, safe to panic
});

/// Ratings carry no tolerance; `±N%` in the text belongs to the primary value.
#[must_use]
pub fn parse_voltage(description: &str) -> Option<Quantity> {
    first_quantity(&VOLTAGE_PATTERN, description, Unit::Volt)
}
