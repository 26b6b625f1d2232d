//! Resistance values such as `10kΩ`, `4.7 KΩ`, `100mΩ` or `1M ohm`.

use std::sync::LazyLock;

use regex::Regex;

use super::quantity::{Quantity, Unit, first_quantity, parse_tolerance};

#[allow(clippy::expect_used)]
static RESISTANCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d+(?:\.\d+)?)\s?([mkKMG]?)\s?(?:\x{03A9}|\x{2126}|(?i:ohms?\b))")
        .expect("resistance regex is valid") // Static pattern, safe to panic
});

/// Extracts the first resistance token, with the description's tolerance attached.
#[must_use]
pub fn parse_resistance(description: &str) -> Option<Quantity> {
    first_quantity(&RESISTANCE_PATTERN, description, Unit::Ohm)
        .map(|quantity| quantity.with_tolerance(parse_tolerance(description)))
}
