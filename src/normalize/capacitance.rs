//! Capacitance values such as `100nF`, `4.7uF` or `22pF`.

use std::sync::LazyLock;

use regex::Regex;

use super::quantity::{Quantity, Unit, first_quantity, parse_tolerance};

#[allow(clippy::expect_used)]
static CAPACITANCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d+(?:\.\d+)?)\s?([pnuµμm]?)F\b").expect("capacitance regex is valid") // Static pattern, safe to panic
});

#[must_use]
pub fn parse_capacitance(description: &str) -> Option<Quantity> {
    first_quantity(&CAPACITANCE_PATTERN, description, Unit::Farad)
        .map(|quantity| quantity.with_tolerance(parse_tolerance(description)))
}
