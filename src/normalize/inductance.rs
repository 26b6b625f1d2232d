//! Inductance values such as `10uH`, `2.2 mH` or `47nH`.

use std::sync::LazyLock;

use regex::Regex;

use super::quantity::{Quantity, Unit, first_quantity, parse_tolerance};

#[allow(clippy::expect_used)]
static INDUCTANCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d+(?:\.\d+)?)\s?([pnuµμm]?)H\b").expect("inductance regex is valid") // Static pattern, safe to panic
});

#[must_use]
pub fn parse_inductance(description: &str) -> Option<Quantity> {
    first_quantity(&INDUCTANCE_PATTERN, description, Unit::Henry)
        .map(|quantity| quantity.with_tolerance(parse_tolerance(description)))
}
