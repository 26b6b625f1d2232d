//! Current ratings such as `2A`, `500mA` or `100uA`.

use std::sync::LazyLock;

use regex::Regex;

use super::quantity::{Quantity, Unit, first_quantity};

#[allow(clippy::expect_used)]
static CURRENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d+(?:\.\d+)?)\s?([nuµμmk]?)A\b").expect("current regex is valid") // Static pattern, safe to panic
});

#[must_use]
pub fn parse_current(description: &str) -> Option<Quantity> {
    first_quantity(&CURRENT_PATTERN, description, Unit::Ampere)
}
