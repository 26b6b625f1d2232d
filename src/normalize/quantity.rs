//! Structured electrical quantities and the shared pieces of the
//! description grammars (SI prefixes, tolerance tokens).

use std::fmt;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

/// Base SI unit a [`Quantity`] is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Ohm,
    Farad,
    Henry,
    Volt,
    Ampere,
}

impl Unit {
    /// Returns the unit symbol used when displaying values.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Ohm => "Ω",
            Self::Farad => "F",
            Self::Henry => "H",
            Self::Volt => "V",
            Self::Ampere => "A",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A magnitude in base units with an optional symmetric tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    /// Magnitude in the base unit (ohms, farads, ...), prefixes already applied.
    pub value: f64,
    pub unit: Unit,
    /// Symmetric tolerance in percent, e.g. `5.0` for `±5%`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerance_percent: Option<f64>,
}

impl Quantity {
    #[must_use]
    pub fn new(value: f64, unit: Unit) -> Self {
        Self {
            value,
            unit,
            tolerance_percent: None,
        }
    }

    #[must_use]
    pub fn with_tolerance(mut self, tolerance_percent: Option<f64>) -> Self {
        self.tolerance_percent = tolerance_percent;
        self
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)?;
        if let Some(tolerance) = self.tolerance_percent {
            write!(f, " ±{tolerance}%")?;
        }
        Ok(())
    }
}

/// Ceramic dielectric class in canonical EIA spelling (`C0G`, `X7R`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dielectric(String);

impl Dielectric {
    /// Wraps an already-canonical class code as read back from storage.
    #[must_use]
    pub fn from_code(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Dielectric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[allow(clippy::expect_used)]
static TOLERANCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"±\s?(\d+(?:\.\d+)?)\s?%").expect("tolerance regex is valid") // Static pattern, safe to panic
});

/// Returns the decimal exponent for an SI prefix as written in vendor
/// descriptions. Both micro signs and the ASCII `u` are accepted; `K` is
/// tolerated as kilo because the catalog uses it interchangeably.
pub(crate) fn si_exponent(prefix: &str) -> Option<i32> {
    match prefix {
        "" => Some(0),
        "p" => Some(-12),
        "n" => Some(-9),
        "u" | "µ" | "μ" => Some(-6),
        "m" => Some(-3),
        "k" | "K" => Some(3),
        "M" => Some(6),
        "G" => Some(9),
        _ => None,
    }
}

/// Applies a decimal exponent. Negative exponents divide so that values such
/// as `100n` land on the closest double to `1e-7`.
pub(crate) fn scale(mantissa: f64, exponent: i32) -> f64 {
    if exponent >= 0 {
        mantissa * 10f64.powi(exponent)
    } else {
        mantissa / 10f64.powi(-exponent)
    }
}

/// First `±N%` token in the description.
pub(crate) fn parse_tolerance(description: &str) -> Option<f64> {
    TOLERANCE_PATTERN
        .captures(description)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Converts a `(number)(prefix)` capture pair into a quantity, rejecting
/// prefixes the grammar does not allow for `unit`.
pub(crate) fn quantity_from_captures(caps: &Captures<'_>, unit: Unit) -> Option<Quantity> {
    let mantissa: f64 = caps.get(1)?.as_str().parse().ok()?;
    let prefix = caps.get(2).map_or("", |m| m.as_str());
    let value = scale(mantissa, si_exponent(prefix)?);
    value.is_finite().then(|| Quantity::new(value, unit))
}

/// Scans all matches of `re` and returns the first that converts cleanly.
pub(crate) fn first_quantity(re: &Regex, description: &str, unit: Unit) -> Option<Quantity> {
    re.captures_iter(description)
        .find_map(|caps| quantity_from_captures(&caps, unit))
}
