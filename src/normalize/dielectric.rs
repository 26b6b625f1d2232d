//! Ceramic dielectric classes (`X7R`, `C0G`, `Y5V`, ...).

use std::sync::LazyLock;

use regex::Regex;

use super::quantity::Dielectric;

#[allow(clippy::expect_used)]
static DIELECTRIC_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(C0G|COG|NP0|NPO|X5R|X6S|X6T|X7R|X7S|X7T|X8R|X8L|Y5V|Z5U|U2J)\b")
        .expect("dielectric regex is valid") // Static pattern, safe to panic
});

/// Returns the canonical class. `NP0`, `COG` and `NPO` all name C0G.
#[must_use]
pub fn parse_dielectric(description: &str) -> Option<Dielectric> {
    let code = DIELECTRIC_PATTERN
        .captures(description)?
        .get(1)?
        .as_str()
        .to_ascii_uppercase();

    let canonical = match code.as_str() {
        "COG" | "NP0" | "NPO" => "C0G".to_string(),
        _ => code,
    };
    Some(Dielectric::from_code(canonical))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dielectric_x7r() {
        assert_eq!(
            parse_dielectric("100nF ±10% 50V X7R 0603").unwrap().as_str(),
            "X7R"
        );
    }

    #[test]
    fn test_parse_dielectric_aliases_canonicalize_to_c0g() {
        for description in ["22pF 50V NP0", "22pF 50V COG", "22pF 50V c0g"] {
            assert_eq!(parse_dielectric(description).unwrap().as_str(), "C0G");
        }
    }

    #[test]
    fn test_parse_dielectric_absent_returns_none() {
        assert!(parse_dielectric("10kΩ ±1% 0402").is_none());
    }
}
