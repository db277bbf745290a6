//! Link latency parsing utilities.
//!
//! Latencies are written the way the simulation framework expects them
//! ("1ns", "100ps", "2us") and stored internally as whole picoseconds.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Match: "1ns", "2.5 us", "100ps"
static LATENCY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+(?:\.\d+)?)\s*(ps|ns|us|ms|s)$").expect("Invalid latency regex")
});

/// Units from largest to smallest with their size in picoseconds
const UNITS: [(&str, u64); 5] = [
    ("s", 1_000_000_000_000),
    ("ms", 1_000_000_000),
    ("us", 1_000_000),
    ("ns", 1_000),
    ("ps", 1),
];

/// Errors that can occur while parsing a latency string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LatencyError {
    #[error("Invalid latency '{value}', expected a number followed by ps, ns, us, ms or s")]
    Malformed { value: String },

    #[error("Latency '{value}' is not a whole number of picoseconds")]
    SubPicosecond { value: String },
}

/// A link latency in picoseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Latency {
    picoseconds: u64,
}

impl Latency {
    pub const fn from_picos(picoseconds: u64) -> Self {
        Self { picoseconds }
    }

    pub const fn from_nanos(nanoseconds: u64) -> Self {
        Self { picoseconds: nanoseconds * 1_000 }
    }

    pub fn as_picos(&self) -> u64 {
        self.picoseconds
    }
}

/// Parse a latency string such as "1ns" or "100ps" into picoseconds
///
/// # Examples
/// ```
/// use treenet::utils::latency::parse_latency_to_picos;
///
/// assert_eq!(parse_latency_to_picos("1ns"), Ok(1_000));
/// assert_eq!(parse_latency_to_picos("100ps"), Ok(100));
/// assert_eq!(parse_latency_to_picos("2.5us"), Ok(2_500_000));
/// assert!(parse_latency_to_picos("fast").is_err());
/// ```
pub fn parse_latency_to_picos(value: &str) -> Result<u64, LatencyError> {
    let trimmed = value.trim();
    let caps = LATENCY_PATTERN
        .captures(trimmed)
        .ok_or_else(|| LatencyError::Malformed { value: value.to_string() })?;

    let number = &caps[1];
    let unit = &caps[2];
    let scale = UNITS
        .iter()
        .find(|(name, _)| *name == unit)
        .map(|(_, scale)| *scale)
        .ok_or_else(|| LatencyError::Malformed { value: value.to_string() })?;

    let (whole, fraction) = match number.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (number, ""),
    };

    let malformed = || LatencyError::Malformed { value: value.to_string() };
    let whole: u64 = whole.parse().map_err(|_| malformed())?;
    let mut picos = whole.checked_mul(scale).ok_or_else(malformed)?;

    // Each fractional digit is worth a tenth of the previous place
    let mut place = scale;
    for digit in fraction.chars() {
        let digit = u64::from(digit.to_digit(10).ok_or_else(malformed)?);
        if place % 10 != 0 {
            if digit != 0 {
                return Err(LatencyError::SubPicosecond { value: value.to_string() });
            }
            continue;
        }
        place /= 10;
        picos = picos.checked_add(digit * place).ok_or_else(malformed)?;
    }

    Ok(picos)
}

impl FromStr for Latency {
    type Err = LatencyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        parse_latency_to_picos(value).map(Self::from_picos)
    }
}

impl TryFrom<String> for Latency {
    type Error = LatencyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Latency> for String {
    fn from(latency: Latency) -> Self {
        latency.to_string()
    }
}

impl fmt::Display for Latency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.picoseconds == 0 {
            return write!(f, "0ps");
        }
        for (unit, scale) in UNITS {
            if self.picoseconds % scale == 0 {
                return write!(f, "{}{}", self.picoseconds / scale, unit);
            }
        }
        write!(f, "{}ps", self.picoseconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_latency_to_picos("100ps"), Ok(100));
        assert_eq!(parse_latency_to_picos("1ns"), Ok(1_000));
        assert_eq!(parse_latency_to_picos("5us"), Ok(5_000_000));
        assert_eq!(parse_latency_to_picos("2ms"), Ok(2_000_000_000));
        assert_eq!(parse_latency_to_picos("1s"), Ok(1_000_000_000_000));
        assert_eq!(parse_latency_to_picos(" 2 ns "), Ok(2_000));
    }

    #[test]
    fn test_parse_fractional() {
        assert_eq!(parse_latency_to_picos("0.5ns"), Ok(500));
        assert_eq!(parse_latency_to_picos("1.25us"), Ok(1_250_000));
        assert_eq!(parse_latency_to_picos("1.0ps"), Ok(1));
        assert!(matches!(
            parse_latency_to_picos("1.5ps"),
            Err(LatencyError::SubPicosecond { .. })
        ));
    }

    #[test]
    fn test_parse_invalid() {
        for bad in ["", "ns", "1", "1 GHz", "-1ns", "1.ns", "1nsec"] {
            assert!(parse_latency_to_picos(bad).is_err(), "'{}' should not parse", bad);
        }
    }

    #[test]
    fn test_display_picks_largest_exact_unit() {
        assert_eq!(Latency::from_picos(1_000).to_string(), "1ns");
        assert_eq!(Latency::from_picos(1_500).to_string(), "1500ps");
        assert_eq!(Latency::from_picos(5_000_000).to_string(), "5us");
        assert_eq!(Latency::from_picos(0).to_string(), "0ps");
        assert_eq!(Latency::from_nanos(2).to_string(), "2ns");
    }

    #[test]
    fn test_serde_as_string() {
        let latency: Latency = serde_yaml::from_str("\"2ns\"").unwrap();
        assert_eq!(latency, Latency::from_nanos(2));
        assert_eq!(serde_json::to_string(&latency).unwrap(), "\"2ns\"");
        assert!(serde_yaml::from_str::<Latency>("\"later\"").is_err());
    }
}
