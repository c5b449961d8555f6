//! Validated request parameters identifying a rover resource.
//!
//! `RoverId` is the only parameter that participates in every cache key, so it
//! is the one that must never contain the key delimiter. Sol indices and earth
//! dates are the per-class discriminators.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::error::DomainError;

/// Longest rover identifier accepted from a request path.
pub const MAX_ROVER_ID_LEN: usize = 64;

/// A rover name as used by the upstream API (`curiosity`, `perseverance`, ...).
///
/// Identifiers are lower-cased ASCII alphanumerics, `-` or `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RoverId(String);

impl RoverId {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("rover", "rover must not be empty"));
        }
        if trimmed.len() > MAX_ROVER_ID_LEN {
            return Err(DomainError::validation(
                "rover",
                format!("rover must be at most {MAX_ROVER_ID_LEN} characters"),
            ));
        }
        if let Some(bad) = trimmed
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(DomainError::validation(
                "rover",
                format!("rover contains unsupported character `{bad}`"),
            ));
        }

        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RoverId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Mission day index counted from landing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Sol(u32);

impl Sol {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        raw.trim()
            .parse::<u32>()
            .map(Self)
            .map_err(|err| DomainError::validation("sol", format!("`{raw}` is not a sol: {err}")))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Sol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Calendar date passed through to the upstream provider unvalidated.
///
/// Only emptiness is rejected; the provider decides what a valid date is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct EarthDate(String);

impl EarthDate {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        if raw.trim().is_empty() {
            return Err(DomainError::validation(
                "earth_date",
                "earth date must not be empty",
            ));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EarthDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rover_is_lowercased() {
        let rover = RoverId::parse("Curiosity").expect("valid rover");
        assert_eq!(rover.as_str(), "curiosity");
    }

    #[test]
    fn rover_rejects_key_delimiter() {
        let err = RoverId::parse("curiosity:sol").expect_err("delimiter rejected");
        assert_eq!(err.field(), "rover");
    }

    #[test]
    fn rover_rejects_empty_and_oversized() {
        assert!(RoverId::parse("  ").is_err());
        assert!(RoverId::parse(&"a".repeat(MAX_ROVER_ID_LEN + 1)).is_err());
        assert!(RoverId::parse(&"a".repeat(MAX_ROVER_ID_LEN)).is_ok());
    }

    #[test]
    fn sol_parses_non_negative_integers_only() {
        assert_eq!(Sol::parse("1000").expect("sol").get(), 1000);
        assert!(Sol::parse("abc").is_err());
        assert!(Sol::parse("-1").is_err());
        assert!(Sol::parse("1.5").is_err());
    }

    #[test]
    fn earth_date_is_opaque() {
        let date = EarthDate::parse("2015-6-3").expect("date");
        assert_eq!(date.as_str(), "2015-6-3");
        assert!(EarthDate::parse("").is_err());
    }
}
