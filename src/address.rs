//! Canonical EVM account addresses
//!
//! Addresses are compared case-insensitively at the boundary and stored
//! lowercase everywhere else, so the string form doubles as a cache key.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Length of a canonical address string, `0x` prefix included
pub const ADDRESS_LEN: usize = 42;

/// Prefix shared by the zero address and most burn sinks
const BURN_PREFIX: &str = "0x0000";

/// Conventional dead-address burn sink
const DEAD_ADDRESS: &str = "0x000000000000000000000000000000000000dead";

lazy_static! {
    static ref ADDRESS_RE: Regex = Regex::new(r"^0x[0-9a-f]{40}$").unwrap();
}

/// A 20-byte account identifier in lowercase hex form
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Parse operator or upstream input into a canonical address
    pub fn parse(input: &str) -> Result<Self> {
        let normalized = input.trim().to_lowercase();
        if normalized.len() != ADDRESS_LEN {
            return Err(Error::InvalidAddress(format!(
                "expected {} characters, got {}",
                ADDRESS_LEN,
                normalized.len()
            )));
        }
        if !ADDRESS_RE.is_match(&normalized) {
            return Err(Error::InvalidAddress(format!(
                "{} is not a 0x-prefixed hex address",
                normalized
            )));
        }
        Ok(Self(normalized))
    }

    /// The zero address
    pub fn zero() -> Self {
        Self(format!("0x{}", "0".repeat(40)))
    }

    /// Check if this is the zero address or a well-known burn sink
    ///
    /// Anything starting with `0x0000` is treated as a burn/system address.
    pub fn is_burn(&self) -> bool {
        self.0.starts_with(BURN_PREFIX) || self.0 == DEAD_ADDRESS
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First characters of the address for log lines and short messages
    pub fn short(&self) -> &str {
        &self.0[..10]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "0x55d398326f99059fF775485246999027B3197955";

    #[test]
    fn test_parse_normalizes_case_and_whitespace() {
        let addr = Address::parse(&format!("  {}\n", TOKEN)).unwrap();
        assert_eq!(addr.as_str(), TOKEN.to_lowercase());
        assert_eq!(addr, Address::parse(&TOKEN.to_lowercase()).unwrap());
    }

    #[test]
    fn test_rejects_wrong_length() {
        let short = &TOKEN[..41];
        assert!(matches!(
            Address::parse(short),
            Err(Error::InvalidAddress(_))
        ));
        assert!(Address::parse(&format!("{}0", TOKEN)).is_err());
    }

    #[test]
    fn test_rejects_bad_syntax() {
        // right length, missing prefix
        assert!(Address::parse("1x55d398326f99059ff775485246999027b3197955").is_err());
        // right length, non-hex digit
        assert!(Address::parse("0x55d398326f99059ff775485246999027b319795g").is_err());
    }

    #[test]
    fn test_burn_detection() {
        assert!(Address::zero().is_burn());
        assert!(Address::parse(DEAD_ADDRESS).unwrap().is_burn());
        assert!(Address::parse("0x0000000000000000000000000000000000001004")
            .unwrap()
            .is_burn());
        assert!(!Address::parse(TOKEN).unwrap().is_burn());
    }

    #[test]
    fn test_serde_roundtrip_validates() {
        let addr = Address::parse(TOKEN).unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", TOKEN.to_lowercase()));

        let bad: std::result::Result<Address, _> = serde_json::from_str("\"0x1234\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_short() {
        let addr = Address::parse(TOKEN).unwrap();
        assert_eq!(addr.short(), "0x55d39832");
    }
}
