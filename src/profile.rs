//! Cached wallet intelligence record

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::address::Address;

/// Intelligence profile for one wallet, keyed by address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletProfile {
    pub address: Address,
    /// Entity label from the intelligence service, if any
    pub label: Option<String>,
    /// Cumulative realized profit and loss in USD
    pub pnl_usd: f64,
    /// Label matched the notability marker
    pub is_notable: bool,
    /// Millisecond precision, so stored and returned profiles compare equal
    pub last_updated: DateTime<Utc>,
}

impl WalletProfile {
    /// Profile with no intelligence at all
    pub fn empty(address: Address) -> Self {
        Self {
            address,
            label: None,
            pnl_usd: 0.0,
            is_notable: false,
            last_updated: now_millis(),
        }
    }

    /// Build a profile from whatever the upstream lookups produced
    pub fn from_lookups(
        address: Address,
        pnl_usd: Option<f64>,
        label: Option<String>,
        notability_marker: &str,
    ) -> Self {
        let label = label
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());
        let is_notable = label
            .as_deref()
            .map(|l| is_notable_label(l, notability_marker))
            .unwrap_or(false);

        Self {
            address,
            label,
            pnl_usd: pnl_usd.filter(|p| p.is_finite()).unwrap_or(0.0),
            is_notable,
            last_updated: now_millis(),
        }
    }

    /// Check if profile is older than `max_age`
    pub fn is_stale(&self, max_age: Duration) -> bool {
        Utc::now() - self.last_updated > max_age
    }

    pub fn has_label(&self) -> bool {
        self.label.as_deref().is_some_and(|l| !l.trim().is_empty())
    }
}

/// Case-insensitive substring test against the notability marker
pub fn is_notable_label(label: &str, marker: &str) -> bool {
    label.to_lowercase().contains(&marker.to_lowercase())
}

/// Current time truncated to what the store can represent
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> Address {
        Address::parse("0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa").unwrap()
    }

    #[test]
    fn test_notability_is_case_insensitive() {
        assert!(is_notable_label("Smart Money: 0xabc", "smart money"));
        assert!(is_notable_label("known SMART MONEY trader", "Smart Money"));
        assert!(!is_notable_label("Binance Hot Wallet", "smart money"));
    }

    #[test]
    fn test_from_lookups_defaults() {
        let profile = WalletProfile::from_lookups(addr(), None, None, "smart money");
        assert_eq!(profile.pnl_usd, 0.0);
        assert!(profile.label.is_none());
        assert!(!profile.is_notable);
        assert!(!profile.has_label());
    }

    #[test]
    fn test_from_lookups_blank_label_is_absent() {
        let profile =
            WalletProfile::from_lookups(addr(), Some(f64::NAN), Some("   ".into()), "smart money");
        assert!(profile.label.is_none());
        assert_eq!(profile.pnl_usd, 0.0);
    }

    #[test]
    fn test_from_lookups_marks_notable() {
        let profile = WalletProfile::from_lookups(
            addr(),
            Some(-1250.5),
            Some("Smart Money Whale".into()),
            "smart money",
        );
        assert!(profile.is_notable);
        assert_eq!(profile.pnl_usd, -1250.5);
        assert_eq!(profile.label.as_deref(), Some("Smart Money Whale"));
    }

    #[test]
    fn test_timestamp_has_millisecond_precision() {
        let profile = WalletProfile::empty(addr());
        assert_eq!(profile.last_updated.timestamp_subsec_nanos() % 1_000_000, 0);
    }

    #[test]
    fn test_profile_staleness() {
        let mut profile = WalletProfile::empty(addr());
        profile.last_updated = Utc::now() - Duration::seconds(7200); // 2 hours ago

        assert!(profile.is_stale(Duration::seconds(3600)));
        assert!(!profile.is_stale(Duration::seconds(10800)));
    }
}
