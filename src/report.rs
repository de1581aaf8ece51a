//! Scoring and report building
//!
//! Every enriched candidate is tested against three predicates in order:
//! notable actor, high profit, labeled. The first match becomes the entry's
//! reason; candidates matching none are dropped.

use serde::Serialize;
use std::fmt;

use crate::address::Address;
use crate::config::{RankingOrder, ScoringConfig};
use crate::profile::WalletProfile;

/// Why a wallet made it into the report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MatchReason {
    NotableActor,
    HighProfit(f64),
    Labeled(String),
}

impl MatchReason {
    /// Ranking tier under [`RankingOrder::ReasonThenPnl`]
    fn tier(&self) -> u8 {
        match self {
            Self::NotableActor => 0,
            Self::HighProfit(_) => 1,
            Self::Labeled(_) => 2,
        }
    }
}

impl fmt::Display for MatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotableActor => write!(f, "Notable actor"),
            Self::HighProfit(pnl) => write!(f, "High profit: ${}", format_usd(*pnl)),
            Self::Labeled(label) => write!(f, "Labeled: {}", label),
        }
    }
}

/// First predicate the profile satisfies, if any
pub fn classify(profile: &WalletProfile, min_pnl_usd: f64) -> Option<MatchReason> {
    if profile.is_notable {
        return Some(MatchReason::NotableActor);
    }
    if profile.pnl_usd >= min_pnl_usd {
        return Some(MatchReason::HighProfit(profile.pnl_usd));
    }
    match profile.label.as_deref().map(str::trim) {
        Some(label) if !label.is_empty() => Some(MatchReason::Labeled(label.to_string())),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    pub profile: WalletProfile,
    pub reason: MatchReason,
}

/// Final result of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub token: Address,
    /// Number of candidates that went through enrichment
    pub candidates_checked: usize,
    /// Survivors, already ranked
    pub entries: Vec<ReportEntry>,
    pub ranking: RankingOrder,
}

impl AnalysisReport {
    /// Score enriched profiles and rank the survivors
    pub fn build(token: Address, profiles: Vec<WalletProfile>, scoring: &ScoringConfig) -> Self {
        let candidates_checked = profiles.len();
        let mut entries: Vec<ReportEntry> = profiles
            .into_iter()
            .filter_map(|profile| {
                classify(&profile, scoring.min_pnl_usd).map(|reason| ReportEntry { profile, reason })
            })
            .collect();

        // sort_by is stable; ties keep candidate order
        match scoring.ranking {
            RankingOrder::PnlDesc => {
                entries.sort_by(|a, b| b.profile.pnl_usd.total_cmp(&a.profile.pnl_usd))
            }
            RankingOrder::ReasonThenPnl => entries.sort_by(|a, b| {
                a.reason
                    .tier()
                    .cmp(&b.reason.tier())
                    .then_with(|| b.profile.pnl_usd.total_cmp(&a.profile.pnl_usd))
            }),
        }

        Self {
            token,
            candidates_checked,
            entries,
            ranking: scoring.ranking,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn headline(&self) -> String {
        format!(
            "{} notable wallets out of {} checked",
            self.entries.len(),
            self.candidates_checked
        )
    }

    /// Plain-text rendering; `explorer_url` has an `{address}` placeholder
    pub fn render(&self, explorer_url: &str) -> String {
        let mut out = format!("{}\nToken: {}\n", self.headline(), self.token);

        if self.entries.is_empty() {
            out.push_str("\nNo notable wallets found.\n");
            return out;
        }

        out.push_str(&format!("Ranked by: {}\n", self.ranking.describe()));
        for (i, entry) in self.entries.iter().enumerate() {
            let address = entry.profile.address.as_str();
            out.push_str(&format!(
                "\n{}. {}\n   {}\n   Reason: {}\n",
                i + 1,
                address,
                explorer_url.replace("{address}", address),
                entry.reason
            ));
        }
        out
    }
}

/// Whole dollars with thousands separators, sign preserved
fn format_usd(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPLORER: &str = "https://bscscan.com/address/{address}";

    fn token() -> Address {
        Address::parse("0x55d398326f99059ff775485246999027b3197955").unwrap()
    }

    fn profile(n: u64, pnl: f64, label: Option<&str>, notable: bool) -> WalletProfile {
        let mut p = WalletProfile::empty(Address::parse(&format!("0xc{:039x}", n)).unwrap());
        p.pnl_usd = pnl;
        p.label = label.map(String::from);
        p.is_notable = notable;
        p
    }

    fn scoring(ranking: RankingOrder) -> ScoringConfig {
        ScoringConfig {
            ranking,
            ..Default::default()
        }
    }

    #[test]
    fn test_first_matching_predicate_wins() {
        let both = profile(1, 500_000.0, Some("Smart Money"), true);
        assert_eq!(classify(&both, 100_000.0), Some(MatchReason::NotableActor));

        let rich_labeled = profile(2, 100_000.0, Some("Fund"), false);
        assert_eq!(
            classify(&rich_labeled, 100_000.0),
            Some(MatchReason::HighProfit(100_000.0))
        );

        let labeled = profile(3, 10.0, Some("Fund"), false);
        assert_eq!(classify(&labeled, 100_000.0), Some(MatchReason::Labeled("Fund".into())));

        let nobody = profile(4, 99_999.99, None, false);
        assert_eq!(classify(&nobody, 100_000.0), None);
    }

    #[test]
    fn test_pnl_desc_is_monotonic_and_stable() {
        let profiles = vec![
            profile(1, 10.0, Some("first labeled"), false),
            profile(2, 200_000.0, None, false),
            profile(3, 10.0, Some("second labeled"), false),
            profile(4, 0.0, None, false),
            profile(5, 50.0, Some("Smart Money"), true),
        ];
        let report = AnalysisReport::build(token(), profiles, &scoring(RankingOrder::PnlDesc));

        assert_eq!(report.candidates_checked, 5);
        assert_eq!(report.entries.len(), 4);
        let pnls: Vec<f64> = report.entries.iter().map(|e| e.profile.pnl_usd).collect();
        assert!(pnls.windows(2).all(|w| w[0] >= w[1]));

        // equal PnL keeps candidate order
        assert_eq!(report.entries[2].reason, MatchReason::Labeled("first labeled".into()));
        assert_eq!(report.entries[3].reason, MatchReason::Labeled("second labeled".into()));
    }

    #[test]
    fn test_reason_then_pnl_ranks_notable_first() {
        let profiles = vec![
            profile(1, 900_000.0, None, false),
            profile(2, 5.0, Some("Labeled whale"), false),
            profile(3, 1_000.0, Some("Smart Money Trader"), true),
        ];
        let report =
            AnalysisReport::build(token(), profiles, &scoring(RankingOrder::ReasonThenPnl));

        let reasons: Vec<u8> = report.entries.iter().map(|e| e.reason.tier()).collect();
        assert_eq!(reasons, vec![0, 1, 2]);
    }

    #[test]
    fn test_render_empty_report() {
        let profiles = (0..3).map(|i| profile(i, 0.0, None, false)).collect();
        let report = AnalysisReport::build(token(), profiles, &scoring(RankingOrder::PnlDesc));
        let text = report.render(EXPLORER);

        assert!(report.is_empty());
        assert!(text.starts_with("0 notable wallets out of 3 checked"));
        assert!(text.contains("No notable wallets found"));
    }

    #[test]
    fn test_render_entries_with_links() {
        let wallet = profile(7, 250_000.0, None, false);
        let address = wallet.address.to_string();
        let report = AnalysisReport::build(token(), vec![wallet], &scoring(RankingOrder::PnlDesc));
        let text = report.render(EXPLORER);

        assert!(text.starts_with("1 notable wallets out of 1 checked"));
        assert!(text.contains(&format!("https://bscscan.com/address/{}", address)));
        assert!(text.contains("Reason: High profit: $250,000"));
        assert!(!text.contains('*') && !text.contains('<'));
    }

    #[test]
    fn test_render_states_active_ranking() {
        let notable = profile(1, 1_000.0, Some("Smart Money: Early"), true);
        let rich = profile(2, 250_000.0, None, false);
        let (notable_addr, rich_addr) = (notable.address.to_string(), rich.address.to_string());

        let report = AnalysisReport::build(
            token(),
            vec![notable.clone(), rich.clone()],
            &scoring(RankingOrder::PnlDesc),
        );
        let text = report.render(EXPLORER);
        assert!(text.contains("Ranked by: profit/loss, highest first"));
        assert!(text.contains(&format!("1. {}", rich_addr)));
        assert!(text.contains(&format!("2. {}", notable_addr)));

        let report =
            AnalysisReport::build(token(), vec![notable, rich], &scoring(RankingOrder::ReasonThenPnl));
        let text = report.render(EXPLORER);
        assert!(text.contains("Ranked by: notable, then high profit, then labeled"));
        assert!(text.contains(&format!("1. {}", notable_addr)));
    }

    #[test]
    fn test_empty_report_omits_ranking_line() {
        let report = AnalysisReport::build(token(), vec![], &scoring(RankingOrder::PnlDesc));
        assert_eq!(report.ranking, RankingOrder::PnlDesc);
        assert!(!report.render(EXPLORER).contains("Ranked by"));
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(0.0), "0");
        assert_eq!(format_usd(999.4), "999");
        assert_eq!(format_usd(1_234_567.8), "1,234,568");
        assert_eq!(format_usd(-100_000.0), "-100,000");
    }
}
