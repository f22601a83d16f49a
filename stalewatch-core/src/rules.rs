//! Shared classification rules: price tolerance, thresholds, risk tiers.
//!
//! Detection and validation both compare prices through [`same_price`] and
//! measure frozen feeds through [`longest_same_price_run`]. Keeping the
//! tolerance in one place means the two stages cannot drift apart.
//!
//! Risk assignment is an ordered rule table ([`RISK_RULES`]): the first rule
//! whose predicate matches decides the tier, everything else is `LOW`.

use serde::{Deserialize, Serialize};

/// Two closes closer than this are treated as the same price.
///
/// Adjusted prices carry rounding noise, so exact equality is never used.
pub const PRICE_TOLERANCE: f64 = 0.0001;

/// Float-equality-with-epsilon test used everywhere a "same price" decision is made.
#[inline]
pub fn same_price(a: f64, b: f64) -> bool {
    (a - b).abs() < PRICE_TOLERANCE
}

/// A run of adjacent observations sharing the same close (within tolerance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PriceRun {
    /// Index of the first observation in the run.
    pub start: usize,
    /// Number of observations in the run.
    pub len: usize,
}

/// Longest run of adjacent same-price closes, scanning oldest → newest.
///
/// Ties on length keep the first maximal run found. An empty slice yields a
/// zero-length run; any non-empty slice yields at least 1.
pub fn longest_same_price_run(closes: &[f64]) -> PriceRun {
    if closes.is_empty() {
        return PriceRun::default();
    }

    let mut best = PriceRun { start: 0, len: 1 };
    let mut current_start = 0;
    let mut current_len = 1;

    for i in 1..closes.len() {
        if same_price(closes[i], closes[i - 1]) {
            current_len += 1;
            if current_len > best.len {
                best = PriceRun {
                    start: current_start,
                    len: current_len,
                };
            }
        } else {
            current_start = i;
            current_len = 1;
        }
    }

    best
}

/// Configurable thresholds shared by detection, validation and reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Latest close below this is a penny stock.
    pub penny_price: f64,
    /// Latest close below this is an extreme penny stock (implies penny).
    pub extreme_penny_price: f64,
    /// Latest close below this is treated as delisted by validation.
    pub delisted_price: f64,
    /// Average daily volume below this counts as low volume.
    pub low_volume: f64,
    /// Same-price run length at which a symbol is stale.
    pub stale_days: usize,
    /// Zero-volume days in the validation window that mean SUSPENDED.
    pub suspended_zero_volume_days: usize,
    /// Same-price run length that validation labels SUSPICIOUS.
    pub suspicious_run_days: usize,
    /// Same-price run length that validation labels MONITOR.
    pub monitor_run_days: usize,
    /// Zero-volume days in the detection window that force HIGH risk.
    pub zero_volume_alert_days: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            penny_price: 1.00,
            extreme_penny_price: 0.01,
            delisted_price: 0.001,
            low_volume: 10_000.0,
            stale_days: 3,
            suspended_zero_volume_days: 5,
            suspicious_run_days: 10,
            monitor_run_days: 3,
            zero_volume_alert_days: 2,
        }
    }
}

/// Three-level severity. Declaration order is the sort order: HIGH first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskTier {
    High,
    Medium,
    Low,
}

impl RiskTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::High => "HIGH",
            RiskTier::Medium => "MEDIUM",
            RiskTier::Low => "LOW",
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-symbol measurements the risk rules look at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskFactors {
    pub is_penny: bool,
    pub is_extreme_penny: bool,
    pub is_stale: bool,
    pub avg_volume: f64,
    pub zero_volume_days: usize,
}

/// One row of the risk table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskRule {
    /// Extreme penny, or repeated zero-volume days.
    ExtremePennyOrZeroVolume,
    /// Penny stock that also trades thinly.
    PennyLowVolume,
    /// Penny stock with normal volume.
    Penny,
    /// Frozen price on thin volume.
    StaleLowVolume,
}

/// Evaluated top to bottom; first match wins.
pub const RISK_RULES: [RiskRule; 4] = [
    RiskRule::ExtremePennyOrZeroVolume,
    RiskRule::PennyLowVolume,
    RiskRule::Penny,
    RiskRule::StaleLowVolume,
];

impl RiskRule {
    pub fn tier(self) -> RiskTier {
        match self {
            RiskRule::ExtremePennyOrZeroVolume | RiskRule::PennyLowVolume => RiskTier::High,
            RiskRule::Penny | RiskRule::StaleLowVolume => RiskTier::Medium,
        }
    }

    pub fn matches(self, f: &RiskFactors, t: &Thresholds) -> bool {
        let low_volume = f.avg_volume < t.low_volume;
        match self {
            RiskRule::ExtremePennyOrZeroVolume => {
                f.is_extreme_penny || f.zero_volume_days >= t.zero_volume_alert_days
            }
            RiskRule::PennyLowVolume => f.is_penny && low_volume,
            RiskRule::Penny => f.is_penny,
            RiskRule::StaleLowVolume => f.is_stale && low_volume,
        }
    }
}

/// Run the risk table and return the tier of the first matching rule.
pub fn assess_risk(factors: &RiskFactors, thresholds: &Thresholds) -> RiskTier {
    RISK_RULES
        .iter()
        .find(|rule| rule.matches(factors, thresholds))
        .map(|rule| rule.tier())
        .unwrap_or(RiskTier::Low)
}

/// Status label produced by the validation classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationStatus {
    Active,
    Delisted,
    Suspended,
    AtRisk,
    PennyStock,
    Suspicious,
    Monitor,
    Unknown,
    Error,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::Active => "ACTIVE",
            ValidationStatus::Delisted => "DELISTED",
            ValidationStatus::Suspended => "SUSPENDED",
            ValidationStatus::AtRisk => "AT_RISK",
            ValidationStatus::PennyStock => "PENNY_STOCK",
            ValidationStatus::Suspicious => "SUSPICIOUS",
            ValidationStatus::Monitor => "MONITOR",
            ValidationStatus::Unknown => "UNKNOWN",
            ValidationStatus::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factors() -> RiskFactors {
        RiskFactors {
            is_penny: false,
            is_extreme_penny: false,
            is_stale: false,
            avg_volume: 50_000.0,
            zero_volume_days: 0,
        }
    }

    #[test]
    fn same_price_uses_tolerance() {
        assert!(same_price(1.0, 1.00005));
        assert!(!same_price(1.0, 1.0002));
    }

    #[test]
    fn longest_run_empty_and_single() {
        assert_eq!(longest_same_price_run(&[]).len, 0);
        assert_eq!(longest_same_price_run(&[5.0]).len, 1);
    }

    #[test]
    fn longest_run_keeps_first_maximal_run() {
        let closes = [2.0, 2.0, 3.0, 4.0, 4.0];
        let run = longest_same_price_run(&closes);
        assert_eq!(run, PriceRun { start: 0, len: 2 });
    }

    #[test]
    fn longest_run_finds_middle_run() {
        let closes = [1.0, 2.0, 2.0, 2.0, 3.0];
        let run = longest_same_price_run(&closes);
        assert_eq!(run, PriceRun { start: 1, len: 3 });
    }

    #[test]
    fn risk_extreme_penny_is_high() {
        let f = RiskFactors {
            is_penny: true,
            is_extreme_penny: true,
            ..factors()
        };
        assert_eq!(assess_risk(&f, &Thresholds::default()), RiskTier::High);
    }

    #[test]
    fn risk_zero_volume_days_is_high() {
        let f = RiskFactors {
            is_stale: true,
            zero_volume_days: 2,
            ..factors()
        };
        assert_eq!(assess_risk(&f, &Thresholds::default()), RiskTier::High);
    }

    #[test]
    fn risk_penny_low_volume_is_high() {
        let f = RiskFactors {
            is_penny: true,
            avg_volume: 500.0,
            ..factors()
        };
        assert_eq!(assess_risk(&f, &Thresholds::default()), RiskTier::High);
    }

    #[test]
    fn risk_penny_alone_is_medium() {
        let f = RiskFactors {
            is_penny: true,
            ..factors()
        };
        assert_eq!(assess_risk(&f, &Thresholds::default()), RiskTier::Medium);
    }

    #[test]
    fn risk_stale_low_volume_is_medium() {
        let f = RiskFactors {
            is_stale: true,
            avg_volume: 10.0,
            ..factors()
        };
        assert_eq!(assess_risk(&f, &Thresholds::default()), RiskTier::Medium);
    }

    #[test]
    fn risk_stale_with_volume_is_low() {
        let f = RiskFactors {
            is_stale: true,
            ..factors()
        };
        assert_eq!(assess_risk(&f, &Thresholds::default()), RiskTier::Low);
    }

    #[test]
    fn risk_tier_sorts_high_first() {
        let mut tiers = vec![RiskTier::Low, RiskTier::High, RiskTier::Medium];
        tiers.sort();
        assert_eq!(tiers, vec![RiskTier::High, RiskTier::Medium, RiskTier::Low]);
    }

    #[test]
    fn status_serializes_screaming_snake() {
        let json = serde_json::to_string(&ValidationStatus::PennyStock).unwrap();
        assert_eq!(json, "\"PENNY_STOCK\"");
        assert_eq!(ValidationStatus::AtRisk.to_string(), "AT_RISK");
    }

    #[test]
    fn thresholds_partial_toml_like_json_uses_defaults() {
        let t: Thresholds = serde_json::from_str(r#"{"penny_price": 0.5}"#).unwrap();
        assert_eq!(t.penny_price, 0.5);
        assert_eq!(t.stale_days, 3);
    }
}
