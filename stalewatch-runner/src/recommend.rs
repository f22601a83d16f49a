//! Cleanup recommendations built from confirmed signals and validations.
//!
//! Pure transformation: no I/O. Symbols land in at most one bucket, taking
//! the first bucket in priority order that claims them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use stalewatch_core::domain::ConfirmedSignal;
use stalewatch_core::rules::{RiskTier, ValidationStatus};
use stalewatch_core::validate::ValidationResult;

/// Approximate stored rows per symbol, used for the savings estimate.
const RECORDS_PER_SYMBOL: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CleanupAction {
    RemoveNoData,
    RemoveDelisted,
    ReviewSuspended,
    PennyStockReview,
    DataQualityCheck,
    GeneralMaintenance,
}

/// One prioritized bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItem {
    pub priority: RiskTier,
    pub action: CleanupAction,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub affected_symbols: Vec<String>,
    pub estimated_cleanup_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_savings: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Urgency {
    Immediate,
    Moderate,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub frequency: Frequency,
    pub task: String,
    pub automation: String,
    pub estimated_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub overall_risk: RiskTier,
    /// Confirmed symbols as a percentage of the universe, two decimals.
    pub stale_percentage: f64,
    pub data_quality_score: u32,
    pub recommendations_urgency: Urgency,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub total_securities: usize,
    pub stale_securities: usize,
    pub validated_securities: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    pub analysis_summary: AnalysisSummary,
    pub cleanup_actions: Vec<ActionItem>,
    pub maintenance_schedule: Vec<ScheduledTask>,
    pub risk_assessment: RiskAssessment,
}

impl Recommendations {
    /// Nothing to act on: only the two standing buckets.
    pub fn empty(universe_size: usize) -> Self {
        build(&[], &[], universe_size)
    }

    pub fn action(&self, action: CleanupAction) -> Option<&ActionItem> {
        self.cleanup_actions.iter().find(|a| a.action == action)
    }
}

/// `max(0, 100 - 2 * flagged)`.
pub fn data_quality_score(flagged: usize) -> u32 {
    100u32.saturating_sub(flagged.saturating_mul(2).min(u32::MAX as usize) as u32)
}

/// IMMEDIATE if any HIGH bucket, MODERATE above three buckets, else LOW.
pub fn urgency(actions: &[ActionItem]) -> Urgency {
    if actions.iter().any(|a| a.priority == RiskTier::High) {
        Urgency::Immediate
    } else if actions.len() > 3 {
        Urgency::Moderate
    } else {
        Urgency::Low
    }
}

/// HIGH above 50 flagged, MEDIUM above 10, else LOW.
pub fn overall_risk(flagged: usize) -> RiskTier {
    if flagged > 50 {
        RiskTier::High
    } else if flagged > 10 {
        RiskTier::Medium
    } else {
        RiskTier::Low
    }
}

pub fn maintenance_schedule() -> Vec<ScheduledTask> {
    let task = |frequency, task: &str, automation: &str, time: &str| ScheduledTask {
        frequency,
        task: task.to_string(),
        automation: automation.to_string(),
        estimated_time: time.to_string(),
    };
    vec![
        task(Frequency::Daily, "Run stale price detection", "Automated", "5 minutes"),
        task(Frequency::Weekly, "Review flagged securities", "Manual", "30 minutes"),
        task(
            Frequency::Monthly,
            "Database optimization and cleanup",
            "Semi-automated",
            "2 hours",
        ),
        task(
            Frequency::Quarterly,
            "Comprehensive data quality audit",
            "Manual",
            "4 hours",
        ),
    ]
}

/// Build recommendations for one run.
pub fn build(
    confirmed: &[ConfirmedSignal],
    validations: &[ValidationResult],
    universe_size: usize,
) -> Recommendations {
    let mut claimed: BTreeSet<String> = BTreeSet::new();
    let mut claim = |symbols: Vec<String>| -> Vec<String> {
        symbols
            .into_iter()
            .filter(|s| claimed.insert(s.clone()))
            .collect()
    };

    let no_data = claim(
        confirmed
            .iter()
            .filter(|c| c.signal.is_no_data)
            .map(|c| c.signal.symbol.clone())
            .collect(),
    );
    let by_status = |statuses: &[ValidationStatus]| -> Vec<String> {
        validations
            .iter()
            .filter(|v| statuses.contains(&v.status))
            .map(|v| v.symbol.clone())
            .collect()
    };
    let delisted = claim(by_status(&[ValidationStatus::Delisted]));
    let suspended = claim(by_status(&[ValidationStatus::Suspended]));
    let penny = claim(by_status(&[ValidationStatus::AtRisk, ValidationStatus::PennyStock]));

    let mut actions = Vec::new();
    if !no_data.is_empty() {
        actions.push(ActionItem {
            priority: RiskTier::High,
            action: CleanupAction::RemoveNoData,
            description: format!("Remove {} securities with no recent data", no_data.len()),
            estimated_cleanup_time: "15 minutes".into(),
            data_savings: Some(format!("~{} records", no_data.len() * RECORDS_PER_SYMBOL)),
            recommendation: Some("Confirm the feed has stopped before removing".into()),
            affected_symbols: no_data,
        });
    }
    if !delisted.is_empty() {
        actions.push(ActionItem {
            priority: RiskTier::High,
            action: CleanupAction::RemoveDelisted,
            description: format!("Remove {} confirmed delisted securities", delisted.len()),
            estimated_cleanup_time: "15 minutes".into(),
            data_savings: Some(format!("~{} records", delisted.len() * RECORDS_PER_SYMBOL)),
            recommendation: None,
            affected_symbols: delisted,
        });
    }
    if !suspended.is_empty() {
        actions.push(ActionItem {
            priority: RiskTier::Medium,
            action: CleanupAction::ReviewSuspended,
            description: format!("Review {} suspended securities", suspended.len()),
            estimated_cleanup_time: "30 minutes".into(),
            data_savings: None,
            recommendation: Some("Monitor for 30 days, then remove if still suspended".into()),
            affected_symbols: suspended,
        });
    }
    if !penny.is_empty() {
        actions.push(ActionItem {
            priority: RiskTier::Medium,
            action: CleanupAction::PennyStockReview,
            description: format!("Review {} securities under $1.00", penny.len()),
            estimated_cleanup_time: "45 minutes".into(),
            data_savings: None,
            recommendation: Some(
                "Consider removing from watchlist if consistently under $1.00".into(),
            ),
            affected_symbols: penny,
        });
    }
    actions.push(ActionItem {
        priority: RiskTier::Medium,
        action: CleanupAction::DataQualityCheck,
        description: "Implement automated stale price monitoring".into(),
        affected_symbols: Vec::new(),
        estimated_cleanup_time: "2 hours".into(),
        data_savings: None,
        recommendation: Some("Add daily automated checks for stale prices".into()),
    });
    actions.push(ActionItem {
        priority: RiskTier::Low,
        action: CleanupAction::GeneralMaintenance,
        description: "Optimize database structure and indexing".into(),
        affected_symbols: Vec::new(),
        estimated_cleanup_time: "1 hour".into(),
        data_savings: None,
        recommendation: Some("Monthly database optimization".into()),
    });

    let flagged = confirmed.len();
    let stale_percentage = if universe_size == 0 {
        0.0
    } else {
        (flagged as f64 / universe_size as f64 * 10_000.0).round() / 100.0
    };

    Recommendations {
        analysis_summary: AnalysisSummary {
            total_securities: universe_size,
            stale_securities: flagged,
            validated_securities: validations.len(),
        },
        risk_assessment: RiskAssessment {
            overall_risk: overall_risk(flagged),
            stale_percentage,
            data_quality_score: data_quality_score(flagged),
            recommendations_urgency: urgency(&actions),
        },
        cleanup_actions: actions,
        maintenance_schedule: maintenance_schedule(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use stalewatch_core::domain::{SignalClass, SymbolSignal};
    use stalewatch_core::validate::ValidationSource;

    fn confirmed(symbol: &str, no_data: bool) -> ConfirmedSignal {
        ConfirmedSignal {
            signal: SymbolSignal {
                symbol: symbol.into(),
                class: if no_data {
                    SignalClass::Absent
                } else {
                    SignalClass::Flagged
                },
                latest_close: 0.5,
                last_date: None,
                max_consecutive: 1,
                avg_volume: 0.0,
                zero_volume_days: 0,
                is_penny: !no_data,
                is_extreme_penny: false,
                is_stale: false,
                is_no_data: no_data,
                risk: RiskTier::High,
                reasons: vec!["x".into()],
            },
            failure_count: 3,
            first_flagged: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        }
    }

    fn validation(symbol: &str, status: ValidationStatus) -> ValidationResult {
        ValidationResult {
            symbol: symbol.into(),
            status,
            reason: "r".into(),
            last_price: Some(0.5),
            avg_volume: Some(10.0),
            data_source: ValidationSource::History,
            validated_at: NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn score_floors_at_zero() {
        assert_eq!(data_quality_score(0), 100);
        assert_eq!(data_quality_score(10), 80);
        assert_eq!(data_quality_score(50), 0);
        assert_eq!(data_quality_score(400), 0);
    }

    #[test]
    fn overall_risk_bands() {
        assert_eq!(overall_risk(10), RiskTier::Low);
        assert_eq!(overall_risk(11), RiskTier::Medium);
        assert_eq!(overall_risk(51), RiskTier::High);
    }

    #[test]
    fn empty_run_has_only_standing_buckets() {
        let r = Recommendations::empty(500);
        let kinds: Vec<CleanupAction> = r.cleanup_actions.iter().map(|a| a.action).collect();
        assert_eq!(
            kinds,
            vec![CleanupAction::DataQualityCheck, CleanupAction::GeneralMaintenance]
        );
        assert_eq!(r.risk_assessment.recommendations_urgency, Urgency::Low);
        assert_eq!(r.risk_assessment.data_quality_score, 100);
        assert_eq!(r.maintenance_schedule.len(), 4);
    }

    #[test]
    fn buckets_in_priority_order_without_double_listing() {
        let confirmed = vec![confirmed("GONE", true), confirmed("PEN", false)];
        let validations = vec![
            validation("GONE", ValidationStatus::Delisted),
            validation("DEAD", ValidationStatus::Delisted),
            validation("HALT", ValidationStatus::Suspended),
            validation("PEN", ValidationStatus::PennyStock),
            validation("RISK", ValidationStatus::AtRisk),
        ];
        let r = build(&confirmed, &validations, 200);

        let kinds: Vec<CleanupAction> = r.cleanup_actions.iter().map(|a| a.action).collect();
        assert_eq!(
            kinds,
            vec![
                CleanupAction::RemoveNoData,
                CleanupAction::RemoveDelisted,
                CleanupAction::ReviewSuspended,
                CleanupAction::PennyStockReview,
                CleanupAction::DataQualityCheck,
                CleanupAction::GeneralMaintenance,
            ]
        );
        let delisted = r.action(CleanupAction::RemoveDelisted).unwrap();
        assert_eq!(delisted.affected_symbols, vec!["DEAD".to_string()]);
        assert_eq!(delisted.data_savings.as_deref(), Some("~200 records"));
        let penny = r.action(CleanupAction::PennyStockReview).unwrap();
        assert_eq!(penny.affected_symbols, vec!["PEN".to_string(), "RISK".to_string()]);

        assert_eq!(r.risk_assessment.recommendations_urgency, Urgency::Immediate);
        assert_eq!(r.risk_assessment.stale_percentage, 1.0);
        assert_eq!(r.risk_assessment.data_quality_score, 96);
    }

    #[test]
    fn medium_buckets_only_is_moderate() {
        let validations = vec![
            validation("HALT", ValidationStatus::Suspended),
            validation("PEN", ValidationStatus::PennyStock),
        ];
        let r = build(&[], &validations, 100);
        assert_eq!(r.cleanup_actions.len(), 4);
        assert_eq!(r.risk_assessment.recommendations_urgency, Urgency::Moderate);
    }

    #[test]
    fn serializes_with_screaming_snake_enums() {
        let json = serde_json::to_value(Recommendations::empty(10)).unwrap();
        assert_eq!(json["cleanup_actions"][0]["action"], "DATA_QUALITY_CHECK");
        assert_eq!(json["cleanup_actions"][0]["priority"], "MEDIUM");
        assert!(json["cleanup_actions"][0].get("affected_symbols").is_none());
        assert_eq!(json["maintenance_schedule"][0]["frequency"], "DAILY");
    }

    proptest::proptest! {
        #[test]
        fn score_is_bounded_and_non_increasing(a in 0usize..500, b in 0usize..500) {
            let (lo, hi) = (a.min(b), a.max(b));
            proptest::prop_assert!(data_quality_score(lo) <= 100);
            proptest::prop_assert!(data_quality_score(hi) <= data_quality_score(lo));
        }

        #[test]
        fn overall_risk_never_drops_as_flags_grow(a in 0usize..200, b in 0usize..200) {
            let (lo, hi) = (a.min(b), a.max(b));
            // High < Medium < Low in tier order
            proptest::prop_assert!(overall_risk(hi) <= overall_risk(lo));
        }
    }
}
