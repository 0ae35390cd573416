//! Success and failure evaluation.
//!
//! Two independent views over the monthly metrics:
//!
//! * [`evaluate_outcome`] judges the run against fixed targets and decides
//!   success once the simulation ends.
//! * [`milestone_for_month`] / [`assess_milestone`] drive the in-progress
//!   objectives shown between months. Their targets grow with the month.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{
    OUTCOME_CHURN_CEILING, OUTCOME_CONVERSION_TARGET, OUTCOME_GROWTH_TARGET,
    OUTCOME_REVENUE_TARGET, OUTCOME_ROI_TARGET, OUTCOME_SATISFACTION_TARGET,
    OUTCOME_SUCCESS_SCORE, OUTCOME_UPTIME_TARGET,
};
use crate::events::{EventKind, EventSeverity, GameEvent};
use crate::numbers::{clamp_score, i64_to_f64, usize_to_f64};
use crate::progression::MonthlyMetrics;
use crate::state::GameState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricId {
    Revenue,
    Users,
    UserGrowth,
    CustomerSatisfaction,
    ServerUptime,
    MarketingRoi,
    ChurnRate,
    ConversionRate,
}

impl MetricId {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Revenue => "revenue",
            Self::Users => "users",
            Self::UserGrowth => "user_growth",
            Self::CustomerSatisfaction => "customer_satisfaction",
            Self::ServerUptime => "server_uptime",
            Self::MarketingRoi => "marketing_roi",
            Self::ChurnRate => "churn_rate",
            Self::ConversionRate => "conversion_rate",
        }
    }

    #[must_use]
    pub const fn lower_is_better(self) -> bool {
        matches!(self, Self::ChurnRate)
    }

    fn meets(self, current: f64, required: f64) -> bool {
        if self.lower_is_better() {
            current <= required
        } else {
            current >= required
        }
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    pub metric: MetricId,
    pub current: f64,
    pub required: f64,
    pub achieved: bool,
}

impl MetricResult {
    fn check(metric: MetricId, current: f64, required: f64) -> Self {
        Self {
            metric,
            current,
            required,
            achieved: metric.meets(current, required),
        }
    }
}

/// Verdict at the end of the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeReport {
    pub success: bool,
    /// Share of targets met, 0..=100.
    pub overall_score: i32,
    pub month: u32,
    pub metrics: Vec<MetricResult>,
    pub success_factors: Vec<String>,
    pub failure_reasons: Vec<String>,
    pub final_money: i64,
    pub final_users: i64,
}

impl OutcomeReport {
    #[must_use]
    pub fn achieved_count(&self) -> usize {
        self.metrics.iter().filter(|result| result.achieved).count()
    }

    #[must_use]
    pub fn result(&self, metric: MetricId) -> Option<&MetricResult> {
        self.metrics.iter().find(|result| result.metric == metric)
    }

    #[must_use]
    pub fn to_event(&self) -> GameEvent {
        let (severity, title) = if self.success {
            (EventSeverity::Success, "Your Startup Made It!")
        } else {
            (EventSeverity::Critical, "Your Startup Struggled")
        };
        GameEvent::new(
            EventKind::GameOutcome,
            severity,
            title,
            format!(
                "After {} months you met {} of {} targets (score {}/100).",
                self.month,
                self.achieved_count(),
                self.metrics.len(),
                self.overall_score
            ),
        )
        .with_payload(serde_json::json!({
            "success": self.success,
            "overall_score": self.overall_score,
            "success_factors": self.success_factors,
            "failure_reasons": self.failure_reasons,
        }))
    }
}

fn describe(result: &MetricResult, factors: &mut Vec<String>, reasons: &mut Vec<String>) {
    let MetricResult {
        metric,
        current,
        required,
        achieved,
    } = *result;
    let line = match (metric, achieved) {
        (MetricId::Revenue, true) => format!("Achieved revenue target of ${required:.0}"),
        (MetricId::Revenue, false) => {
            format!("Revenue of ${current:.0} below target of ${required:.0}")
        }
        (MetricId::UserGrowth, true) => {
            format!("Strong user growth of {:.1}%", current * 100.0)
        }
        (MetricId::UserGrowth, false) => format!(
            "User growth of {:.1}% below target of {:.0}%",
            current * 100.0,
            required * 100.0
        ),
        (MetricId::CustomerSatisfaction, true) => {
            format!("High customer satisfaction at {current:.1}%")
        }
        (MetricId::CustomerSatisfaction, false) => format!(
            "Customer satisfaction at {current:.1}% below target of {required:.0}%"
        ),
        (MetricId::ServerUptime, true) => format!("Excellent server uptime at {current:.2}%"),
        (MetricId::ServerUptime, false) => {
            format!("Server uptime at {current:.2}% below target of {required:.0}%")
        }
        (MetricId::MarketingRoi, true) => {
            format!("Strong marketing ROI at {:.1}%", current * 100.0)
        }
        (MetricId::MarketingRoi, false) => format!(
            "Marketing ROI at {:.1}% below target of {:.1}%",
            current * 100.0,
            required * 100.0
        ),
        (MetricId::ChurnRate, true) => format!("Low churn rate at {:.1}%", current * 100.0),
        (MetricId::ChurnRate, false) => format!(
            "High churn rate at {:.1}% above target of {:.0}%",
            current * 100.0,
            required * 100.0
        ),
        (MetricId::ConversionRate, true) => {
            format!("Good conversion rate at {:.1}%", current * 100.0)
        }
        (MetricId::ConversionRate, false) => format!(
            "Conversion rate at {:.1}% below target of {:.0}%",
            current * 100.0,
            required * 100.0
        ),
        (MetricId::Users, true) => format!("Reached {current:.0} users"),
        (MetricId::Users, false) => format!("{current:.0} users, short of {required:.0}"),
    };
    if achieved {
        factors.push(line);
    } else {
        reasons.push(line);
    }
}

/// Judge the month's metrics against the fixed targets.
///
/// `overall_score` is the rounded share of the seven targets met; the run
/// succeeds at 70 or above.
#[must_use]
pub fn evaluate_outcome(metrics: &MonthlyMetrics, month: u32, state: &GameState) -> OutcomeReport {
    let results = vec![
        MetricResult::check(MetricId::Revenue, metrics.revenue, OUTCOME_REVENUE_TARGET),
        MetricResult::check(MetricId::UserGrowth, metrics.user_growth, OUTCOME_GROWTH_TARGET),
        MetricResult::check(
            MetricId::CustomerSatisfaction,
            metrics.customer_satisfaction,
            OUTCOME_SATISFACTION_TARGET,
        ),
        MetricResult::check(
            MetricId::ServerUptime,
            metrics.server_uptime,
            OUTCOME_UPTIME_TARGET,
        ),
        MetricResult::check(MetricId::MarketingRoi, metrics.marketing_roi, OUTCOME_ROI_TARGET),
        MetricResult::check(MetricId::ChurnRate, metrics.churn_rate, OUTCOME_CHURN_CEILING),
        MetricResult::check(
            MetricId::ConversionRate,
            metrics.conversion_rate,
            OUTCOME_CONVERSION_TARGET,
        ),
    ];

    let mut success_factors = Vec::new();
    let mut failure_reasons = Vec::new();
    for result in &results {
        describe(result, &mut success_factors, &mut failure_reasons);
    }

    let achieved = results.iter().filter(|result| result.achieved).count();
    let overall_score = clamp_score(usize_to_f64(achieved) / usize_to_f64(results.len()) * 100.0);

    OutcomeReport {
        success: overall_score >= OUTCOME_SUCCESS_SCORE,
        overall_score,
        month,
        metrics: results,
        success_factors,
        failure_reasons,
        final_money: state.resources.money,
        final_users: state.resources.users,
    }
}

/// Month-indexed objective thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MilestoneThresholds {
    pub month: u32,
    pub min_revenue: f64,
    pub min_users: i64,
    pub min_satisfaction: f64,
    pub min_uptime: f64,
    pub min_roi: f64,
    pub max_churn_rate: f64,
}

const MILESTONES: [MilestoneThresholds; 4] = [
    MilestoneThresholds {
        month: 1,
        min_revenue: 5_000.0,
        min_users: 100,
        min_satisfaction: 60.0,
        min_uptime: 95.0,
        min_roi: 0.5,
        max_churn_rate: 0.10,
    },
    MilestoneThresholds {
        month: 3,
        min_revenue: 15_000.0,
        min_users: 500,
        min_satisfaction: 70.0,
        min_uptime: 97.0,
        min_roi: 1.0,
        max_churn_rate: 0.08,
    },
    MilestoneThresholds {
        month: 6,
        min_revenue: 50_000.0,
        min_users: 2_000,
        min_satisfaction: 75.0,
        min_uptime: 98.0,
        min_roi: 1.5,
        max_churn_rate: 0.05,
    },
    MilestoneThresholds {
        month: 12,
        min_revenue: 200_000.0,
        min_users: 10_000,
        min_satisfaction: 80.0,
        min_uptime: 99.0,
        min_roi: 2.0,
        max_churn_rate: 0.03,
    },
];

/// Thresholds for the largest milestone month not after `month`. Months
/// before the first milestone use the first one.
#[must_use]
pub fn milestone_for_month(month: u32) -> MilestoneThresholds {
    MILESTONES
        .iter()
        .rev()
        .find(|milestone| milestone.month <= month)
        .copied()
        .unwrap_or(MILESTONES[0])
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneProgress {
    pub thresholds: MilestoneThresholds,
    pub results: Vec<MetricResult>,
}

impl MilestoneProgress {
    #[must_use]
    pub fn on_track(&self) -> bool {
        self.results.iter().all(|result| result.achieved)
    }

    #[must_use]
    pub fn met(&self) -> usize {
        self.results.iter().filter(|result| result.achieved).count()
    }
}

/// Compare live metrics with the objectives for `month`.
#[must_use]
pub fn assess_milestone(metrics: &MonthlyMetrics, users: i64, month: u32) -> MilestoneProgress {
    let thresholds = milestone_for_month(month);
    let results = vec![
        MetricResult::check(MetricId::Revenue, metrics.revenue, thresholds.min_revenue),
        MetricResult::check(
            MetricId::Users,
            i64_to_f64(users),
            i64_to_f64(thresholds.min_users),
        ),
        MetricResult::check(
            MetricId::CustomerSatisfaction,
            metrics.customer_satisfaction,
            thresholds.min_satisfaction,
        ),
        MetricResult::check(
            MetricId::ServerUptime,
            metrics.server_uptime,
            thresholds.min_uptime,
        ),
        MetricResult::check(MetricId::MarketingRoi, metrics.marketing_roi, thresholds.min_roi),
        MetricResult::check(
            MetricId::ChurnRate,
            metrics.churn_rate,
            thresholds.max_churn_rate,
        ),
    ];
    MilestoneProgress {
        thresholds,
        results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strong_month() -> MonthlyMetrics {
        MonthlyMetrics {
            revenue: 20_000.0,
            user_growth: 0.15,
            customer_satisfaction: 90.0,
            server_uptime: 99.5,
            marketing_roi: 0.5,
            cashflow: 4_000.0,
            churn_rate: 0.03,
            conversion_rate: 0.18,
        }
    }

    #[test]
    fn all_targets_met_is_full_score() {
        let state = GameState::default();
        let report = evaluate_outcome(&strong_month(), 12, &state);
        assert!(report.success);
        assert_eq!(report.overall_score, 100);
        assert_eq!(report.success_factors.len(), 7);
        assert!(report.failure_reasons.is_empty());
        assert_eq!(report.final_money, 100_000);
    }

    #[test]
    fn five_of_seven_meets_the_bar() {
        let mut metrics = strong_month();
        metrics.revenue = 9_000.0;
        metrics.churn_rate = 0.09;
        let report = evaluate_outcome(&metrics, 12, &GameState::default());
        // round(5/7 * 100)
        assert_eq!(report.overall_score, 71);
        assert!(report.success);
        assert_eq!(report.failure_reasons.len(), 2);
        assert!(report.failure_reasons[1].contains("above target of 8%"));
        assert!(!report.result(MetricId::ChurnRate).unwrap().achieved);
    }

    #[test]
    fn four_of_seven_fails() {
        let mut metrics = strong_month();
        metrics.revenue = 9_000.0;
        metrics.churn_rate = 0.09;
        metrics.conversion_rate = 0.10;
        let report = evaluate_outcome(&metrics, 12, &GameState::default());
        assert_eq!(report.overall_score, 57);
        assert!(!report.success);
        assert_eq!(report.to_event().severity, EventSeverity::Critical);
    }

    #[test]
    fn churn_is_lower_is_better() {
        assert!(MetricId::ChurnRate.meets(0.08, 0.08));
        assert!(!MetricId::ChurnRate.meets(0.081, 0.08));
        assert!(MetricId::Revenue.meets(15_000.0, 15_000.0));
    }

    #[test]
    fn milestone_picks_largest_month_not_after() {
        assert_eq!(milestone_for_month(0).month, 1);
        assert_eq!(milestone_for_month(2).month, 1);
        assert_eq!(milestone_for_month(3).month, 3);
        assert_eq!(milestone_for_month(11).month, 6);
        assert_eq!(milestone_for_month(24).month, 12);
    }

    #[test]
    fn milestone_progress_counts_users() {
        let progress = assess_milestone(&strong_month(), 600, 3);
        assert_eq!(progress.thresholds.min_users, 500);
        // ROI 0.5 misses the month-three target of 1.0
        assert_eq!(progress.met(), 5);
        assert!(!progress.on_track());
    }
}
