//! Build-stage analytics derived from the roster and feature list.
//!
//! None of these values feed the score; they inform the player and the
//! tester's reports.

use serde::{Deserialize, Serialize};

use crate::catalog::{Feature, TeamMember};
use crate::constants::{
    PROGRESS_COMPLETE, READINESS_RISK_MIN, READINESS_TEAM_MIN, RISK_COMPLEXITY_SCALE, RISK_SCALE,
    RUNWAY_COMFORT_MONTHS, SKILL_SCALE, STARTING_TIME_DAYS, SYNERGY_WEIGHT,
};
use crate::numbers::{clamp_score, i64_to_f64, round_f64_to_i64, usize_to_f64};
use crate::stage::can_leave_build;
use crate::state::GameState;

fn average_skill(members: &[TeamMember]) -> f64 {
    members.iter().map(|m| f64::from(m.skill)).sum::<f64>() / usize_to_f64(members.len())
}

/// `1 + 0.5 * share of pairs where the first member fits with the second`.
#[must_use]
pub fn team_synergy(members: &[TeamMember]) -> f64 {
    if members.len() <= 1 {
        return 1.0;
    }
    let mut pairs = 0_usize;
    let mut fitting = 0_usize;
    for (i, first) in members.iter().enumerate() {
        for second in &members[i + 1..] {
            pairs += 1;
            if first.team_fit.contains(&second.role) {
                fitting += 1;
            }
        }
    }
    1.0 + usize_to_f64(fitting) / usize_to_f64(pairs) * SYNERGY_WEIGHT
}

/// Team efficiency 0..=100 from skill, synergy, morale and any productivity
/// swing from resolved events.
#[must_use]
pub fn team_efficiency(members: &[TeamMember], morale: i32, productivity_modifier: i32) -> i32 {
    if members.is_empty() {
        return 0;
    }
    let productivity = 1.0 + f64::from(productivity_modifier) / 100.0;
    clamp_score(
        average_skill(members)
            * SKILL_SCALE
            * team_synergy(members)
            * (f64::from(morale) / 100.0)
            * productivity,
    )
}

/// Share of the feature work done after `days_spent` at the given efficiency.
#[must_use]
pub fn development_progress(features: &[Feature], efficiency: i32, days_spent: i64) -> i32 {
    let total: i64 = features.iter().map(|f| f.time_required).sum();
    if total <= 0 {
        return 0;
    }
    let spent = i64_to_f64(days_spent.clamp(0, total));
    clamp_score(spent / i64_to_f64(total) * f64::from(efficiency))
}

/// Skill relative to average complexity, weighted by efficiency.
#[must_use]
pub fn quality_score(members: &[TeamMember], features: &[Feature], efficiency: i32) -> i32 {
    if members.is_empty() || features.is_empty() {
        return 0;
    }
    let complexity = features.iter().map(|f| f64::from(f.complexity)).sum::<f64>()
        / usize_to_f64(features.len());
    if complexity <= 0.0 {
        return 0;
    }
    clamp_score(average_skill(members) / complexity * f64::from(efficiency))
}

/// Risk 0..=100 from team inexperience, feature complexity and short runway.
/// Without a burn rate the runway adds no risk.
#[must_use]
pub fn risk_score(members: &[TeamMember], features: &[Feature], runway_months: Option<f64>) -> i32 {
    if members.is_empty() || features.is_empty() {
        return 0;
    }
    let team_risk = 1.0 - average_skill(members) / SKILL_SCALE;
    let feature_risk = features.iter().map(|f| f64::from(f.complexity)).sum::<f64>()
        / (usize_to_f64(features.len()) * RISK_COMPLEXITY_SCALE);
    let financial_risk =
        runway_months.map_or(0.0, |months| (1.0 - months / RUNWAY_COMFORT_MONTHS).max(0.0));
    clamp_score((team_risk + feature_risk + financial_risk) * RISK_SCALE)
}

/// Calendar days to build everything at the given efficiency.
#[must_use]
pub fn predicted_development_days(features: &[Feature], efficiency: i32) -> Option<i64> {
    if features.is_empty() || efficiency <= 0 {
        return None;
    }
    let base: i64 = features.iter().map(|f| f.time_required).sum();
    Some(round_f64_to_i64(
        i64_to_f64(base) / (f64::from(efficiency) / 100.0),
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureReadiness {
    pub can_start: bool,
    pub team: i32,
    pub time: i32,
    pub budget: i32,
    pub risk: i32,
}

fn coverage(available: i64, required: i64) -> i32 {
    if available >= required || required <= 0 {
        return i32::from(PROGRESS_COMPLETE);
    }
    clamp_score(i64_to_f64(available.max(0)) / i64_to_f64(required) * 100.0)
}

/// Whether the team, calendar and wallet are ready for one more feature.
#[must_use]
pub fn feature_readiness(feature: &Feature, state: &GameState) -> FeatureReadiness {
    let members = &state.team_members;
    let team = if members.is_empty() {
        0
    } else {
        clamp_score(average_skill(members) / SKILL_SCALE * 100.0)
    };
    let time = coverage(state.resources.time, feature.time_required);
    let budget = coverage(state.resources.money, feature.cost);
    let risk = 100 - risk_score(members, std::slice::from_ref(feature), state.runway_months());
    let complete = i32::from(PROGRESS_COMPLETE);
    FeatureReadiness {
        can_start: team >= READINESS_TEAM_MIN
            && time >= complete
            && budget >= complete
            && risk >= READINESS_RISK_MIN,
        team,
        time,
        budget,
        risk,
    }
}

/// Snapshot of the build stage for display and reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildReport {
    pub efficiency: i32,
    pub synergy: f64,
    pub progress: i32,
    pub quality: i32,
    pub risk: i32,
    pub predicted_days: Option<i64>,
    pub burn_rate: i64,
    pub runway_months: Option<f64>,
    pub ready_for_launch: bool,
}

impl BuildReport {
    #[must_use]
    pub fn from_state(state: &GameState) -> Self {
        let members = &state.team_members;
        let features = &state.features;
        let efficiency = team_efficiency(members, state.morale, state.productivity_modifier);
        let days_spent = STARTING_TIME_DAYS - state.resources.time;
        let runway = state.runway_months();
        Self {
            efficiency,
            synergy: team_synergy(members),
            progress: development_progress(features, efficiency, days_spent),
            quality: quality_score(members, features, efficiency),
            risk: risk_score(members, features, runway),
            predicted_days: predicted_development_days(features, efficiency),
            burn_rate: state.burn_rate(),
            runway_months: runway,
            ready_for_launch: can_leave_build(state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::catalog;

    fn members(ids: &[&str]) -> Vec<TeamMember> {
        ids.iter()
            .map(|id| catalog().member(id).unwrap().clone())
            .collect()
    }

    fn features(ids: &[&str]) -> Vec<Feature> {
        ids.iter()
            .map(|id| catalog().feature(id).unwrap().clone())
            .collect()
    }

    #[test]
    fn synergy_counts_one_way_fit() {
        assert!((team_synergy(&members(&["dev1", "dev2"])) - 1.0).abs() < f64::EPSILON);
        assert!((team_synergy(&members(&["dev1", "design1"])) - 1.5).abs() < f64::EPSILON);
        assert!((team_synergy(&members(&["dev1"])) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn efficiency_scales_with_morale_and_productivity() {
        let team = members(&["dev1", "dev2"]);
        assert_eq!(team_efficiency(&team, 100, 0), 80);
        assert_eq!(team_efficiency(&team, 50, 0), 40);
        assert_eq!(team_efficiency(&team, 100, 15), 92);
        assert_eq!(team_efficiency(&members(&["dev1", "design1"]), 100, 0), 100);
        assert_eq!(team_efficiency(&[], 100, 0), 0);
    }

    #[test]
    fn quality_and_risk_follow_complexity() {
        let team = members(&["dev1", "dev2"]);
        let picked = features(&["profile", "groups"]);
        // 8 / 13 * 80
        assert_eq!(quality_score(&team, &picked, 80), 49);
        // (0.2 + 26 / 50) * 33.33
        assert_eq!(risk_score(&team, &picked, None), 24);
        assert_eq!(risk_score(&team, &picked, Some(6.0)), 41);
    }

    #[test]
    fn progress_and_prediction() {
        let picked = features(&["profile", "groups"]);
        assert_eq!(development_progress(&picked, 80, 14), 40);
        assert_eq!(development_progress(&picked, 80, 500), 80);
        assert_eq!(predicted_development_days(&picked, 80), Some(35));
        assert_eq!(predicted_development_days(&picked, 0), None);
    }

    #[test]
    fn readiness_checks_time_and_money() {
        let mut state = GameState::default();
        for id in ["dev1", "design1"] {
            let _ = state.add_team_member(catalog().member(id).unwrap());
        }
        let payments = catalog().feature("payments").unwrap();
        let ready = feature_readiness(payments, &state);
        assert_eq!(ready.team, 85);
        assert_eq!(ready.time, 100);
        assert!(ready.can_start || ready.risk < 50);

        state.resources.time = 15;
        let short = feature_readiness(payments, &state);
        assert_eq!(short.time, 50);
        assert!(!short.can_start);
    }

    #[test]
    fn report_reflects_state() {
        let mut state = GameState::default();
        for id in ["dev1", "dev2"] {
            let _ = state.add_team_member(catalog().member(id).unwrap());
        }
        let report = BuildReport::from_state(&state);
        assert_eq!(report.efficiency, 80);
        assert_eq!(report.progress, 0);
        assert!(!report.ready_for_launch);
        assert_eq!(report.burn_rate, state.burn_rate());
    }
}
