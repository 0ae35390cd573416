//! Pure scoring functions.
//!
//! Every function here is referentially transparent: the state container
//! calls them after each mutation and stores the result, it never
//! accumulates sub-scores.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::catalog::{Feature, MarketingChannel, TeamMember, ValidationChoice};
use crate::constants::{
    CHANNEL_SCORE_BASELINE, DEVELOPMENT_FEATURE_BASELINE, DEVELOPMENT_HALF,
    DEVELOPMENT_TEAM_BASELINE, DEVELOPMENT_WEIGHT, FEATURE_VALUE_SCALE, FOUNDATION_WEIGHT,
    IDEA_POTENTIAL_SCALE, MARKETING_WEIGHT, ROLE_DIVERSITY_BONUS, ROLE_DIVERSITY_THRESHOLD,
    TEAM_SIZE_PENALTY, TEAM_SIZE_SOFT_CAP, TEAM_SKILL_CAP, UNFUNDED_MARKETING_FACTOR,
    VALIDATION_CHOICE_BASELINE,
};
use crate::numbers::{clamp_score, usize_to_f64};

/// Stage sub-scores plus the weighted composite, each 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Scores {
    pub foundation: i32,
    pub development: i32,
    pub marketing: i32,
    pub overall: i32,
}

impl Scores {
    /// Re-derive `overall` from the current sub-scores.
    pub fn refresh_overall(&mut self) {
        self.overall = overall_score(self.foundation, self.development, self.marketing);
    }

    /// True when `overall` matches the weighted composite of the sub-scores.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.overall == overall_score(self.foundation, self.development, self.marketing)
    }
}

/// Foundation score from a single idea potential on a 0..=10 scale.
#[must_use]
pub fn foundation_from_potential(potential: f64) -> i32 {
    clamp_score(potential * IDEA_POTENTIAL_SCALE)
}

/// Foundation score from discrete validation choices, normalized against the
/// best three achievable impacts.
#[must_use]
pub fn foundation_from_choices(choices: &[ValidationChoice]) -> i32 {
    let total: i32 = choices.iter().map(|choice| choice.impact).sum();
    clamp_score(f64::from(total) / VALIDATION_CHOICE_BASELINE * 100.0)
}

/// Derived team capability.
///
/// Average skill, minus half a point per member beyond three, plus one when
/// at least two distinct roles are present (minus one otherwise), capped at 9.
#[must_use]
pub fn team_skill(members: &[TeamMember]) -> f64 {
    if members.is_empty() {
        return 0.0;
    }
    let count = usize_to_f64(members.len());
    let average = members
        .iter()
        .map(|member| f64::from(member.skill))
        .sum::<f64>()
        / count;
    let oversize = members.len().saturating_sub(TEAM_SIZE_SOFT_CAP);
    let size_penalty = usize_to_f64(oversize) * TEAM_SIZE_PENALTY;
    let roles: HashSet<_> = members.iter().map(|member| member.role).collect();
    let diversity = if roles.len() >= ROLE_DIVERSITY_THRESHOLD {
        ROLE_DIVERSITY_BONUS
    } else {
        -ROLE_DIVERSITY_BONUS
    };
    (average - size_penalty + diversity).clamp(0.0, TEAM_SKILL_CAP)
}

/// Sum of `(user_value / complexity) * 10` over the selected features.
#[must_use]
pub fn feature_value(features: &[Feature]) -> f64 {
    features
        .iter()
        .filter(|feature| feature.complexity > 0)
        .map(|feature| {
            f64::from(feature.user_value) / f64::from(feature.complexity) * FEATURE_VALUE_SCALE
        })
        .sum()
}

/// Development score: half team strength, half feature value, each measured
/// against a three-item best case.
#[must_use]
pub fn development_score(members: &[TeamMember], features: &[Feature]) -> i32 {
    let team_total: f64 = members.iter().map(|member| f64::from(member.skill)).sum();
    let team_part = (team_total / DEVELOPMENT_TEAM_BASELINE).min(1.0) * DEVELOPMENT_HALF;
    let feature_part =
        (feature_value(features) / DEVELOPMENT_FEATURE_BASELINE).min(1.0) * DEVELOPMENT_HALF;
    clamp_score(team_part + feature_part)
}

/// Marketing score from channel reach and engagement, halved when nothing is
/// allocated.
#[must_use]
pub fn marketing_score(channels: &[MarketingChannel], allocated_budget: i64) -> i32 {
    let channel_total: u32 = channels
        .iter()
        .map(|channel| u32::from(channel.reach) + u32::from(channel.engagement))
        .sum();
    let efficiency = if allocated_budget > 0 {
        1.0
    } else {
        UNFUNDED_MARKETING_FACTOR
    };
    clamp_score(f64::from(channel_total) / CHANNEL_SCORE_BASELINE * 100.0 * efficiency)
}

/// Weighted composite: 30% foundation, 35% development, 35% marketing.
#[must_use]
pub fn overall_score(foundation: i32, development: i32, marketing: i32) -> i32 {
    clamp_score(
        f64::from(foundation) * FOUNDATION_WEIGHT
            + f64::from(development) * DEVELOPMENT_WEIGHT
            + f64::from(marketing) * MARKETING_WEIGHT,
    )
}
