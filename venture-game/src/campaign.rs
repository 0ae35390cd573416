//! Launch-stage marketing: channel selection, budget allocation, strategy
//! confirmation and the timed launch campaign.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::catalog::{MarketingChannel, Role};
use crate::constants::{
    CAMPAIGN_BUDGET_DIVISOR, CAMPAIGN_BUDGET_MULTIPLIER_CAP, CAMPAIGN_CLICK_RATE,
    CAMPAIGN_CONVERSION_RATE, CAMPAIGN_ENGAGEMENT_DIVISOR, CAMPAIGN_FEATURE_BONUS,
    CAMPAIGN_FOLLOW_RATE, CAMPAIGN_IMPRESSIONS_PER_REACH, CAMPAIGN_MARKETER_BONUS,
    CAMPAIGN_POOR_CONVERSIONS, CAMPAIGN_RANDOM_MAX, CAMPAIGN_RANDOM_MIN, CAMPAIGN_SUCCESS_BONUS,
    CAMPAIGN_SUCCESS_CONVERSIONS, CAMPAIGN_TICKS, CAMPAIGN_VIRAL_IMPRESSIONS,
    MARKETING_EFFECTIVENESS_DIVISOR, MAX_MARKETING_CHANNELS, MIN_CHANNELS_FOR_DECISION,
    MIN_MARKETING_BUDGET, PROGRESS_COMPLETE,
};
use crate::events::{EventKind, EventSeverity, GameEvent};
use crate::ledger::FinanceChange;
use crate::numbers::{i64_to_f64, round_f64_to_i64, round_f64_to_u64, u64_to_f64, usize_to_f64};
use crate::scoring;
use crate::state::{ActionOutcome, GameState};
use crate::tasks::ProgressWork;

/// Selected channels and their budget split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MarketingPlan {
    #[serde(default)]
    pub channels: Vec<MarketingChannel>,
    #[serde(default)]
    pub allocations: BTreeMap<String, i64>,
    #[serde(default)]
    pub confirmed: bool,
    /// Final sample of the launch campaign, once it has run.
    #[serde(default)]
    pub campaign: Option<CampaignMetrics>,
}

impl MarketingPlan {
    #[must_use]
    pub fn allocated(&self) -> i64 {
        self.allocations.values().sum()
    }

    #[must_use]
    pub fn is_selected(&self, channel_id: &str) -> bool {
        self.channels.iter().any(|channel| channel.id == channel_id)
    }

    #[must_use]
    pub fn total_reach(&self) -> u32 {
        self.channels.iter().map(|c| u32::from(c.reach)).sum()
    }

    #[must_use]
    pub fn total_engagement(&self) -> u32 {
        self.channels.iter().map(|c| u32::from(c.engagement)).sum()
    }

    /// `sum(reach * engagement) / 100`, the growth lever used by the monthly
    /// simulation.
    #[must_use]
    pub fn effectiveness(&self) -> f64 {
        let product: u32 = self
            .channels
            .iter()
            .map(|c| u32::from(c.reach) * u32::from(c.engagement))
            .sum();
        f64::from(product) / MARKETING_EFFECTIVENESS_DIVISOR
    }
}

/// Select or deselect a channel. A new channel starts at its minimum cost.
pub fn toggle_channel(state: &mut GameState, channel: &MarketingChannel) -> ActionOutcome {
    let plan = &mut state.marketing;
    if plan.confirmed {
        log::debug!("marketing strategy already confirmed; ignoring toggle");
        return ActionOutcome::Ignored;
    }
    if plan.is_selected(&channel.id) {
        plan.channels.retain(|c| c.id != channel.id);
        plan.allocations.remove(&channel.id);
        return ActionOutcome::Applied;
    }
    if plan.channels.len() >= MAX_MARKETING_CHANNELS {
        state.trigger_event(GameEvent::too_many_channels(MAX_MARKETING_CHANNELS));
        return ActionOutcome::Rejected(EventKind::TooManyChannels);
    }
    plan.channels.push(channel.clone());
    plan.allocations.insert(channel.id.clone(), channel.min_cost);
    ActionOutcome::Applied
}

/// Set one channel's budget, clamped up to the channel minimum. The change is
/// rejected when the total allocation would exceed available money.
pub fn set_channel_budget(state: &mut GameState, channel_id: &str, amount: i64) -> ActionOutcome {
    if state.marketing.confirmed {
        return ActionOutcome::Ignored;
    }
    let Some(minimum) = state
        .marketing
        .channels
        .iter()
        .find(|c| c.id == channel_id)
        .map(|c| c.min_cost)
    else {
        return ActionOutcome::Ignored;
    };
    let amount = amount.max(minimum);
    let current = state
        .marketing
        .allocations
        .get(channel_id)
        .copied()
        .unwrap_or_default();
    let total = state.marketing.allocated() - current + amount;
    if total > state.resources.money {
        state.trigger_event(GameEvent::insufficient_budget(
            total,
            state.resources.money,
        ));
        return ActionOutcome::Rejected(EventKind::InsufficientBudget);
    }
    state
        .marketing
        .allocations
        .insert(channel_id.to_string(), amount);
    ActionOutcome::Applied
}

/// At least two channels, at least the minimum budget, and no more than the
/// money on hand.
#[must_use]
pub fn can_make_decision(state: &GameState) -> bool {
    let allocated = state.marketing.allocated();
    state.marketing.channels.len() >= MIN_CHANNELS_FOR_DECISION
        && allocated >= MIN_MARKETING_BUDGET
        && allocated <= state.resources.money
}

/// Lock in the strategy, score it and book the campaign spend.
pub fn confirm_strategy(state: &mut GameState) -> ActionOutcome {
    if state.marketing.confirmed {
        return ActionOutcome::Ignored;
    }
    let allocated = state.marketing.allocated();
    if allocated > state.resources.money {
        state.trigger_event(GameEvent::insufficient_budget(
            allocated,
            state.resources.money,
        ));
        return ActionOutcome::Rejected(EventKind::InsufficientBudget);
    }
    if !can_make_decision(state) {
        log::debug!(
            "strategy not ready: {} channel(s), ${allocated} allocated",
            state.marketing.channels.len()
        );
        return ActionOutcome::Ignored;
    }
    if let Err(err) = state.update_finances(&FinanceChange::MarketingCampaign { budget: allocated }) {
        log::warn!("marketing campaign not booked: {err}");
        return ActionOutcome::Ignored;
    }
    let score = scoring::marketing_score(&state.marketing.channels, allocated);
    state.update_marketing_score(score);
    state.choices.marketing_channels = state
        .marketing
        .channels
        .iter()
        .map(|c| c.id.clone())
        .collect();
    state.choices.budget_allocation = state.marketing.allocations.clone();
    state.marketing.confirmed = true;
    log::info!("marketing strategy confirmed: ${allocated}, score {score}");
    ActionOutcome::Applied
}

/// Inputs to the campaign model, captured when the campaign starts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CampaignInputs {
    pub total_reach: u32,
    pub total_engagement: u32,
    pub budget: i64,
    pub marketers: usize,
    pub features: usize,
}

impl CampaignInputs {
    #[must_use]
    pub fn from_state(state: &GameState) -> Self {
        Self {
            total_reach: state.marketing.total_reach(),
            total_engagement: state.marketing.total_engagement(),
            budget: state.marketing.allocated(),
            marketers: state
                .team_members
                .iter()
                .filter(|member| member.role == Role::Marketer)
                .count(),
            features: state.features.len(),
        }
    }

    #[must_use]
    pub fn budget_multiplier(&self) -> f64 {
        (i64_to_f64(self.budget) / CAMPAIGN_BUDGET_DIVISOR).min(CAMPAIGN_BUDGET_MULTIPLIER_CAP)
    }

    #[must_use]
    pub fn team_bonus(&self) -> f64 {
        1.0 + usize_to_f64(self.marketers) * CAMPAIGN_MARKETER_BONUS
    }

    #[must_use]
    pub fn feature_bonus(&self) -> f64 {
        1.0 + usize_to_f64(self.features) * CAMPAIGN_FEATURE_BONUS
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CampaignMetrics {
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: u64,
    pub followers: u64,
}

impl CampaignMetrics {
    /// Model output for one random factor.
    #[must_use]
    pub fn sample(inputs: &CampaignInputs, factor: f64) -> Self {
        let impressions = f64::from(inputs.total_reach)
            * CAMPAIGN_IMPRESSIONS_PER_REACH
            * inputs.budget_multiplier()
            * inputs.team_bonus();
        let clicks = impressions
            * (f64::from(inputs.total_engagement) / CAMPAIGN_ENGAGEMENT_DIVISOR)
            * CAMPAIGN_CLICK_RATE
            * inputs.feature_bonus();
        let conversions = clicks * CAMPAIGN_CONVERSION_RATE * inputs.team_bonus();
        let followers = impressions * CAMPAIGN_FOLLOW_RATE * inputs.feature_bonus();
        Self {
            impressions: round_f64_to_u64(impressions * factor),
            clicks: round_f64_to_u64(clicks * factor),
            conversions: round_f64_to_u64(conversions * factor),
            followers: round_f64_to_u64(followers * factor),
        }
    }

    #[must_use]
    pub fn sample_with<R: Rng>(inputs: &CampaignInputs, rng: &mut R) -> Self {
        let factor = rng.gen_range(CAMPAIGN_RANDOM_MIN..=CAMPAIGN_RANDOM_MAX);
        Self::sample(inputs, factor)
    }

    /// Points added to the raw score when the campaign ends.
    #[must_use]
    pub fn performance_score(&self) -> i64 {
        round_f64_to_i64(
            u64_to_f64(self.impressions) / 1_000.0 * 0.1
                + u64_to_f64(self.clicks) / 100.0 * 0.5
                + u64_to_f64(self.conversions) * 2.0
                + u64_to_f64(self.followers) / 10.0 * 0.3,
        )
    }

    #[must_use]
    pub const fn verdict(&self) -> EventKind {
        if self.conversions > CAMPAIGN_SUCCESS_CONVERSIONS {
            EventKind::CampaignSuccess
        } else if self.conversions < CAMPAIGN_POOR_CONVERSIONS {
            EventKind::CampaignPoor
        } else {
            EventKind::CampaignModerate
        }
    }

    #[must_use]
    pub const fn went_viral(&self) -> bool {
        self.impressions > CAMPAIGN_VIRAL_IMPRESSIONS
    }
}

fn campaign_event(metrics: &CampaignMetrics, marketing_score: i32) -> GameEvent {
    let conversions = metrics.conversions;
    let (severity, title, description) = match metrics.verdict() {
        EventKind::CampaignSuccess => (
            EventSeverity::Success,
            "Campaign Success!",
            format!(
                "Your campaign generated {conversions} conversions. Marketing score: {marketing_score}/100. Your startup is gaining real traction!"
            ),
        ),
        EventKind::CampaignPoor => (
            EventSeverity::Warning,
            "Campaign Needs Improvement",
            format!(
                "Only {conversions} conversions. Marketing score: {marketing_score}/100. Consider adjusting your strategy or increasing budget."
            ),
        ),
        _ => (
            EventSeverity::Info,
            "Campaign Complete",
            format!(
                "Your campaign generated {conversions} conversions. Marketing score: {marketing_score}/100. Solid start with room to grow."
            ),
        ),
    };
    GameEvent::new(metrics.verdict(), severity, title, description).with_payload(
        serde_json::json!({
            "impressions": metrics.impressions,
            "clicks": metrics.clicks,
            "conversions": conversions,
            "followers": metrics.followers,
            "marketing_score": marketing_score,
        }),
    )
}

/// Ten ticks of re-sampled metrics. The last sample is the result.
#[derive(Debug, Clone)]
pub struct CampaignWork<R> {
    inputs: CampaignInputs,
    rng: R,
    ticks: u8,
    latest: CampaignMetrics,
}

impl<R: Rng> CampaignWork<R> {
    #[must_use]
    pub fn new(inputs: CampaignInputs, rng: R) -> Self {
        Self {
            inputs,
            rng,
            ticks: 0,
            latest: CampaignMetrics::default(),
        }
    }

    /// Most recent live sample.
    #[must_use]
    pub const fn latest(&self) -> &CampaignMetrics {
        &self.latest
    }
}

impl<R: Rng> ProgressWork for CampaignWork<R> {
    type Output = CampaignMetrics;

    fn step(&mut self) -> Option<CampaignMetrics> {
        if self.ticks >= CAMPAIGN_TICKS {
            return Some(self.latest);
        }
        self.latest = CampaignMetrics::sample_with(&self.inputs, &mut self.rng);
        self.ticks += 1;
        (self.ticks >= CAMPAIGN_TICKS).then_some(self.latest)
    }

    fn progress(&self) -> u8 {
        self.ticks.saturating_mul(PROGRESS_COMPLETE / CAMPAIGN_TICKS)
    }

    fn commit(metrics: CampaignMetrics, state: &mut GameState) {
        let marketing_score =
            scoring::marketing_score(&state.marketing.channels, state.marketing.allocated());
        state.update_marketing_score(marketing_score);
        state.update_score(metrics.performance_score());
        if metrics.verdict() == EventKind::CampaignSuccess {
            state.update_score(CAMPAIGN_SUCCESS_BONUS);
        }
        log::info!(
            "launch campaign finished: {} conversions, {} impressions{}",
            metrics.conversions,
            metrics.impressions,
            if metrics.went_viral() { " (viral)" } else { "" }
        );
        state.marketing.campaign = Some(metrics);
        state.trigger_event(campaign_event(&metrics, marketing_score));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::catalog;
    use crate::tasks::{TaskStatus, TimedTask};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use std::time::Duration;

    fn channel(id: &str) -> MarketingChannel {
        catalog().channel(id).unwrap().clone()
    }

    #[test]
    fn fourth_channel_is_refused() {
        let mut state = GameState::default();
        for id in ["instagram", "tiktok", "youtube"] {
            assert!(toggle_channel(&mut state, &channel(id)).is_applied());
        }
        let outcome = toggle_channel(&mut state, &channel("facebook"));
        assert_eq!(outcome, ActionOutcome::Rejected(EventKind::TooManyChannels));
        assert_eq!(state.marketing.channels.len(), 3);
        assert_eq!(state.marketing.allocated(), 3_300);
    }

    #[test]
    fn toggling_twice_deselects() {
        let mut state = GameState::default();
        let _ = toggle_channel(&mut state, &channel("tiktok"));
        let _ = toggle_channel(&mut state, &channel("tiktok"));
        assert!(state.marketing.channels.is_empty());
        assert!(state.marketing.allocations.is_empty());
    }

    #[test]
    fn budget_clamps_to_channel_minimum() {
        let mut state = GameState::default();
        let _ = toggle_channel(&mut state, &channel("youtube"));
        assert!(set_channel_budget(&mut state, "youtube", 200).is_applied());
        assert_eq!(state.marketing.allocations["youtube"], 1_500);
        assert_eq!(set_channel_budget(&mut state, "tiktok", 5_000), ActionOutcome::Ignored);
    }

    #[test]
    fn overspend_is_rejected_without_change() {
        let mut state = GameState::default();
        let _ = toggle_channel(&mut state, &channel("instagram"));
        let outcome = set_channel_budget(&mut state, "instagram", 250_000);
        assert_eq!(outcome, ActionOutcome::Rejected(EventKind::InsufficientBudget));
        assert_eq!(state.marketing.allocations["instagram"], 1_000);
    }

    #[test]
    fn confirm_scores_and_books_spend() {
        let mut state = GameState::default();
        let _ = toggle_channel(&mut state, &channel("instagram"));
        assert!(!can_make_decision(&state));
        assert_eq!(confirm_strategy(&mut state), ActionOutcome::Ignored);

        let _ = toggle_channel(&mut state, &channel("tiktok"));
        let _ = set_channel_budget(&mut state, "instagram", 2_200);
        assert!(can_make_decision(&state));
        assert!(confirm_strategy(&mut state).is_applied());
        assert_eq!(state.scores.marketing, 63);
        assert_eq!(state.resources.money, 97_000);
        assert_eq!(state.finances.expenses.marketing, 3_000);
        assert_eq!(
            state.choices.marketing_channels,
            vec!["instagram".to_string(), "tiktok".to_string()]
        );
        assert_eq!(toggle_channel(&mut state, &channel("youtube")), ActionOutcome::Ignored);
    }

    #[test]
    fn sample_follows_launch_model() {
        let inputs = CampaignInputs {
            total_reach: 17,
            total_engagement: 17,
            budget: 3_000,
            marketers: 1,
            features: 3,
        };
        let metrics = CampaignMetrics::sample(&inputs, 1.0);
        // 17 * 1000 * 1 * 1.3
        assert_eq!(metrics.impressions, 22_100);
        // 22100 * 0.17 * 0.02 * 1.3
        assert_eq!(metrics.clicks, 98);
        assert_eq!(metrics.conversions, 6);
        assert_eq!(metrics.followers, 29);
        assert_eq!(metrics.verdict(), EventKind::CampaignPoor);
        assert!(!metrics.went_viral());
    }

    #[test]
    fn performance_score_weights_each_metric() {
        let metrics = CampaignMetrics {
            impressions: 50_000,
            clicks: 1_000,
            conversions: 120,
            followers: 100,
        };
        // 5 + 5 + 240 + 3
        assert_eq!(metrics.performance_score(), 253);
        assert_eq!(metrics.verdict(), EventKind::CampaignSuccess);
    }

    #[test]
    fn campaign_runs_ten_ticks_then_commits() {
        let mut state = GameState::default();
        let _ = toggle_channel(&mut state, &channel("instagram"));
        let _ = toggle_channel(&mut state, &channel("tiktok"));
        let _ = confirm_strategy(&mut state);
        let inputs = CampaignInputs::from_state(&state);
        let work = CampaignWork::new(inputs, ChaCha20Rng::seed_from_u64(11));
        let mut task = TimedTask::new(work, Duration::ZERO);
        for _ in 0..9 {
            assert!(task.tick().is_running());
        }
        assert_eq!(task.tick(), TaskStatus::Finished);
        let final_sample = *task.work().latest();
        assert!(task.commit(&mut state));
        assert_eq!(state.marketing.campaign, Some(final_sample));
        assert!(state.score >= final_sample.performance_score());
        let kind = state.current_event.as_ref().map(|e| e.kind);
        assert_eq!(kind, Some(final_sample.verdict()));
    }
}
