use anyhow::{Context, Result, ensure};
use serde::Serialize;
use std::sync::Arc;

use venture_game::evaluation::assess_milestone;
use venture_game::{
    CampaignMetrics, CapabilityRule, EventKind, GameConfig, GameSession, GameState, GameVariant,
    MonthReport, OutcomeReport, Scores, Stage, StageOutcome, TaskStatus, catalog,
};

use super::strategy::Strategy;

/// Assertion hook run after a playthrough completes.
type RunExpectationFn = Arc<dyn Fn(&RunSummary) -> Result<()> + Send + Sync + 'static>;

#[derive(Clone)]
pub struct RunExpectation(RunExpectationFn);

impl std::fmt::Debug for RunExpectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunExpectation").finish()
    }
}

impl RunExpectation {
    pub fn evaluate(&self, summary: &RunSummary) -> Result<()> {
        (self.0)(summary)
    }
}

impl<F> From<F> for RunExpectation
where
    F: Fn(&RunSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self(Arc::new(f))
    }
}

/// What a scenario plays and what it expects afterwards.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub strategy: Strategy,
    pub variant: GameVariant,
    pub rule: CapabilityRule,
    /// Stop after this many months and close the run early.
    pub months: Option<u32>,
    /// Play every seed twice and require identical end states.
    pub replay: bool,
    pub expectations: Vec<RunExpectation>,
}

impl RunPlan {
    #[must_use]
    pub const fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            variant: GameVariant::Classic,
            rule: CapabilityRule::Lenient,
            months: None,
            replay: false,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_variant(mut self, variant: GameVariant) -> Self {
        self.variant = variant;
        self
    }

    #[must_use]
    pub const fn with_rule(mut self, rule: CapabilityRule) -> Self {
        self.rule = rule;
        self
    }

    #[must_use]
    pub const fn with_months(mut self, months: u32) -> Self {
        self.months = Some(months);
        self
    }

    #[must_use]
    pub const fn with_replay(mut self) -> Self {
        self.replay = true;
        self
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Into<RunExpectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }
}

/// Everything a playthrough produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub seed: u64,
    pub strategy: Strategy,
    pub variant: GameVariant,
    pub stage: Stage,
    pub scores: Scores,
    /// Validation booked the company into debt and an investor covered it.
    pub seed_funded: bool,
    pub hires: usize,
    pub features: usize,
    pub blocked_transitions: u32,
    pub operational_events: u32,
    pub campaign: Option<CampaignMetrics>,
    pub months: Vec<MonthReport>,
    pub on_track_months: usize,
    pub bailouts: usize,
    pub outcome: OutcomeReport,
    #[serde(skip)]
    pub final_state: GameState,
}

impl RunSummary {
    #[must_use]
    pub fn verdict(&self) -> &'static str {
        if self.outcome.success {
            "success"
        } else {
            "failure"
        }
    }
}

/// Plays whole sessions with a scripted strategy.
#[derive(Debug, Clone)]
pub struct GameRunner {
    base: GameConfig,
    verbose: bool,
}

impl GameRunner {
    /// Headless runners skip every delay; realtime ones honour the
    /// configured transition delay and tick periods.
    #[must_use]
    pub fn new(realtime: bool, verbose: bool) -> Self {
        let base = if realtime {
            GameConfig::default()
        } else {
            GameConfig::headless()
        };
        Self { base, verbose }
    }

    #[must_use]
    pub const fn verbose(&self) -> bool {
        self.verbose
    }

    fn config_for(&self, plan: &RunPlan) -> Result<GameConfig> {
        let mut config = self.base.clone();
        config.variant = plan.variant;
        config.stage.capability_rule = plan.rule;
        config.validate()?;
        Ok(config)
    }

    pub async fn play(&self, plan: &RunPlan, seed: u64) -> Result<RunSummary> {
        let catalog = catalog();
        let strategy = plan.strategy;
        let mut session = GameSession::new(self.config_for(plan)?, catalog.clone(), seed);
        let mut blocked_transitions = 0;
        let mut operational_events = 0;

        // Foundation
        let idea = strategy
            .pick_idea(catalog, session.state().resources.money)
            .context("catalog has no startup ideas")?;
        session
            .start_idea_validation(&idea.id)
            .with_context(|| format!("idea {} is not in the catalog", idea.id))?;
        let status = session.drive_idea_validation().await;
        ensure!(
            status == Some(TaskStatus::Committed),
            "idea validation ended as {status:?}"
        );
        log::debug!("seed {seed}: validated {}", idea.name);
        let seed_funded = session.state().event_count(EventKind::InvestmentReceived) > 0;
        Self::leave_stage(&mut session, &mut blocked_transitions).await?;

        // Build
        for member in strategy.roster(catalog) {
            if !Self::affordable(&session, member.cost, strategy) {
                continue;
            }
            if session.hire(&member.id).is_applied() {
                operational_events += Self::handle_operations(&mut session, strategy);
            }
        }
        let mut shipped = 0;
        for feature in strategy.feature_order(catalog) {
            if shipped >= strategy.feature_target() {
                break;
            }
            if !session.state().can_build(feature)
                || !Self::affordable(&session, feature.cost, strategy)
            {
                continue;
            }
            if session.add_feature(&feature.id).is_applied() {
                shipped += 1;
                operational_events += Self::handle_operations(&mut session, strategy);
            }
        }
        let hires = session.state().team_members.len();
        let features = session.state().features.len();
        Self::leave_stage(&mut session, &mut blocked_transitions).await?;

        // Launch
        for channel in strategy.channels(catalog) {
            let state = session.state();
            if state.marketing.allocated() + channel.min_cost > state.resources.money {
                continue;
            }
            if !session.toggle_channel(&channel.id).is_applied() {
                continue;
            }
            if let Some(extra) = strategy.channel_budget() {
                let _ = session.set_channel_budget(&channel.id, channel.min_cost + extra);
            }
        }
        if session.can_make_decision() && session.confirm_marketing_strategy().is_applied() {
            let _token = session.start_campaign();
            session.drive_campaign().await;
        }
        let campaign = session.campaign_metrics();

        let limit = plan.months.unwrap_or(u32::MAX);
        let mut months = Vec::new();
        while u32::try_from(months.len()).unwrap_or(u32::MAX) < limit {
            let decision = strategy.monthly_decision(&session.recommend_decision());
            let Some(report) = session.advance_month(&decision) else {
                break;
            };
            if let Some(change) = report.metrics.revenue_change(&report.previous) {
                log::debug!("month {}: revenue {:+.1}%", report.month, change * 100.0);
            }
            months.push(report);
        }
        let outcome = session.finish_run();

        let on_track_months = months
            .iter()
            .filter(|report| {
                assess_milestone(&report.metrics, report.users_after, report.month).on_track()
            })
            .count();
        let bailouts = months.iter().filter(|report| report.bailout.is_some()).count();
        let final_state = session.into_state();

        Ok(RunSummary {
            seed,
            strategy,
            variant: plan.variant,
            stage: final_state.stage,
            scores: final_state.scores,
            seed_funded,
            hires,
            features,
            blocked_transitions,
            operational_events,
            campaign,
            months,
            on_track_months,
            bailouts,
            outcome,
            final_state,
        })
    }

    fn affordable(session: &GameSession, cost: i64, strategy: Strategy) -> bool {
        session.state().resources.money - cost >= strategy.reserve()
    }

    async fn next_stage(session: &mut GameSession) -> Result<StageOutcome> {
        let ticket = session.begin_stage_transition()?;
        let delay = session.stage_flow().delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(session.finish_stage_transition(ticket)?)
    }

    /// Advance one stage, dropping features the team cannot carry when the
    /// capability scan blocks.
    async fn leave_stage(session: &mut GameSession, blocked: &mut u32) -> Result<()> {
        let from = session.state().stage;
        for _ in 0..2 {
            match Self::next_stage(session).await? {
                StageOutcome::Advanced { to, .. } => {
                    log::debug!("seed {}: {from} -> {to}", session.seed());
                    return Ok(());
                }
                StageOutcome::Blocked { feature_ids } => {
                    *blocked += 1;
                    log::debug!("transition blocked by {}", feature_ids.join(", "));
                    for id in &feature_ids {
                        let _ = session.remove_feature(id);
                    }
                }
            }
        }
        anyhow::bail!("could not leave the {from} stage")
    }

    fn handle_operations(session: &mut GameSession, strategy: Strategy) -> u32 {
        let Some(event) = session.roll_operational_event() else {
            return 0;
        };
        match strategy.option_for(&event) {
            Some(option) => {
                let _ = session.resolve_operational_event(&option);
            }
            None => {
                let _ = session.dismiss_event();
            }
        }
        1
    }
}
