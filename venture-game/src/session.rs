//! A playable session: state, catalog, configuration, seeded randomness and
//! the in-flight timed work, behind id-based player actions.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::time::Duration;

use crate::analytics::{self, BuildReport, FeatureReadiness};
use crate::campaign::{self, CampaignInputs, CampaignMetrics, CampaignWork};
use crate::catalog::{Catalog, OperationalEvent, ValidationChoice};
use crate::config::GameConfig;
use crate::evaluation::{self, MilestoneProgress, OutcomeReport};
use crate::events::GameEvent;
use crate::operations;
use crate::progression::{self, DecisionAdvice, MonthReport, MonthlyDecision};
use crate::stage::{StageFlow, StageFlowError, StageOutcome, TransitionTicket};
use crate::state::{ActionOutcome, GameState};
use crate::tasks::{CancellationToken, TaskStatus, TimedTask};
use crate::validation::ValidationWork;

pub struct GameSession {
    state: GameState,
    config: GameConfig,
    catalog: Catalog,
    seed: u64,
    rng: ChaCha20Rng,
    flow: StageFlow,
    validation: Option<TimedTask<ValidationWork>>,
    campaign: Option<TimedTask<CampaignWork<ChaCha20Rng>>>,
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("seed", &self.seed)
            .field("stage", &self.state.stage)
            .field("month", &self.state.month)
            .field("flow", &self.flow)
            .field("validation", &self.validation)
            .field("campaign", &self.campaign)
            .finish_non_exhaustive()
    }
}

impl GameSession {
    #[must_use]
    pub fn new(config: GameConfig, catalog: Catalog, seed: u64) -> Self {
        let flow = StageFlow::new(
            config.stage.transition_delay(),
            config.stage.capability_rule,
        );
        Self {
            state: GameState::new(config.variant),
            config,
            catalog,
            seed,
            rng: ChaCha20Rng::seed_from_u64(seed),
            flow,
            validation: None,
            campaign: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &GameState {
        &self.state
    }

    pub const fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    /// Apply a closure to the mutable game state.
    pub fn with_state_mut<R>(&mut self, f: impl FnOnce(&mut GameState) -> R) -> R {
        f(&mut self.state)
    }

    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub const fn stage_flow(&self) -> &StageFlow {
        &self.flow
    }

    /// Deterministically reseed the session.
    pub fn reseed(&mut self, seed: u64) {
        self.seed = seed;
        self.rng = ChaCha20Rng::seed_from_u64(seed);
    }

    /// Consume the session, returning the underlying game state.
    #[must_use]
    pub fn into_state(self) -> GameState {
        self.state
    }

    /// Start over: fresh state, no pending work, same seed.
    pub fn reset(&mut self) {
        self.cancel_tasks();
        self.flow.cancel();
        self.state.reset();
        self.rng = ChaCha20Rng::seed_from_u64(self.seed);
    }

    /// Dismiss the live event. Running tasks are unaffected; a dismissed
    /// operational event is dropped without applying an option.
    pub fn dismiss_event(&mut self) -> Option<GameEvent> {
        operations::dismiss_event(&mut self.state)
    }

    // Foundation -----------------------------------------------------------

    pub fn select_idea(&mut self, idea_id: &str) -> ActionOutcome {
        let Some(idea) = self.catalog.idea(idea_id) else {
            return ActionOutcome::Ignored;
        };
        self.state.select_idea(idea);
        ActionOutcome::Applied
    }

    /// Begin researching an idea. Any validation already running is
    /// cancelled first.
    pub fn start_idea_validation(&mut self, idea_id: &str) -> Option<CancellationToken> {
        let idea = self.catalog.idea(idea_id)?.clone();
        if let Some(mut previous) = self.validation.take() {
            previous.cancel();
        }
        self.state.select_idea(&idea);
        let period = Duration::from_millis(self.config.timing.validation_tick_ms);
        let task = TimedTask::new(ValidationWork::new(idea), period);
        let token = task.token();
        self.validation = Some(task);
        Some(token)
    }

    /// Advance the validation by one tick, committing it once complete.
    pub fn tick_validation(&mut self) -> Option<TaskStatus> {
        let task = self.validation.as_mut()?;
        let mut status = task.tick();
        if status == TaskStatus::Finished && task.commit(&mut self.state) {
            status = TaskStatus::Committed;
            self.close_seed_round();
        }
        if !status.is_running() {
            self.validation = None;
        }
        Some(status)
    }

    /// Run the validation to the end without waiting.
    pub fn finish_idea_validation(&mut self) -> Option<TaskStatus> {
        loop {
            let status = self.tick_validation()?;
            if !status.is_running() {
                return Some(status);
            }
        }
    }

    /// Tick the validation on its configured period, then commit it.
    #[cfg(feature = "async")]
    pub async fn drive_idea_validation(&mut self) -> Option<TaskStatus> {
        let mut task = self.validation.take()?;
        let mut status = task.drive().await;
        if status == TaskStatus::Finished && task.commit(&mut self.state) {
            status = TaskStatus::Committed;
            self.close_seed_round();
        }
        Some(status)
    }

    fn close_seed_round(&mut self) {
        progression::seed_round(
            &mut self.state,
            &self.config.simulation,
            &self.catalog,
            &mut self.rng,
        );
    }

    #[must_use]
    pub fn validation_progress(&self) -> Option<u8> {
        self.validation.as_ref().map(|task| match task.status() {
            TaskStatus::Running { progress } => progress,
            _ => 100,
        })
    }

    /// Validate with discrete research choices. Unknown ids are ignored.
    pub fn validate_with_choices(&mut self, choice_ids: &[u8]) -> ActionOutcome {
        let picks: Option<Vec<ValidationChoice>> = choice_ids
            .iter()
            .map(|id| self.catalog.validation_choice(*id).cloned())
            .collect();
        match picks {
            Some(picks) if !picks.is_empty() => {
                self.state.validate_with_choices(&picks);
                ActionOutcome::Applied
            }
            _ => ActionOutcome::Ignored,
        }
    }

    // Build ----------------------------------------------------------------

    pub fn hire(&mut self, member_id: &str) -> ActionOutcome {
        match self.catalog.member(member_id) {
            Some(member) => self.state.add_team_member(member),
            None => ActionOutcome::Ignored,
        }
    }

    pub fn release(&mut self, member_id: &str) -> ActionOutcome {
        self.state.remove_team_member(member_id)
    }

    pub fn add_feature(&mut self, feature_id: &str) -> ActionOutcome {
        match self.catalog.feature(feature_id) {
            Some(feature) => self.state.add_feature(feature),
            None => ActionOutcome::Ignored,
        }
    }

    pub fn remove_feature(&mut self, feature_id: &str) -> ActionOutcome {
        self.state.remove_feature(feature_id)
    }

    pub fn roll_operational_event(&mut self) -> Option<OperationalEvent> {
        operations::roll_operational_event(&mut self.state, &self.catalog, &mut self.rng)
    }

    pub fn resolve_operational_event(&mut self, option_id: &str) -> ActionOutcome {
        operations::resolve_operational_event(&mut self.state, option_id)
    }

    #[must_use]
    pub fn build_report(&self) -> BuildReport {
        BuildReport::from_state(&self.state)
    }

    #[must_use]
    pub fn feature_readiness(&self, feature_id: &str) -> Option<FeatureReadiness> {
        let feature = self.catalog.feature(feature_id)?;
        Some(analytics::feature_readiness(feature, &self.state))
    }

    // Launch ---------------------------------------------------------------

    pub fn toggle_channel(&mut self, channel_id: &str) -> ActionOutcome {
        match self.catalog.channel(channel_id) {
            Some(channel) => campaign::toggle_channel(&mut self.state, channel),
            None => ActionOutcome::Ignored,
        }
    }

    pub fn set_channel_budget(&mut self, channel_id: &str, amount: i64) -> ActionOutcome {
        campaign::set_channel_budget(&mut self.state, channel_id, amount)
    }

    #[must_use]
    pub fn can_make_decision(&self) -> bool {
        campaign::can_make_decision(&self.state)
    }

    pub fn confirm_marketing_strategy(&mut self) -> ActionOutcome {
        campaign::confirm_strategy(&mut self.state)
    }

    /// Launch the campaign for a confirmed strategy. Only one campaign runs
    /// per session.
    pub fn start_campaign(&mut self) -> Option<CancellationToken> {
        if !self.state.marketing.confirmed
            || self.state.marketing.campaign.is_some()
            || self.campaign.is_some()
        {
            return None;
        }
        let inputs = CampaignInputs::from_state(&self.state);
        let rng = ChaCha20Rng::seed_from_u64(self.rng.next_u64());
        let period = Duration::from_millis(self.config.timing.campaign_tick_ms);
        let task = TimedTask::new(CampaignWork::new(inputs, rng), period);
        let token = task.token();
        self.campaign = Some(task);
        Some(token)
    }

    pub fn tick_campaign(&mut self) -> Option<TaskStatus> {
        let task = self.campaign.as_mut()?;
        let mut status = task.tick();
        if status == TaskStatus::Finished && task.commit(&mut self.state) {
            status = TaskStatus::Committed;
        }
        if !status.is_running() {
            self.campaign = None;
        }
        Some(status)
    }

    pub fn finish_campaign(&mut self) -> Option<TaskStatus> {
        loop {
            let status = self.tick_campaign()?;
            if !status.is_running() {
                return Some(status);
            }
        }
    }

    #[cfg(feature = "async")]
    pub async fn drive_campaign(&mut self) -> Option<TaskStatus> {
        let mut task = self.campaign.take()?;
        let mut status = task.drive().await;
        if status == TaskStatus::Finished && task.commit(&mut self.state) {
            status = TaskStatus::Committed;
        }
        Some(status)
    }

    /// Latest live sample while the campaign runs, then the final result.
    #[must_use]
    pub fn campaign_metrics(&self) -> Option<CampaignMetrics> {
        self.campaign
            .as_ref()
            .map(|task| *task.work().latest())
            .or(self.state.marketing.campaign)
    }

    /// Drop all timed work without writing its results.
    pub fn cancel_tasks(&mut self) {
        if let Some(mut task) = self.validation.take() {
            task.cancel();
        }
        if let Some(mut task) = self.campaign.take() {
            task.cancel();
        }
    }

    // Stage flow -----------------------------------------------------------

    /// Reserve the transition. Pair with [`Self::finish_stage_transition`]
    /// after the configured delay.
    ///
    /// # Errors
    ///
    /// See [`StageFlow::begin`].
    pub fn begin_stage_transition(&mut self) -> Result<TransitionTicket, StageFlowError> {
        self.flow.begin(&self.state)
    }

    /// # Errors
    ///
    /// See [`StageFlow::finish`].
    pub fn finish_stage_transition(
        &mut self,
        ticket: TransitionTicket,
    ) -> Result<StageOutcome, StageFlowError> {
        self.flow.finish(ticket, &mut self.state)
    }

    /// Transition with no delay.
    ///
    /// # Errors
    ///
    /// See [`StageFlow::begin`].
    pub fn next_stage_now(&mut self) -> Result<StageOutcome, StageFlowError> {
        let ticket = self.begin_stage_transition()?;
        self.finish_stage_transition(ticket)
    }

    /// Transition after the configured delay. The session is only borrowed
    /// around the two halves, so other callers may observe it meanwhile; a
    /// second call during the wait is rejected. Dropping the future before
    /// the delay elapses releases the transition.
    ///
    /// # Errors
    ///
    /// See [`StageFlow::begin`] and [`StageFlow::finish`].
    #[cfg(feature = "async")]
    pub async fn next_stage(
        session: &std::cell::RefCell<Self>,
    ) -> Result<StageOutcome, StageFlowError> {
        let (mut pending, delay) = {
            let mut guard = session.borrow_mut();
            let ticket = guard.begin_stage_transition()?;
            (PendingTransition::new(session, ticket), guard.flow.delay())
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match pending.ticket.take() {
            Some(ticket) => session.borrow_mut().finish_stage_transition(ticket),
            None => Err(StageFlowError::StaleTicket),
        }
    }

    // Monthly progression --------------------------------------------------

    pub fn advance_month(&mut self, decision: &MonthlyDecision) -> Option<MonthReport> {
        progression::advance_month(
            &mut self.state,
            decision,
            &self.config.simulation,
            &self.catalog,
            &mut self.rng,
        )
    }

    pub fn advance_months(&mut self, decision: &MonthlyDecision, months: u32) -> Vec<MonthReport> {
        progression::advance_months(
            &mut self.state,
            decision,
            months,
            &self.config.simulation,
            &self.catalog,
            &mut self.rng,
        )
    }

    /// End the run now and evaluate the latest month.
    pub fn finish_run(&mut self) -> OutcomeReport {
        progression::finish_run(&mut self.state)
    }

    #[must_use]
    pub fn recommend_decision(&self) -> DecisionAdvice {
        progression::recommend_decision(&self.state)
    }

    /// Progress against the objectives for the month being played.
    #[must_use]
    pub fn milestone_progress(&self) -> MilestoneProgress {
        evaluation::assess_milestone(
            &self.state.monthly_metrics,
            self.state.resources.users,
            self.state.month,
        )
    }
}

/// Releases an unfinished transition when `next_stage` is dropped mid-wait.
#[cfg(feature = "async")]
struct PendingTransition<'a> {
    session: &'a std::cell::RefCell<GameSession>,
    ticket: Option<TransitionTicket>,
}

#[cfg(feature = "async")]
impl<'a> PendingTransition<'a> {
    const fn new(session: &'a std::cell::RefCell<GameSession>, ticket: TransitionTicket) -> Self {
        Self {
            session,
            ticket: Some(ticket),
        }
    }
}

#[cfg(feature = "async")]
impl Drop for PendingTransition<'_> {
    fn drop(&mut self) {
        let Some(ticket) = self.ticket.take() else {
            return;
        };
        match self.session.try_borrow_mut() {
            Ok(mut session) => {
                session.flow.abandon(ticket);
            }
            Err(_) => log::warn!("stage transition dropped while the session was borrowed"),
        }
    }
}
