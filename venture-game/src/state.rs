use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::campaign::MarketingPlan;
use crate::catalog::{Feature, OperationalEvent, StartupIdea, TeamMember, ValidationChoice};
use crate::constants::{
    CLASSIC_STARTING_MONEY, FEATURE_GATE_MULTIPLIER, FINAL_STAGE_NUMBER, FIRST_MONTH,
    LEAN_STARTING_MONEY, MORALE_ADD_FEATURE_DELTA, MORALE_HIRE_DELTA, MORALE_MAX, MORALE_MIN,
    MORALE_RELEASE_DELTA, MORALE_REMOVE_FEATURE_DELTA, SCORE_MAX, SCORE_MIN, STARTING_TIME_DAYS,
    STARTING_USERS, TEAM_SKILL_CAP,
};
use crate::evaluation::OutcomeReport;
use crate::events::{EventKind, GameEvent};
use crate::ledger::{self, FinanceChange, Finances, LedgerError, ResourcePatch, Resources};
use crate::numbers::i64_to_f64;
use crate::progression::MonthlyMetrics;
use crate::scoring::{self, Scores};
use crate::stage::Stage;

/// Starting capital preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GameVariant {
    #[default]
    Classic,
    Lean,
}

impl GameVariant {
    #[must_use]
    pub const fn starting_money(self) -> i64 {
        match self {
            Self::Classic => CLASSIC_STARTING_MONEY,
            Self::Lean => LEAN_STARTING_MONEY,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Classic => "classic",
            Self::Lean => "lean",
        }
    }
}

impl fmt::Display for GameVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameVariant {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "classic" => Ok(Self::Classic),
            "lean" => Ok(Self::Lean),
            _ => Err(()),
        }
    }
}

/// How the idea was validated, if at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ValidationRecord {
    #[default]
    Pending,
    Potential {
        potential: f64,
    },
    Choices {
        choice_ids: Vec<u8>,
    },
}

impl ValidationRecord {
    #[must_use]
    pub const fn is_validated(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Player decisions, the canonical input to scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Choices {
    #[serde(default)]
    pub idea_id: Option<String>,
    #[serde(default)]
    pub validation: ValidationRecord,
    #[serde(default)]
    pub team_members: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub marketing_channels: Vec<String>,
    #[serde(default)]
    pub budget_allocation: BTreeMap<String, i64>,
}

/// Result of a player action. Rejections also raise an event on the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Applied,
    /// Duplicate or unknown id; nothing changed.
    Ignored,
    Rejected(EventKind),
}

impl ActionOutcome {
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Complete session state. One owner, one writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub variant: GameVariant,
    pub stage: Stage,
    pub current_stage: u8,
    pub completed: bool,
    /// Raw cumulative points used for narrative feedback.
    pub score: i64,
    pub scores: Scores,
    pub resources: Resources,
    pub morale: i32,
    pub team_members: Vec<TeamMember>,
    pub features: Vec<Feature>,
    pub team_skill: f64,
    /// Permanent bonus from resolved opportunities, added to the derived skill.
    #[serde(default)]
    pub skill_bonus: f64,
    /// Percentage-point swing on team efficiency from resolved disruptions.
    #[serde(default)]
    pub productivity_modifier: i32,
    pub finances: Finances,
    #[serde(default)]
    pub current_event: Option<GameEvent>,
    #[serde(default)]
    pub event_log: Vec<GameEvent>,
    /// Operational event awaiting an option choice.
    #[serde(default)]
    pub pending_operation: Option<OperationalEvent>,
    pub choices: Choices,
    #[serde(default)]
    pub idea: Option<StartupIdea>,
    #[serde(default)]
    pub marketing: MarketingPlan,
    pub month: u32,
    pub monthly_metrics: MonthlyMetrics,
    pub previous_metrics: MonthlyMetrics,
    #[serde(default)]
    pub outcome: Option<OutcomeReport>,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(GameVariant::default())
    }
}

impl GameState {
    #[must_use]
    pub fn new(variant: GameVariant) -> Self {
        Self {
            variant,
            stage: Stage::Foundation,
            current_stage: Stage::Foundation.number(),
            completed: false,
            score: 0,
            scores: Scores::default(),
            resources: Resources {
                money: variant.starting_money(),
                time: STARTING_TIME_DAYS,
                users: STARTING_USERS,
            },
            morale: MORALE_MAX,
            team_members: Vec::new(),
            features: Vec::new(),
            team_skill: 0.0,
            skill_bonus: 0.0,
            productivity_modifier: 0,
            finances: Finances::default(),
            current_event: None,
            event_log: Vec::new(),
            pending_operation: None,
            choices: Choices::default(),
            idea: None,
            marketing: MarketingPlan::default(),
            month: FIRST_MONTH,
            monthly_metrics: MonthlyMetrics::initial(),
            previous_metrics: MonthlyMetrics::initial(),
            outcome: None,
        }
    }

    /// Discard everything and start over with the same variant.
    pub fn reset(&mut self) {
        log::info!("resetting {} session", self.variant);
        *self = Self::new(self.variant);
    }

    pub fn update_score(&mut self, points: i64) {
        self.score += points;
        self.scores.refresh_overall();
    }

    /// Shallow merge. Negative money is a valid transient state.
    pub fn update_resources(&mut self, patch: ResourcePatch) {
        patch.apply_to(&mut self.resources);
    }

    pub fn update_morale(&mut self, delta: i32) {
        self.morale = self.morale.saturating_add(delta).clamp(MORALE_MIN, MORALE_MAX);
    }

    #[must_use]
    pub fn has_member(&self, member_id: &str) -> bool {
        self.team_members.iter().any(|member| member.id == member_id)
    }

    #[must_use]
    pub fn has_feature(&self, feature_id: &str) -> bool {
        self.features.iter().any(|feature| feature.id == feature_id)
    }

    pub fn add_team_member(&mut self, member: &TeamMember) -> ActionOutcome {
        if self.has_member(&member.id) {
            log::debug!("{} is already on the team", member.id);
            return ActionOutcome::Ignored;
        }
        if self.resources.money < member.cost {
            log::warn!(
                "cannot hire {}: cost {} exceeds money {}",
                member.id,
                member.cost,
                self.resources.money
            );
            self.trigger_event(GameEvent::insufficient_funds(
                &member.name,
                member.cost,
                self.resources.money,
            ));
            return ActionOutcome::Rejected(EventKind::InsufficientFunds);
        }
        let change = FinanceChange::HireTeamMember {
            member_id: member.id.clone(),
            cost: member.cost,
            monthly_cost: member.monthly_cost(),
        };
        if !self.apply_ledger(&change) {
            return ActionOutcome::Ignored;
        }
        self.team_members.push(member.clone());
        self.choices.team_members.push(member.id.clone());
        self.refresh_team();
        self.update_morale(MORALE_HIRE_DELTA);
        log::debug!(
            "hired {} ({}), team skill now {:.1}",
            member.name,
            member.role,
            self.team_skill
        );
        ActionOutcome::Applied
    }

    pub fn remove_team_member(&mut self, member_id: &str) -> ActionOutcome {
        if !self.has_member(member_id) {
            return ActionOutcome::Ignored;
        }
        let change = FinanceChange::ReleaseTeamMember {
            member_id: member_id.to_string(),
        };
        if !self.apply_ledger(&change) {
            return ActionOutcome::Ignored;
        }
        self.team_members.retain(|member| member.id != member_id);
        self.choices.team_members.retain(|id| id != member_id);
        self.refresh_team();
        self.update_morale(MORALE_RELEASE_DELTA);
        log::debug!("released {member_id}, team skill now {:.1}", self.team_skill);
        ActionOutcome::Applied
    }

    /// Whether the current team can take on a feature of this complexity.
    #[must_use]
    pub fn can_build(&self, feature: &Feature) -> bool {
        self.team_skill * FEATURE_GATE_MULTIPLIER >= f64::from(feature.complexity)
    }

    pub fn add_feature(&mut self, feature: &Feature) -> ActionOutcome {
        if self.has_feature(&feature.id) {
            log::debug!("{} is already in the product", feature.id);
            return ActionOutcome::Ignored;
        }
        if !self.can_build(feature) {
            log::warn!(
                "feature {} rejected: complexity {} exceeds team capability {:.1}",
                feature.id,
                feature.complexity,
                self.team_skill * FEATURE_GATE_MULTIPLIER
            );
            self.trigger_event(GameEvent::complexity_warning(feature, self.team_skill));
            return ActionOutcome::Rejected(EventKind::ComplexityWarning);
        }
        if self.resources.money < feature.cost {
            self.trigger_event(GameEvent::insufficient_funds(
                &feature.name,
                feature.cost,
                self.resources.money,
            ));
            return ActionOutcome::Rejected(EventKind::InsufficientFunds);
        }
        if self.resources.time < feature.time_required {
            self.trigger_event(GameEvent::insufficient_time(
                &feature.name,
                feature.time_required,
                self.resources.time,
            ));
            return ActionOutcome::Rejected(EventKind::InsufficientTime);
        }
        let change = FinanceChange::AddFeature {
            feature_id: feature.id.clone(),
            development_cost: feature.cost,
            time_cost: feature.time_required,
            maintenance_cost: feature.maintenance_cost,
        };
        if !self.apply_ledger(&change) {
            return ActionOutcome::Ignored;
        }
        self.features.push(feature.clone());
        self.choices.features.push(feature.id.clone());
        self.refresh_development();
        self.update_morale(MORALE_ADD_FEATURE_DELTA);
        log::debug!("added feature {}", feature.id);
        ActionOutcome::Applied
    }

    pub fn remove_feature(&mut self, feature_id: &str) -> ActionOutcome {
        if !self.has_feature(feature_id) {
            return ActionOutcome::Ignored;
        }
        let change = FinanceChange::RemoveFeature {
            feature_id: feature_id.to_string(),
        };
        if !self.apply_ledger(&change) {
            return ActionOutcome::Ignored;
        }
        self.features.retain(|feature| feature.id != feature_id);
        self.choices.features.retain(|id| id != feature_id);
        self.refresh_development();
        self.update_morale(MORALE_REMOVE_FEATURE_DELTA);
        log::debug!("removed feature {feature_id}");
        ActionOutcome::Applied
    }

    /// Record the idea the player is pursuing.
    pub fn select_idea(&mut self, idea: &StartupIdea) {
        self.choices.idea_id = Some(idea.id.clone());
        self.idea = Some(idea.clone());
    }

    /// Potential-based validation. Calling again with the same potential is a no-op.
    pub fn validate_idea(&mut self, potential: f64) {
        self.scores.foundation = scoring::foundation_from_potential(potential);
        self.choices.validation = ValidationRecord::Potential { potential };
        self.scores.refresh_overall();
        log::debug!("idea validated, foundation score {}", self.scores.foundation);
    }

    /// Choice-based validation.
    pub fn validate_with_choices(&mut self, choices: &[ValidationChoice]) {
        self.scores.foundation = scoring::foundation_from_choices(choices);
        self.choices.validation = ValidationRecord::Choices {
            choice_ids: choices.iter().map(|choice| choice.id).collect(),
        };
        self.scores.refresh_overall();
    }

    /// Overwrite the marketing sub-score.
    pub fn update_marketing_score(&mut self, score: i32) {
        self.scores.marketing = score.clamp(SCORE_MIN, SCORE_MAX);
        self.scores.refresh_overall();
    }

    /// Apply a ledger transaction. The state is unchanged on error.
    ///
    /// # Errors
    ///
    /// Propagates `LedgerError` from [`ledger::apply`].
    pub fn update_finances(&mut self, change: &FinanceChange) -> Result<(), LedgerError> {
        let (finances, resources) = ledger::apply(&self.finances, &self.resources, change)?;
        self.finances = finances;
        self.resources = resources;
        log::debug!(
            "{} applied, money now {}",
            change.label(),
            self.resources.money
        );
        Ok(())
    }

    fn apply_ledger(&mut self, change: &FinanceChange) -> bool {
        match self.update_finances(change) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("{} ignored: {err}", change.label());
                false
            }
        }
    }

    /// Put an event in the live slot. A pending event is overwritten.
    pub fn trigger_event(&mut self, event: GameEvent) {
        if let Some(previous) = &self.current_event {
            log::debug!(
                "event {} replaced unresolved {}",
                event.kind,
                previous.kind
            );
        }
        self.event_log.push(event.clone());
        self.current_event = Some(event);
    }

    /// Dismiss the live event.
    pub fn resolve_event(&mut self) -> Option<GameEvent> {
        self.current_event.take()
    }

    /// Number of logged events of one kind.
    #[must_use]
    pub fn event_count(&self, kind: EventKind) -> usize {
        self.event_log.iter().filter(|event| event.kind == kind).count()
    }

    /// Add a permanent skill bonus and re-derive team skill.
    pub fn apply_skill_bonus(&mut self, bonus: f64) {
        self.skill_bonus += bonus;
        self.refresh_team();
    }

    /// Monthly outflow committed so far.
    #[must_use]
    pub const fn burn_rate(&self) -> i64 {
        self.finances.burn_rate()
    }

    /// Months of money left at the current burn rate.
    #[must_use]
    pub fn runway_months(&self) -> Option<f64> {
        let burn = self.burn_rate();
        if burn <= 0 {
            return None;
        }
        Some(i64_to_f64(self.resources.money.max(0)) / i64_to_f64(burn))
    }

    pub(crate) fn advance_stage(&mut self) -> Option<Stage> {
        let next = self.stage.next()?;
        log::info!("stage {} -> {}", self.stage, next);
        self.stage = next;
        self.current_stage = self.current_stage.saturating_add(1);
        self.completed = self.current_stage >= FINAL_STAGE_NUMBER;
        Some(next)
    }

    fn refresh_team(&mut self) {
        self.team_skill =
            (scoring::team_skill(&self.team_members) + self.skill_bonus).clamp(0.0, TEAM_SKILL_CAP);
        self.refresh_development();
    }

    fn refresh_development(&mut self) {
        self.scores.development = scoring::development_score(&self.team_members, &self.features);
        self.scores.refresh_overall();
    }

    /// Structural invariants that hold after every operation.
    #[must_use]
    pub fn invariants_hold(&self) -> bool {
        let unique_members = self
            .team_members
            .iter()
            .map(|member| member.id.as_str())
            .collect::<HashSet<_>>()
            .len()
            == self.team_members.len();
        let unique_features = self
            .features
            .iter()
            .map(|feature| feature.id.as_str())
            .collect::<HashSet<_>>()
            .len()
            == self.features.len();
        unique_members
            && unique_features
            && (MORALE_MIN..=MORALE_MAX).contains(&self.morale)
            && self.scores.is_consistent()
    }
}
