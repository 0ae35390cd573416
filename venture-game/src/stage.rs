//! Stage sequence and the gated transition between stages.
//!
//! A transition is split into `begin` and `finish` so a host can put a delay
//! between the two. Only one transition may be pending at a time; a second
//! `begin` while one is in flight is rejected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::catalog::Feature;
use crate::constants::{FEATURE_GATE_MULTIPLIER, MIN_FEATURES_FOR_LAUNCH, MIN_TEAM_FOR_LAUNCH};
use crate::events::GameEvent;
use crate::state::GameState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Foundation,
    Build,
    Launch,
}

impl Stage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Foundation => "foundation",
            Self::Build => "build",
            Self::Launch => "launch",
        }
    }

    /// One-based position in the sequence.
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::Foundation => 1,
            Self::Build => 2,
            Self::Launch => 3,
        }
    }

    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Foundation => Some(Self::Build),
            Self::Build => Some(Self::Launch),
            Self::Launch => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "foundation" => Ok(Self::Foundation),
            "build" => Ok(Self::Build),
            "launch" => Ok(Self::Launch),
            _ => Err(()),
        }
    }
}

/// How the transition scan compares features against team skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityRule {
    /// Block when `complexity * 2 > team_skill`.
    #[default]
    Strict,
    /// Block when `complexity > team_skill * 2`, mirroring the add-feature gate.
    Lenient,
}

impl CapabilityRule {
    #[must_use]
    pub fn blocks(self, feature: &Feature, team_skill: f64) -> bool {
        let complexity = f64::from(feature.complexity);
        match self {
            Self::Strict => complexity * FEATURE_GATE_MULTIPLIER > team_skill,
            Self::Lenient => complexity > team_skill * FEATURE_GATE_MULTIPLIER,
        }
    }
}

/// Features the current team cannot carry into the next stage.
#[must_use]
pub fn capability_blockers(state: &GameState, rule: CapabilityRule) -> Vec<&Feature> {
    state
        .features
        .iter()
        .filter(|feature| rule.blocks(feature, state.team_skill))
        .collect()
}

/// Minimum roster and product size needed to leave the build stage.
#[must_use]
pub fn can_leave_build(state: &GameState) -> bool {
    state.team_members.len() >= MIN_TEAM_FOR_LAUNCH
        && state.features.len() >= MIN_FEATURES_FOR_LAUNCH
}

/// Host-side readiness check for the current stage. The transition itself
/// only enforces the capability scan.
#[must_use]
pub fn stage_requirements_met(state: &GameState) -> bool {
    match state.stage {
        Stage::Foundation => state.choices.validation.is_validated(),
        Stage::Build => can_leave_build(state),
        Stage::Launch => false,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum StageOutcome {
    Advanced { from: Stage, to: Stage },
    Blocked { feature_ids: Vec<String> },
}

impl StageOutcome {
    #[must_use]
    pub const fn advanced(&self) -> bool {
        matches!(self, Self::Advanced { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StageFlowError {
    #[error("a stage transition is already pending")]
    TransitionPending,
    #[error("the final stage has been reached")]
    FinalStage,
    #[error("transition ticket does not belong to the pending transition")]
    StaleTicket,
}

/// Proof that `begin` succeeded. Consumed by `finish`.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a pending transition must be finished"]
pub struct TransitionTicket {
    serial: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFlow {
    delay: Duration,
    rule: CapabilityRule,
    pending: Option<u64>,
    issued: u64,
}

impl StageFlow {
    #[must_use]
    pub const fn new(delay: Duration, rule: CapabilityRule) -> Self {
        Self {
            delay,
            rule,
            pending: None,
            issued: 0,
        }
    }

    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    #[must_use]
    pub const fn rule(&self) -> CapabilityRule {
        self.rule
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Reserve the transition slot.
    ///
    /// # Errors
    ///
    /// Returns `StageFlowError::TransitionPending` while another transition is
    /// in flight and `StageFlowError::FinalStage` once launch is reached.
    pub fn begin(&mut self, state: &GameState) -> Result<TransitionTicket, StageFlowError> {
        if self.pending.is_some() {
            log::warn!("stage transition requested while another is pending");
            return Err(StageFlowError::TransitionPending);
        }
        if state.stage.next().is_none() {
            return Err(StageFlowError::FinalStage);
        }
        self.issued += 1;
        self.pending = Some(self.issued);
        log::debug!("stage transition {} started from {}", self.issued, state.stage);
        Ok(TransitionTicket {
            serial: self.issued,
        })
    }

    /// Run the capability scan and advance when it passes.
    ///
    /// # Errors
    ///
    /// Returns `StageFlowError::StaleTicket` when the ticket was not issued for
    /// the pending transition.
    pub fn finish(
        &mut self,
        ticket: TransitionTicket,
        state: &mut GameState,
    ) -> Result<StageOutcome, StageFlowError> {
        if self.pending != Some(ticket.serial) {
            return Err(StageFlowError::StaleTicket);
        }
        self.pending = None;

        let blockers = capability_blockers(state, self.rule);
        if !blockers.is_empty() {
            let event = GameEvent::team_capability_warning(&blockers, state.team_skill);
            let feature_ids = blockers.iter().map(|f| f.id.clone()).collect();
            log::warn!(
                "stage transition blocked: {} feature(s) exceed team skill {:.1}",
                blockers.len(),
                state.team_skill
            );
            state.trigger_event(event);
            return Ok(StageOutcome::Blocked { feature_ids });
        }

        let from = state.stage;
        match state.advance_stage() {
            Some(to) => Ok(StageOutcome::Advanced { from, to }),
            None => Err(StageFlowError::FinalStage),
        }
    }

    /// Drop a pending transition without applying it.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// Release the slot held by `ticket`. A ticket that no longer matches
    /// the pending transition leaves the flow untouched.
    pub fn abandon(&mut self, ticket: TransitionTicket) -> bool {
        if self.pending != Some(ticket.serial) {
            return false;
        }
        log::debug!("stage transition {} abandoned", ticket.serial);
        self.pending = None;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::catalog;
    use crate::events::EventKind;
    use crate::state::GameVariant;

    fn flow(rule: CapabilityRule) -> StageFlow {
        StageFlow::new(Duration::ZERO, rule)
    }

    #[test]
    fn sequence_is_fixed() {
        assert_eq!(Stage::Foundation.next(), Some(Stage::Build));
        assert_eq!(Stage::Build.next(), Some(Stage::Launch));
        assert_eq!(Stage::Launch.next(), None);
        assert_eq!("Build".parse::<Stage>(), Ok(Stage::Build));
    }

    #[test]
    fn abandoned_ticket_frees_only_its_own_slot() {
        let state = GameState::new(GameVariant::Classic);
        let mut flow = flow(CapabilityRule::Strict);
        let first = flow.begin(&state).unwrap();
        assert!(flow.abandon(first));
        assert!(!flow.is_pending());

        let stale = flow.begin(&state).unwrap();
        flow.cancel();
        let current = flow.begin(&state).unwrap();
        assert!(!flow.abandon(stale));
        assert!(flow.is_pending());
        assert!(flow.abandon(current));
    }

    #[test]
    fn second_begin_is_rejected_while_pending() {
        let mut state = GameState::new(GameVariant::Classic);
        let mut flow = flow(CapabilityRule::Strict);
        let ticket = flow.begin(&state).unwrap();
        assert_eq!(flow.begin(&state), Err(StageFlowError::TransitionPending));
        let outcome = flow.finish(ticket, &mut state).unwrap();
        assert_eq!(
            outcome,
            StageOutcome::Advanced {
                from: Stage::Foundation,
                to: Stage::Build
            }
        );
        assert!(!flow.is_pending());
        assert_eq!(state.current_stage, 2);
    }

    #[test]
    fn strict_rule_blocks_any_catalog_feature() {
        let mut state = GameState::new(GameVariant::Classic);
        for id in ["dev1", "design1"] {
            let _ = state.add_team_member(catalog().member(id).unwrap());
        }
        let _ = state.add_feature(catalog().feature("profile").unwrap());
        state.stage = Stage::Build;
        state.current_stage = 2;

        let mut flow = flow(CapabilityRule::Strict);
        let ticket = flow.begin(&state).unwrap();
        let outcome = flow.finish(ticket, &mut state).unwrap();
        assert_eq!(
            outcome,
            StageOutcome::Blocked {
                feature_ids: vec!["profile".to_string()]
            }
        );
        assert_eq!(state.stage, Stage::Build);
        assert_eq!(
            state.current_event.as_ref().map(|e| e.kind),
            Some(EventKind::TeamCapabilityWarning)
        );
    }

    #[test]
    fn lenient_rule_mirrors_add_gate() {
        let feature = catalog().feature("groups").unwrap();
        assert!(!CapabilityRule::Lenient.blocks(feature, 7.0));
        assert!(CapabilityRule::Lenient.blocks(feature, 6.5));
        assert!(CapabilityRule::Strict.blocks(feature, 9.0));
    }

    #[test]
    fn launch_is_final() {
        let mut state = GameState::new(GameVariant::Classic);
        state.stage = Stage::Launch;
        let mut flow = flow(CapabilityRule::Lenient);
        assert_eq!(flow.begin(&state), Err(StageFlowError::FinalStage));
    }

    #[test]
    fn foreign_ticket_is_stale() {
        let mut state = GameState::new(GameVariant::Classic);
        let mut first = flow(CapabilityRule::Strict);
        let mut second = flow(CapabilityRule::Strict);
        let _ticket = first.begin(&state).unwrap();
        let other = second.begin(&state).unwrap();
        second.cancel();
        assert_eq!(
            second.finish(other, &mut state),
            Err(StageFlowError::StaleTicket)
        );
    }
}
