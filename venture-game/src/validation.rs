//! Foundation-stage idea validation.

use crate::catalog::StartupIdea;
use crate::constants::{PROGRESS_COMPLETE, VALIDATION_PROGRESS_STEP};
use crate::ledger::FinanceChange;
use crate::state::GameState;
use crate::tasks::ProgressWork;

/// Market research on one idea. Progress climbs ten points per tick; at 100
/// the idea is validated and its startup costs are booked.
#[derive(Debug, Clone)]
pub struct ValidationWork {
    idea: StartupIdea,
    progress: u8,
}

impl ValidationWork {
    #[must_use]
    pub const fn new(idea: StartupIdea) -> Self {
        Self { idea, progress: 0 }
    }

    #[must_use]
    pub const fn idea(&self) -> &StartupIdea {
        &self.idea
    }
}

impl ProgressWork for ValidationWork {
    type Output = StartupIdea;

    fn step(&mut self) -> Option<StartupIdea> {
        self.progress = self
            .progress
            .saturating_add(VALIDATION_PROGRESS_STEP)
            .min(PROGRESS_COMPLETE);
        (self.progress >= PROGRESS_COMPLETE).then(|| self.idea.clone())
    }

    fn progress(&self) -> u8 {
        self.progress
    }

    fn commit(idea: StartupIdea, state: &mut GameState) {
        state.select_idea(&idea);
        state.validate_idea(idea.potential);
        if state.finances.initialized {
            return;
        }
        let financials = &idea.financials;
        let change = FinanceChange::InitializeStartup {
            initial_costs: financials.initial_costs,
            monthly_fixed: financials.monthly_fixed,
            operational_costs: financials.operational_costs,
        };
        if let Err(err) = state.update_finances(&change) {
            log::warn!("startup costs for {} not booked: {err}", idea.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::catalog;
    use crate::tasks::{TaskStatus, TimedTask};
    use std::time::Duration;

    #[test]
    fn ten_ticks_validate_and_initialize() {
        let idea = catalog().idea("1").unwrap().clone();
        let mut state = GameState::default();
        let mut task = TimedTask::new(ValidationWork::new(idea), Duration::ZERO);
        for expected in (10..100).step_by(10) {
            assert_eq!(task.tick(), TaskStatus::Running { progress: expected });
        }
        assert_eq!(task.tick(), TaskStatus::Finished);
        assert!(task.commit(&mut state));

        assert_eq!(state.scores.foundation, 80);
        assert_eq!(state.choices.idea_id.as_deref(), Some("1"));
        assert!(state.finances.initialized);
        assert_eq!(state.finances.total_investment, 40_000);
        assert_eq!(state.resources.money, 60_000);
    }

    #[test]
    fn second_validation_keeps_initial_booking() {
        let mut state = GameState::default();
        for id in ["3", "2"] {
            let idea = catalog().idea(id).unwrap().clone();
            let mut task = TimedTask::new(ValidationWork::new(idea), Duration::ZERO);
            task.run_to_end();
            assert!(task.commit(&mut state));
        }
        assert_eq!(state.scores.foundation, 90);
        assert_eq!(state.finances.total_investment, 30_000);
    }

    #[test]
    fn abandoned_validation_leaves_state_alone() {
        let idea = catalog().idea("4").unwrap().clone();
        let mut state = GameState::default();
        let mut task = TimedTask::new(ValidationWork::new(idea), Duration::ZERO);
        task.tick();
        task.cancel();
        assert_eq!(task.run_to_end(), TaskStatus::Cancelled);
        assert!(!task.commit(&mut state));
        assert_eq!(state, GameState::default());
    }
}
