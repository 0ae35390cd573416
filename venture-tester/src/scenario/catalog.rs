use anyhow::{Result, ensure};

use super::Scenario;
use crate::logic::{RunPlan, RunSummary, Strategy};
use venture_game::{CapabilityRule, EventKind, GameVariant, Stage};

pub fn catalog_scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new(
            "smoke",
            "Smoke",
            "Balanced strategy plays all three stages and twelve months",
            RunPlan::new(Strategy::Balanced)
                .with_expectation(full_run_expectation)
                .with_expectation(invariants_expectation),
        ),
        Scenario::new(
            "lean-start",
            "Lean Start",
            "Frugal play on the lean budget builds on its seed round and stays solvent",
            RunPlan::new(Strategy::Frugal)
                .with_variant(GameVariant::Lean)
                .with_expectation(full_run_expectation)
                .with_expectation(lean_build_expectation)
                .with_expectation(solvency_expectation),
        ),
        Scenario::new(
            "aggressive-growth",
            "Aggressive Growth",
            "Large team, many features and heavy marketing grow the user base",
            RunPlan::new(Strategy::Aggressive)
                .with_expectation(full_run_expectation)
                .with_expectation(growth_expectation),
        ),
        Scenario::new(
            "capability-gate",
            "Capability Gate",
            "The strict capability rule blocks the build stage until features are dropped",
            RunPlan::new(Strategy::Balanced)
                .with_rule(CapabilityRule::Strict)
                .with_expectation(capability_gate_expectation),
        ),
        Scenario::new(
            "deterministic",
            "Deterministic Replay",
            "The same seed replays to an identical end state",
            RunPlan::new(Strategy::Aggressive).with_replay(),
        ),
        Scenario::new(
            "early-exit",
            "Early Exit",
            "Closing the run after six months evaluates month six",
            RunPlan::new(Strategy::Balanced)
                .with_months(6)
                .with_expectation(early_exit_expectation),
        ),
        Scenario::new(
            "score-invariants",
            "Score Invariants",
            "Score composition, morale bounds and unique membership hold at the end of every strategy",
            RunPlan::new(Strategy::Frugal).with_expectation(invariants_expectation),
        ),
    ]
}

pub fn find_scenario(key: &str) -> Option<Scenario> {
    catalog_scenarios()
        .into_iter()
        .find(|scenario| scenario.key == key)
}

pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    catalog_scenarios()
        .into_iter()
        .map(|scenario| (scenario.key, scenario.description))
        .collect()
}

fn full_run_expectation(summary: &RunSummary) -> Result<()> {
    ensure!(
        summary.stage == Stage::Launch,
        "run ended in the {} stage",
        summary.stage
    );
    ensure!(
        summary.months.len() == 12,
        "expected 12 simulated months, got {}",
        summary.months.len()
    );
    ensure!(summary.outcome.month == 12, "verdict taken at month {}", summary.outcome.month);
    ensure!(
        summary.final_state.event_count(EventKind::GameOutcome) == 1,
        "expected exactly one game outcome event"
    );
    Ok(())
}

fn invariants_expectation(summary: &RunSummary) -> Result<()> {
    let state = &summary.final_state;
    ensure!(state.invariants_hold(), "state invariants violated");
    ensure!(state.completed, "launch reached without completion flag");
    ensure!(state.current_stage == 3, "stage counter is {}", state.current_stage);
    Ok(())
}

fn solvency_expectation(summary: &RunSummary) -> Result<()> {
    for report in &summary.months {
        ensure!(
            report.money_after >= 0,
            "month {} closed with ${}",
            report.month,
            report.money_after
        );
    }
    let injections = summary.final_state.event_count(EventKind::InvestmentReceived);
    let expected = summary.bailouts + usize::from(summary.seed_funded);
    ensure!(
        injections == expected,
        "{} bailouts and seed round {} but {injections} investment events",
        summary.bailouts,
        summary.seed_funded
    );
    Ok(())
}

fn lean_build_expectation(summary: &RunSummary) -> Result<()> {
    ensure!(summary.seed_funded, "start-up costs were not covered by a seed round");
    ensure!(summary.hires >= 2, "expected at least two hires, got {}", summary.hires);
    ensure!(
        summary.features >= 3,
        "expected at least three features, got {}",
        summary.features
    );
    Ok(())
}

fn growth_expectation(summary: &RunSummary) -> Result<()> {
    let first = summary
        .months
        .first()
        .map(|report| report.users_before)
        .unwrap_or_default();
    ensure!(
        summary.final_state.resources.users > first,
        "users did not grow ({first} -> {})",
        summary.final_state.resources.users
    );
    ensure!(summary.campaign.is_some(), "launch campaign never ran");
    ensure!(summary.hires == 4, "expected four hires, got {}", summary.hires);
    Ok(())
}

fn capability_gate_expectation(summary: &RunSummary) -> Result<()> {
    ensure!(summary.blocked_transitions >= 1, "strict rule never blocked");
    let warnings = summary
        .final_state
        .event_count(EventKind::TeamCapabilityWarning);
    ensure!(
        u32::try_from(warnings).unwrap_or(u32::MAX) == summary.blocked_transitions,
        "{warnings} capability warnings for {} blocked transitions",
        summary.blocked_transitions
    );
    ensure!(summary.stage == Stage::Launch, "gate was never cleared");
    Ok(())
}

fn early_exit_expectation(summary: &RunSummary) -> Result<()> {
    ensure!(summary.months.len() == 6, "played {} months", summary.months.len());
    ensure!(summary.outcome.month == 6, "verdict taken at month {}", summary.outcome.month);
    ensure!(
        summary.outcome.metrics.len() == 7,
        "verdict checked {} metrics",
        summary.outcome.metrics.len()
    );
    Ok(())
}
