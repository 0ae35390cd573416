use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use venture_game::{
    ActionOutcome, CapabilityRule, EventKind, Feature, FeatureCategory, GameConfig, GameSession,
    GameState, GameVariant, MonthlyDecision, SimulationConfig, Stage, StageFlowError,
    StageOutcome, advance_month, catalog, numbers::clamp_score,
};

fn fixture_feature(id: &str, complexity: u8) -> Feature {
    Feature {
        id: id.to_string(),
        name: format!("Fixture {id}"),
        category: FeatureCategory::Core,
        description: String::new(),
        complexity,
        user_value: 5,
        cost: 2_000,
        time_required: 8,
        maintenance_cost: 100,
        revenue_impact: 0,
    }
}

fn session(rule: CapabilityRule) -> GameSession {
    let mut config = GameConfig::headless();
    config.stage.capability_rule = rule;
    GameSession::new(config, catalog().clone(), 42)
}

fn expected_overall(state: &GameState) -> i32 {
    let s = &state.scores;
    clamp_score(
        f64::from(s.foundation) * 0.30
            + f64::from(s.development) * 0.35
            + f64::from(s.marketing) * 0.35,
    )
}

#[test]
fn score_composition_and_membership_hold_under_random_play() {
    let catalog = catalog();
    for seed in 0..16_u64 {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let mut state = GameState::default();
        for _ in 0..120 {
            match rng.gen_range(0..7) {
                0 => {
                    let member = &catalog.team[rng.gen_range(0..catalog.team.len())];
                    let _ = state.add_team_member(member);
                }
                1 => {
                    let member = &catalog.team[rng.gen_range(0..catalog.team.len())];
                    let _ = state.remove_team_member(&member.id);
                }
                2 => {
                    let feature = &catalog.features[rng.gen_range(0..catalog.features.len())];
                    let _ = state.add_feature(feature);
                }
                3 => {
                    let feature = &catalog.features[rng.gen_range(0..catalog.features.len())];
                    let _ = state.remove_feature(&feature.id);
                }
                4 => state.validate_idea(rng.gen_range(0.0..10.0)),
                5 => state.update_marketing_score(rng.gen_range(-20..140)),
                _ => state.update_morale(rng.gen_range(-40..40)),
            }
            assert_eq!(state.scores.overall, expected_overall(&state), "seed {seed}");
            assert!(state.invariants_hold(), "seed {seed}");
        }
    }
}

#[test]
fn morale_stays_within_bounds() {
    let mut state = GameState::default();
    let mut rng = ChaCha20Rng::seed_from_u64(9);
    for _ in 0..500 {
        state.update_morale(rng.gen_range(-250..250));
        assert!((0..=100).contains(&state.morale));
    }
    state.update_morale(i32::MAX);
    assert_eq!(state.morale, 100);
    state.update_morale(i32::MIN);
    assert_eq!(state.morale, 0);
}

#[test]
fn duplicate_adds_are_ignored() {
    let mut state = GameState::default();
    let dev = catalog().member("dev1").unwrap();
    let profile = catalog().feature("profile").unwrap();
    assert!(state.add_team_member(dev).is_applied());
    assert!(state.add_team_member(catalog().member("design1").unwrap()).is_applied());
    assert!(state.add_feature(profile).is_applied());

    let before = state.clone();
    assert_eq!(state.add_team_member(dev), ActionOutcome::Ignored);
    assert_eq!(state.add_feature(profile), ActionOutcome::Ignored);
    assert_eq!(state, before);
}

#[test]
fn add_then_remove_feature_restores_resources_and_scores() {
    let mut state = GameState::default();
    for id in ["dev1", "design1"] {
        let _ = state.add_team_member(catalog().member(id).unwrap());
    }
    for id in ["profile", "groups", "auth", "api"] {
        let feature = catalog().feature(id).unwrap();
        let money = state.resources.money;
        let time = state.resources.time;
        let scores = state.scores;
        let development_expense = state.finances.expenses.development;
        assert!(state.add_feature(feature).is_applied(), "{id}");
        assert!(state.remove_feature(id).is_applied(), "{id}");
        assert_eq!(state.resources.money, money);
        assert_eq!(state.resources.time, time);
        assert_eq!(state.scores, scores);
        assert_eq!(state.finances.expenses.development, development_expense);
    }
}

#[test]
fn hire_then_release_restores_money() {
    let mut state = GameState::default();
    let money = state.resources.money;
    let operations = state.finances.expenses.operations;
    let _ = state.add_team_member(catalog().member("market1").unwrap());
    assert!(state.remove_team_member("market1").is_applied());
    assert_eq!(state.resources.money, money);
    assert_eq!(state.finances.expenses.operations, operations);
    assert_eq!(state.remove_team_member("market1"), ActionOutcome::Ignored);
}

#[test]
fn rejected_feature_leaves_state_untouched() {
    let mut state = GameState::default();
    state.team_skill = 3.0;
    let heavy = fixture_feature("heavy", 10);
    let money = state.resources.money;
    let development = state.scores.development;

    let outcome = state.add_feature(&heavy);
    assert_eq!(outcome, ActionOutcome::Rejected(EventKind::ComplexityWarning));
    assert!(state.features.is_empty());
    assert_eq!(state.resources.money, money);
    assert_eq!(state.scores.development, development);
    assert_eq!(state.event_count(EventKind::ComplexityWarning), 1);
    assert_eq!(state.event_log.len(), 1);
}

#[test]
fn stage_gate_blocks_then_advances_one_step() {
    let mut session = session(CapabilityRule::Strict);
    assert!(session.next_stage_now().unwrap().advanced());
    assert_eq!(session.state().stage, Stage::Build);

    for id in ["dev1", "dev2"] {
        assert!(session.hire(id).is_applied());
    }
    assert!(session.add_feature("profile").is_applied());
    let blocked = session.next_stage_now().unwrap();
    assert_eq!(
        blocked,
        StageOutcome::Blocked {
            feature_ids: vec!["profile".to_string()]
        }
    );
    assert_eq!(session.state().stage, Stage::Build);
    assert_eq!(session.state().event_count(EventKind::TeamCapabilityWarning), 1);

    assert!(session.remove_feature("profile").is_applied());
    for (id, complexity) in [("landing", 3), ("faq", 2), ("contact", 3)] {
        let feature = fixture_feature(id, complexity);
        assert!(session.with_state_mut(|state| state.add_feature(&feature)).is_applied());
    }
    let outcome = session.next_stage_now().unwrap();
    assert_eq!(
        outcome,
        StageOutcome::Advanced {
            from: Stage::Build,
            to: Stage::Launch
        }
    );
    assert_eq!(session.state().current_stage, 3);
    assert!(session.state().completed);
    assert_eq!(session.next_stage_now(), Err(StageFlowError::FinalStage));
}

#[test]
fn pending_transition_rejects_a_second_request() {
    let mut session = session(CapabilityRule::Strict);
    let ticket = session.begin_stage_transition().unwrap();
    assert_eq!(
        session.begin_stage_transition().unwrap_err(),
        StageFlowError::TransitionPending
    );
    assert!(session.finish_stage_transition(ticket).unwrap().advanced());
    assert_eq!(session.state().stage, Stage::Build);
}

#[test]
fn negative_month_is_rescued_by_investment() {
    let mut state = GameState::new(GameVariant::Classic);
    state.stage = Stage::Launch;
    state.current_stage = 3;
    state.completed = true;
    state.resources.money = 100;
    let mut rng = ChaCha20Rng::seed_from_u64(3);
    let config = SimulationConfig {
        market_event_chance: 0.0,
        ..SimulationConfig::default()
    };
    let report = advance_month(
        &mut state,
        &MonthlyDecision::new(5_000, 0),
        &config,
        catalog(),
        &mut rng,
    )
    .unwrap();

    assert!(report.profit < 0);
    assert!(state.resources.money >= 0);
    assert_eq!(state.resources.money, config.bailout_buffer);
    assert!(report.bailout.is_some());
    assert_eq!(state.event_count(EventKind::InvestmentReceived), 1);
}

#[test]
fn end_to_end_scenario() {
    let mut session = session(CapabilityRule::Lenient);

    // Foundation
    let _token = session.start_idea_validation("1").unwrap();
    assert!(session.finish_idea_validation().is_some());
    assert_eq!(session.state().scores.foundation, 80);
    assert!(session.next_stage_now().unwrap().advanced());

    // Build
    for id in ["dev1", "dev2"] {
        assert!(session.hire(id).is_applied());
    }
    assert!((session.state().team_skill - 7.0).abs() < f64::EPSILON);
    assert!(session.add_feature("profile").is_applied());
    assert!(session.add_feature("groups").is_applied());
    let search = fixture_feature("search", 10);
    assert!(session.with_state_mut(|state| state.add_feature(&search)).is_applied());
    assert_eq!(
        session.add_feature("messaging"),
        ActionOutcome::Rejected(EventKind::ComplexityWarning)
    );
    assert_eq!(session.state().features.len(), 3);
    assert!(session.next_stage_now().unwrap().advanced());
    assert_eq!(session.state().stage, Stage::Launch);

    // Launch
    assert!(session.toggle_channel("instagram").is_applied());
    assert!(session.toggle_channel("tiktok").is_applied());
    assert!(session.state().marketing.allocated() >= 1_000);
    assert!(session.can_make_decision());
    assert!(session.confirm_marketing_strategy().is_applied());
    assert_eq!(session.state().scores.marketing, 63);
    assert!(session.state().invariants_hold());
}
