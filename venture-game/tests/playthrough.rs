use venture_game::{
    BuiltinLoader, CapabilityRule, EventKind, GameConfig, GameEngine, GameSession, GameVariant,
    MetricId, MonthlyDecision, Stage, TaskStatus,
};

fn launched_session(seed: u64) -> GameSession {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut config = GameConfig::headless();
    config.stage.capability_rule = CapabilityRule::Lenient;
    let engine = GameEngine::new(BuiltinLoader);
    let mut session = engine.create_session_with(seed, config).unwrap();

    let _token = session.start_idea_validation("2").unwrap();
    assert_eq!(session.finish_idea_validation(), Some(TaskStatus::Committed));
    assert!(session.next_stage_now().unwrap().advanced());

    for id in ["dev1", "design1", "market1"] {
        assert!(session.hire(id).is_applied(), "hire {id}");
    }
    for id in ["profile", "groups", "auth"] {
        assert!(session.add_feature(id).is_applied(), "feature {id}");
    }
    assert!(session.build_report().ready_for_launch);
    assert!(session.next_stage_now().unwrap().advanced());
    assert_eq!(session.state().stage, Stage::Launch);

    for id in ["instagram", "tiktok"] {
        assert!(session.toggle_channel(id).is_applied());
    }
    assert!(session.set_channel_budget("instagram", 4_000).is_applied());
    assert!(session.confirm_marketing_strategy().is_applied());
    let _token = session.start_campaign().unwrap();
    assert_eq!(session.finish_campaign(), Some(TaskStatus::Committed));
    session
}

#[test]
fn full_run_reaches_a_verdict() {
    let mut session = launched_session(11);
    let campaign_events = [
        EventKind::CampaignSuccess,
        EventKind::CampaignModerate,
        EventKind::CampaignPoor,
    ]
    .iter()
    .map(|kind| session.state().event_count(*kind))
    .sum::<usize>();
    assert_eq!(campaign_events, 1);

    let decision = MonthlyDecision::new(3_000, 1_500);
    let mut reports = Vec::new();
    while reports.len() < 20 {
        let batch = session.advance_months(&decision, 3);
        if batch.is_empty() {
            break;
        }
        reports.extend(batch);
    }

    assert_eq!(reports.len(), 12);
    assert!(reports.windows(2).all(|w| w[1].month == w[0].month + 1));
    assert!(reports.iter().all(|report| report.money_after >= 0));
    let outcome = session.state().outcome.clone().unwrap();
    assert_eq!(outcome.month, 12);
    assert_eq!(outcome.metrics.len(), 7);
    assert!(outcome.result(MetricId::Revenue).is_some());
    assert_eq!(session.state().event_count(EventKind::GameOutcome), 1);
    assert_eq!(session.finish_run(), outcome);
    assert!(session.advance_month(&decision).is_none());
}

#[test]
fn same_seed_same_run() {
    let decision = MonthlyDecision::new(2_000, 1_000);
    let mut first = launched_session(77);
    let mut second = launched_session(77);
    assert_eq!(first.campaign_metrics(), second.campaign_metrics());
    assert_eq!(
        first.advance_months(&decision, 12),
        second.advance_months(&decision, 12)
    );
    assert_eq!(first.state(), second.state());
}

#[test]
fn early_finish_evaluates_latest_month() {
    let mut session = launched_session(5);
    let advice = session.recommend_decision();
    let decision = MonthlyDecision::new(advice.marketing.recommended, advice.servers.recommended);
    let reports = session.advance_months(&decision, 4);
    assert_eq!(reports.len(), 4);
    assert_eq!(session.state().month, 5);

    let milestone = session.milestone_progress();
    assert_eq!(milestone.thresholds.month, 3);

    let outcome = session.finish_run();
    assert_eq!(outcome.month, 4);
    assert!(session.advance_month(&decision).is_none());
}

#[test]
fn lean_start_builds_on_its_seed_round() {
    let mut config = GameConfig {
        variant: GameVariant::Lean,
        ..GameConfig::headless()
    };
    config.stage.capability_rule = CapabilityRule::Lenient;
    let engine = GameEngine::new(BuiltinLoader);
    let mut session = engine.create_session_with(3, config).unwrap();

    let _token = session.start_idea_validation("3").unwrap();
    assert_eq!(session.finish_idea_validation(), Some(TaskStatus::Committed));
    assert!(session.state().resources.money > 0);
    assert_eq!(session.state().event_count(EventKind::InvestmentReceived), 1);
    assert!(session.next_stage_now().unwrap().advanced());

    for id in ["dev2", "market2"] {
        assert!(session.hire(id).is_applied(), "hire {id}");
    }
    for id in ["profile", "auth", "groups"] {
        assert!(session.add_feature(id).is_applied(), "feature {id}");
    }
    assert!(session.build_report().ready_for_launch);
    assert!(session.next_stage_now().unwrap().advanced());
    assert_eq!(session.state().stage, Stage::Launch);
    assert!(session.state().resources.money >= 0);
}
