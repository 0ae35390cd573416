//! Month-by-month simulation after launch.
//!
//! Each step reads the previous month's metrics and the player's budget
//! decision, then writes new metrics, users and money back to the state.
//! Rates are fractions internally (`0.12` is 12 %); satisfaction and uptime
//! are 0..=100 indices.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, Polarity};
use crate::config::SimulationConfig;
use crate::constants::{
    BASE_GROWTH_RATE, BASELINE_REVENUE_GROWTH, BUDGET_EFFICIENCY_CAP, BUDGET_MONEY_SHARE,
    CHURN_BASE, CHURN_FLOOR, CHURN_SATISFACTION_WEIGHT, CHURN_UPTIME_WEIGHT, CONVERSION_CAP,
    CONVERSION_MARKETING_WEIGHT, CONVERSION_SATISFACTION_PIVOT, CONVERSION_SATISFACTION_WEIGHT,
    FINAL_MONTH, FIRST_MONTH, INITIAL_CONVERSION_RATE, INITIAL_SATISFACTION, INITIAL_UPTIME,
    MARKET_EVENT_NEGATIVE_MIN, MARKET_EVENT_POSITIVE_MAX, MARKETING_GROWTH_WEIGHT,
    MARKETING_REVENUE_FACTOR, OUTCOME_UPTIME_TARGET, SATISFACTION_CHURN_PENALTY,
    SATISFACTION_FEATURE_BONUS, SATISFACTION_UPTIME_PIVOT, SERVER_COST_PER_USER,
    UNFUNDED_BUDGET_EFFICIENCY, UPTIME_BASE, UPTIME_CAP, UPTIME_INVESTMENT_WEIGHT,
};
use crate::evaluation::{self, OutcomeReport};
use crate::events::GameEvent;
use crate::numbers::{i64_to_f64, round_f64_to_i64, usize_to_f64};
use crate::stage::Stage;
use crate::state::GameState;

/// Snapshot of one simulated month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyMetrics {
    pub revenue: f64,
    pub user_growth: f64,
    pub customer_satisfaction: f64,
    pub server_uptime: f64,
    pub marketing_roi: f64,
    pub cashflow: f64,
    pub churn_rate: f64,
    pub conversion_rate: f64,
}

impl MonthlyMetrics {
    /// Metrics before the first simulated month.
    #[must_use]
    pub const fn initial() -> Self {
        Self {
            revenue: 0.0,
            user_growth: 0.0,
            customer_satisfaction: INITIAL_SATISFACTION,
            server_uptime: INITIAL_UPTIME,
            marketing_roi: 0.0,
            cashflow: 0.0,
            churn_rate: 0.0,
            conversion_rate: INITIAL_CONVERSION_RATE,
        }
    }

    /// Month-over-month revenue change as a fraction, `None` without a base.
    #[must_use]
    pub fn revenue_change(&self, previous: &Self) -> Option<f64> {
        (previous.revenue > 0.0).then(|| (self.revenue - previous.revenue) / previous.revenue)
    }
}

impl Default for MonthlyMetrics {
    fn default() -> Self {
        Self::initial()
    }
}

/// Budgets the player commits to for one month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MonthlyDecision {
    pub marketing_budget: i64,
    pub server_investment: i64,
}

impl MonthlyDecision {
    #[must_use]
    pub const fn new(marketing_budget: i64, server_investment: i64) -> Self {
        Self {
            marketing_budget,
            server_investment,
        }
    }

    /// The recommended budgets for the current state.
    #[must_use]
    pub fn recommended(state: &GameState) -> Self {
        let advice = recommend_decision(state);
        Self::new(advice.marketing.recommended, advice.servers.recommended)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MonthlyExpenses {
    pub marketing: i64,
    pub servers: i64,
    pub maintenance: i64,
    pub salaries: i64,
    pub overhead: i64,
}

impl MonthlyExpenses {
    #[must_use]
    pub const fn total(&self) -> i64 {
        self.marketing + self.servers + self.maintenance + self.salaries + self.overhead
    }
}

/// Market swing rolled for the month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketShock {
    pub event_id: String,
    pub factor: f64,
}

/// Emergency investment that covered a negative balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bailout {
    pub investor: String,
    pub amount: i64,
    pub debt: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthReport {
    pub month: u32,
    pub decision: MonthlyDecision,
    pub previous: MonthlyMetrics,
    pub metrics: MonthlyMetrics,
    pub expenses: MonthlyExpenses,
    pub users_before: i64,
    pub users_after: i64,
    pub profit: i64,
    pub money_after: i64,
    pub market_shock: Option<MarketShock>,
    pub bailout: Option<Bailout>,
    /// Present on the month that ended the run.
    pub outcome: Option<OutcomeReport>,
}

/// `sum(reach * engagement) / 100` over the chosen channels.
#[must_use]
pub fn marketing_effectiveness(state: &GameState) -> f64 {
    state.marketing.effectiveness()
}

/// How far the budget goes relative to 30 % of cash on hand, capped at 1.5.
/// An unfunded month, or one with no cash behind the budget, counts for half.
#[must_use]
pub fn budget_efficiency(budget: i64, money: i64) -> f64 {
    if budget <= 0 {
        return UNFUNDED_BUDGET_EFFICIENCY;
    }
    let reference = i64_to_f64(money) * BUDGET_MONEY_SHARE;
    if reference <= 0.0 {
        return UNFUNDED_BUDGET_EFFICIENCY;
    }
    (i64_to_f64(budget) / reference).min(BUDGET_EFFICIENCY_CAP)
}

/// Growth before any market swing, capped by configuration.
#[must_use]
pub fn growth_rate(effectiveness: f64, budget_efficiency: f64, cap: f64) -> f64 {
    (BASE_GROWTH_RATE + effectiveness * budget_efficiency * MARKETING_GROWTH_WEIGHT).min(cap)
}

#[must_use]
pub fn monthly_expenses(
    state: &GameState,
    decision: &MonthlyDecision,
    config: &SimulationConfig,
) -> MonthlyExpenses {
    let team = i64::try_from(state.team_members.len()).unwrap_or(i64::MAX);
    MonthlyExpenses {
        marketing: decision.marketing_budget.max(0),
        servers: decision.server_investment.max(0),
        maintenance: state.features.iter().map(|f| f.maintenance_cost).sum(),
        salaries: team.saturating_mul(config.salary_per_member),
        overhead: config.monthly_overhead,
    }
}

/// Uptime from server spend relative to the load of the user base.
#[must_use]
pub fn server_uptime(investment: i64, users: i64) -> f64 {
    let load = i64_to_f64(users.max(1)) * SERVER_COST_PER_USER;
    let coverage = i64_to_f64(investment.max(0)) / load;
    (UPTIME_BASE + coverage * UPTIME_INVESTMENT_WEIGHT).min(UPTIME_CAP)
}

/// Apply a month's profit. A negative balance is topped up to `buffer` by an
/// investor; returns the new balance and the injected amount with the debt.
#[must_use]
pub fn settle_balance(money: i64, profit: i64, buffer: i64) -> (i64, Option<(i64, i64)>) {
    let balance = money.saturating_add(profit);
    if balance >= 0 {
        return (balance, None);
    }
    let debt = balance.saturating_abs();
    let amount = debt.saturating_add(buffer.max(0));
    (balance.saturating_add(amount), Some((amount, debt)))
}

fn pick_investor<R: Rng>(catalog: &Catalog, rng: &mut R) -> String {
    catalog
        .investors
        .choose(rng)
        .cloned()
        .unwrap_or_else(|| "An angel investor".to_string())
}

/// Seed round closed once the idea is validated. Booking the start-up costs
/// can leave the balance negative; an investor then covers the debt and adds
/// `seed_buffer` of runway for the build-out. Returns `None` when the company
/// is still solvent.
pub fn seed_round<R: Rng>(
    state: &mut GameState,
    config: &SimulationConfig,
    catalog: &Catalog,
    rng: &mut R,
) -> Option<Bailout> {
    let (money, injection) = settle_balance(state.resources.money, 0, config.seed_buffer);
    let (amount, debt) = injection?;
    let investor = pick_investor(catalog, rng);
    log::info!("seed round: {investor} covers ${debt} of start-up debt with ${amount}");
    state.resources.money = money;
    state.trigger_event(GameEvent::investment_received(&investor, amount, debt));
    Some(Bailout {
        investor,
        amount,
        debt,
    })
}

fn roll_market_shock<R: Rng>(
    catalog: &Catalog,
    chance: f64,
    rng: &mut R,
) -> Option<(GameEvent, MarketShock)> {
    if rng.r#gen::<f64>() >= chance {
        return None;
    }
    let event = catalog.market_events.choose(rng)?;
    let factor = match event.polarity {
        Polarity::Negative => rng.gen_range(MARKET_EVENT_NEGATIVE_MIN..=1.0),
        Polarity::Positive => rng.gen_range(1.0..=MARKET_EVENT_POSITIVE_MAX),
    };
    Some((
        GameEvent::market_event(event, factor),
        MarketShock {
            event_id: event.id.clone(),
            factor,
        },
    ))
}

/// Simulate the current month. Returns `None` before launch and once the
/// run has ended.
pub fn advance_month<R: Rng>(
    state: &mut GameState,
    decision: &MonthlyDecision,
    config: &SimulationConfig,
    catalog: &Catalog,
    rng: &mut R,
) -> Option<MonthReport> {
    if state.stage != Stage::Launch {
        log::warn!("month advance requested during the {:?} stage", state.stage);
        return None;
    }
    if state.outcome.is_some() {
        log::warn!("month advance requested after the run ended");
        return None;
    }
    let month = state.month;
    let previous = state.monthly_metrics;

    let shock = roll_market_shock(catalog, config.market_event_chance, rng);
    let factor = shock.as_ref().map_or(1.0, |(_, shock)| shock.factor);

    let effectiveness = marketing_effectiveness(state);
    let efficiency = budget_efficiency(decision.marketing_budget, state.resources.money);
    let rate = growth_rate(effectiveness, efficiency, config.max_growth_rate) * factor;

    let users_before = state.resources.users;
    let users_after = round_f64_to_i64(i64_to_f64(users_before) * (1.0 + rate)).max(0);
    let user_growth = if users_before > 0 {
        i64_to_f64(users_after - users_before) / i64_to_f64(users_before)
    } else {
        0.0
    };

    let revenue = (previous.revenue
        + i64_to_f64(users_after) * previous.conversion_rate * config.avg_revenue_per_user
        + effectiveness * efficiency * MARKETING_REVENUE_FACTOR
        + previous.revenue * BASELINE_REVENUE_GROWTH)
        * factor;

    let expenses = monthly_expenses(state, decision, config);
    let profit = round_f64_to_i64(revenue) - expenses.total();
    let (money_after, injection) =
        settle_balance(state.resources.money, profit, config.bailout_buffer);

    let server_uptime = server_uptime(decision.server_investment, users_after);
    let satisfaction_ceiling = server_uptime.min(100.0);
    let customer_satisfaction = (previous.customer_satisfaction
        + (server_uptime - SATISFACTION_UPTIME_PIVOT)
        + usize_to_f64(state.features.len()) * SATISFACTION_FEATURE_BONUS
        - previous.churn_rate * SATISFACTION_CHURN_PENALTY)
        .clamp(0.0, satisfaction_ceiling);
    let churn_rate = (CHURN_BASE
        + (100.0 - customer_satisfaction) * CHURN_SATISFACTION_WEIGHT
        + (100.0 - server_uptime) * CHURN_UPTIME_WEIGHT)
        .clamp(CHURN_FLOOR, 1.0);
    let conversion_rate = (previous.conversion_rate
        + effectiveness * CONVERSION_MARKETING_WEIGHT
        + (customer_satisfaction - CONVERSION_SATISFACTION_PIVOT) * CONVERSION_SATISFACTION_WEIGHT)
        .clamp(0.0, CONVERSION_CAP);
    let marketing_roi = if decision.marketing_budget > 0 {
        (revenue - previous.revenue) / i64_to_f64(decision.marketing_budget)
    } else {
        0.0
    };

    let metrics = MonthlyMetrics {
        revenue,
        user_growth,
        customer_satisfaction,
        server_uptime,
        marketing_roi,
        cashflow: revenue - i64_to_f64(expenses.total()),
        churn_rate,
        conversion_rate,
    };

    state.previous_metrics = previous;
    state.monthly_metrics = metrics;
    state.resources.users = users_after;
    state.resources.money = money_after;

    let market_shock = shock.map(|(event, shock)| {
        log::info!("month {month}: market event {} ({:.2}x)", shock.event_id, shock.factor);
        state.trigger_event(event);
        shock
    });

    let bailout = match injection {
        Some((amount, debt)) => {
            let investor = pick_investor(catalog, rng);
            log::warn!("month {month}: ${debt} shortfall covered by {investor} with ${amount}");
            state.trigger_event(GameEvent::investment_received(&investor, amount, debt));
            Some(Bailout {
                investor,
                amount,
                debt,
            })
        }
        None => None,
    };

    log::info!(
        "month {month}: revenue {:.0}, users {users_after}, profit {profit}, money {money_after}",
        revenue
    );

    let outcome = if month >= FINAL_MONTH {
        Some(conclude(state, month))
    } else {
        state.month += 1;
        None
    };

    Some(MonthReport {
        month,
        decision: *decision,
        previous,
        metrics,
        expenses,
        users_before,
        users_after,
        profit,
        money_after,
        market_shock,
        bailout,
        outcome,
    })
}

/// Simulate up to `months` months with the same decision, stopping early
/// when the run ends.
pub fn advance_months<R: Rng>(
    state: &mut GameState,
    decision: &MonthlyDecision,
    months: u32,
    config: &SimulationConfig,
    catalog: &Catalog,
    rng: &mut R,
) -> Vec<MonthReport> {
    let mut reports = Vec::new();
    for _ in 0..months {
        match advance_month(state, decision, config, catalog, rng) {
            Some(report) => reports.push(report),
            None => break,
        }
    }
    reports
}

fn conclude(state: &mut GameState, month: u32) -> OutcomeReport {
    let report = evaluation::evaluate_outcome(&state.monthly_metrics, month, state);
    log::info!(
        "run ended at month {month}: {} ({}/100)",
        if report.success { "success" } else { "failure" },
        report.overall_score
    );
    state.trigger_event(report.to_event());
    state.outcome = Some(report.clone());
    report
}

/// End the run now and evaluate the latest simulated month. Repeated calls
/// return the stored verdict.
pub fn finish_run(state: &mut GameState) -> OutcomeReport {
    if let Some(report) = &state.outcome {
        return report.clone();
    }
    let month = state.month.saturating_sub(1).max(FIRST_MONTH);
    conclude(state, month)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetAdvice {
    pub minimum: i64,
    pub recommended: i64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionAdvice {
    pub marketing: BudgetAdvice,
    pub servers: BudgetAdvice,
}

/// Budget guidance scaled to the current user base.
#[must_use]
pub fn recommend_decision(state: &GameState) -> DecisionAdvice {
    let users = state.resources.users.max(0);
    let metrics = &state.monthly_metrics;
    let marketing_reason = if metrics.user_growth < BASE_GROWTH_RATE {
        "User growth is below target, more marketing recommended"
    } else {
        "Maintain current growth momentum"
    };
    let server_reason = if metrics.server_uptime < OUTCOME_UPTIME_TARGET {
        "Server stability needs improvement"
    } else {
        "Current infrastructure is adequate"
    };
    DecisionAdvice {
        marketing: BudgetAdvice {
            minimum: (users / 2).max(1_000),
            recommended: users.max(2_000),
            reason: marketing_reason.to_string(),
        },
        servers: BudgetAdvice {
            minimum: (users / 5).max(500),
            recommended: (users * 2 / 5).max(1_000),
            reason: server_reason.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::catalog;
    use crate::events::EventKind;
    use crate::state::GameVariant;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn calm() -> SimulationConfig {
        SimulationConfig {
            market_event_chance: 0.0,
            ..SimulationConfig::default()
        }
    }

    fn launched() -> GameState {
        let mut state = GameState::new(GameVariant::Classic);
        state.stage = Stage::Launch;
        state.current_stage = 3;
        state.completed = true;
        for id in ["instagram", "tiktok"] {
            let _ = crate::campaign::toggle_channel(&mut state, catalog().channel(id).unwrap());
        }
        state
    }

    #[test]
    fn budget_efficiency_caps_and_defaults() {
        assert!((budget_efficiency(0, 50_000) - 0.5).abs() < f64::EPSILON);
        assert!((budget_efficiency(3_000, 100_000) - 0.1).abs() < 1e-12);
        assert!((budget_efficiency(90_000, 100_000) - 1.5).abs() < f64::EPSILON);
        assert!((budget_efficiency(1_000, -5_000) - 0.5).abs() < f64::EPSILON);
        assert!((budget_efficiency(1_000, 0) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn months_do_not_advance_before_launch() {
        let mut state = GameState::new(GameVariant::Classic);
        let before = state.clone();
        let mut rng = ChaCha20Rng::seed_from_u64(4);
        let decision = MonthlyDecision::new(2_000, 1_000);
        assert!(advance_month(&mut state, &decision, &calm(), catalog(), &mut rng).is_none());
        state.stage = Stage::Build;
        assert!(advance_months(&mut state, &decision, 3, &calm(), catalog(), &mut rng).is_empty());
        state.stage = Stage::Foundation;
        assert_eq!(state, before);
    }

    #[test]
    fn seed_round_covers_start_up_debt() {
        let mut state = GameState::new(GameVariant::Lean);
        state.resources.money = -7_000;
        let mut rng = ChaCha20Rng::seed_from_u64(8);
        let round = seed_round(&mut state, &calm(), catalog(), &mut rng).unwrap();
        assert_eq!(round.debt, 7_000);
        assert_eq!(round.amount, 37_000);
        assert_eq!(state.resources.money, 30_000);
        assert!(catalog().investors.contains(&round.investor));
        assert_eq!(state.event_count(EventKind::InvestmentReceived), 1);

        assert!(seed_round(&mut state, &calm(), catalog(), &mut rng).is_none());
        assert_eq!(state.resources.money, 30_000);
        assert_eq!(state.event_count(EventKind::InvestmentReceived), 1);
    }

    #[test]
    fn uptime_rises_with_investment_and_caps() {
        assert!((server_uptime(0, 1_000) - 95.0).abs() < f64::EPSILON);
        // 100 per 100 units of load adds four points
        assert!((server_uptime(100, 1_000) - 99.0).abs() < 1e-9);
        assert!((server_uptime(10_000, 1_000) - 99.99).abs() < f64::EPSILON);
    }

    #[test]
    fn negative_balance_is_bailed_out() {
        assert_eq!(settle_balance(100, -500, 10_000), (10_000, Some((10_400, 400))));
        assert_eq!(settle_balance(1_000, -500, 10_000), (500, None));
    }

    #[test]
    fn bankrupt_month_injects_investment() {
        let mut state = launched();
        state.resources.money = 100;
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let decision = MonthlyDecision::new(5_000, 0);
        let report = advance_month(&mut state, &decision, &calm(), catalog(), &mut rng).unwrap();
        assert!(report.profit < 0);
        assert!(state.resources.money >= 0);
        let bailout = report.bailout.unwrap();
        assert!(catalog().investors.contains(&bailout.investor));
        assert_eq!(state.event_count(EventKind::InvestmentReceived), 1);
    }

    #[test]
    fn first_month_follows_growth_model() {
        let mut state = launched();
        let mut rng = ChaCha20Rng::seed_from_u64(9);
        let decision = MonthlyDecision::new(6_000, 1_000);
        let report = advance_month(&mut state, &decision, &calm(), catalog(), &mut rng).unwrap();
        // instagram 9*8 + tiktok 8*9 over 100
        let efficiency = budget_efficiency(6_000, 100_000);
        let rate = 0.05 + 1.44 * efficiency * 0.2;
        assert_eq!(report.users_after, round_f64_to_i64(1_000.0 * (1.0 + rate)));
        assert_eq!(report.month, 1);
        assert_eq!(state.month, 2);
        assert!(report.market_shock.is_none());
        assert_eq!(report.expenses.overhead, 2_000);
        assert_eq!(report.expenses.salaries, 0);
        assert!(report.metrics.churn_rate >= 0.02);
        assert!(report.metrics.conversion_rate <= 0.30);
        assert!(report.metrics.customer_satisfaction <= report.metrics.server_uptime);
        assert_eq!(state.previous_metrics, MonthlyMetrics::initial());
    }

    #[test]
    fn month_twelve_is_terminal() {
        let mut state = launched();
        let mut rng = ChaCha20Rng::seed_from_u64(21);
        let decision = MonthlyDecision::new(5_000, 2_000);
        let reports = advance_months(&mut state, &decision, 20, &calm(), catalog(), &mut rng);
        assert_eq!(reports.len(), 12);
        assert!(reports[11].outcome.is_some());
        assert!(reports[..11].iter().all(|r| r.outcome.is_none()));
        assert!(state.outcome.is_some());
        assert!(advance_month(&mut state, &decision, &calm(), catalog(), &mut rng).is_none());
        assert_eq!(state.event_count(EventKind::GameOutcome), 1);
    }

    #[test]
    fn same_seed_same_year() {
        let decision = MonthlyDecision::new(4_000, 1_500);
        let config = SimulationConfig::default();
        let run = |seed| {
            let mut state = launched();
            let mut rng = ChaCha20Rng::seed_from_u64(seed);
            advance_months(&mut state, &decision, 12, &config, catalog(), &mut rng);
            state
        };
        assert_eq!(run(77), run(77));
    }

    #[test]
    fn market_shock_scales_growth() {
        let config = SimulationConfig {
            market_event_chance: 1.0,
            ..SimulationConfig::default()
        };
        let mut state = launched();
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let report = advance_month(&mut state, &MonthlyDecision::new(3_000, 0), &config, catalog(), &mut rng)
            .unwrap();
        let shock = report.market_shock.unwrap();
        assert!((0.8..=1.2).contains(&shock.factor));
        assert_eq!(state.event_count(EventKind::MarketEvent), 1);
    }

    #[test]
    fn finish_run_is_idempotent() {
        let mut state = launched();
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let _ = advance_months(&mut state, &MonthlyDecision::new(2_000, 500), 3, &calm(), catalog(), &mut rng);
        let first = finish_run(&mut state);
        assert_eq!(first.month, 3);
        assert_eq!(finish_run(&mut state), first);
        assert!(advance_month(&mut state, &MonthlyDecision::default(), &calm(), catalog(), &mut rng).is_none());
    }

    #[test]
    fn recommendations_scale_with_users() {
        let mut state = GameState::default();
        state.resources.users = 4_000;
        state.monthly_metrics.server_uptime = 97.0;
        let advice = recommend_decision(&state);
        assert_eq!(advice.marketing.minimum, 2_000);
        assert_eq!(advice.marketing.recommended, 4_000);
        assert_eq!(advice.servers.recommended, 1_600);
        assert!(advice.servers.reason.contains("stability"));
        assert_eq!(MonthlyDecision::recommended(&state), MonthlyDecision::new(4_000, 1_600));
    }
}
