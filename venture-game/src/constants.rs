//! Centralized balance and tuning constants for Venture game logic.
//!
//! These values define the deterministic math for the core simulation.
//! Values that a host may want to tweak per session live on
//! [`crate::config::GameConfig`] instead and default to the numbers below.

// Starting resources -------------------------------------------------------
pub(crate) const CLASSIC_STARTING_MONEY: i64 = 100_000;
pub(crate) const LEAN_STARTING_MONEY: i64 = 23_000;
pub(crate) const STARTING_TIME_DAYS: i64 = 90;
pub(crate) const STARTING_USERS: i64 = 1_000;
pub(crate) const MORALE_MIN: i32 = 0;
pub(crate) const MORALE_MAX: i32 = 100;

// Morale nudges ------------------------------------------------------------
pub(crate) const MORALE_HIRE_DELTA: i32 = 5;
pub(crate) const MORALE_RELEASE_DELTA: i32 = -5;
pub(crate) const MORALE_ADD_FEATURE_DELTA: i32 = 3;
pub(crate) const MORALE_REMOVE_FEATURE_DELTA: i32 = -1;

// Scoring ------------------------------------------------------------------
pub(crate) const SCORE_MIN: i32 = 0;
pub(crate) const SCORE_MAX: i32 = 100;
pub(crate) const FOUNDATION_WEIGHT: f64 = 0.30;
pub(crate) const DEVELOPMENT_WEIGHT: f64 = 0.35;
pub(crate) const MARKETING_WEIGHT: f64 = 0.35;
pub(crate) const IDEA_POTENTIAL_SCALE: f64 = 10.0;
/// Best achievable sum of three validation choice impacts (8 + 7 + 6).
pub(crate) const VALIDATION_CHOICE_BASELINE: f64 = 21.0;
/// Three members at the maximum skill of 9.
pub(crate) const DEVELOPMENT_TEAM_BASELINE: f64 = 27.0;
/// Three features at the best value/complexity ratio (9/2) scaled by 10.
pub(crate) const DEVELOPMENT_FEATURE_BASELINE: f64 = 135.0;
pub(crate) const FEATURE_VALUE_SCALE: f64 = 10.0;
pub(crate) const DEVELOPMENT_HALF: f64 = 50.0;
/// Three channels at the maximum reach + engagement of 18.
pub(crate) const CHANNEL_SCORE_BASELINE: f64 = 54.0;
pub(crate) const UNFUNDED_MARKETING_FACTOR: f64 = 0.5;

// Team skill ---------------------------------------------------------------
pub(crate) const TEAM_SKILL_CAP: f64 = 9.0;
pub(crate) const TEAM_SIZE_SOFT_CAP: usize = 3;
pub(crate) const TEAM_SIZE_PENALTY: f64 = 0.5;
pub(crate) const ROLE_DIVERSITY_THRESHOLD: usize = 2;
pub(crate) const ROLE_DIVERSITY_BONUS: f64 = 1.0;
pub(crate) const FEATURE_GATE_MULTIPLIER: f64 = 2.0;

// Stage gates --------------------------------------------------------------
pub(crate) const MIN_TEAM_FOR_LAUNCH: usize = 2;
pub(crate) const MIN_FEATURES_FOR_LAUNCH: usize = 3;
pub(crate) const FINAL_STAGE_NUMBER: u8 = 3;
pub(crate) const DEFAULT_TRANSITION_DELAY_MS: u64 = 2_000;

// Marketing plan -----------------------------------------------------------
pub(crate) const MAX_MARKETING_CHANNELS: usize = 3;
pub(crate) const MIN_CHANNELS_FOR_DECISION: usize = 2;
pub(crate) const MIN_MARKETING_BUDGET: i64 = 1_000;

// Launch campaign ----------------------------------------------------------
pub(crate) const CAMPAIGN_TICKS: u8 = 10;
pub(crate) const CAMPAIGN_BUDGET_DIVISOR: f64 = 3_000.0;
pub(crate) const CAMPAIGN_BUDGET_MULTIPLIER_CAP: f64 = 3.0;
pub(crate) const CAMPAIGN_MARKETER_BONUS: f64 = 0.3;
pub(crate) const CAMPAIGN_FEATURE_BONUS: f64 = 0.1;
pub(crate) const CAMPAIGN_IMPRESSIONS_PER_REACH: f64 = 1_000.0;
pub(crate) const CAMPAIGN_ENGAGEMENT_DIVISOR: f64 = 100.0;
pub(crate) const CAMPAIGN_CLICK_RATE: f64 = 0.02;
pub(crate) const CAMPAIGN_CONVERSION_RATE: f64 = 0.05;
pub(crate) const CAMPAIGN_FOLLOW_RATE: f64 = 0.001;
pub(crate) const CAMPAIGN_RANDOM_MIN: f64 = 0.8;
pub(crate) const CAMPAIGN_RANDOM_MAX: f64 = 1.2;
pub(crate) const CAMPAIGN_SUCCESS_CONVERSIONS: u64 = 100;
pub(crate) const CAMPAIGN_POOR_CONVERSIONS: u64 = 20;
pub(crate) const CAMPAIGN_SUCCESS_BONUS: i64 = 500;
pub(crate) const CAMPAIGN_VIRAL_IMPRESSIONS: u64 = 50_000;

// Idea validation ----------------------------------------------------------
pub(crate) const VALIDATION_PROGRESS_STEP: u8 = 10;
pub(crate) const PROGRESS_COMPLETE: u8 = 100;
pub(crate) const DEFAULT_VALIDATION_TICK_MS: u64 = 200;
pub(crate) const DEFAULT_CAMPAIGN_TICK_MS: u64 = 2_000;

// Monthly progression ------------------------------------------------------
pub(crate) const FIRST_MONTH: u32 = 1;
pub(crate) const FINAL_MONTH: u32 = 12;
pub(crate) const BASE_GROWTH_RATE: f64 = 0.05;
pub(crate) const MARKETING_GROWTH_WEIGHT: f64 = 0.2;
pub(crate) const MARKETING_EFFECTIVENESS_DIVISOR: f64 = 100.0;
pub(crate) const BUDGET_MONEY_SHARE: f64 = 0.3;
pub(crate) const BUDGET_EFFICIENCY_CAP: f64 = 1.5;
pub(crate) const UNFUNDED_BUDGET_EFFICIENCY: f64 = 0.5;
pub(crate) const MARKETING_REVENUE_FACTOR: f64 = 1_000.0;
pub(crate) const BASELINE_REVENUE_GROWTH: f64 = 0.10;
pub(crate) const DEFAULT_AVG_REVENUE_PER_USER: f64 = 50.0;
pub(crate) const DEFAULT_SALARY_PER_MEMBER: i64 = 5_000;
pub(crate) const DEFAULT_MONTHLY_OVERHEAD: i64 = 2_000;
pub(crate) const DEFAULT_BAILOUT_BUFFER: i64 = 10_000;
pub(crate) const DEFAULT_SEED_BUFFER: i64 = 30_000;
pub(crate) const DEFAULT_MARKET_EVENT_CHANCE: f64 = 0.2;
pub(crate) const DEFAULT_MAX_GROWTH_RATE: f64 = 1.0;
pub(crate) const MARKET_EVENT_NEGATIVE_MIN: f64 = 0.8;
pub(crate) const MARKET_EVENT_POSITIVE_MAX: f64 = 1.2;
pub(crate) const SERVER_COST_PER_USER: f64 = 0.1;
pub(crate) const UPTIME_BASE: f64 = 95.0;
pub(crate) const UPTIME_INVESTMENT_WEIGHT: f64 = 4.0;
pub(crate) const UPTIME_CAP: f64 = 99.99;
pub(crate) const SATISFACTION_UPTIME_PIVOT: f64 = 97.0;
pub(crate) const SATISFACTION_FEATURE_BONUS: f64 = 0.5;
pub(crate) const SATISFACTION_CHURN_PENALTY: f64 = 50.0;
pub(crate) const CHURN_BASE: f64 = 0.05;
pub(crate) const CHURN_SATISFACTION_WEIGHT: f64 = 0.001;
pub(crate) const CHURN_UPTIME_WEIGHT: f64 = 0.002;
pub(crate) const CHURN_FLOOR: f64 = 0.02;
pub(crate) const CONVERSION_MARKETING_WEIGHT: f64 = 0.002;
pub(crate) const CONVERSION_SATISFACTION_PIVOT: f64 = 80.0;
pub(crate) const CONVERSION_SATISFACTION_WEIGHT: f64 = 0.000_5;
pub(crate) const CONVERSION_CAP: f64 = 0.30;
pub(crate) const INITIAL_CONVERSION_RATE: f64 = 0.02;
pub(crate) const INITIAL_SATISFACTION: f64 = 100.0;
pub(crate) const INITIAL_UPTIME: f64 = 100.0;

// Outcome evaluation -------------------------------------------------------
pub(crate) const OUTCOME_SUCCESS_SCORE: i32 = 70;
pub(crate) const OUTCOME_REVENUE_TARGET: f64 = 15_000.0;
pub(crate) const OUTCOME_GROWTH_TARGET: f64 = 0.12;
pub(crate) const OUTCOME_SATISFACTION_TARGET: f64 = 85.0;
pub(crate) const OUTCOME_UPTIME_TARGET: f64 = 99.0;
pub(crate) const OUTCOME_ROI_TARGET: f64 = 0.3;
pub(crate) const OUTCOME_CHURN_CEILING: f64 = 0.08;
pub(crate) const OUTCOME_CONVERSION_TARGET: f64 = 0.15;

// Build analytics ----------------------------------------------------------
pub(crate) const SYNERGY_WEIGHT: f64 = 0.5;
pub(crate) const RUNWAY_COMFORT_MONTHS: f64 = 12.0;
pub(crate) const RISK_SCALE: f64 = 33.33;
/// Just above the highest catalog complexity, so feature risk stays below one.
pub(crate) const RISK_COMPLEXITY_SCALE: f64 = 25.0;
pub(crate) const SKILL_SCALE: f64 = 10.0;
pub(crate) const READINESS_TEAM_MIN: i32 = 70;
pub(crate) const READINESS_RISK_MIN: i32 = 50;
