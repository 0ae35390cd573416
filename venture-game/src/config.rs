//! Per-session configuration.
//!
//! Every field has a serde default so a host can ship a partial JSON file.
//! Call [`GameConfig::validate`] before building a session from it.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::constants::{
    DEFAULT_AVG_REVENUE_PER_USER, DEFAULT_BAILOUT_BUFFER, DEFAULT_CAMPAIGN_TICK_MS,
    DEFAULT_MARKET_EVENT_CHANCE, DEFAULT_MAX_GROWTH_RATE, DEFAULT_MONTHLY_OVERHEAD,
    DEFAULT_SALARY_PER_MEMBER, DEFAULT_SEED_BUFFER, DEFAULT_TRANSITION_DELAY_MS,
    DEFAULT_VALIDATION_TICK_MS,
};
use crate::numbers::{i64_to_f64, u64_to_f64};
use crate::stage::CapabilityRule;
use crate::state::GameVariant;

/// Longest delay accepted for any timed step.
const MAX_DELAY_MS: u64 = 60_000;

/// Errors raised when configuration invariants are violated.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{field} must be at least {min:.2} (got {value:.2})")]
    MinViolation {
        field: &'static str,
        min: f64,
        value: f64,
    },
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if !(min..=max).contains(&value) {
        return Err(ConfigError::RangeViolation {
            field,
            min,
            max,
            value,
        });
    }
    Ok(())
}

fn check_min(field: &'static str, value: f64, min: f64) -> Result<(), ConfigError> {
    if value.is_nan() || value < min {
        return Err(ConfigError::MinViolation { field, min, value });
    }
    Ok(())
}

fn millis(field: &'static str, value: u64) -> Result<(), ConfigError> {
    check_range(field, u64_to_f64(value), 0.0, u64_to_f64(MAX_DELAY_MS))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    #[serde(default = "StageConfig::default_transition_delay_ms")]
    pub transition_delay_ms: u64,
    #[serde(default)]
    pub capability_rule: CapabilityRule,
}

impl StageConfig {
    #[must_use]
    pub const fn default_transition_delay_ms() -> u64 {
        DEFAULT_TRANSITION_DELAY_MS
    }

    #[must_use]
    pub const fn transition_delay(&self) -> Duration {
        Duration::from_millis(self.transition_delay_ms)
    }
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            transition_delay_ms: Self::default_transition_delay_ms(),
            capability_rule: CapabilityRule::default(),
        }
    }
}

/// Knobs for the monthly simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "SimulationConfig::default_market_event_chance")]
    pub market_event_chance: f64,
    /// Cash left on hand after an emergency investment.
    #[serde(default = "SimulationConfig::default_bailout_buffer")]
    pub bailout_buffer: i64,
    /// Runway handed over by the seed round when the build-out leaves the
    /// company in debt.
    #[serde(default = "SimulationConfig::default_seed_buffer")]
    pub seed_buffer: i64,
    #[serde(default = "SimulationConfig::default_avg_revenue_per_user")]
    pub avg_revenue_per_user: f64,
    #[serde(default = "SimulationConfig::default_salary_per_member")]
    pub salary_per_member: i64,
    #[serde(default = "SimulationConfig::default_monthly_overhead")]
    pub monthly_overhead: i64,
    #[serde(default = "SimulationConfig::default_max_growth_rate")]
    pub max_growth_rate: f64,
}

impl SimulationConfig {
    #[must_use]
    pub const fn default_market_event_chance() -> f64 {
        DEFAULT_MARKET_EVENT_CHANCE
    }

    #[must_use]
    pub const fn default_bailout_buffer() -> i64 {
        DEFAULT_BAILOUT_BUFFER
    }

    #[must_use]
    pub const fn default_seed_buffer() -> i64 {
        DEFAULT_SEED_BUFFER
    }

    #[must_use]
    pub const fn default_avg_revenue_per_user() -> f64 {
        DEFAULT_AVG_REVENUE_PER_USER
    }

    #[must_use]
    pub const fn default_salary_per_member() -> i64 {
        DEFAULT_SALARY_PER_MEMBER
    }

    #[must_use]
    pub const fn default_monthly_overhead() -> i64 {
        DEFAULT_MONTHLY_OVERHEAD
    }

    #[must_use]
    pub const fn default_max_growth_rate() -> f64 {
        DEFAULT_MAX_GROWTH_RATE
    }

    /// # Errors
    ///
    /// Returns `ConfigError` when a field is outside its documented bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("market_event_chance", self.market_event_chance, 0.0, 1.0)?;
        check_min("bailout_buffer", i64_to_f64(self.bailout_buffer), 0.0)?;
        check_min("seed_buffer", i64_to_f64(self.seed_buffer), 0.0)?;
        check_range("avg_revenue_per_user", self.avg_revenue_per_user, 1.0, 10_000.0)?;
        check_min("salary_per_member", i64_to_f64(self.salary_per_member), 0.0)?;
        check_min("monthly_overhead", i64_to_f64(self.monthly_overhead), 0.0)?;
        check_range("max_growth_rate", self.max_growth_rate, 0.05, 5.0)?;
        Ok(())
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            market_event_chance: Self::default_market_event_chance(),
            bailout_buffer: Self::default_bailout_buffer(),
            seed_buffer: Self::default_seed_buffer(),
            avg_revenue_per_user: Self::default_avg_revenue_per_user(),
            salary_per_member: Self::default_salary_per_member(),
            monthly_overhead: Self::default_monthly_overhead(),
            max_growth_rate: Self::default_max_growth_rate(),
        }
    }
}

/// Tick cadence for the progress tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "TimingConfig::default_validation_tick_ms")]
    pub validation_tick_ms: u64,
    #[serde(default = "TimingConfig::default_campaign_tick_ms")]
    pub campaign_tick_ms: u64,
}

impl TimingConfig {
    #[must_use]
    pub const fn default_validation_tick_ms() -> u64 {
        DEFAULT_VALIDATION_TICK_MS
    }

    #[must_use]
    pub const fn default_campaign_tick_ms() -> u64 {
        DEFAULT_CAMPAIGN_TICK_MS
    }

    /// No waiting at all; used by headless runs.
    #[must_use]
    pub const fn instant() -> Self {
        Self {
            validation_tick_ms: 0,
            campaign_tick_ms: 0,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            validation_tick_ms: Self::default_validation_tick_ms(),
            campaign_tick_ms: Self::default_campaign_tick_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GameConfig {
    #[serde(default)]
    pub variant: GameVariant,
    #[serde(default)]
    pub stage: StageConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub timing: TimingConfig,
}

impl GameConfig {
    /// Parse and validate a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed JSON and a bounds error when
    /// validation fails.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Zero delays everywhere, for tests and batch runs.
    #[must_use]
    pub fn headless() -> Self {
        Self {
            stage: StageConfig {
                transition_delay_ms: 0,
                ..StageConfig::default()
            },
            timing: TimingConfig::instant(),
            ..Self::default()
        }
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when any field violates the documented bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        millis("stage.transition_delay_ms", self.stage.transition_delay_ms)?;
        millis("timing.validation_tick_ms", self.timing.validation_tick_ms)?;
        millis("timing.campaign_tick_ms", self.timing.campaign_tick_ms)?;
        self.simulation.validate()
    }
}
