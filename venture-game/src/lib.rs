//! Venture Game Engine
//!
//! Platform-agnostic core logic for a startup-building simulation that runs
//! from an idea (Foundation) through hiring and product work (Build) to a
//! marketing launch and twelve simulated months (Launch).
//! This crate provides all game mechanics without UI or platform-specific dependencies.

pub mod analytics;
pub mod campaign;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod evaluation;
pub mod events;
pub mod ledger;
pub mod numbers;
pub mod operations;
pub mod progression;
pub mod scoring;
pub mod session;
pub mod stage;
pub mod state;
pub mod tasks;
pub mod validation;

// Re-export commonly used types
pub use analytics::{BuildReport, FeatureReadiness, feature_readiness, team_efficiency};
pub use campaign::{CampaignInputs, CampaignMetrics, CampaignWork, MarketingPlan};
pub use catalog::{
    Catalog, CatalogError, EventOption, Feature, FeatureCategory, MarketEvent, MarketingChannel,
    OperationalEvent, OperationalEventKind, Role, StartupIdea, TeamMember, ValidationChoice,
    catalog,
};
pub use config::{ConfigError, GameConfig, SimulationConfig, StageConfig, TimingConfig};
pub use evaluation::{
    MetricId, MetricResult, MilestoneProgress, MilestoneThresholds, OutcomeReport,
    evaluate_outcome, milestone_for_month,
};
pub use events::{EventKind, EventSeverity, GameEvent};
pub use ledger::{ExpenseLedger, FinanceChange, Finances, LedgerError, ResourcePatch, Resources};
pub use progression::{
    Bailout, DecisionAdvice, MonthReport, MonthlyDecision, MonthlyExpenses, MonthlyMetrics,
    advance_month, finish_run, seed_round,
};
pub use scoring::Scores;
pub use session::GameSession;
pub use stage::{CapabilityRule, Stage, StageFlow, StageFlowError, StageOutcome, TransitionTicket};
pub use state::{ActionOutcome, GameState, GameVariant};
pub use tasks::{CancellationToken, ProgressWork, TaskStatus, TimedTask};
pub use validation::ValidationWork;

/// Name under which hosts store the session configuration.
pub const GAME_CONFIG_NAME: &str = "game";

/// Trait for abstracting data loading operations
/// Platform-specific implementations should provide this
pub trait CatalogLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the reference catalog from the platform-specific source
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be loaded.
    fn load_catalog(&self) -> Result<Catalog, Self::Error>;

    /// Load configuration data by name
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or parsed.
    fn load_config<T>(&self, config_name: &str) -> Result<T, Self::Error>
    where
        T: serde::de::DeserializeOwned;
}

/// Loader backed by the catalog compiled into the crate. Every named
/// configuration resolves to its defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinLoader;

impl CatalogLoader for BuiltinLoader {
    type Error = CatalogError;

    fn load_catalog(&self) -> Result<Catalog, Self::Error> {
        Ok(catalog().clone())
    }

    fn load_config<T>(&self, _config_name: &str) -> Result<T, Self::Error>
    where
        T: serde::de::DeserializeOwned,
    {
        Ok(serde_json::from_str("{}")?)
    }
}

/// Main game engine for creating sessions
pub struct GameEngine<L>
where
    L: CatalogLoader,
{
    loader: L,
}

impl<L> GameEngine<L>
where
    L: CatalogLoader,
{
    /// Create a new game engine with the provided loader
    pub const fn new(loader: L) -> Self {
        Self { loader }
    }

    pub const fn loader(&self) -> &L {
        &self.loader
    }

    /// Fresh state for the given variant.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be loaded.
    pub fn create_game(&self, seed: u64, variant: GameVariant) -> Result<GameState, L::Error> {
        let config = GameConfig {
            variant,
            ..GameConfig::default()
        };
        self.create_session_with(seed, config)
            .map(GameSession::into_state)
    }

    /// Construct a session with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be loaded.
    pub fn create_session_with(
        &self,
        seed: u64,
        config: GameConfig,
    ) -> Result<GameSession, L::Error> {
        let catalog = self.loader.load_catalog()?;
        Ok(GameSession::new(config, catalog, seed))
    }

    /// Construct a session from the loader's stored configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration or catalog cannot be loaded, or
    /// if either fails validation.
    pub fn create_session(&self, seed: u64) -> Result<GameSession, anyhow::Error>
    where
        L::Error: Into<anyhow::Error>,
    {
        let config: GameConfig = self
            .loader
            .load_config(GAME_CONFIG_NAME)
            .map_err(Into::into)?;
        config.validate()?;
        let catalog = self.loader.load_catalog().map_err(Into::into)?;
        catalog.validate()?;
        Ok(GameSession::new(config, catalog, seed))
    }
}
