//! Read-only reference data the engine looks up by id.
//!
//! Records are copied by value into [`crate::GameState`] when selected, so a
//! catalog can be swapped without aliasing anything a session already owns.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

const DEFAULT_CATALOG_DATA: &str = include_str!("../assets/catalog.json");

/// One-off startup costs paid when the company is incorporated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct InitialCosts {
    #[serde(default)]
    pub setup: i64,
    #[serde(default)]
    pub development: i64,
    #[serde(default)]
    pub legal: i64,
    #[serde(default)]
    pub marketing: i64,
}

impl InitialCosts {
    #[must_use]
    pub const fn total(&self) -> i64 {
        self.setup + self.development + self.legal + self.marketing
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MonthlyFixedCosts {
    #[serde(default)]
    pub rent: i64,
    #[serde(default)]
    pub salaries: i64,
    #[serde(default)]
    pub utilities: i64,
    #[serde(default)]
    pub insurance: i64,
}

impl MonthlyFixedCosts {
    #[must_use]
    pub const fn total(&self) -> i64 {
        self.rent + self.salaries + self.utilities + self.insurance
    }
}

/// Variable costs per unit sold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct OperationalCosts {
    #[serde(default)]
    pub per_unit: f64,
    #[serde(default)]
    pub labor_per_unit: f64,
    #[serde(default)]
    pub material_per_unit: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct BreakEvenAnalysis {
    pub recommended_price: f64,
    pub units_per_month: u32,
    pub months_to_break_even: u32,
}

impl BreakEvenAnalysis {
    /// Contribution margin per unit at the recommended price.
    #[must_use]
    pub fn unit_margin(&self, costs: &OperationalCosts) -> f64 {
        self.recommended_price - costs.per_unit
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct IdeaFinancials {
    pub initial_costs: InitialCosts,
    pub monthly_fixed: MonthlyFixedCosts,
    pub operational_costs: OperationalCosts,
    #[serde(default)]
    pub break_even: BreakEvenAnalysis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartupIdea {
    pub id: String,
    pub name: String,
    pub description: String,
    pub market: String,
    pub difficulty: u8,
    /// Market potential on a 0..=10 scale.
    pub potential: f64,
    pub financials: IdeaFinancials,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Developer,
    Designer,
    Marketer,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Developer => "developer",
            Self::Designer => "designer",
            Self::Marketer => "marketer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "developer" => Ok(Self::Developer),
            "designer" => Ok(Self::Designer),
            "marketer" => Ok(Self::Marketer),
            _ => Err(()),
        }
    }
}

/// Hireable team member. Copied into the session on hire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: String,
    pub name: String,
    pub role: Role,
    pub skill: u8,
    /// One-off hiring cost.
    pub cost: i64,
    pub salary: i64,
    pub benefits: i64,
    #[serde(default = "default_productivity")]
    pub productivity_multiplier: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub specialties: Vec<String>,
    /// Roles this member works well alongside.
    #[serde(default)]
    pub team_fit: Vec<Role>,
}

const fn default_productivity() -> f64 {
    1.0
}

impl TeamMember {
    /// Recurring monthly cost of keeping the member on payroll.
    #[must_use]
    pub const fn monthly_cost(&self) -> i64 {
        self.salary + self.benefits
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureCategory {
    Core,
    Social,
    Business,
}

/// Buildable product feature. Copied into the session when added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub id: String,
    pub name: String,
    pub category: FeatureCategory,
    #[serde(default)]
    pub description: String,
    pub complexity: u8,
    pub user_value: u8,
    pub cost: i64,
    /// Development time in days.
    pub time_required: i64,
    pub maintenance_cost: i64,
    #[serde(default)]
    pub revenue_impact: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketingChannel {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub reach: u8,
    pub engagement: u8,
    /// Smallest budget the channel accepts.
    pub min_cost: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationChoice {
    pub id: u8,
    pub text: String,
    pub impact: i32,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationalEventKind {
    Equipment,
    Staff,
    Opportunity,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct OptionEffect {
    #[serde(default)]
    pub productivity: i32,
    #[serde(default)]
    pub morale: i32,
    #[serde(default)]
    pub cost: i64,
    #[serde(default)]
    pub time: i64,
    #[serde(default)]
    pub team_skill: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventOption {
    pub id: String,
    pub text: String,
    pub effect: OptionEffect,
}

/// Build-stage disruption or opportunity the player resolves by picking an option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationalEvent {
    pub id: String,
    pub kind: OperationalEventKind,
    pub title: String,
    pub description: String,
    pub probability: f64,
    pub options: Vec<EventOption>,
}

impl OperationalEvent {
    #[must_use]
    pub fn option(&self, id: &str) -> Option<&EventOption> {
        self.options.iter().find(|option| option.id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Positive,
    Negative,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketEvent {
    pub id: String,
    pub polarity: Polarity,
    pub title: String,
    pub description: String,
}

/// Errors raised when a catalog document is malformed.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate {section} id `{id}`")]
    DuplicateId { section: &'static str, id: String },
    #[error("catalog section `{0}` must not be empty")]
    EmptySection(&'static str),
}

/// All reference tables in one place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Catalog {
    #[serde(default)]
    pub ideas: Vec<StartupIdea>,
    #[serde(default)]
    pub team: Vec<TeamMember>,
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(default)]
    pub channels: Vec<MarketingChannel>,
    #[serde(default)]
    pub validation_choices: Vec<ValidationChoice>,
    #[serde(default)]
    pub operational_events: Vec<OperationalEvent>,
    #[serde(default)]
    pub market_events: Vec<MarketEvent>,
    #[serde(default)]
    pub investors: Vec<String>,
}

impl Catalog {
    /// Parse and validate a catalog document.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` when the JSON is malformed, a section used by the
    /// simulation is empty, or an id is repeated within a section.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let catalog: Self = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load the catalog compiled into the crate.
    #[must_use]
    pub fn load_from_static() -> Self {
        Self::from_json(DEFAULT_CATALOG_DATA).unwrap_or_default()
    }

    /// Check section invariants.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` on an empty required section or a duplicate id.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.investors.is_empty() {
            return Err(CatalogError::EmptySection("investors"));
        }
        ensure_unique("ideas", self.ideas.iter().map(|idea| idea.id.as_str()))?;
        ensure_unique("team", self.team.iter().map(|member| member.id.as_str()))?;
        ensure_unique(
            "features",
            self.features.iter().map(|feature| feature.id.as_str()),
        )?;
        ensure_unique(
            "channels",
            self.channels.iter().map(|channel| channel.id.as_str()),
        )?;
        ensure_unique(
            "operational_events",
            self.operational_events.iter().map(|event| event.id.as_str()),
        )?;
        ensure_unique(
            "market_events",
            self.market_events.iter().map(|event| event.id.as_str()),
        )?;
        let mut choice_ids = HashSet::new();
        for choice in &self.validation_choices {
            if !choice_ids.insert(choice.id) {
                return Err(CatalogError::DuplicateId {
                    section: "validation_choices",
                    id: choice.id.to_string(),
                });
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn idea(&self, id: &str) -> Option<&StartupIdea> {
        self.ideas.iter().find(|idea| idea.id == id)
    }

    #[must_use]
    pub fn member(&self, id: &str) -> Option<&TeamMember> {
        self.team.iter().find(|member| member.id == id)
    }

    #[must_use]
    pub fn feature(&self, id: &str) -> Option<&Feature> {
        self.features.iter().find(|feature| feature.id == id)
    }

    #[must_use]
    pub fn channel(&self, id: &str) -> Option<&MarketingChannel> {
        self.channels.iter().find(|channel| channel.id == id)
    }

    #[must_use]
    pub fn validation_choice(&self, id: u8) -> Option<&ValidationChoice> {
        self.validation_choices.iter().find(|choice| choice.id == id)
    }

    #[must_use]
    pub fn operational_event(&self, id: &str) -> Option<&OperationalEvent> {
        self.operational_events.iter().find(|event| event.id == id)
    }

    /// Members of a given role, in roster order.
    pub fn members_with_role(&self, role: Role) -> impl Iterator<Item = &TeamMember> {
        self.team.iter().filter(move |member| member.role == role)
    }
}

fn ensure_unique<'a>(
    section: &'static str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<(), CatalogError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(CatalogError::DuplicateId {
                section,
                id: id.to_string(),
            });
        }
    }
    Ok(())
}

/// Shared built-in catalog, parsed on first use.
#[must_use]
pub fn catalog() -> &'static Catalog {
    static CATALOG: OnceLock<Catalog> = OnceLock::new();
    CATALOG.get_or_init(Catalog::load_from_static)
}
