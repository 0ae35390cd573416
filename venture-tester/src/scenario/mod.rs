pub mod catalog;

pub use catalog::{catalog_scenarios, find_scenario, list_scenarios};

use crate::logic::RunPlan;

/// A named playthrough with its expectations.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub plan: RunPlan,
}

impl Scenario {
    #[must_use]
    pub const fn new(
        key: &'static str,
        name: &'static str,
        description: &'static str,
        plan: RunPlan,
    ) -> Self {
        Self {
            key,
            name,
            description,
            plan,
        }
    }
}
