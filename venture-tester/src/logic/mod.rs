pub mod reports;
pub mod runner;
pub mod seeds;
pub mod strategy;
pub mod tester;

pub use runner::{GameRunner, RunPlan, RunSummary};
pub use seeds::resolve_seed_inputs;
pub use strategy::Strategy;
pub use tester::{LogicTester, ScenarioResult};
