use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::runner::{GameRunner, RunPlan, RunSummary};
use crate::scenario::Scenario;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub key: String,
    pub strategy: String,
    pub seed: u64,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    #[serde(with = "duration_vec_serde")]
    pub performance_data: Vec<Duration>,
    /// Runs whose final verdict was a success.
    pub game_successes: usize,
    pub mean_overall_score: f64,
}

pub struct LogicTester {
    runner: GameRunner,
}

impl LogicTester {
    pub const fn new(runner: GameRunner) -> Self {
        Self { runner }
    }

    pub async fn run_scenario(
        &self,
        scenario: &Scenario,
        seeds: &[u64],
        iterations: usize,
    ) -> Vec<ScenarioResult> {
        let mut results = Vec::with_capacity(seeds.len());
        for &seed in seeds {
            if self.runner.verbose() {
                println!(
                    "🧪 Testing scenario: {} (strategy: {} seed: {})",
                    scenario.name.bright_white(),
                    scenario.plan.strategy,
                    seed
                );
            }
            results.push(self.run_single_scenario(scenario, seed, iterations).await);
        }
        results
    }

    async fn run_single_scenario(
        &self,
        scenario: &Scenario,
        seed: u64,
        iterations: usize,
    ) -> ScenarioResult {
        let mut successes = 0;
        let mut failures = Vec::new();
        let mut performance_data = Vec::new();
        let mut game_successes = 0;
        let mut score_total = 0_i64;
        let mut scored = 0_u32;

        for i in 0..iterations {
            let start_time = Instant::now();
            let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));

            match self.run_iteration(&scenario.plan, iteration_seed).await {
                Ok(summary) => {
                    successes += 1;
                    let duration = start_time.elapsed();
                    performance_data.push(duration);
                    if summary.outcome.success {
                        game_successes += 1;
                    }
                    score_total += i64::from(summary.outcome.overall_score);
                    scored += 1;
                    if self.runner.verbose() {
                        println!(
                            "  ✅ Iteration {}/{} passed ({duration:?}) months:{} verdict:{} score:{}",
                            i + 1,
                            iterations,
                            summary.months.len(),
                            summary.verdict(),
                            summary.outcome.overall_score
                        );
                    }
                }
                Err(err) => {
                    let message = format!(
                        "Iteration {} (strategy {}, seed {}): {err:#}",
                        i + 1,
                        scenario.plan.strategy,
                        iteration_seed
                    );
                    if self.runner.verbose() {
                        println!(
                            "  ❌ Iteration {}/{} failed: {}",
                            i + 1,
                            iterations,
                            message.clone().red()
                        );
                    }
                    failures.push(message);
                }
            }
        }

        let average_duration = if performance_data.is_empty() {
            Duration::ZERO
        } else {
            performance_data.iter().sum::<Duration>()
                / u32::try_from(performance_data.len()).unwrap_or(1)
        };
        let mean_overall_score = if scored == 0 {
            0.0
        } else {
            venture_game::numbers::i64_to_f64(score_total) / f64::from(scored)
        };

        ScenarioResult {
            scenario_name: scenario.name.to_string(),
            key: scenario.key.to_string(),
            strategy: scenario.plan.strategy.label().to_string(),
            seed,
            passed: failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: successes,
            failures,
            average_duration,
            performance_data,
            game_successes,
            mean_overall_score,
        }
    }

    /// Play one seed, replay it when the plan asks, and run the expectations.
    async fn run_iteration(&self, plan: &RunPlan, seed: u64) -> anyhow::Result<RunSummary> {
        let summary = self.runner.play(plan, seed).await?;
        if plan.replay {
            let replay = self.runner.play(plan, seed).await?;
            anyhow::ensure!(
                replay.final_state == summary.final_state,
                "replay of seed {seed} diverged (scores {:?} vs {:?})",
                summary.scores,
                replay.scores
            );
        }
        evaluate_expectations(plan, &summary)?;
        Ok(summary)
    }
}

fn evaluate_expectations(plan: &RunPlan, summary: &RunSummary) -> anyhow::Result<()> {
    for expectation in &plan.expectations {
        expectation.evaluate(summary)?;
    }
    Ok(())
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}

mod duration_vec_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis: Vec<u128> = durations.iter().map(Duration::as_millis).collect();
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Vec::<u128>::deserialize(deserializer)?;
        Ok(millis
            .into_iter()
            .map(|m| Duration::from_millis(u64::try_from(m).unwrap_or(0)))
            .collect())
    }
}
