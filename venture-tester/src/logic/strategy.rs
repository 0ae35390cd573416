use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::fmt;

use venture_game::numbers::i64_to_f64;
use venture_game::progression::DecisionAdvice;
use venture_game::{
    Catalog, Feature, MarketingChannel, MonthlyDecision, OperationalEvent, Role, StartupIdea,
    TeamMember,
};

const ROLES: [Role; 3] = [Role::Developer, Role::Designer, Role::Marketer];

/// Scripted player behaviour used by the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// One strong hire per role, three approachable features, recommended budgets
    Balanced,
    /// Largest team, most features, heavy marketing spend
    Aggressive,
    /// Cheapest idea, best-value hires, minimum budgets
    Frugal,
}

impl Strategy {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Balanced => "balanced",
            Self::Aggressive => "aggressive",
            Self::Frugal => "frugal",
        }
    }

    /// Pick the idea to validate given the cash on hand.
    #[must_use]
    pub fn pick_idea(self, catalog: &Catalog, budget: i64) -> Option<&StartupIdea> {
        let cost = |idea: &StartupIdea| idea.financials.initial_costs.total();
        match self {
            Self::Balanced => catalog
                .ideas
                .iter()
                .filter(|idea| cost(idea) > 0)
                .max_by(|a, b| {
                    let a = a.potential / i64_to_f64(cost(a));
                    let b = b.potential / i64_to_f64(cost(b));
                    a.total_cmp(&b)
                }),
            Self::Aggressive => catalog
                .ideas
                .iter()
                .filter(|idea| cost(idea) <= budget / 2)
                .max_by(|a, b| a.potential.total_cmp(&b.potential))
                .or_else(|| Self::Frugal.pick_idea(catalog, budget)),
            Self::Frugal => catalog.ideas.iter().min_by_key(|idea| cost(idea)),
        }
    }

    /// Cash the strategy keeps back while hiring and building.
    #[must_use]
    pub const fn reserve(self) -> i64 {
        match self {
            Self::Balanced => 15_000,
            Self::Aggressive => 10_000,
            Self::Frugal => 3_000,
        }
    }

    #[must_use]
    pub fn roster(self, catalog: &Catalog) -> Vec<&TeamMember> {
        match self {
            Self::Balanced => ROLES
                .into_iter()
                .filter_map(|role| {
                    catalog
                        .members_with_role(role)
                        .max_by_key(|member| member.skill)
                })
                .collect(),
            Self::Aggressive => {
                let mut members: Vec<_> = catalog.team.iter().collect();
                members.sort_by_key(|member| Reverse(member.skill));
                members.truncate(4);
                members
            }
            Self::Frugal => {
                // best skill per dollar in each role, then the two strongest
                let mut members: Vec<_> = ROLES
                    .into_iter()
                    .filter_map(|role| {
                        catalog.members_with_role(role).max_by(|a, b| {
                            let a_value = i64::from(a.skill) * b.cost;
                            let b_value = i64::from(b.skill) * a.cost;
                            a_value.cmp(&b_value)
                        })
                    })
                    .collect();
                members.sort_by_key(|member| Reverse(member.skill));
                members.truncate(2);
                members
            }
        }
    }

    /// How many features the strategy tries to ship.
    #[must_use]
    pub const fn feature_target(self) -> usize {
        match self {
            Self::Balanced | Self::Frugal => 3,
            Self::Aggressive => 5,
        }
    }

    /// Candidate features, most preferred first.
    #[must_use]
    pub fn feature_order(self, catalog: &Catalog) -> Vec<&Feature> {
        let mut features: Vec<_> = catalog.features.iter().collect();
        match self {
            Self::Balanced => features.sort_by_key(|feature| feature.complexity),
            Self::Aggressive => {
                features.sort_by_key(|feature| (Reverse(feature.user_value), feature.complexity));
            }
            Self::Frugal => features.sort_by_key(|feature| feature.cost),
        }
        features
    }

    #[must_use]
    pub fn channels(self, catalog: &Catalog) -> Vec<&MarketingChannel> {
        let mut channels: Vec<_> = catalog.channels.iter().collect();
        match self {
            Self::Balanced | Self::Aggressive => channels.sort_by_key(|channel| {
                Reverse(u32::from(channel.reach) * u32::from(channel.engagement))
            }),
            Self::Frugal => channels.sort_by_key(|channel| channel.min_cost),
        }
        channels.truncate(if self == Self::Aggressive { 3 } else { 2 });
        channels
    }

    /// Budget per channel on top of the channel minimum.
    #[must_use]
    pub const fn channel_budget(self) -> Option<i64> {
        match self {
            Self::Aggressive => Some(5_000),
            Self::Balanced => Some(2_000),
            Self::Frugal => None,
        }
    }

    #[must_use]
    pub fn option_for(self, event: &OperationalEvent) -> Option<String> {
        let options = event.options.iter();
        let picked = match self {
            Self::Balanced => options.max_by_key(|option| option.effect.morale),
            Self::Aggressive => options.max_by_key(|option| option.effect.productivity),
            Self::Frugal => options.min_by_key(|option| option.effect.cost),
        };
        picked.map(|option| option.id.clone())
    }

    #[must_use]
    pub const fn monthly_decision(self, advice: &DecisionAdvice) -> MonthlyDecision {
        match self {
            Self::Balanced => {
                MonthlyDecision::new(advice.marketing.recommended, advice.servers.recommended)
            }
            Self::Aggressive => MonthlyDecision::new(
                advice.marketing.recommended.saturating_mul(2),
                advice.servers.recommended,
            ),
            Self::Frugal => MonthlyDecision::new(advice.marketing.minimum, advice.servers.minimum),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use venture_game::catalog;

    #[test]
    fn idea_choice_depends_on_strategy_and_budget() {
        let pick = |strategy: Strategy, budget| {
            strategy.pick_idea(catalog(), budget).unwrap().id.clone()
        };
        assert_eq!(pick(Strategy::Balanced, 100_000), "3");
        assert_eq!(pick(Strategy::Aggressive, 100_000), "2");
        assert_eq!(pick(Strategy::Aggressive, 1_000), "3");
        assert_eq!(pick(Strategy::Frugal, 23_000), "3");
    }

    #[test]
    fn balanced_roster_covers_every_role() {
        let roster = Strategy::Balanced.roster(catalog());
        let ids: Vec<_> = roster.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["dev1", "design1", "market1"]);
    }

    #[test]
    fn frugal_picks_best_value_options() {
        let roster = Strategy::Frugal.roster(catalog());
        let ids: Vec<_> = roster.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["dev2", "market2"]);
        let team: Vec<_> = roster.into_iter().cloned().collect();
        // two roles lift the pair to skill 8, enough for complexity 16
        assert!(venture_game::scoring::team_skill(&team) * 2.0 >= 16.0);
        let channels = Strategy::Frugal.channels(catalog());
        assert_eq!(channels[0].id, "twitter");
    }

    #[test]
    fn aggressive_runs_three_channels() {
        let channels = Strategy::Aggressive.channels(catalog());
        let ids: Vec<_> = channels.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["instagram", "tiktok", "youtube"]);
        assert_eq!(Strategy::Aggressive.feature_target(), 5);
    }

    #[test]
    fn every_strategy_answers_operational_events() {
        for event in &catalog().operational_events {
            for strategy in Strategy::value_variants() {
                let option = strategy.option_for(event).unwrap();
                assert!(event.option(&option).is_some());
            }
        }
    }
}
