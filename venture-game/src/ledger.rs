//! Financial ledger.
//!
//! Each [`FinanceChange`] is applied as a pure function over the finances and
//! resources. Charges for hires and features are remembered per entity so a
//! later removal refunds exactly what was taken, even if the catalog changed
//! in between.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::catalog::{InitialCosts, MonthlyFixedCosts, OperationalCosts};

/// Spendable pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    /// Whole dollars. May be negative between monthly boundaries.
    pub money: i64,
    /// Development days left. Never replenished.
    pub time: i64,
    pub users: i64,
}

/// Shallow patch merged into [`Resources`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ResourcePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub money: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<i64>,
}

impl ResourcePatch {
    #[must_use]
    pub const fn money(money: i64) -> Self {
        Self {
            money: Some(money),
            time: None,
            users: None,
        }
    }

    pub fn apply_to(&self, resources: &mut Resources) {
        if let Some(money) = self.money {
            resources.money = money;
        }
        if let Some(time) = self.time {
            resources.time = time;
        }
        if let Some(users) = self.users {
            resources.users = users;
        }
    }
}

/// Accumulated recurring spend per bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ExpenseLedger {
    pub development: i64,
    pub marketing: i64,
    pub operations: i64,
}

impl ExpenseLedger {
    #[must_use]
    pub const fn total(&self) -> i64 {
        self.development + self.marketing + self.operations
    }
}

/// Amounts taken for one hire or feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EntityCharge {
    pub money: i64,
    #[serde(default)]
    pub time: i64,
    /// Recurring amount booked into an expense bucket.
    #[serde(default)]
    pub recurring: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Finances {
    pub initial_costs: InitialCosts,
    pub monthly_fixed: MonthlyFixedCosts,
    pub operational_costs: OperationalCosts,
    /// Set once when the startup is initialized.
    pub total_investment: i64,
    pub initialized: bool,
    pub expenses: ExpenseLedger,
    #[serde(default)]
    pub member_charges: BTreeMap<String, EntityCharge>,
    #[serde(default)]
    pub feature_charges: BTreeMap<String, EntityCharge>,
}

impl Finances {
    /// Recurring monthly outflow: fixed costs plus payroll and maintenance.
    #[must_use]
    pub const fn burn_rate(&self) -> i64 {
        self.monthly_fixed.total() + self.expenses.operations + self.expenses.development
    }
}

/// Tagged financial transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinanceChange {
    InitializeStartup {
        initial_costs: InitialCosts,
        monthly_fixed: MonthlyFixedCosts,
        operational_costs: OperationalCosts,
    },
    HireTeamMember {
        member_id: String,
        cost: i64,
        monthly_cost: i64,
    },
    ReleaseTeamMember {
        member_id: String,
    },
    AddFeature {
        feature_id: String,
        development_cost: i64,
        time_cost: i64,
        maintenance_cost: i64,
    },
    RemoveFeature {
        feature_id: String,
    },
    MarketingCampaign {
        budget: i64,
    },
}

impl FinanceChange {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::InitializeStartup { .. } => "INITIALIZE_STARTUP",
            Self::HireTeamMember { .. } => "HIRE_TEAM_MEMBER",
            Self::ReleaseTeamMember { .. } => "RELEASE_TEAM_MEMBER",
            Self::AddFeature { .. } => "ADD_FEATURE",
            Self::RemoveFeature { .. } => "REMOVE_FEATURE",
            Self::MarketingCampaign { .. } => "MARKETING_CAMPAIGN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeKind {
    Member,
    Feature,
}

impl std::fmt::Display for ChargeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Member => "team member",
            Self::Feature => "feature",
        })
    }
}

/// Errors raised when a transaction would break ledger invariants.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("startup finances were already initialized")]
    AlreadyInitialized,
    #[error("{kind} `{id}` already has a recorded charge")]
    DuplicateCharge { kind: ChargeKind, id: String },
    #[error("{kind} `{id}` has no recorded charge to refund")]
    UnknownCharge { kind: ChargeKind, id: String },
    #[error("{field} must not be negative (got {value})")]
    NegativeAmount { field: &'static str, value: i64 },
}

fn non_negative(field: &'static str, value: i64) -> Result<(), LedgerError> {
    if value < 0 {
        return Err(LedgerError::NegativeAmount { field, value });
    }
    Ok(())
}

/// Apply one transaction, returning the updated finances and resources.
///
/// # Errors
///
/// Returns `LedgerError` when the startup is initialized twice, an entity is
/// charged twice, a refund has no matching charge, or an amount is negative.
/// The inputs are never modified.
pub fn apply(
    finances: &Finances,
    resources: &Resources,
    change: &FinanceChange,
) -> Result<(Finances, Resources), LedgerError> {
    let mut finances = finances.clone();
    let mut resources = *resources;
    match change {
        FinanceChange::InitializeStartup {
            initial_costs,
            monthly_fixed,
            operational_costs,
        } => {
            if finances.initialized {
                return Err(LedgerError::AlreadyInitialized);
            }
            let total = initial_costs.total();
            non_negative("initial_costs", total)?;
            finances.initial_costs = *initial_costs;
            finances.monthly_fixed = *monthly_fixed;
            finances.operational_costs = *operational_costs;
            finances.total_investment = total;
            finances.initialized = true;
            resources.money -= total;
        }
        FinanceChange::HireTeamMember {
            member_id,
            cost,
            monthly_cost,
        } => {
            non_negative("cost", *cost)?;
            non_negative("monthly_cost", *monthly_cost)?;
            if finances.member_charges.contains_key(member_id) {
                return Err(LedgerError::DuplicateCharge {
                    kind: ChargeKind::Member,
                    id: member_id.clone(),
                });
            }
            resources.money -= cost;
            finances.expenses.operations += monthly_cost;
            finances.member_charges.insert(
                member_id.clone(),
                EntityCharge {
                    money: *cost,
                    time: 0,
                    recurring: *monthly_cost,
                },
            );
        }
        FinanceChange::ReleaseTeamMember { member_id } => {
            let charge = finances.member_charges.remove(member_id).ok_or_else(|| {
                LedgerError::UnknownCharge {
                    kind: ChargeKind::Member,
                    id: member_id.clone(),
                }
            })?;
            resources.money += charge.money;
            finances.expenses.operations = (finances.expenses.operations - charge.recurring).max(0);
        }
        FinanceChange::AddFeature {
            feature_id,
            development_cost,
            time_cost,
            maintenance_cost,
        } => {
            non_negative("development_cost", *development_cost)?;
            non_negative("time_cost", *time_cost)?;
            non_negative("maintenance_cost", *maintenance_cost)?;
            if finances.feature_charges.contains_key(feature_id) {
                return Err(LedgerError::DuplicateCharge {
                    kind: ChargeKind::Feature,
                    id: feature_id.clone(),
                });
            }
            resources.money -= development_cost;
            resources.time -= time_cost;
            finances.expenses.development += maintenance_cost;
            finances.feature_charges.insert(
                feature_id.clone(),
                EntityCharge {
                    money: *development_cost,
                    time: *time_cost,
                    recurring: *maintenance_cost,
                },
            );
        }
        FinanceChange::RemoveFeature { feature_id } => {
            let charge = finances.feature_charges.remove(feature_id).ok_or_else(|| {
                LedgerError::UnknownCharge {
                    kind: ChargeKind::Feature,
                    id: feature_id.clone(),
                }
            })?;
            resources.money += charge.money;
            resources.time += charge.time;
            finances.expenses.development =
                (finances.expenses.development - charge.recurring).max(0);
        }
        FinanceChange::MarketingCampaign { budget } => {
            non_negative("budget", *budget)?;
            resources.money -= budget;
            finances.expenses.marketing += budget;
        }
    }
    Ok((finances, resources))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::catalog;

    fn start() -> (Finances, Resources) {
        (
            Finances::default(),
            Resources {
                money: 100_000,
                time: 90,
                users: 1_000,
            },
        )
    }

    fn initialize() -> FinanceChange {
        let financials = &catalog().idea("1").unwrap().financials;
        FinanceChange::InitializeStartup {
            initial_costs: financials.initial_costs,
            monthly_fixed: financials.monthly_fixed,
            operational_costs: financials.operational_costs,
        }
    }

    #[test]
    fn initialize_deducts_total_investment_once() {
        let (finances, resources) = start();
        let (finances, resources) = apply(&finances, &resources, &initialize()).unwrap();
        assert_eq!(finances.total_investment, 40_000);
        assert_eq!(resources.money, 60_000);
        assert_eq!(
            apply(&finances, &resources, &initialize()).unwrap_err(),
            LedgerError::AlreadyInitialized
        );
    }

    #[test]
    fn hire_and_release_round_trip() {
        let (finances, resources) = start();
        let hire = FinanceChange::HireTeamMember {
            member_id: "dev1".into(),
            cost: 8_000,
            monthly_cost: 12_000,
        };
        let (hired, after_hire) = apply(&finances, &resources, &hire).unwrap();
        assert_eq!(after_hire.money, 92_000);
        assert_eq!(hired.expenses.operations, 12_000);

        let release = FinanceChange::ReleaseTeamMember {
            member_id: "dev1".into(),
        };
        let (released, after_release) = apply(&hired, &after_hire, &release).unwrap();
        assert_eq!(after_release, resources);
        assert_eq!(released.expenses, ExpenseLedger::default());
        assert!(released.member_charges.is_empty());
    }

    #[test]
    fn feature_refund_uses_recorded_charge() {
        let (finances, resources) = start();
        let add = FinanceChange::AddFeature {
            feature_id: "auth".into(),
            development_cost: 5_000,
            time_cost: 15,
            maintenance_cost: 200,
        };
        let (added, spent) = apply(&finances, &resources, &add).unwrap();
        assert_eq!((spent.money, spent.time), (95_000, 75));
        assert_eq!(added.expenses.development, 200);

        let remove = FinanceChange::RemoveFeature {
            feature_id: "auth".into(),
        };
        let (removed, refunded) = apply(&added, &spent, &remove).unwrap();
        assert_eq!(refunded, resources);
        assert_eq!(removed.expenses.development, 0);
    }

    #[test]
    fn duplicate_and_unknown_charges_are_rejected() {
        let (finances, resources) = start();
        let add = FinanceChange::AddFeature {
            feature_id: "auth".into(),
            development_cost: 5_000,
            time_cost: 15,
            maintenance_cost: 200,
        };
        let (added, spent) = apply(&finances, &resources, &add).unwrap();
        assert!(matches!(
            apply(&added, &spent, &add),
            Err(LedgerError::DuplicateCharge { kind: ChargeKind::Feature, .. })
        ));
        let release = FinanceChange::ReleaseTeamMember {
            member_id: "ghost".into(),
        };
        assert!(matches!(
            apply(&finances, &resources, &release),
            Err(LedgerError::UnknownCharge { kind: ChargeKind::Member, .. })
        ));
    }

    #[test]
    fn marketing_campaign_books_budget() {
        let (finances, resources) = start();
        let change = FinanceChange::MarketingCampaign { budget: 3_000 };
        let (finances, resources) = apply(&finances, &resources, &change).unwrap();
        assert_eq!(resources.money, 97_000);
        assert_eq!(finances.expenses.marketing, 3_000);
        assert_eq!(
            apply(
                &finances,
                &resources,
                &FinanceChange::MarketingCampaign { budget: -1 }
            )
            .unwrap_err(),
            LedgerError::NegativeAmount {
                field: "budget",
                value: -1
            }
        );
    }

    #[test]
    fn changes_serialize_with_type_tag() {
        let change = FinanceChange::MarketingCampaign { budget: 1_500 };
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["type"], "MARKETING_CAMPAIGN");
        assert_eq!(change.label(), "MARKETING_CAMPAIGN");
    }

    #[test]
    fn patch_merges_only_provided_fields() {
        let (_, mut resources) = start();
        ResourcePatch::money(-250).apply_to(&mut resources);
        assert_eq!(resources.money, -250);
        assert_eq!(resources.time, 90);
    }
}
