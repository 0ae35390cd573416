//! Narrative events surfaced to the player.
//!
//! Rejected actions never return errors to the host; they raise one of these
//! events on the state instead. The state keeps a single live slot plus an
//! append-only history.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::catalog::{Feature, MarketEvent, OperationalEvent, OperationalEventKind, Polarity};

/// Mechanical event kind. The serialized form is the stable event id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    ComplexityWarning,
    TeamCapabilityWarning,
    InsufficientFunds,
    InsufficientTime,
    InsufficientBudget,
    TooManyChannels,
    InvestmentReceived,
    MarketEvent,
    CampaignSuccess,
    CampaignModerate,
    CampaignPoor,
    OperationalIssue,
    Opportunity,
    GameOutcome,
}

impl EventKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ComplexityWarning => "complexity_warning",
            Self::TeamCapabilityWarning => "team_capability_warning",
            Self::InsufficientFunds => "insufficient_funds",
            Self::InsufficientTime => "insufficient_time",
            Self::InsufficientBudget => "insufficient_budget",
            Self::TooManyChannels => "too_many_channels",
            Self::InvestmentReceived => "investment_received",
            Self::MarketEvent => "market_event",
            Self::CampaignSuccess => "campaign_success",
            Self::CampaignModerate => "campaign_moderate",
            Self::CampaignPoor => "campaign_poor",
            Self::OperationalIssue => "operational_issue",
            Self::Opportunity => "opportunity",
            Self::GameOutcome => "game_outcome",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity tier for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSeverity {
    Info,
    Success,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    pub kind: EventKind,
    pub severity: EventSeverity,
    pub title: String,
    pub description: String,
    /// Optional structured payload for hosts that render details.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub payload: serde_json::Value,
}

impl GameEvent {
    #[must_use]
    pub fn new(
        kind: EventKind,
        severity: EventSeverity,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            severity,
            title: title.into(),
            description: description.into(),
            payload: serde_json::Value::Null,
        }
    }

    #[must_use]
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    #[must_use]
    pub fn complexity_warning(feature: &Feature, team_skill: f64) -> Self {
        Self::new(
            EventKind::ComplexityWarning,
            EventSeverity::Warning,
            "Feature Too Complex",
            format!(
                "{} needs complexity {} but the team can handle up to {:.1}. Hire stronger members first.",
                feature.name,
                feature.complexity,
                team_skill * 2.0
            ),
        )
        .with_payload(serde_json::json!({
            "feature_id": feature.id,
            "complexity": feature.complexity,
            "team_skill": team_skill,
        }))
    }

    #[must_use]
    pub fn team_capability_warning(blocking: &[&Feature], team_skill: f64) -> Self {
        let names: Vec<&str> = blocking.iter().map(|f| f.name.as_str()).collect();
        let ids: Vec<&str> = blocking.iter().map(|f| f.id.as_str()).collect();
        Self::new(
            EventKind::TeamCapabilityWarning,
            EventSeverity::Warning,
            "Team Capability Warning",
            format!(
                "Your team (skill {team_skill:.1}) may struggle with: {}. Consider adjusting your feature selection or team composition.",
                names.join(", ")
            ),
        )
        .with_payload(serde_json::json!({ "feature_ids": ids, "team_skill": team_skill }))
    }

    #[must_use]
    pub fn insufficient_funds(item: &str, required: i64, available: i64) -> Self {
        Self::new(
            EventKind::InsufficientFunds,
            EventSeverity::Warning,
            "Insufficient Funds",
            format!(
                "{item} costs ${required} but only ${available} is available (short by ${}).",
                required - available
            ),
        )
        .with_payload(serde_json::json!({
            "required": required,
            "available": available,
            "shortfall": required - available,
        }))
    }

    #[must_use]
    pub fn insufficient_time(item: &str, required: i64, available: i64) -> Self {
        Self::new(
            EventKind::InsufficientTime,
            EventSeverity::Warning,
            "Not Enough Time",
            format!(
                "{item} needs {required} days but only {available} remain (short by {}).",
                required - available
            ),
        )
        .with_payload(serde_json::json!({
            "required": required,
            "available": available,
            "shortfall": required - available,
        }))
    }

    #[must_use]
    pub fn insufficient_budget(allocated: i64, available: i64) -> Self {
        Self::new(
            EventKind::InsufficientBudget,
            EventSeverity::Warning,
            "Insufficient Budget",
            format!("You've allocated ${allocated} but only have ${available} available."),
        )
        .with_payload(serde_json::json!({ "allocated": allocated, "available": available }))
    }

    #[must_use]
    pub fn too_many_channels(limit: usize) -> Self {
        Self::new(
            EventKind::TooManyChannels,
            EventSeverity::Warning,
            "Too Many Channels",
            format!("Focus is key. Pick at most {limit} marketing channels."),
        )
    }

    #[must_use]
    pub fn investment_received(investor: &str, amount: i64, debt: i64) -> Self {
        Self::new(
            EventKind::InvestmentReceived,
            EventSeverity::Info,
            "Investment Received",
            format!("{investor} stepped in with ${amount} to cover a ${debt} shortfall."),
        )
        .with_payload(serde_json::json!({
            "investor": investor,
            "amount": amount,
            "debt": debt,
        }))
    }

    #[must_use]
    pub fn market_event(event: &MarketEvent, factor: f64) -> Self {
        let severity = match event.polarity {
            Polarity::Positive => EventSeverity::Success,
            Polarity::Negative => EventSeverity::Warning,
        };
        Self::new(
            EventKind::MarketEvent,
            severity,
            event.title.clone(),
            event.description.clone(),
        )
        .with_payload(serde_json::json!({ "market_event_id": event.id, "factor": factor }))
    }

    #[must_use]
    pub fn operational(event: &OperationalEvent) -> Self {
        let (kind, severity) = match event.kind {
            OperationalEventKind::Opportunity => (EventKind::Opportunity, EventSeverity::Info),
            OperationalEventKind::Equipment | OperationalEventKind::Staff => {
                (EventKind::OperationalIssue, EventSeverity::Warning)
            }
        };
        let options: Vec<&str> = event.options.iter().map(|o| o.id.as_str()).collect();
        Self::new(kind, severity, event.title.clone(), event.description.clone()).with_payload(
            serde_json::json!({ "operational_event_id": event.id, "options": options }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::catalog;

    #[test]
    fn kinds_serialize_to_stable_ids() {
        let json = serde_json::to_string(&EventKind::TeamCapabilityWarning).unwrap();
        assert_eq!(json, "\"team_capability_warning\"");
        assert_eq!(EventKind::InvestmentReceived.to_string(), "investment_received");
    }

    #[test]
    fn complexity_warning_carries_feature_payload() {
        let feature = catalog().feature("payments").unwrap();
        let event = GameEvent::complexity_warning(feature, 7.0);
        assert_eq!(event.kind, EventKind::ComplexityWarning);
        assert_eq!(event.payload["feature_id"], "payments");
        assert!(event.description.contains("14.0"));
    }

    #[test]
    fn shortfall_is_reported() {
        let event = GameEvent::insufficient_funds("Payment System", 10_000, 4_000);
        assert_eq!(event.payload["shortfall"], 6_000);
    }

    #[test]
    fn opportunities_are_informational() {
        let event = catalog().operational_event("tech_breakthrough").unwrap();
        let surfaced = GameEvent::operational(event);
        assert_eq!(surfaced.kind, EventKind::Opportunity);
        assert_eq!(surfaced.severity, EventSeverity::Info);
    }
}
