//! Build-stage operational events: equipment failures, staff friction and
//! the occasional opportunity.

use rand::Rng;

use crate::catalog::{Catalog, OperationalEvent};
use crate::events::GameEvent;
use crate::state::{ActionOutcome, GameState};

/// Roll each catalog event against its probability, in catalog order. The
/// first hit becomes pending and is surfaced as the live event. Nothing is
/// rolled while an earlier event is still unresolved.
pub fn roll_operational_event<R: Rng>(
    state: &mut GameState,
    catalog: &Catalog,
    rng: &mut R,
) -> Option<OperationalEvent> {
    if state.pending_operation.is_some() {
        return None;
    }
    let hit = catalog
        .operational_events
        .iter()
        .find(|event| rng.r#gen::<f64>() < event.probability)?
        .clone();
    log::info!("operational event {} raised", hit.id);
    state.trigger_event(GameEvent::operational(&hit));
    state.pending_operation = Some(hit.clone());
    Some(hit)
}

/// Apply the chosen option of the pending event.
pub fn resolve_operational_event(state: &mut GameState, option_id: &str) -> ActionOutcome {
    let Some(pending) = state.pending_operation.as_ref() else {
        return ActionOutcome::Ignored;
    };
    let Some(option) = pending.option(option_id) else {
        log::debug!("{} has no option {option_id}", pending.id);
        return ActionOutcome::Ignored;
    };
    let effect = option.effect;
    let event_id = pending.id.clone();

    state.update_morale(effect.morale);
    state.resources.money -= effect.cost;
    state.resources.time -= effect.time;
    state.productivity_modifier = state.productivity_modifier.saturating_add(effect.productivity);
    if effect.team_skill.abs() > f64::EPSILON {
        state.apply_skill_bonus(effect.team_skill);
    }
    state.pending_operation = None;

    if is_live(state, &event_id) {
        state.resolve_event();
    }
    log::debug!("resolved {event_id} with {option_id}");
    ActionOutcome::Applied
}

/// Dismiss the live event. Dismissing the pending operational event walks
/// away from it: no option is applied and the next roll may fire again.
pub fn dismiss_event(state: &mut GameState) -> Option<GameEvent> {
    let pending = state
        .pending_operation
        .as_ref()
        .is_some_and(|pending| is_live(state, &pending.id));
    if pending && let Some(event) = state.pending_operation.take() {
        log::debug!("dismissed {} without a decision", event.id);
    }
    state.resolve_event()
}

fn is_live(state: &GameState, event_id: &str) -> bool {
    state
        .current_event
        .as_ref()
        .and_then(|event| event.payload.get("operational_event_id"))
        .and_then(serde_json::Value::as_str)
        == Some(event_id)
}
