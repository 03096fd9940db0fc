use std::sync::Arc;

use tracing::{error, warn};

use crate::{
    config::PersistenceMode,
    dao::{models::TeamPatch, team_store::TeamStore},
    error::ServiceError,
    state::{PlanId, SharedState, TeamTurn, TurnEvent, TurnPhase},
};

/// Execute a turn transition for a team, sequencing the optional persistence
/// write between planning and applying.
///
/// Under [`PersistenceMode::Optimistic`] the write is issued in the
/// background and the local transition applies immediately; a failed write
/// is logged and local state stays ahead of durable state. Under
/// [`PersistenceMode::Strict`] the write is awaited and a failure aborts the
/// planned transition. The per-team gate guarantees no two transitions for
/// the same team are in flight at once.
pub async fn run_turn_transition(
    state: &SharedState,
    team_id: i64,
    event: TurnEvent,
    patch: Option<TeamPatch>,
) -> Result<TurnPhase, ServiceError> {
    let turn = state.turn(team_id);
    let gate = turn.gate().lock().await;

    let plan = turn.plan(event.clone()).await?;

    if let Some(patch) = patch.filter(|patch| !patch.is_empty()) {
        let store = match state.require_team_store().await {
            Ok(store) => store,
            Err(err) => {
                abort_quietly(&turn, plan.id, &event).await;
                drop(gate);
                return Err(err);
            }
        };

        match state.config().persistence {
            PersistenceMode::Strict => {
                if let Err(err) = store.update_team(team_id, patch).await {
                    abort_quietly(&turn, plan.id, &event).await;
                    drop(gate);
                    return Err(err.into());
                }
            }
            PersistenceMode::Optimistic => {
                tokio::spawn(async move {
                    if let Err(err) = store.update_team(team_id, patch).await {
                        error!(team_id, error = %err, "dropped team update");
                    }
                });
            }
        }
    }

    let next = turn.apply(plan.id).await?;
    drop(gate);
    Ok(next)
}

async fn abort_quietly(turn: &Arc<TeamTurn>, plan_id: PlanId, event: &TurnEvent) {
    if let Err(abort_err) = turn.abort(plan_id).await {
        warn!(
            event = ?event,
            plan_id = %plan_id,
            error = ?abort_err,
            "failed to abort transition after write error"
        );
    }
}
