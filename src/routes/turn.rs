use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::{
        common::TurnSnapshot,
        turn::{CompleteRequest, DrawResponse, VetoResponse},
    },
    error::AppError,
    services::turn_service,
    state::SharedState,
};

/// Runner-facing turn endpoints, keyed by team id.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/team/{id}/turn", get(current_turn))
        .route("/api/team/{id}/draw", post(draw))
        .route("/api/team/{id}/complete", post(complete))
        .route("/api/team/{id}/pass", post(pass))
        .route("/api/team/{id}/veto", post(veto))
        .route("/api/team/{id}/transit/start", post(start_transit))
        .route("/api/team/{id}/transit/stop", post(stop_transit))
}

/// Current turn snapshot, resuming persisted state after a reload.
#[utoipa::path(
    get,
    path = "/api/team/{id}/turn",
    tag = "turn",
    params(("id" = i64, Path, description = "Identifier of the team")),
    responses((status = 200, description = "Current turn snapshot", body = TurnSnapshot))
)]
pub async fn current_turn(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<TurnSnapshot>, AppError> {
    Ok(Json(turn_service::current_turn(&state, id).await?))
}

/// Draw a random challenge among those not yet completed.
#[utoipa::path(
    post,
    path = "/api/team/{id}/draw",
    tag = "turn",
    params(("id" = i64, Path, description = "Identifier of the team")),
    responses((status = 200, description = "Challenge drawn, or the eligible set is exhausted", body = DrawResponse))
)]
pub async fn draw(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<DrawResponse>, AppError> {
    match turn_service::draw_challenge(&state, id).await {
        Ok(response) => Ok(Json(response)),
        // terminal condition, not an error: every challenge is done
        Err(crate::error::ServiceError::ChallengesExhausted) => {
            Ok(Json(DrawResponse::exhausted()))
        }
        Err(err) => Err(err.into()),
    }
}

/// Complete the active challenge for the claimed reward.
#[utoipa::path(
    post,
    path = "/api/team/{id}/complete",
    tag = "turn",
    params(("id" = i64, Path, description = "Identifier of the team")),
    request_body = CompleteRequest,
    responses((status = 200, description = "Challenge completed", body = TurnSnapshot))
)]
pub async fn complete(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Valid(Json(payload)): Valid<Json<CompleteRequest>>,
) -> Result<Json<TurnSnapshot>, AppError> {
    Ok(Json(
        turn_service::complete_challenge(&state, id, payload.winnable).await?,
    ))
}

/// Put the active challenge back without completing it.
#[utoipa::path(
    post,
    path = "/api/team/{id}/pass",
    tag = "turn",
    params(("id" = i64, Path, description = "Identifier of the team")),
    responses((status = 200, description = "Challenge passed", body = TurnSnapshot))
)]
pub async fn pass(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<TurnSnapshot>, AppError> {
    Ok(Json(turn_service::pass_challenge(&state, id).await?))
}

/// Veto the active challenge and start (or re-observe) the cooldown.
#[utoipa::path(
    post,
    path = "/api/team/{id}/veto",
    tag = "turn",
    params(("id" = i64, Path, description = "Identifier of the team")),
    responses((status = 200, description = "Cooldown running", body = VetoResponse))
)]
pub async fn veto(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<VetoResponse>, AppError> {
    Ok(Json(turn_service::veto_challenge(&state, id).await?))
}

/// Start the transit coin burn.
#[utoipa::path(
    post,
    path = "/api/team/{id}/transit/start",
    tag = "turn",
    params(("id" = i64, Path, description = "Identifier of the team")),
    responses((status = 200, description = "Transit countdown started", body = TurnSnapshot))
)]
pub async fn start_transit(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<TurnSnapshot>, AppError> {
    Ok(Json(turn_service::start_transit(&state, id).await?))
}

/// Stop the transit coin burn and settle the balance.
#[utoipa::path(
    post,
    path = "/api/team/{id}/transit/stop",
    tag = "turn",
    params(("id" = i64, Path, description = "Identifier of the team")),
    responses((status = 200, description = "Transit countdown settled", body = TurnSnapshot))
)]
pub async fn stop_transit(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<TurnSnapshot>, AppError> {
    Ok(Json(turn_service::stop_transit(&state, id).await?))
}
