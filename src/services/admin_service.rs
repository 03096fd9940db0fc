//! Business logic behind the admin form endpoints: team creation and
//! out-of-band team/user edits. Authorization is checked here against the
//! resolved context; the routes own the redirect behavior.

use tracing::debug;

use crate::{
    dao::{
        models::{TeamPatch, UserPatch},
        team_store::TeamStore,
    },
    dto::admin::{CreateTeamForm, TeamSummary, UpdateTeamForm, UpdateUserForm, UserSummary},
    error::ServiceError,
    services::auth_service::{AuthContext, require_admin},
    state::SharedState,
};

/// Teams as shown on the admin dashboard.
pub async fn list_teams(
    state: &SharedState,
    ctx: &AuthContext,
) -> Result<Vec<TeamSummary>, ServiceError> {
    require_admin(ctx)?;

    let store = state.require_team_store().await?;
    let teams = store.list_teams().await?;
    Ok(teams.into_iter().map(Into::into).collect())
}

/// Users as shown on the admin dashboard.
pub async fn list_users(
    state: &SharedState,
    ctx: &AuthContext,
) -> Result<Vec<UserSummary>, ServiceError> {
    require_admin(ctx)?;

    let store = state.require_team_store().await?;
    let users = store.list_users().await?;
    Ok(users.into_iter().map(Into::into).collect())
}

/// Create a team and move the listed members onto it.
///
/// Members are reassigned one by one; the first failing reassignment stops
/// the loop, leaving earlier ones in place (no transactional grouping
/// exists across statements).
pub async fn create_team(
    state: &SharedState,
    ctx: &AuthContext,
    form: CreateTeamForm,
) -> Result<i64, ServiceError> {
    require_admin(ctx)?;

    let store = state.require_team_store().await?;
    let coins = form.coins.unwrap_or(state.config().default_team_coins);
    let team_id = store.insert_team(form.name, coins).await?;
    debug!(team_id, "team created");

    for member in form.members {
        let patch = UserPatch {
            team: Some(Some(team_id)),
            ..UserPatch::default()
        };
        store.update_user(member, patch).await?;
    }

    Ok(team_id)
}

/// Apply an out-of-band partial edit to a team.
pub async fn update_team(
    state: &SharedState,
    ctx: &AuthContext,
    form: UpdateTeamForm,
) -> Result<(), ServiceError> {
    require_admin(ctx)?;

    let store = state.require_team_store().await?;
    let patch = TeamPatch {
        name: form.name,
        coins: form.coins.map(Some),
        role: form.role,
        ..TeamPatch::default()
    };

    store.update_team(form.id, patch).await?;
    Ok(())
}

/// Rename a user and reassign their team.
pub async fn update_user(
    state: &SharedState,
    ctx: &AuthContext,
    form: UpdateUserForm,
) -> Result<(), ServiceError> {
    require_admin(ctx)?;

    let store = state.require_team_store().await?;
    let patch = UserPatch {
        name: Some(form.name),
        team: Some(form.team),
        ..UserPatch::default()
    };

    store.update_user(form.id, patch).await?;
    Ok(())
}
