//! Admin mutation endpoints in the form-submission style the dashboards
//! post to. Every outcome redirects back to the referring page; a missing
//! field or failed admin gate is indistinguishable from success at the
//! HTTP level (fail-closed, no error surface).

use axum::{
    Form, Json, Router,
    extract::State,
    http::HeaderMap,
    response::Redirect,
    routing::{get, post},
};
use tracing::debug;

use crate::{
    dto::admin::{
        CreateTeamForm, FormFields, TeamSummary, UpdateTeamForm, UpdateUserForm, UserSummary,
    },
    error::AppError,
    services::{admin_service, auth_service},
    state::SharedState,
};

/// Fallback redirect target when no referer is present.
const DEFAULT_REDIRECT: &str = "/dashboard";

/// Admin-only management endpoints for teams and users.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/admin/teams", get(list_teams).post(create_team))
        .route("/admin/teams/update", post(update_team))
        .route("/admin/users", get(list_users))
        .route("/admin/users/update", post(update_user))
}

/// Teams with their gameplay state, for the admin dashboard.
#[utoipa::path(
    get,
    path = "/admin/teams",
    tag = "admin",
    params(("x-auth-subject" = String, Header, description = "Auth subject id of the caller")),
    responses((status = 200, description = "All teams", body = [TeamSummary]))
)]
pub async fn list_teams(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<Vec<TeamSummary>>, AppError> {
    let ctx = auth_service::resolve_context(&state, &headers).await?;
    Ok(Json(admin_service::list_teams(&state, &ctx).await?))
}

/// Registered users, for the admin dashboard.
#[utoipa::path(
    get,
    path = "/admin/users",
    tag = "admin",
    params(("x-auth-subject" = String, Header, description = "Auth subject id of the caller")),
    responses((status = 200, description = "All users", body = [UserSummary]))
)]
pub async fn list_users(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<Vec<UserSummary>>, AppError> {
    let ctx = auth_service::resolve_context(&state, &headers).await?;
    Ok(Json(admin_service::list_users(&state, &ctx).await?))
}

async fn create_team(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Redirect {
    let target = referer_path(&headers);
    let fields = FormFields::new(pairs);

    let Some(form) = CreateTeamForm::parse(&fields) else {
        return Redirect::to(&target);
    };

    let ctx = match auth_service::resolve_context(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(err) => {
            debug!(error = %err, "create team refused");
            return Redirect::to(&target);
        }
    };

    if let Err(err) = admin_service::create_team(&state, &ctx, form).await {
        debug!(error = %err, "create team failed");
    }

    Redirect::to(&target)
}

async fn update_team(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Redirect {
    let target = referer_path(&headers);
    let fields = FormFields::new(pairs);

    let Some(form) = UpdateTeamForm::parse(&fields) else {
        return Redirect::to(&target);
    };

    let ctx = match auth_service::resolve_context(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(err) => {
            debug!(error = %err, "update team refused");
            return Redirect::to(&target);
        }
    };

    if let Err(err) = admin_service::update_team(&state, &ctx, form).await {
        debug!(error = %err, "update team failed");
    }

    Redirect::to(&target)
}

async fn update_user(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Redirect {
    let target = referer_path(&headers);
    let fields = FormFields::new(pairs);

    let Some(form) = UpdateUserForm::parse(&fields) else {
        return Redirect::to(&target);
    };

    let ctx = match auth_service::resolve_context(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(err) => {
            debug!(error = %err, "update user refused");
            return Redirect::to(&target);
        }
    };

    if let Err(err) = admin_service::update_user(&state, &ctx, form).await {
        debug!(error = %err, "update user failed");
    }

    Redirect::to(&target)
}

/// Path component of the referer header, defaulting to the dashboard.
fn referer_path(headers: &HeaderMap) -> String {
    headers
        .get("referer")
        .and_then(|value| value.to_str().ok())
        .and_then(extract_path)
        .unwrap_or_else(|| DEFAULT_REDIRECT.to_string())
}

/// Extract the path of an absolute or relative URL without tracking the
/// query or fragment.
fn extract_path(url: &str) -> Option<String> {
    let after_scheme = match url.find("://") {
        Some(index) => {
            let authority = &url[index + 3..];
            match authority.find('/') {
                Some(slash) => &authority[slash..],
                None => "/",
            }
        }
        None if url.starts_with('/') => url,
        None => return None,
    };

    let end = after_scheme
        .find(['?', '#'])
        .unwrap_or(after_scheme.len());
    Some(after_scheme[..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn referer_paths_are_extracted() {
        assert_eq!(
            extract_path("https://tag.example/admin?tab=teams").as_deref(),
            Some("/admin")
        );
        assert_eq!(extract_path("https://tag.example").as_deref(), Some("/"));
        assert_eq!(extract_path("/admin").as_deref(), Some("/admin"));
        assert_eq!(extract_path("not a url"), None);
    }

    #[test]
    fn missing_referer_falls_back_to_dashboard() {
        let headers = HeaderMap::new();
        assert_eq!(referer_path(&headers), "/dashboard");
    }
}
