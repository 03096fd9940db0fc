//! Authorization context resolution for the admin surface.
//!
//! The OAuth flow itself lives outside this backend; requests arrive with
//! the auth-provider subject id in a header and the context is resolved
//! once here, at the boundary, instead of re-checked ad hoc by each caller.

use axum::http::HeaderMap;
use uuid::Uuid;

use crate::{dao::team_store::TeamStore, error::ServiceError, state::SharedState};

/// Header carrying the auth-provider subject id of the caller.
pub const AUTH_SUBJECT_HEADER: &str = "x-auth-subject";

/// Caller identity resolved against the user table.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Auth-provider subject id.
    pub subject: Uuid,
    /// Whether the caller may use the admin mutation endpoints.
    pub admin: bool,
    /// Team the caller belongs to, if any.
    pub team: Option<i64>,
}

/// Resolve the caller's context from the subject header.
///
/// A session implies a user row exists; a missing or unknown subject is an
/// authorization failure, not a lookup miss.
pub async fn resolve_context(
    state: &SharedState,
    headers: &HeaderMap,
) -> Result<AuthContext, ServiceError> {
    let raw = headers
        .get(AUTH_SUBJECT_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ServiceError::Unauthorized("missing subject header".into()))?;

    let subject = Uuid::parse_str(raw)
        .map_err(|_| ServiceError::Unauthorized("malformed subject header".into()))?;

    let store = state.require_team_store().await?;
    let user = store
        .find_user(subject)
        .await?
        .ok_or_else(|| ServiceError::Unauthorized("unknown subject".into()))?;

    Ok(AuthContext {
        subject,
        admin: user.admin,
        team: user.team,
    })
}

/// Fail unless the context belongs to an admin account.
pub fn require_admin(ctx: &AuthContext) -> Result<(), ServiceError> {
    if ctx.admin {
        Ok(())
    } else {
        Err(ServiceError::Unauthorized(
            "admin privileges required".into(),
        ))
    }
}
