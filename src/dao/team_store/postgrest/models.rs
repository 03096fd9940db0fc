use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use time::OffsetDateTime;

use crate::dao::models::{Role, TeamPatch, UserPatch};

pub const TEAM_TABLE: &str = "team";
pub const CHALLENGES_TABLE: &str = "challenges";
pub const USER_TABLE: &str = "user";

/// RFC 3339 timestamp wrapper so nullable PATCH columns can reuse the
/// standard serde representation inside a double option.
#[derive(Debug, Clone, Serialize)]
pub struct Rfc3339Stamp(#[serde(with = "time::serde::rfc3339")] pub OffsetDateTime);

/// PATCH body for the team table. Absent columns are left untouched;
/// `Some(None)` writes NULL.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
pub struct TeamPatchBody {
    pub name: Option<String>,
    #[serde(with = "::serde_with::rust::double_option")]
    pub coins: Option<Option<f64>>,
    #[serde(with = "::serde_with::rust::double_option")]
    pub current_challenge: Option<Option<i64>>,
    pub challenges_completed: Option<Vec<i64>>,
    #[serde(with = "::serde_with::rust::double_option")]
    pub role: Option<Option<Role>>,
    #[serde(with = "::serde_with::rust::double_option")]
    pub veto_until: Option<Option<Rfc3339Stamp>>,
}

impl From<TeamPatch> for TeamPatchBody {
    fn from(patch: TeamPatch) -> Self {
        Self {
            name: patch.name,
            coins: patch.coins,
            current_challenge: patch.current_challenge,
            challenges_completed: patch.challenges_completed,
            role: patch.role,
            veto_until: patch
                .veto_until
                .map(|inner| inner.map(Rfc3339Stamp)),
        }
    }
}

/// PATCH body for the user table.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
pub struct UserPatchBody {
    pub name: Option<String>,
    #[serde(with = "::serde_with::rust::double_option")]
    pub team: Option<Option<i64>>,
    pub admin: Option<bool>,
}

impl From<UserPatch> for UserPatchBody {
    fn from(patch: UserPatch) -> Self {
        Self {
            name: patch.name,
            team: patch.team,
            admin: patch.admin,
        }
    }
}

/// INSERT body for a fresh team row.
#[derive(Debug, Clone, Serialize)]
pub struct InsertTeamBody {
    pub name: String,
    pub coins: f64,
    pub challenges_completed: Vec<i64>,
}

/// Row returned by an insert asking for `select=id`.
#[derive(Debug, Deserialize)]
pub struct InsertedIdRow {
    pub id: i64,
}

/// Row returned when selecting only the veto column.
#[derive(Debug, Deserialize)]
pub struct TeamVetoRow {
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub veto_until: Option<OffsetDateTime>,
}

/// Equality filter in the REST dialect, e.g. `id=eq.5`.
pub fn eq_filter(column: &str, value: impl std::fmt::Display) -> String {
    format!("{column}=eq.{value}")
}

/// Negated membership filter, e.g. `id=not.in.(1,2,3)`.
///
/// Returns `None` for an empty id set; the dialect has no well-formed
/// empty list literal, and no filter means nothing is excluded.
pub fn not_in_filter(column: &str, ids: &[i64]) -> Option<String> {
    if ids.is_empty() {
        return None;
    }
    let list = ids
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",");
    Some(format!("{column}=not.in.({list})"))
}
