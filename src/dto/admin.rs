//! Form payloads accepted by the admin mutation endpoints.
//!
//! The admin surface is form-submission style: fields arrive as repeated
//! key/value pairs and a missing required field means the request is
//! silently redirected, so parsing returns `Option` instead of an error.

use serde::Serialize;
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dao::models::{Role, TeamEntity, UserEntity},
    dto::validation::{parse_nonzero_coins, parse_role},
};

/// Projection of a team for the admin dashboard.
#[derive(Debug, Serialize, ToSchema)]
pub struct TeamSummary {
    pub id: i64,
    pub name: String,
    pub coins: Option<f64>,
    pub current_challenge: Option<i64>,
    pub challenges_completed: Vec<i64>,
    pub role: Option<Role>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub veto_until: Option<OffsetDateTime>,
}

impl From<TeamEntity> for TeamSummary {
    fn from(entity: TeamEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            coins: entity.coins,
            current_challenge: entity.current_challenge,
            challenges_completed: entity.challenges_completed,
            role: entity.role,
            veto_until: entity.veto_until,
        }
    }
}

/// Projection of a user for the admin dashboard.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: Option<String>,
    pub admin: bool,
    pub team: Option<i64>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<UserEntity> for UserSummary {
    fn from(entity: UserEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            admin: entity.admin,
            team: entity.team,
            created_at: entity.created_at,
        }
    }
}

/// Decoded form body preserving repeated keys.
#[derive(Debug, Default)]
pub struct FormFields(Vec<(String, String)>);

impl FormFields {
    /// Wrap the decoded key/value pairs of a form body.
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }

    /// First non-empty value for a field, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, value)| key == name && !value.trim().is_empty())
            .map(|(_, value)| value.trim())
    }

    /// Every value submitted under a field name.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(key, _)| key == name)
            .map(|(_, value)| value.trim())
            .collect()
    }
}

/// Parsed create-team submission.
#[derive(Debug, PartialEq)]
pub struct CreateTeamForm {
    pub name: String,
    /// Starting balance; `None` when the field was unusable and the
    /// configured default applies.
    pub coins: Option<f64>,
    /// Users to move onto the new team. May be empty.
    pub members: Vec<Uuid>,
}

impl CreateTeamForm {
    /// Parse the submission, returning `None` when a required field is missing.
    pub fn parse(fields: &FormFields) -> Option<Self> {
        let name = fields.get("name")?.to_string();
        let coins = parse_nonzero_coins(fields.get("coins")?);
        let members = fields
            .get_all("members")
            .into_iter()
            .filter_map(|raw| Uuid::parse_str(raw).ok())
            .collect();

        Some(Self {
            name,
            coins,
            members,
        })
    }
}

/// Parsed update-team submission; empty fields mean "no change".
#[derive(Debug, PartialEq)]
pub struct UpdateTeamForm {
    pub id: i64,
    pub name: Option<String>,
    pub coins: Option<f64>,
    /// `Some(None)` clears the role (the form value `none`).
    pub role: Option<Option<Role>>,
}

impl UpdateTeamForm {
    /// Parse the submission, returning `None` when the id is missing or no
    /// field would change.
    pub fn parse(fields: &FormFields) -> Option<Self> {
        let id = fields.get("id")?.parse::<i64>().ok()?;
        let name = fields.get("name").map(str::to_string);
        let coins = fields.get("coins").and_then(parse_nonzero_coins);
        let role = fields.get("role").and_then(parse_role);

        if name.is_none() && coins.is_none() && role.is_none() {
            return None;
        }

        Some(Self {
            id,
            name,
            coins,
            role,
        })
    }
}

/// Parsed update-user submission.
#[derive(Debug, PartialEq)]
pub struct UpdateUserForm {
    pub id: Uuid,
    pub name: String,
    /// `None` clears the assignment (the form value `0`).
    pub team: Option<i64>,
}

impl UpdateUserForm {
    /// Parse the submission, returning `None` when a required field is missing.
    pub fn parse(fields: &FormFields) -> Option<Self> {
        let id = Uuid::parse_str(fields.get("id")?).ok()?;
        let name = fields.get("name")?.to_string();
        let team = match fields.get("team")? {
            "0" => None,
            raw => Some(raw.parse::<i64>().ok()?),
        };

        Some(Self { id, name, team })
    }
}
