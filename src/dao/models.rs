use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// Gameplay role a team can be assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The team completing challenges and riding transit.
    Runner,
    /// The team hunting the runners.
    Chaser,
}

/// Representation of a team as persisted by the hosted store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeamEntity {
    /// Stable identifier for the team.
    pub id: i64,
    /// Display name chosen for the team.
    pub name: String,
    /// Transit credit in fractional minutes; absent when never granted.
    pub coins: Option<f64>,
    /// Identifier of the challenge the team is currently working, if any.
    pub current_challenge: Option<i64>,
    /// Ordered ids of completed challenges; duplicates are possible.
    pub challenges_completed: Vec<i64>,
    /// Gameplay role, if assigned.
    pub role: Option<Role>,
    /// End of an active veto cooldown, if one is recorded.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub veto_until: Option<OffsetDateTime>,
}

/// Immutable challenge reference data as persisted by the hosted store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChallengeEntity {
    /// Stable identifier for the challenge.
    pub id: i64,
    /// Short display name.
    pub name: String,
    /// Free-form description; may embed `[label](url)` links.
    pub description: String,
    /// Smallest reward the challenge can award.
    pub min_coins: i64,
    /// Largest reward the challenge can award.
    pub max_coins: i64,
    /// Curse flag carried from the reference data.
    pub is_curse: bool,
}

/// Representation of an authenticated player account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserEntity {
    /// Auth-provider subject identifier.
    pub id: Uuid,
    /// Optional display name.
    pub name: Option<String>,
    /// Whether the account may use the admin mutation endpoints.
    pub admin: bool,
    /// Team the account belongs to, if any.
    pub team: Option<i64>,
    /// Account creation timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Partial update of a team row.
///
/// An outer `None` leaves the column untouched; for nullable columns the
/// inner option distinguishes setting a value from clearing it
/// (`Some(None)` writes NULL).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamPatch {
    /// New display name.
    pub name: Option<String>,
    /// New coin balance, or `Some(None)` to clear it.
    pub coins: Option<Option<f64>>,
    /// New current challenge, or `Some(None)` to clear it.
    pub current_challenge: Option<Option<i64>>,
    /// Replacement completed-challenge list.
    pub challenges_completed: Option<Vec<i64>>,
    /// New role, or `Some(None)` to clear it.
    pub role: Option<Option<Role>>,
    /// New veto deadline, or `Some(None)` to clear it.
    pub veto_until: Option<Option<OffsetDateTime>>,
}

impl TeamPatch {
    /// Whether the patch would change no columns.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.coins.is_none()
            && self.current_challenge.is_none()
            && self.challenges_completed.is_none()
            && self.role.is_none()
            && self.veto_until.is_none()
    }
}

/// Partial update of a user row; same outer/inner option convention as
/// [`TeamPatch`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPatch {
    /// New display name.
    pub name: Option<String>,
    /// New team assignment, or `Some(None)` to clear it.
    pub team: Option<Option<i64>>,
    /// New admin flag.
    pub admin: Option<bool>,
}

impl UserPatch {
    /// Whether the patch would change no columns.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.team.is_none() && self.admin.is_none()
    }
}
