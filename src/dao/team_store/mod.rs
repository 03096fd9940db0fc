#[cfg(feature = "rest-store")]
pub mod postgrest;

use futures::future::BoxFuture;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::dao::models::{ChallengeEntity, TeamEntity, TeamPatch, UserEntity, UserPatch};
use crate::dao::storage::StorageResult;

/// Abstraction over the hosted store owning teams, users, and challenges.
///
/// Every method is a single best-effort statement; no transactional
/// grouping is assumed across calls, and concurrent writers follow
/// last-write-wins.
pub trait TeamStore: Send + Sync {
    /// All challenges whose id is not in `exclude`.
    fn select_challenges(
        &self,
        exclude: Vec<i64>,
    ) -> BoxFuture<'static, StorageResult<Vec<ChallengeEntity>>>;
    /// Look up a team by id.
    fn find_team(&self, id: i64) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>>;
    /// Apply a partial update to a team row.
    fn update_team(&self, id: i64, patch: TeamPatch) -> BoxFuture<'static, StorageResult<()>>;
    /// Read only the veto deadline of a team, used to resync after reload.
    fn select_team_veto(
        &self,
        id: i64,
    ) -> BoxFuture<'static, StorageResult<Option<OffsetDateTime>>>;
    /// Create a team with the given name and starting coins, returning its id.
    fn insert_team(&self, name: String, coins: f64) -> BoxFuture<'static, StorageResult<i64>>;
    /// All teams, for the admin dashboard.
    fn list_teams(&self) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>>;
    /// Look up a user by auth subject id.
    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>>;
    /// Apply a partial update to a user row.
    fn update_user(&self, id: Uuid, patch: UserPatch) -> BoxFuture<'static, StorageResult<()>>;
    /// All users, for the admin dashboard.
    fn list_users(&self) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>>;
    /// Cheap probe verifying the store still answers.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Attempt to re-establish a lost connection.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
