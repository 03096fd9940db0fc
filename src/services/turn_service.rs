//! Business logic powering the runner turn loop: drawing, completing,
//! passing, and vetoing challenges, plus the transit coin burn. These
//! helpers coordinate storage reads, state-machine transitions, and the
//! veto expiry countdown while honouring the single-transition-at-a-time
//! requirement per team.

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::{
    dao::{models::TeamPatch, team_store::TeamStore},
    dto::{
        common::TurnSnapshot,
        turn::{DrawResponse, VetoResponse},
    },
    error::ServiceError,
    state::{
        SharedState, TurnEvent, TurnPhase,
        transitions::run_turn_transition,
        turn::{Challenge, Team, TransitRun, pick_challenge, transit_burn},
    },
    timer::format_time,
};

/// Current turn snapshot for a team, resyncing veto state and resuming a
/// persisted challenge after a reload.
pub async fn current_turn(state: &SharedState, team_id: i64) -> Result<TurnSnapshot, ServiceError> {
    let store = state.require_team_store().await?;
    let team = load_team(&store, team_id).await?;
    sync_veto(state, &store, &team).await?;

    let turn = state.turn(team_id);
    let phase = turn.phase().await;

    if matches!(phase, TurnPhase::Idle) && team.current_challenge.is_some() {
        // a challenge drawn by a previous session resumes instead of idling
        match draw_challenge(state, team_id).await {
            Ok(response) => {
                if let Some(snapshot) = response.turn {
                    return Ok(snapshot);
                }
            }
            Err(err) => debug!(team_id, error = %err, "challenge resume failed"),
        }
    }

    Ok(TurnSnapshot::from_parts(&team, &phase))
}

/// Draw a challenge for the team with an OS-seeded random pick.
pub async fn draw_challenge(
    state: &SharedState,
    team_id: i64,
) -> Result<DrawResponse, ServiceError> {
    let mut rng = rand::rngs::StdRng::from_os_rng();
    draw_challenge_with_rng(state, team_id, &mut rng).await
}

/// Draw a challenge for the team: resume the persisted pick when one
/// exists, otherwise select uniformly at random among the challenges the
/// team has not completed.
pub async fn draw_challenge_with_rng<R>(
    state: &SharedState,
    team_id: i64,
    rng: &mut R,
) -> Result<DrawResponse, ServiceError>
where
    R: Rng + Send + ?Sized,
{
    let store = state.require_team_store().await?;
    let mut team = load_team(&store, team_id).await?;
    sync_veto(state, &store, &team).await?;

    let turn = state.turn(team_id);
    if let Some(active) = turn.active_challenge().await {
        // repeated draw requests are answered with the challenge in hand
        team.current_challenge = Some(active.id);
        return Ok(DrawResponse::drawn(TurnSnapshot::from_parts(
            &team,
            &TurnPhase::ChallengeActive(active),
        )));
    }

    let eligible: Vec<Challenge> = store
        .select_challenges(team.challenges_completed.clone())
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    if eligible.is_empty() {
        return Err(ServiceError::ChallengesExhausted);
    }

    let resumed = team
        .current_challenge
        .and_then(|id| eligible.iter().find(|c| c.id == id).cloned());
    let fresh = resumed.is_none();

    let challenge = match resumed {
        Some(challenge) => challenge,
        None => pick_challenge(&eligible, rng)
            .cloned()
            .ok_or(ServiceError::ChallengesExhausted)?,
    };

    let patch = fresh.then(|| TeamPatch {
        current_challenge: Some(Some(challenge.id)),
        ..TeamPatch::default()
    });

    let phase = run_turn_transition(state, team_id, TurnEvent::Draw(challenge.clone()), patch)
        .await?;

    team.current_challenge = Some(challenge.id);
    Ok(DrawResponse::drawn(TurnSnapshot::from_parts(&team, &phase)))
}

/// Complete the active challenge for `winnable` coins.
pub async fn complete_challenge(
    state: &SharedState,
    team_id: i64,
    winnable: i64,
) -> Result<TurnSnapshot, ServiceError> {
    let store = state.require_team_store().await?;
    let mut team = load_team(&store, team_id).await?;

    let turn = state.turn(team_id);
    let challenge = turn.active_challenge().await.ok_or_else(|| {
        ServiceError::InvalidState("no active challenge to complete".into())
    })?;

    if !challenge.reward_in_range(winnable) {
        return Err(ServiceError::InvalidInput(format!(
            "reward {winnable} outside [{}, {}] for challenge `{}`",
            challenge.min_coins, challenge.max_coins, challenge.id
        )));
    }

    team.coins += winnable as f64;
    team.challenges_completed.push(challenge.id);
    team.current_challenge = None;

    let patch = TeamPatch {
        coins: Some(Some(team.coins)),
        current_challenge: Some(None),
        challenges_completed: Some(team.challenges_completed.clone()),
        ..TeamPatch::default()
    };

    let phase =
        run_turn_transition(state, team_id, TurnEvent::Complete { winnable }, Some(patch)).await?;

    Ok(TurnSnapshot::from_parts(&team, &phase))
}

/// Put the active challenge back without completing it. The challenge stays
/// eligible for future draws and any recorded veto deadline is cleared.
pub async fn pass_challenge(
    state: &SharedState,
    team_id: i64,
) -> Result<TurnSnapshot, ServiceError> {
    let store = state.require_team_store().await?;
    let mut team = load_team(&store, team_id).await?;

    let patch = TeamPatch {
        current_challenge: Some(None),
        veto_until: Some(None),
        ..TeamPatch::default()
    };

    let phase = run_turn_transition(state, team_id, TurnEvent::Pass, Some(patch)).await?;

    team.current_challenge = None;
    team.veto_until = None;
    Ok(TurnSnapshot::from_parts(&team, &phase))
}

/// Veto the active challenge, starting (or re-observing) the cooldown.
///
/// A deadline already recorded server-side is adopted as-is, so repeated
/// vetoes never extend a running cooldown.
pub async fn veto_challenge(
    state: &SharedState,
    team_id: i64,
) -> Result<VetoResponse, ServiceError> {
    let store = state.require_team_store().await?;
    let team = load_team(&store, team_id).await?;

    let recorded = store.select_team_veto(team_id).await?;
    let (until, fresh) = match recorded {
        Some(until) => (until, false),
        None => (
            OffsetDateTime::now_utc() + state.config().veto_cooldown,
            true,
        ),
    };

    let patch = fresh.then(|| TeamPatch {
        veto_until: Some(Some(until)),
        challenges_completed: Some(team.challenges_completed.clone()),
        current_challenge: Some(None),
        ..TeamPatch::default()
    });

    run_turn_transition(state, team_id, TurnEvent::Veto { until }, patch).await?;
    arm_veto_timer(state, team_id, until).await;

    let remaining = (until - OffsetDateTime::now_utc()).whole_seconds().max(0);
    Ok(VetoResponse {
        until,
        remaining: format_time(remaining as f64, 2),
    })
}

/// Clear an elapsed veto cooldown, locally and in storage.
///
/// Safe to call from both the countdown callback and a passive re-check:
/// the state machine lets the local transition happen exactly once, and
/// clearing an already-null column is a no-op, so the write may repeat.
pub async fn expire_veto(state: &SharedState, team_id: i64) -> Result<(), ServiceError> {
    let patch = TeamPatch {
        veto_until: Some(None),
        ..TeamPatch::default()
    };

    match run_turn_transition(state, team_id, TurnEvent::VetoExpired, Some(patch)).await {
        Ok(_) => {
            state.turn(team_id).veto_timer().lock().await.clear();
            Ok(())
        }
        // another observer already cleared the cooldown
        Err(ServiceError::InvalidState(_)) => Ok(()),
        Err(err) => Err(err),
    }
}

/// Start the transit coin burn. Requires a positive balance and an idle turn.
pub async fn start_transit(
    state: &SharedState,
    team_id: i64,
) -> Result<TurnSnapshot, ServiceError> {
    let store = state.require_team_store().await?;
    let team = load_team(&store, team_id).await?;
    sync_veto(state, &store, &team).await?;

    if team.coins <= 0.0 {
        return Err(ServiceError::InvalidInput(
            "transit requires a positive coin balance".into(),
        ));
    }

    let run = TransitRun {
        started_at: OffsetDateTime::now_utc(),
        coins_at_start: team.coins,
    };

    let phase = run_turn_transition(state, team_id, TurnEvent::StartTransit(run), None).await?;
    Ok(TurnSnapshot::from_parts(&team, &phase))
}

/// Stop the transit coin burn and settle the balance.
pub async fn stop_transit(state: &SharedState, team_id: i64) -> Result<TurnSnapshot, ServiceError> {
    let store = state.require_team_store().await?;
    let mut team = load_team(&store, team_id).await?;

    let turn = state.turn(team_id);
    let run = turn.transit_run().await.ok_or_else(|| {
        ServiceError::InvalidState("no transit countdown is running".into())
    })?;

    let elapsed = OffsetDateTime::now_utc() - run.started_at;
    let updated = transit_burn(run.coins_at_start, elapsed);
    if updated < 0.0 {
        warn!(team_id, coins = updated, "transit stop drove the balance negative");
    }

    let patch = TeamPatch {
        coins: Some(Some(updated)),
        ..TeamPatch::default()
    };

    let phase = run_turn_transition(
        state,
        team_id,
        TurnEvent::StopTransit {
            coins_after: updated,
        },
        Some(patch),
    )
    .await?;

    team.coins = updated;
    Ok(TurnSnapshot::from_parts(&team, &phase))
}

/// Reconcile the in-memory veto state with storage.
///
/// Adopts a cooldown recorded by a previous session, clears one whose
/// deadline already passed, and leaves everything else untouched.
async fn sync_veto(
    state: &SharedState,
    store: &Arc<dyn TeamStore>,
    team: &Team,
) -> Result<(), ServiceError> {
    let turn = state.turn(team.id);

    match turn.phase().await {
        TurnPhase::Vetoed { until } if until <= OffsetDateTime::now_utc() => {
            expire_veto(state, team.id).await
        }
        TurnPhase::Idle => {
            let Some(until) = store.select_team_veto(team.id).await? else {
                return Ok(());
            };

            if until > OffsetDateTime::now_utc() {
                run_turn_transition(state, team.id, TurnEvent::Veto { until }, None).await?;
                arm_veto_timer(state, team.id, until).await;
            } else {
                // stale cooldown left behind by an earlier session
                let patch = TeamPatch {
                    veto_until: Some(None),
                    ..TeamPatch::default()
                };
                store.update_team(team.id, patch).await?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Arm (or re-arm) the countdown that clears the veto at its deadline.
async fn arm_veto_timer(state: &SharedState, team_id: i64, until: OffsetDateTime) {
    let turn = state.turn(team_id);
    let mut slot = turn.veto_timer().lock().await;

    let state = state.clone();
    slot.rearm(until, move || {
        tokio::spawn(async move {
            if let Err(err) = expire_veto(&state, team_id).await {
                warn!(team_id, error = %err, "veto expiry failed");
            }
        });
    });
}

async fn load_team(
    store: &Arc<dyn TeamStore>,
    team_id: i64,
) -> Result<Team, ServiceError> {
    let entity = store
        .find_team(team_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("team `{team_id}` not found")))?;
    Ok(entity.into())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use futures::future::BoxFuture;
    use rand::{SeedableRng, rngs::StdRng};
    use time::Duration;
    use uuid::Uuid;

    use crate::{
        config::{AppConfig, PersistenceMode},
        dao::{
            models::{ChallengeEntity, TeamEntity, UserEntity, UserPatch},
            storage::StorageResult,
        },
        state::AppState,
    };

    use super::*;

    /// In-memory store recording every write, standing in for the hosted
    /// database.
    #[derive(Default)]
    struct RecordingStore {
        teams: Mutex<Vec<TeamEntity>>,
        challenges: Vec<ChallengeEntity>,
        patches: Mutex<Vec<(i64, TeamPatch)>>,
    }

    impl RecordingStore {
        fn with(teams: Vec<TeamEntity>, challenges: Vec<ChallengeEntity>) -> Arc<Self> {
            Arc::new(Self {
                teams: Mutex::new(teams),
                challenges,
                patches: Mutex::new(Vec::new()),
            })
        }

        fn team(&self, id: i64) -> Option<TeamEntity> {
            self.teams.lock().unwrap().iter().find(|t| t.id == id).cloned()
        }

        fn recorded_patches(&self) -> Vec<(i64, TeamPatch)> {
            self.patches.lock().unwrap().clone()
        }
    }

    impl crate::dao::team_store::TeamStore for RecordingStore {
        fn select_challenges(
            &self,
            exclude: Vec<i64>,
        ) -> BoxFuture<'static, StorageResult<Vec<ChallengeEntity>>> {
            let rows = self
                .challenges
                .iter()
                .filter(|c| !exclude.contains(&c.id))
                .cloned()
                .collect();
            Box::pin(async move { Ok(rows) })
        }

        fn find_team(&self, id: i64) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>> {
            let row = self.team(id);
            Box::pin(async move { Ok(row) })
        }

        fn update_team(&self, id: i64, patch: TeamPatch) -> BoxFuture<'static, StorageResult<()>> {
            self.patches.lock().unwrap().push((id, patch.clone()));
            let mut teams = self.teams.lock().unwrap();
            if let Some(team) = teams.iter_mut().find(|t| t.id == id) {
                if let Some(name) = patch.name {
                    team.name = name;
                }
                if let Some(coins) = patch.coins {
                    team.coins = coins;
                }
                if let Some(current) = patch.current_challenge {
                    team.current_challenge = current;
                }
                if let Some(completed) = patch.challenges_completed {
                    team.challenges_completed = completed;
                }
                if let Some(role) = patch.role {
                    team.role = role;
                }
                if let Some(veto) = patch.veto_until {
                    team.veto_until = veto;
                }
            }
            Box::pin(async move { Ok(()) })
        }

        fn select_team_veto(
            &self,
            id: i64,
        ) -> BoxFuture<'static, StorageResult<Option<OffsetDateTime>>> {
            let veto = self.team(id).and_then(|t| t.veto_until);
            Box::pin(async move { Ok(veto) })
        }

        fn insert_team(&self, name: String, coins: f64) -> BoxFuture<'static, StorageResult<i64>> {
            let mut teams = self.teams.lock().unwrap();
            let id = teams.iter().map(|t| t.id).max().unwrap_or(0) + 1;
            teams.push(TeamEntity {
                id,
                name,
                coins: Some(coins),
                current_challenge: None,
                challenges_completed: vec![],
                role: None,
                veto_until: None,
            });
            Box::pin(async move { Ok(id) })
        }

        fn list_teams(&self) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>> {
            let rows = self.teams.lock().unwrap().clone();
            Box::pin(async move { Ok(rows) })
        }

        fn find_user(&self, _id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
            Box::pin(async move { Ok(None) })
        }

        fn update_user(
            &self,
            _id: Uuid,
            _patch: UserPatch,
        ) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async move { Ok(()) })
        }

        fn list_users(&self) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>> {
            Box::pin(async move { Ok(Vec::new()) })
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async move { Ok(()) })
        }

        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async move { Ok(()) })
        }
    }

    fn challenge(id: i64, min: i64, max: i64) -> ChallengeEntity {
        ChallengeEntity {
            id,
            name: format!("challenge {id}"),
            description: String::new(),
            min_coins: min,
            max_coins: max,
            is_curse: false,
        }
    }

    fn team(id: i64, coins: f64) -> TeamEntity {
        TeamEntity {
            id,
            name: format!("team {id}"),
            coins: Some(coins),
            current_challenge: None,
            challenges_completed: vec![],
            role: None,
            veto_until: None,
        }
    }

    async fn state_with(store: Arc<RecordingStore>) -> SharedState {
        // strict mode keeps test writes synchronous and assertable
        let config = AppConfig {
            persistence: PersistenceMode::Strict,
            ..AppConfig::default()
        };
        let state = AppState::new(config);
        state.install_team_store(store).await;
        state
    }

    #[tokio::test]
    async fn draw_never_selects_a_completed_challenge() {
        let store = RecordingStore::with(
            vec![TeamEntity {
                challenges_completed: vec![1, 3],
                ..team(1, 20.0)
            }],
            vec![challenge(1, 0, 0), challenge(2, 0, 0), challenge(3, 0, 0)],
        );
        let state = state_with(store.clone()).await;

        let mut rng = StdRng::seed_from_u64(5);
        let response = draw_challenge_with_rng(&state, 1, &mut rng).await.unwrap();
        let snapshot = response.turn.unwrap();
        assert_eq!(snapshot.challenge.unwrap().id, 2);
        assert_eq!(store.team(1).unwrap().current_challenge, Some(2));
    }

    #[tokio::test]
    async fn draw_with_everything_completed_signals_exhaustion() {
        let store = RecordingStore::with(
            vec![TeamEntity {
                challenges_completed: vec![1, 2],
                ..team(1, 20.0)
            }],
            vec![challenge(1, 0, 0), challenge(2, 0, 0)],
        );
        let state = state_with(store.clone()).await;

        let mut rng = StdRng::seed_from_u64(5);
        let err = draw_challenge_with_rng(&state, 1, &mut rng).await.unwrap_err();
        assert!(matches!(err, ServiceError::ChallengesExhausted));

        // no transition happened and nothing was written
        assert_eq!(state.turn(1).phase().await, TurnPhase::Idle);
        assert!(store.recorded_patches().is_empty());
    }

    #[tokio::test]
    async fn draw_resumes_the_persisted_challenge() {
        let store = RecordingStore::with(
            vec![TeamEntity {
                current_challenge: Some(3),
                ..team(1, 20.0)
            }],
            vec![challenge(2, 0, 0), challenge(3, 0, 0), challenge(4, 0, 0)],
        );
        let state = state_with(store.clone()).await;

        let mut rng = StdRng::seed_from_u64(99);
        let response = draw_challenge_with_rng(&state, 1, &mut rng).await.unwrap();
        assert_eq!(response.turn.unwrap().challenge.unwrap().id, 3);

        // a resume is not a fresh pick: nothing is re-written
        assert!(store.recorded_patches().is_empty());
    }

    #[tokio::test]
    async fn complete_awards_coins_and_records_the_challenge() {
        let store = RecordingStore::with(
            vec![team(1, 20.0)],
            vec![challenge(5, 2, 8)],
        );
        let state = state_with(store.clone()).await;

        let mut rng = StdRng::seed_from_u64(1);
        draw_challenge_with_rng(&state, 1, &mut rng).await.unwrap();
        let snapshot = complete_challenge(&state, 1, 5).await.unwrap();

        assert_eq!(snapshot.coins, 25.0);
        assert_eq!(snapshot.challenges_completed, vec![5]);
        assert!(snapshot.challenge.is_none());

        let persisted = store.team(1).unwrap();
        assert_eq!(persisted.coins, Some(25.0));
        assert_eq!(persisted.challenges_completed, vec![5]);
        assert_eq!(persisted.current_challenge, None);
    }

    #[tokio::test]
    async fn complete_rejects_out_of_range_rewards() {
        let store = RecordingStore::with(vec![team(1, 20.0)], vec![challenge(5, 2, 8)]);
        let state = state_with(store.clone()).await;

        let mut rng = StdRng::seed_from_u64(1);
        draw_challenge_with_rng(&state, 1, &mut rng).await.unwrap();

        let err = complete_challenge(&state, 1, 9).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
        assert_eq!(store.team(1).unwrap().coins, Some(20.0));
    }

    #[tokio::test]
    async fn pass_leaves_coins_and_completions_untouched() {
        let store = RecordingStore::with(vec![team(1, 20.0)], vec![challenge(5, 2, 8)]);
        let state = state_with(store.clone()).await;

        let mut rng = StdRng::seed_from_u64(1);
        draw_challenge_with_rng(&state, 1, &mut rng).await.unwrap();
        let snapshot = pass_challenge(&state, 1).await.unwrap();

        assert_eq!(snapshot.coins, 20.0);
        assert!(snapshot.challenges_completed.is_empty());

        let persisted = store.team(1).unwrap();
        assert_eq!(persisted.current_challenge, None);
        assert_eq!(persisted.veto_until, None);
        assert_eq!(persisted.challenges_completed, Vec::<i64>::new());

        // the passed challenge stays eligible
        let response = draw_challenge_with_rng(&state, 1, &mut StdRng::seed_from_u64(2))
            .await
            .unwrap();
        assert_eq!(response.turn.unwrap().challenge.unwrap().id, 5);
    }

    #[tokio::test]
    async fn veto_is_idempotent_about_its_deadline() {
        let store = RecordingStore::with(vec![team(1, 20.0)], vec![challenge(5, 2, 8)]);
        let state = state_with(store.clone()).await;

        let mut rng = StdRng::seed_from_u64(1);
        draw_challenge_with_rng(&state, 1, &mut rng).await.unwrap();

        let before = OffsetDateTime::now_utc();
        let first = veto_challenge(&state, 1).await.unwrap();
        let window = first.until - before;
        assert!(window > Duration::minutes(9) && window <= Duration::minutes(10));

        // a second veto while the cooldown runs adopts the same deadline
        let second = veto_challenge(&state, 1).await.unwrap();
        assert_eq!(second.until, first.until);

        let persisted = store.team(1).unwrap();
        assert_eq!(persisted.veto_until, Some(first.until));
        assert_eq!(persisted.current_challenge, None);
    }

    #[tokio::test]
    async fn expired_veto_clears_once() {
        let store = RecordingStore::with(
            vec![TeamEntity {
                veto_until: Some(OffsetDateTime::now_utc() - Duration::seconds(5)),
                ..team(1, 20.0)
            }],
            vec![challenge(5, 2, 8)],
        );
        let state = state_with(store.clone()).await;

        // the stale cooldown is cleared during resync instead of adopted
        let snapshot = current_turn(&state, 1).await.unwrap();
        assert!(snapshot.veto_until.is_none());
        assert_eq!(store.team(1).unwrap().veto_until, None);

        // a second expiry observation is a no-op
        expire_veto(&state, 1).await.unwrap();
    }

    #[tokio::test]
    async fn active_veto_is_adopted_after_reload() {
        let until = OffsetDateTime::now_utc() + Duration::minutes(8);
        let store = RecordingStore::with(
            vec![TeamEntity {
                veto_until: Some(until),
                ..team(1, 20.0)
            }],
            vec![challenge(5, 2, 8)],
        );
        let state = state_with(store.clone()).await;

        let snapshot = current_turn(&state, 1).await.unwrap();
        assert_eq!(snapshot.veto_until, Some(until));

        // drawing stays suppressed for the adopted cooldown
        let err = draw_challenge(&state, 1).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn transit_stop_floors_the_burn() {
        let store = RecordingStore::with(vec![team(1, 10.0)], vec![]);
        let state = state_with(store.clone()).await;

        let started = start_transit(&state, 1).await.unwrap();
        assert!(started.transit);

        // ninety seconds of transit on a 10-coin balance settles at 8
        {
            let turn = state.turn(1);
            let run = turn.transit_run().await.unwrap();
            assert_eq!(transit_burn(run.coins_at_start, time::Duration::seconds(90)), 8.0);
        }

        let snapshot = stop_transit(&state, 1).await.unwrap();
        assert!(!snapshot.transit);
        // even a near-instant stop flooring burns the started minute
        assert_eq!(snapshot.coins, 9.0);
        assert_eq!(store.team(1).unwrap().coins, Some(9.0));
    }

    #[tokio::test]
    async fn transit_requires_a_positive_balance() {
        let store = RecordingStore::with(vec![team(1, 0.0)], vec![]);
        let state = state_with(store.clone()).await;

        let err = start_transit(&state, 1).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn transit_suppresses_challenge_completion() {
        let store = RecordingStore::with(vec![team(1, 10.0)], vec![challenge(5, 2, 8)]);
        let state = state_with(store.clone()).await;

        start_transit(&state, 1).await.unwrap();
        let err = draw_challenge(&state, 1).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    /// Store whose team reads work but whose writes always fail.
    struct WriteFailingStore {
        inner: Arc<RecordingStore>,
    }

    impl crate::dao::team_store::TeamStore for WriteFailingStore {
        fn select_challenges(
            &self,
            exclude: Vec<i64>,
        ) -> BoxFuture<'static, StorageResult<Vec<ChallengeEntity>>> {
            self.inner.select_challenges(exclude)
        }

        fn find_team(&self, id: i64) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>> {
            self.inner.find_team(id)
        }

        fn update_team(
            &self,
            _id: i64,
            _patch: TeamPatch,
        ) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async move {
                Err(crate::dao::storage::StorageError::unavailable(
                    "write refused".into(),
                    std::io::Error::other("write refused"),
                ))
            })
        }

        fn select_team_veto(
            &self,
            id: i64,
        ) -> BoxFuture<'static, StorageResult<Option<OffsetDateTime>>> {
            self.inner.select_team_veto(id)
        }

        fn insert_team(&self, name: String, coins: f64) -> BoxFuture<'static, StorageResult<i64>> {
            self.inner.insert_team(name, coins)
        }

        fn list_teams(&self) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>> {
            self.inner.list_teams()
        }

        fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
            self.inner.find_user(id)
        }

        fn update_user(
            &self,
            id: Uuid,
            patch: UserPatch,
        ) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.update_user(id, patch)
        }

        fn list_users(&self) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>> {
            self.inner.list_users()
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.health_check()
        }

        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.try_reconnect()
        }
    }

    #[tokio::test]
    async fn strict_mode_aborts_on_a_failed_write() {
        let inner = RecordingStore::with(
            vec![TeamEntity {
                current_challenge: Some(5),
                ..team(1, 20.0)
            }],
            vec![challenge(5, 2, 8)],
        );
        let state = AppState::new(AppConfig {
            persistence: PersistenceMode::Strict,
            ..AppConfig::default()
        });
        state
            .install_team_store(Arc::new(WriteFailingStore { inner }))
            .await;

        // resume needs no write, so the challenge still becomes active
        draw_challenge(&state, 1).await.unwrap();

        let err = complete_challenge(&state, 1, 5).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unavailable(_)));

        // the aborted transition leaves the challenge in hand
        assert!(matches!(
            state.turn(1).phase().await,
            TurnPhase::ChallengeActive(_)
        ));
    }

    #[tokio::test]
    async fn optimistic_mode_applies_despite_a_failed_write() {
        let inner = RecordingStore::with(
            vec![TeamEntity {
                current_challenge: Some(5),
                ..team(1, 20.0)
            }],
            vec![challenge(5, 2, 8)],
        );
        let state = AppState::new(AppConfig {
            persistence: PersistenceMode::Optimistic,
            ..AppConfig::default()
        });
        state
            .install_team_store(Arc::new(WriteFailingStore { inner }))
            .await;

        draw_challenge(&state, 1).await.unwrap();

        // the dropped write is logged, not surfaced; local state advances
        let snapshot = complete_challenge(&state, 1, 5).await.unwrap();
        assert_eq!(snapshot.coins, 25.0);
        assert_eq!(state.turn(1).phase().await, TurnPhase::Idle);
    }

    #[tokio::test]
    async fn full_turn_scenario() {
        let store = RecordingStore::with(
            vec![team(1, 20.0)],
            vec![challenge(11, 1, 6), challenge(12, 1, 6)],
        );
        let state = state_with(store.clone()).await;

        let mut rng = StdRng::seed_from_u64(42);
        let drawn = draw_challenge_with_rng(&state, 1, &mut rng)
            .await
            .unwrap()
            .turn
            .unwrap()
            .challenge
            .unwrap();

        let snapshot = complete_challenge(&state, 1, 5).await.unwrap();
        assert_eq!(snapshot.coins, 25.0);
        assert_eq!(snapshot.challenges_completed, vec![drawn.id]);

        let persisted = store.team(1).unwrap();
        assert_eq!(persisted.coins, Some(25.0));
        assert_eq!(persisted.challenges_completed, vec![drawn.id]);
        assert_eq!(persisted.current_challenge, None);
    }
}
