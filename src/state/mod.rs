pub mod state_machine;
pub mod transitions;
pub mod turn;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock, watch};

use crate::{
    config::AppConfig,
    dao::team_store::TeamStore,
    error::ServiceError,
    state::{
        state_machine::{TurnSnapshotState, TurnStateMachine},
        turn::{Challenge, TransitRun},
    },
    timer::CountdownSlot,
};

pub use self::state_machine::{
    AbortError, ApplyError, Plan, PlanError, PlanId, TurnEvent, TurnPhase,
};

/// Handle shared between every route and background task.
pub type SharedState = Arc<AppState>;

/// Per-team turn bookkeeping: the state machine, a gate serializing
/// transitions, and the veto countdown slot.
pub struct TeamTurn {
    machine: RwLock<TurnStateMachine>,
    gate: Mutex<()>,
    veto_timer: Mutex<CountdownSlot>,
}

impl TeamTurn {
    fn new() -> Self {
        Self {
            machine: RwLock::new(TurnStateMachine::new()),
            gate: Mutex::new(()),
            veto_timer: Mutex::new(CountdownSlot::default()),
        }
    }

    /// Current phase of this team's turn.
    pub async fn phase(&self) -> TurnPhase {
        self.machine.read().await.phase()
    }

    /// The drawn challenge, if this team is working one.
    pub async fn active_challenge(&self) -> Option<Challenge> {
        self.machine.read().await.active_challenge().cloned()
    }

    /// The running transit countdown, if any.
    pub async fn transit_run(&self) -> Option<TransitRun> {
        self.machine.read().await.transit_run().cloned()
    }

    /// Snapshot of the underlying machine.
    pub async fn snapshot(&self) -> TurnSnapshotState {
        self.machine.read().await.snapshot()
    }

    /// Gate serializing transitions for this team; at most one may be in
    /// flight at a time.
    pub fn gate(&self) -> &Mutex<()> {
        &self.gate
    }

    /// Countdown slot driving the veto expiry callback.
    pub fn veto_timer(&self) -> &Mutex<CountdownSlot> {
        &self.veto_timer
    }

    pub(crate) async fn plan(&self, event: TurnEvent) -> Result<Plan, PlanError> {
        self.machine.write().await.plan(event)
    }

    pub(crate) async fn apply(&self, plan_id: PlanId) -> Result<TurnPhase, ApplyError> {
        self.machine.write().await.apply(plan_id)
    }

    pub(crate) async fn abort(&self, plan_id: PlanId) -> Result<(), AbortError> {
        self.machine.write().await.abort(plan_id)
    }
}

/// Central application state storing the team store handle, the per-team
/// turn registry, and the degraded flag.
pub struct AppState {
    team_store: RwLock<Option<Arc<dyn TeamStore>>>,
    turns: DashMap<i64, Arc<TeamTurn>>,
    degraded: watch::Sender<bool>,
    config: AppConfig,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            team_store: RwLock::new(None),
            turns: DashMap::new(),
            degraded: degraded_tx,
            config,
        })
    }

    /// Gameplay configuration the server was started with.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current team store, if one is installed.
    pub async fn team_store(&self) -> Option<Arc<dyn TeamStore>> {
        let guard = self.team_store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the team store or fail with the degraded-mode error.
    pub async fn require_team_store(&self) -> Result<Arc<dyn TeamStore>, ServiceError> {
        self.team_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new team store implementation and leave degraded mode.
    pub async fn install_team_store(&self, store: Arc<dyn TeamStore>) {
        {
            let mut guard = self.team_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Remove the current team store and enter degraded mode.
    pub async fn clear_team_store(&self) {
        {
            let mut guard = self.team_store.write().await;
            guard.take();
        }
        self.update_degraded(true).await;
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        let guard = self.team_store.read().await;
        guard.is_none()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag.
    pub async fn update_degraded(&self, value: bool) {
        let _ = self.degraded.send(value);
    }

    /// Turn bookkeeping for a team, created lazily on first access.
    pub fn turn(&self, team_id: i64) -> Arc<TeamTurn> {
        self.turns
            .entry(team_id)
            .or_insert_with(|| Arc::new(TeamTurn::new()))
            .clone()
    }
}
