use std::time::Instant;

use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::state::turn::{Challenge, TransitRun};

/// Mutually exclusive phases a team's turn can be in.
///
/// The phase carries everything the current mode needs, so a drawn
/// challenge and an active veto cooldown can never coexist.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnPhase {
    /// No challenge drawn, no cooldown running; the team may draw or start transit.
    Idle,
    /// A challenge has been drawn and is waiting to be completed, passed, or vetoed.
    ChallengeActive(Challenge),
    /// The team vetoed a challenge and serves a cooldown until the deadline.
    Vetoed {
        /// End of the cooldown window.
        until: OffsetDateTime,
    },
    /// A transit coin-burn countdown is running; challenge actions are refused.
    Transit(TransitRun),
}

/// Events that can be applied to a team's turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    /// A challenge was selected for the team (fresh pick or resumed from storage).
    Draw(Challenge),
    /// The active challenge was completed for the given reward.
    Complete {
        /// Coins awarded, within the challenge's reward range.
        winnable: i64,
    },
    /// The active challenge was skipped without reward or exclusion.
    Pass,
    /// The active challenge was vetoed; the cooldown runs until the deadline.
    Veto {
        /// End of the cooldown window (freshly computed or adopted from storage).
        until: OffsetDateTime,
    },
    /// The veto cooldown deadline elapsed.
    VetoExpired,
    /// A transit countdown started.
    StartTransit(TransitRun),
    /// The transit countdown stopped and the burn was settled.
    StopTransit {
        /// Coin balance after subtracting the elapsed transit minutes.
        coins_after: f64,
    },
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the turn was in when the invalid event was received.
    pub from: TurnPhase,
    /// The event that cannot be applied from this phase.
    pub event: TurnEvent,
}

/// Errors that can occur when planning a turn transition.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanError {
    /// A transition is already pending and must be applied or aborted.
    AlreadyPending,
    /// The requested transition is not valid from the current phase.
    InvalidTransition(InvalidTransition),
}

/// Errors that can occur when applying a planned turn transition.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
    /// Phase changed since the plan was created.
    PhaseMismatch {
        /// Phase when the plan was created.
        expected: TurnPhase,
        /// Current phase.
        actual: TurnPhase,
    },
    /// Version changed since the plan was created.
    VersionMismatch {
        /// Version when the plan was created.
        expected: usize,
        /// Current version.
        actual: usize,
    },
}

/// Errors that can occur when aborting a planned turn transition.
#[derive(Debug, Clone, PartialEq)]
pub enum AbortError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
}

/// Unique identifier for a planned turn transition.
pub type PlanId = Uuid;

/// A turn transition that has been validated but not yet applied.
///
/// The persistence write happens between planning and applying, so an
/// aborted plan leaves both local and durable state untouched.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Unique identifier for this plan.
    pub id: PlanId,
    /// Phase the turn is currently in.
    pub from: TurnPhase,
    /// Phase the turn will transition to.
    pub to: TurnPhase,
    /// Event that triggered this transition.
    pub event: TurnEvent,
    /// Version number after applying this transition.
    pub version_next: usize,
    /// Timestamp when this plan was created.
    pub pending_since: Instant,
}

/// Snapshot of a turn state machine.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnSnapshotState {
    /// Current phase of the turn.
    pub phase: TurnPhase,
    /// Version number (increments on each applied transition).
    pub version: usize,
    /// Pending transition target, if a transition is planned but not applied.
    pub pending: Option<TurnPhase>,
}

/// Per-team state machine implementing the challenge/coin/veto turn flow.
#[derive(Debug, Clone)]
pub struct TurnStateMachine {
    phase: TurnPhase,
    version: usize,
    pending: Option<Plan>,
}

impl Default for TurnStateMachine {
    fn default() -> Self {
        Self {
            phase: TurnPhase::Idle,
            version: 0,
            pending: None,
        }
    }
}

impl TurnStateMachine {
    /// Create a new state machine initialised in the idle phase.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> TurnPhase {
        self.phase.clone()
    }

    /// The active challenge, if one is drawn.
    pub fn active_challenge(&self) -> Option<&Challenge> {
        match &self.phase {
            TurnPhase::ChallengeActive(challenge) => Some(challenge),
            _ => None,
        }
    }

    /// The running transit countdown, if one is active.
    pub fn transit_run(&self) -> Option<&TransitRun> {
        match &self.phase {
            TurnPhase::Transit(run) => Some(run),
            _ => None,
        }
    }

    /// Create a snapshot of the current machine state.
    pub fn snapshot(&self) -> TurnSnapshotState {
        TurnSnapshotState {
            phase: self.phase.clone(),
            version: self.version,
            pending: self.pending.as_ref().map(|plan| plan.to.clone()),
        }
    }

    /// Plan a transition by validating that the event can be applied from the
    /// current phase. Returns a [`Plan`] that can later be applied or aborted.
    pub fn plan(&mut self, event: TurnEvent) -> Result<Plan, PlanError> {
        if self.pending.is_some() {
            return Err(PlanError::AlreadyPending);
        }

        let next = self
            .compute_transition(event.clone())
            .map_err(PlanError::InvalidTransition)?;

        let plan = Plan {
            id: Uuid::new_v4(),
            from: self.phase.clone(),
            to: next,
            event,
            version_next: self.version + 1,
            pending_since: Instant::now(),
        };

        self.pending = Some(plan.clone());

        Ok(plan)
    }

    /// Apply a planned transition, moving the machine to the next phase.
    /// Returns the new phase after the transition.
    pub fn apply(&mut self, plan_id: PlanId) -> Result<TurnPhase, ApplyError> {
        let plan = self.pending.take().ok_or(ApplyError::NoPending)?;

        if plan.id != plan_id {
            let expected_plan_id = plan.id;
            self.pending = Some(plan);
            return Err(ApplyError::IdMismatch {
                expected: expected_plan_id,
                got: plan_id,
            });
        }

        if self.phase != plan.from {
            return Err(ApplyError::PhaseMismatch {
                expected: plan.from,
                actual: self.phase.clone(),
            });
        }

        if self.version + 1 != plan.version_next {
            return Err(ApplyError::VersionMismatch {
                expected: plan.version_next,
                actual: self.version + 1,
            });
        }

        self.phase = plan.to;
        self.version = plan.version_next;
        self.pending = None;

        Ok(self.phase.clone())
    }

    /// Abort a planned transition without applying it.
    pub fn abort(&mut self, plan_id: PlanId) -> Result<(), AbortError> {
        let plan = self.pending.as_ref().ok_or(AbortError::NoPending)?;

        if plan.id != plan_id {
            return Err(AbortError::IdMismatch {
                expected: plan.id,
                got: plan_id,
            });
        }

        self.pending = None;
        Ok(())
    }

    /// Compute the target phase for an event if the transition is valid.
    ///
    /// `Veto` is accepted from `Idle` as well as `ChallengeActive` so a
    /// cooldown persisted by a previous session can be adopted after reload.
    fn compute_transition(&self, event: TurnEvent) -> Result<TurnPhase, InvalidTransition> {
        let next = match (self.phase.clone(), event) {
            (TurnPhase::Idle, TurnEvent::Draw(challenge)) => TurnPhase::ChallengeActive(challenge),
            (TurnPhase::ChallengeActive(_), TurnEvent::Complete { .. }) => TurnPhase::Idle,
            (TurnPhase::ChallengeActive(_), TurnEvent::Pass) => TurnPhase::Idle,
            (TurnPhase::ChallengeActive(_), TurnEvent::Veto { until }) => {
                TurnPhase::Vetoed { until }
            }
            (TurnPhase::Idle, TurnEvent::Veto { until }) => TurnPhase::Vetoed { until },
            // re-observing a cooldown already being served adopts its deadline
            (TurnPhase::Vetoed { .. }, TurnEvent::Veto { until }) => TurnPhase::Vetoed { until },
            (TurnPhase::Vetoed { .. }, TurnEvent::VetoExpired) => TurnPhase::Idle,
            (TurnPhase::Idle, TurnEvent::StartTransit(run)) => TurnPhase::Transit(run),
            (TurnPhase::Transit(_), TurnEvent::StopTransit { .. }) => TurnPhase::Idle,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use super::*;

    fn challenge(id: i64) -> Challenge {
        Challenge {
            id,
            name: format!("challenge {id}"),
            description: "ride to the end of the line".into(),
            min_coins: 2,
            max_coins: 5,
            is_curse: false,
        }
    }

    fn apply(sm: &mut TurnStateMachine, event: TurnEvent) -> TurnPhase {
        let plan = sm.plan(event).unwrap();
        sm.apply(plan.id).unwrap()
    }

    #[test]
    fn initial_phase_is_idle() {
        let sm = TurnStateMachine::new();
        assert_eq!(sm.phase(), TurnPhase::Idle);
    }

    #[test]
    fn draw_complete_cycle() {
        let mut sm = TurnStateMachine::new();

        assert_eq!(
            apply(&mut sm, TurnEvent::Draw(challenge(7))),
            TurnPhase::ChallengeActive(challenge(7))
        );
        assert_eq!(sm.active_challenge().map(|c| c.id), Some(7));
        assert_eq!(
            apply(&mut sm, TurnEvent::Complete { winnable: 3 }),
            TurnPhase::Idle
        );
    }

    #[test]
    fn pass_returns_to_idle() {
        let mut sm = TurnStateMachine::new();
        apply(&mut sm, TurnEvent::Draw(challenge(1)));
        assert_eq!(apply(&mut sm, TurnEvent::Pass), TurnPhase::Idle);
    }

    #[test]
    fn veto_then_expiry() {
        let mut sm = TurnStateMachine::new();
        let until = OffsetDateTime::now_utc() + Duration::minutes(10);

        apply(&mut sm, TurnEvent::Draw(challenge(1)));
        assert_eq!(
            apply(&mut sm, TurnEvent::Veto { until }),
            TurnPhase::Vetoed { until }
        );

        // challenge actions are suppressed while the cooldown runs
        let err = sm.plan(TurnEvent::Draw(challenge(2))).unwrap_err();
        assert!(matches!(err, PlanError::InvalidTransition(_)));

        assert_eq!(apply(&mut sm, TurnEvent::VetoExpired), TurnPhase::Idle);
    }

    #[test]
    fn veto_adopted_from_idle() {
        let mut sm = TurnStateMachine::new();
        let until = OffsetDateTime::now_utc() + Duration::minutes(4);
        assert_eq!(
            apply(&mut sm, TurnEvent::Veto { until }),
            TurnPhase::Vetoed { until }
        );
    }

    #[test]
    fn veto_expiry_fires_locally_once() {
        let mut sm = TurnStateMachine::new();
        let until = OffsetDateTime::now_utc();
        apply(&mut sm, TurnEvent::Veto { until });
        apply(&mut sm, TurnEvent::VetoExpired);

        // a racing second expiry observation cannot transition again
        let err = sm.plan(TurnEvent::VetoExpired).unwrap_err();
        match err {
            PlanError::InvalidTransition(invalid) => {
                assert_eq!(invalid.from, TurnPhase::Idle);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn transit_blocks_drawing() {
        let mut sm = TurnStateMachine::new();
        let run = TransitRun {
            started_at: OffsetDateTime::now_utc(),
            coins_at_start: 10.0,
        };

        apply(&mut sm, TurnEvent::StartTransit(run));
        let err = sm.plan(TurnEvent::Draw(challenge(1))).unwrap_err();
        assert!(matches!(err, PlanError::InvalidTransition(_)));

        assert_eq!(
            apply(&mut sm, TurnEvent::StopTransit { coins_after: 8.0 }),
            TurnPhase::Idle
        );
    }

    #[test]
    fn draw_refused_with_active_challenge() {
        let mut sm = TurnStateMachine::new();
        apply(&mut sm, TurnEvent::Draw(challenge(1)));
        let err = sm.plan(TurnEvent::Draw(challenge(2))).unwrap_err();
        assert!(matches!(err, PlanError::InvalidTransition(_)));
    }

    #[test]
    fn plan_then_abort_leaves_phase_unchanged() {
        let mut sm = TurnStateMachine::new();
        let plan = sm.plan(TurnEvent::Draw(challenge(1))).unwrap();
        sm.abort(plan.id).unwrap();
        assert_eq!(sm.phase(), TurnPhase::Idle);
        assert!(sm.pending.is_none());
    }

    #[test]
    fn second_plan_refused_while_pending() {
        let mut sm = TurnStateMachine::new();
        let _plan = sm.plan(TurnEvent::Draw(challenge(1))).unwrap();
        let err = sm.plan(TurnEvent::Pass).unwrap_err();
        assert_eq!(err, PlanError::AlreadyPending);
    }

    #[test]
    fn apply_with_wrong_id_keeps_pending() {
        let mut sm = TurnStateMachine::new();
        let plan = sm.plan(TurnEvent::Draw(challenge(1))).unwrap();
        let err = sm.apply(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, ApplyError::IdMismatch { .. }));
        assert!(sm.pending.is_some());
        sm.apply(plan.id).unwrap();
    }
}
