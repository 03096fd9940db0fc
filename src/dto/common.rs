use serde::Serialize;
use time::OffsetDateTime;
use utoipa::ToSchema;

use crate::{
    state::{TurnPhase, turn::{Challenge, Team}},
    timer::format_time,
};

/// Client-facing name of the current turn phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VisibleTurnPhase {
    Idle,
    ChallengeActive,
    Vetoed,
    Transit,
}

impl From<&TurnPhase> for VisibleTurnPhase {
    fn from(phase: &TurnPhase) -> Self {
        match phase {
            TurnPhase::Idle => VisibleTurnPhase::Idle,
            TurnPhase::ChallengeActive(_) => VisibleTurnPhase::ChallengeActive,
            TurnPhase::Vetoed { .. } => VisibleTurnPhase::Vetoed,
            TurnPhase::Transit(_) => VisibleTurnPhase::Transit,
        }
    }
}

/// Snapshot of a challenge as shown to a runner.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ChallengeSnapshot {
    pub id: i64,
    pub name: String,
    /// Description with `[label](url)` spans rendered to anchors.
    pub description: String,
    pub min_coins: i64,
    pub max_coins: i64,
    pub is_curse: bool,
}

impl From<&Challenge> for ChallengeSnapshot {
    fn from(challenge: &Challenge) -> Self {
        Self {
            id: challenge.id,
            name: challenge.name.clone(),
            description: crate::state::turn::render_description_links(&challenge.description),
            min_coins: challenge.min_coins,
            max_coins: challenge.max_coins,
            is_curse: challenge.is_curse,
        }
    }
}

/// Shared snapshot describing a team's current turn and related context.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TurnSnapshot {
    pub team_id: i64,
    pub phase: VisibleTurnPhase,
    /// Transit credit in minutes.
    pub coins: f64,
    /// True while the transit coin burn is running; challenge actions must
    /// stay disabled in the client while set.
    pub transit: bool,
    /// Present while a challenge is drawn.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge: Option<ChallengeSnapshot>,
    /// Present while a veto cooldown runs.
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub veto_until: Option<OffsetDateTime>,
    /// Remaining cooldown rendered as `MM:SS`; present while vetoed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub veto_remaining: Option<String>,
    /// Ordered ids of completed challenges.
    pub challenges_completed: Vec<i64>,
}

impl TurnSnapshot {
    /// Merge the persisted team data with the in-memory phase.
    pub fn from_parts(team: &Team, phase: &TurnPhase) -> Self {
        let (challenge, veto_until) = match phase {
            TurnPhase::ChallengeActive(challenge) => (Some(challenge.into()), None),
            TurnPhase::Vetoed { until } => (None, Some(*until)),
            _ => (None, None),
        };

        let veto_remaining = veto_until.map(|until| {
            let remaining = (until - OffsetDateTime::now_utc()).whole_seconds().max(0);
            format_time(remaining as f64, 2)
        });

        Self {
            team_id: team.id,
            phase: phase.into(),
            coins: team.coins,
            transit: matches!(phase, TurnPhase::Transit(_)),
            challenge,
            veto_until,
            veto_remaining,
            challenges_completed: team.challenges_completed.clone(),
        }
    }
}
