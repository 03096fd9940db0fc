//! DTO definitions for the runner-facing turn API.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use validator::Validate;

use crate::dto::common::TurnSnapshot;

/// Reward claimed when completing the active challenge.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CompleteRequest {
    /// Coins won, inside the active challenge's `[min_coins, max_coins]` range.
    #[validate(range(min = 0))]
    pub winnable: i64,
}

/// Result of a draw attempt.
///
/// `exhausted` marks the terminal condition where every challenge has been
/// completed; the turn is unchanged and no challenge is returned.
#[derive(Debug, Serialize, ToSchema)]
pub struct DrawResponse {
    pub exhausted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn: Option<TurnSnapshot>,
}

impl DrawResponse {
    /// A draw that produced (or resumed) a challenge.
    pub fn drawn(turn: TurnSnapshot) -> Self {
        Self {
            exhausted: false,
            turn: Some(turn),
        }
    }

    /// The eligible set was empty.
    pub fn exhausted() -> Self {
        Self {
            exhausted: true,
            turn: None,
        }
    }
}

/// Response returned when a veto cooldown starts or is re-observed.
#[derive(Debug, Serialize, ToSchema)]
pub struct VetoResponse {
    /// End of the cooldown window.
    #[serde(with = "time::serde::rfc3339")]
    pub until: OffsetDateTime,
    /// Remaining cooldown rendered as `MM:SS`.
    pub remaining: String,
}
