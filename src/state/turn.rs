use rand::{Rng, seq::IndexedRandom};
use time::OffsetDateTime;

use crate::dao::models::{ChallengeEntity, Role, TeamEntity};

/// Runtime representation of a team participating in the hunt.
#[derive(Debug, Clone, PartialEq)]
pub struct Team {
    /// Stable identifier for the team.
    pub id: i64,
    /// Display name chosen for the team.
    pub name: String,
    /// Transit credit in fractional minutes. A team without a recorded
    /// balance plays as if it had zero.
    pub coins: f64,
    /// Identifier of the drawn challenge persisted by a previous session.
    pub current_challenge: Option<i64>,
    /// Ordered ids of completed challenges; duplicates are possible.
    pub challenges_completed: Vec<i64>,
    /// Gameplay role, if the team has been assigned one.
    pub role: Option<Role>,
    /// End of an active veto cooldown, if one is being served.
    pub veto_until: Option<OffsetDateTime>,
}

/// Immutable reference data describing a single challenge.
#[derive(Debug, Clone, PartialEq)]
pub struct Challenge {
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
    /// Curse flag carried from the reference data; not used by turn logic.
    pub is_curse: bool,
}

/// Data captured when a transit countdown starts, settled on stop.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitRun {
    /// Wall-clock instant the countdown started.
    pub started_at: OffsetDateTime,
    /// Coin balance when the countdown started.
    pub coins_at_start: f64,
}

impl From<TeamEntity> for Team {
    fn from(value: TeamEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            coins: value.coins.unwrap_or(0.0),
            current_challenge: value.current_challenge,
            challenges_completed: value.challenges_completed,
            role: value.role,
            veto_until: value.veto_until,
        }
    }
}

impl From<ChallengeEntity> for Challenge {
    fn from(value: ChallengeEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            description: value.description,
            min_coins: value.min_coins,
            max_coins: value.max_coins,
            is_curse: value.is_curse,
        }
    }
}

impl Challenge {
    /// Whether a reward value lies in the challenge's inclusive range.
    pub fn reward_in_range(&self, winnable: i64) -> bool {
        (self.min_coins..=self.max_coins).contains(&winnable)
    }

    /// Clamp a requested reward to the challenge's range, defaulting to the
    /// minimum when no value was given.
    pub fn clamp_reward(&self, winnable: Option<i64>) -> i64 {
        winnable
            .map(|value| value.clamp(self.min_coins, self.max_coins))
            .unwrap_or(self.min_coins)
    }
}

/// Pick a challenge uniformly at random among the eligible set.
pub fn pick_challenge<'a, R>(eligible: &'a [Challenge], rng: &mut R) -> Option<&'a Challenge>
where
    R: Rng + ?Sized,
{
    eligible.choose(rng)
}

/// Settle a transit countdown: subtract the elapsed wall-clock minutes from
/// the starting balance and round down to the nearest whole coin.
///
/// The burn never rounds in the player's favor and the result is not clamped
/// at zero, so a countdown left running too long persists a negative balance.
pub fn transit_burn(coins_at_start: f64, elapsed: time::Duration) -> f64 {
    let minutes = elapsed.as_seconds_f64() / 60.0;
    (coins_at_start - minutes).floor()
}

/// Render `[label](url)` spans in a challenge description to HTML anchors,
/// matching what the web client displayed.
pub fn render_description_links(description: &str) -> String {
    let mut out = String::with_capacity(description.len());
    let mut rest = description;

    while let Some((before, label, url, after)) = next_link(rest) {
        out.push_str(before);
        out.push_str("<a target=\"_blank\" href=\"");
        out.push_str(url);
        out.push_str("\">");
        out.push_str(label);
        out.push_str("</a>");
        rest = after;
    }

    out.push_str(rest);
    out
}

/// Locate the next `[label](url)` span, returning the text before it, the
/// two captured parts, and the remaining input.
fn next_link(input: &str) -> Option<(&str, &str, &str, &str)> {
    let open = input.find('[')?;
    let label_end = input[open..].find("](").map(|i| open + i)?;
    let url_start = label_end + 2;
    let url_end = input[url_start..].find(')').map(|i| url_start + i)?;

    let before = &input[..open];
    let label = &input[open + 1..label_end];
    let url = &input[url_start..url_end];
    let after = &input[url_end + 1..];
    Some((before, label, url, after))
}
