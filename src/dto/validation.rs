//! Parsing helpers for the form-encoded admin endpoints.

use crate::dao::models::Role;

/// Parse a form role value.
///
/// `runner` and `chaser` select a role, `none` explicitly clears it, and
/// anything else is rejected as unknown.
pub fn parse_role(value: &str) -> Option<Option<Role>> {
    match value {
        "runner" => Some(Some(Role::Runner)),
        "chaser" => Some(Some(Role::Chaser)),
        "none" => Some(None),
        _ => None,
    }
}

/// Parse a coins form value, treating unparsable or zero input as absent,
/// mirroring how the admin forms historically coerced their numbers.
pub fn parse_nonzero_coins(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|coins| *coins != 0.0)
}
