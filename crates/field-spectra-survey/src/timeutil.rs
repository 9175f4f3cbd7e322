//! Timestamp matching helpers.

use chrono::{DateTime, Utc};

/// Nearest timestamp to `target` and the signed distance in minutes.
///
/// The distance keeps the sign of `nearest - target`; callers compare it
/// against half the match window.
pub fn nearest_datetime(
    candidates: &[DateTime<Utc>],
    target: DateTime<Utc>,
) -> Option<(DateTime<Utc>, f64)> {
    let nearest = candidates
        .iter()
        .copied()
        .min_by_key(|t| (*t - target).num_milliseconds().abs())?;
    let delta_min = (nearest - target).num_milliseconds() as f64 / 60_000.0;
    Some((nearest, delta_min))
}
