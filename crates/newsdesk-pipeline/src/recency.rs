//! Recency bonus and composite ranking shared by both filter stages.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

/// Bonus for an item published within the last hour.
pub const MAX_RECENCY_BONUS: f32 = 15.0;

/// `(max age in minutes, bonus)`, checked in order.
const RECENCY_STEPS: &[(i64, f32)] = &[
    (60, MAX_RECENCY_BONUS),
    (3 * 60, 10.0),
    (6 * 60, 6.0),
    (12 * 60, 3.0),
    (24 * 60, 1.0),
];

/// Step-decaying bonus for fresh items.
///
/// | age         | bonus |
/// |-------------|-------|
/// | ≤ 1 h       | 15    |
/// | ≤ 3 h       | 10    |
/// | ≤ 6 h       | 6     |
/// | ≤ 12 h      | 3     |
/// | ≤ 24 h      | 1     |
/// | older       | 0     |
///
/// Unknown publication time earns nothing; a timestamp in the future counts
/// as age zero.
#[must_use]
pub fn recency_bonus(published_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f32 {
    let Some(published_at) = published_at else {
        return 0.0;
    };
    let age = now.signed_duration_since(published_at);
    // Compare in seconds so 60m 30s is no longer "within the hour".
    let age_secs = age.num_seconds().max(0);
    RECENCY_STEPS
        .iter()
        .find(|(max_minutes, _)| age_secs <= max_minutes * 60)
        .map_or(0.0, |(_, bonus)| *bonus)
}

/// Sort `items` by `score + recency_bonus`, best first.
///
/// Ties go to the more recently published item, then to input order.
pub(crate) fn rank_by_composite<T>(
    items: Vec<T>,
    now: DateTime<Utc>,
    score: impl Fn(&T) -> f32,
    published_at: impl Fn(&T) -> Option<DateTime<Utc>>,
) -> Vec<T> {
    let mut keyed: Vec<(f32, Option<DateTime<Utc>>, T)> = items
        .into_iter()
        .map(|item| {
            let published = published_at(&item);
            (score(&item) + recency_bonus(published, now), published, item)
        })
        .collect();

    // Stable sort keeps input order for full ties.
    keyed.sort_by(|a, b| {
        b.0.total_cmp(&a.0).then_with(|| match (a.1, b.1) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
    });
    keyed.into_iter().map(|(_, _, item)| item).collect()
}
