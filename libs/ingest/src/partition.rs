use chrono::{DateTime, Utc};

use feed_api::Partition;

const SECONDS_PER_DAY: i64 = 86_400;

/// Whole UTC days since 1970-01-01, floored (pre-epoch instants are negative).
pub fn days_since_epoch(instant: DateTime<Utc>) -> i64 {
    instant.timestamp().div_euclid(SECONDS_PER_DAY)
}

/// Выбрать партицию по чётности дня создания события.
pub fn route(instant: DateTime<Utc>) -> Partition {
    if days_since_epoch(instant).rem_euclid(2) == 0 {
        Partition::Even
    } else {
        Partition::Odd
    }
}
