//! Wall clock used by views

use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Source of the current time as unix seconds
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Clock reading the system time
#[must_use]
pub fn system_clock() -> Clock {
    Arc::new(|| Utc::now().timestamp())
}

/// Clock frozen at `now`
#[must_use]
pub fn fixed_clock(now: i64) -> Clock {
    Arc::new(move || now)
}

/// Calendar date of a unix timestamp (`YYYY-MM-DD`)
#[must_use]
pub fn format_date(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map_or_else(|| timestamp.to_string(), |at| at.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_is_frozen() {
        let clock = fixed_clock(42);
        assert_eq!(clock(), 42);
        assert_eq!(clock(), 42);
    }

    #[test]
    fn formats_dates() {
        assert_eq!(format_date(1_700_000_000), "2023-11-14");
        assert_eq!(format_date(0), "1970-01-01");
    }
}
