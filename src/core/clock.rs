//! core::clock
//!
//! Time source for key dating and metadata timestamps.
//!
//! Stores and the build pipeline never call `Utc::now()` directly. They read
//! the time through a [`Clock`] so tests can pin or advance the calendar day
//! and exercise day-bucketing deterministically.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, Utc};

/// A source of the current time.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;

    /// The current UTC calendar day.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A manually controlled clock for tests.
///
/// # Example
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use gozer::core::clock::{Clock, FixedClock};
///
/// let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 31, 23, 0, 0).unwrap());
/// assert_eq!(clock.today().to_string(), "2024-01-31");
///
/// clock.advance_days(1);
/// assert_eq!(clock.today().to_string(), "2024-02-01");
/// ```
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    /// Create a clock frozen at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Move the clock to `now`.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    /// Move the clock forward by whole days.
    pub fn advance_days(&self, days: i64) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += Duration::days(days);
    }

    /// Move the clock forward by seconds.
    pub fn advance_secs(&self, secs: i64) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += Duration::seconds(secs);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Format an instant the way metadata records carry it (RFC 3339, seconds).
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamp_has_second_precision() {
        let at = Utc.with_ymd_and_hms(2017, 6, 5, 14, 3, 9).unwrap();
        assert_eq!(format_timestamp(at), "2017-06-05T14:03:09Z");
    }

    #[test]
    fn fixed_clock_set_and_advance() {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        clock.advance_secs(90);
        assert_eq!(format_timestamp(clock.now()), "2024-01-01T00:01:30Z");

        clock.set(Utc.with_ymd_and_hms(2030, 5, 5, 5, 5, 5).unwrap());
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2030, 5, 5).unwrap());
    }

    #[test]
    fn system_clock_today_matches_now() {
        let clock = SystemClock;
        let today = clock.today();
        assert!(today >= clock.now().date_naive() - Duration::days(1));
    }
}
