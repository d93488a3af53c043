use chrono::{DateTime, Duration, Utc};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// A simple clock abstraction for deterministic time in services and tests.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// Returns a clock that uses the current system time.
    #[must_use]
    pub fn default_clock() -> Self {
        Self::Default
    }

    /// Returns a clock fixed at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// Returns the current time according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// If this is a fixed clock, advance it by the given duration.
    ///
    /// Has no effect on `Clock::Default`.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }
}

/// Convert a fractional day count into a millisecond-precision duration.
///
/// Saturates at `Duration::MAX` for huge or non-finite inputs; negative
/// inputs become zero.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn days_to_duration(days: f64) -> Duration {
    if days.is_nan() || days <= 0.0 {
        return Duration::zero();
    }
    let millis = (days * MILLIS_PER_DAY).round();
    if millis >= i64::MAX as f64 {
        return Duration::MAX;
    }
    Duration::try_milliseconds(millis as i64).unwrap_or(Duration::MAX)
}

/// 9999-12-31T23:59:59Z, the last second with a four-digit year.
pub const LATEST_SCHEDULE_TIMESTAMP: i64 = 253_402_300_799;

/// Upper bound for any scheduled review time.
///
/// Past year 9999 RFC 3339 text gains a `+` prefix and no longer sorts in
/// time order, which breaks text comparisons in storage.
#[must_use]
pub fn latest_schedule() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(LATEST_SCHEDULE_TIMESTAMP, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// `at + days`, saturating at [`latest_schedule`].
#[must_use]
pub fn add_days(at: DateTime<Utc>, days: f64) -> DateTime<Utc> {
    let ceiling = latest_schedule();
    at.checked_add_signed(days_to_duration(days))
        .map_or(ceiling, |t| t.min(ceiling))
}

/// Deterministic timestamp for tests and examples (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` fixed at the deterministic test timestamp.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}
