use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("{field} must be finite and > 0, got {provided}")]
    InvalidInterval { field: &'static str, provided: f64 },

    #[error("minimum ease factor must be finite and > 0, got {0}")]
    InvalidMinEaseFactor(f64),

    #[error("minimum session size must be > 0")]
    InvalidMinSessionSize,

    #[error("minimum session size ({min}) must be <= maximum session size ({max})")]
    InvalidSessionBounds { min: u32, max: u32 },

    #[error("max reviews per session must be > 0")]
    InvalidMaxReviewPerSession,

    #[error("maximum session size ({max}) must be <= {limit}")]
    SessionTooLarge { max: u32, limit: u32 },
}

//
// ─── SCHEDULER SETTINGS ────────────────────────────────────────────────────────
//

/// Tuning for the SM-2 style scheduler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerSettings {
    first_interval_days: f64,
    second_interval_days: f64,
    incorrect_interval_days: f64,
    min_ease_factor: f64,
}

impl SchedulerSettings {
    /// Creates custom scheduler settings.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if an interval or the ease floor is not a
    /// positive finite number.
    pub fn new(
        first_interval_days: f64,
        second_interval_days: f64,
        incorrect_interval_days: f64,
        min_ease_factor: f64,
    ) -> Result<Self, SettingsError> {
        for (field, provided) in [
            ("first interval", first_interval_days),
            ("second interval", second_interval_days),
            ("incorrect interval", incorrect_interval_days),
        ] {
            if !provided.is_finite() || provided <= 0.0 {
                return Err(SettingsError::InvalidInterval { field, provided });
            }
        }
        if !min_ease_factor.is_finite() || min_ease_factor <= 0.0 {
            return Err(SettingsError::InvalidMinEaseFactor(min_ease_factor));
        }

        Ok(Self {
            first_interval_days,
            second_interval_days,
            incorrect_interval_days,
            min_ease_factor,
        })
    }

    #[must_use]
    pub fn first_interval_days(&self) -> f64 {
        self.first_interval_days
    }

    #[must_use]
    pub fn second_interval_days(&self) -> f64 {
        self.second_interval_days
    }

    #[must_use]
    pub fn incorrect_interval_days(&self) -> f64 {
        self.incorrect_interval_days
    }

    #[must_use]
    pub fn min_ease_factor(&self) -> f64 {
        self.min_ease_factor
    }
}

impl Default for SchedulerSettings {
    /// 1 day, then 3 days, 6 hours after a miss, ease floor 1.3.
    fn default() -> Self {
        Self {
            first_interval_days: 1.0,
            second_interval_days: 3.0,
            incorrect_interval_days: 0.25,
            min_ease_factor: 1.3,
        }
    }
}

//
// ─── SESSION SETTINGS ──────────────────────────────────────────────────────────
//

/// Upper bound for `max_size`. Pool queries bind every already selected id,
/// which must stay well under SQLite's bound-parameter limit.
pub const MAX_SESSION_SIZE: u32 = 1000;

/// Size limits for a practice session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    default_size: u32,
    min_size: u32,
    max_size: u32,
    max_review_per_session: u32,
}

impl SessionSettings {
    /// Creates custom session settings.
    ///
    /// `default_size` may fall outside `[min_size, max_size]`; it is clamped
    /// like any requested size.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if `min_size` is zero or exceeds `max_size`,
    /// if `max_size` exceeds [`MAX_SESSION_SIZE`], or if
    /// `max_review_per_session` is zero.
    pub fn new(
        default_size: u32,
        min_size: u32,
        max_size: u32,
        max_review_per_session: u32,
    ) -> Result<Self, SettingsError> {
        if min_size == 0 {
            return Err(SettingsError::InvalidMinSessionSize);
        }
        if min_size > max_size {
            return Err(SettingsError::InvalidSessionBounds {
                min: min_size,
                max: max_size,
            });
        }
        if max_size > MAX_SESSION_SIZE {
            return Err(SettingsError::SessionTooLarge {
                max: max_size,
                limit: MAX_SESSION_SIZE,
            });
        }
        if max_review_per_session == 0 {
            return Err(SettingsError::InvalidMaxReviewPerSession);
        }

        Ok(Self {
            default_size,
            min_size,
            max_size,
            max_review_per_session,
        })
    }

    #[must_use]
    pub fn default_size(&self) -> u32 {
        self.default_size
    }

    #[must_use]
    pub fn min_size(&self) -> u32 {
        self.min_size
    }

    #[must_use]
    pub fn max_size(&self) -> u32 {
        self.max_size
    }

    #[must_use]
    pub fn max_review_per_session(&self) -> u32 {
        self.max_review_per_session
    }

    /// Resolve the session size: the request (or the default) clamped to
    /// `[min_size, max_size]`.
    #[must_use]
    pub fn clamp_size(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.default_size)
            .clamp(self.min_size, self.max_size)
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            default_size: 15,
            min_size: 5,
            max_size: 20,
            max_review_per_session: 10,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
