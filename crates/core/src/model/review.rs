use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::QuestionId;

/// Ease factor every question starts with.
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;

/// Consecutive correct answers after which a question counts as mastered.
pub const MASTERY_REPETITIONS: u32 = 3;

//
// ─── REVIEW RECORD ────────────────────────────────────────────────────────────
//

/// Per-question memory-strength state.
///
/// Created together with its question and only ever replaced by
/// `Scheduler::advance`.
///
/// - `repetitions`: consecutive correct answers since the last reset
/// - `ease_factor`: growth multiplier for successive intervals
/// - `interval_days`: days until the next review, may be fractional
/// - `last_reviewed_at`: `None` until the first answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub question_id: QuestionId,
    pub repetitions: u32,
    pub ease_factor: f64,
    pub interval_days: f64,
    pub next_review_at: DateTime<Utc>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub times_correct: u32,
    pub times_incorrect: u32,
    pub streak: u32,
}

impl ReviewRecord {
    /// Fresh record for a question created at `created_at`.
    ///
    /// `next_review_at` starts at the creation time so the question is
    /// immediately eligible as unseen.
    #[must_use]
    pub fn new(question_id: QuestionId, created_at: DateTime<Utc>) -> Self {
        Self {
            question_id,
            repetitions: 0,
            ease_factor: DEFAULT_EASE_FACTOR,
            interval_days: 0.0,
            next_review_at: created_at,
            last_reviewed_at: None,
            times_correct: 0,
            times_incorrect: 0,
            streak: 0,
        }
    }

    /// Never answered.
    #[must_use]
    pub fn is_unseen(&self) -> bool {
        self.last_reviewed_at.is_none()
    }

    /// Answered before and scheduled at or before `now`.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.is_unseen() && self.next_review_at <= now
    }

    #[must_use]
    pub fn is_mastered(&self) -> bool {
        self.repetitions >= MASTERY_REPETITIONS
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
