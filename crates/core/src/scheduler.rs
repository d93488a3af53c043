use chrono::{DateTime, Utc};

use crate::model::ReviewRecord;
use crate::settings::SchedulerSettings;
use crate::time::add_days;

//
// ─── ANSWER QUALITY ────────────────────────────────────────────────────────────
//

/// Two-level projection of the classic 0–5 SM-2 quality scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerQuality {
    /// Correct answer, quality 4.
    Correct,
    /// Incorrect answer, quality 1.
    Incorrect,
}

impl AnswerQuality {
    #[must_use]
    pub fn from_correct(is_correct: bool) -> Self {
        if is_correct {
            Self::Correct
        } else {
            Self::Incorrect
        }
    }

    /// Numeric SM-2 quality.
    #[must_use]
    pub fn value(self) -> u8 {
        match self {
            AnswerQuality::Correct => 4,
            AnswerQuality::Incorrect => 1,
        }
    }

    /// SM-2 ease adjustment: `0.1 - (5 - q) * (0.08 + (5 - q) * 0.02)`.
    ///
    /// Exactly zero for `Correct`, -0.54 for `Incorrect`.
    #[must_use]
    pub fn ease_delta(self) -> f64 {
        let miss = f64::from(5 - self.value());
        0.1 - miss * (0.08 + miss * 0.02)
    }
}

/// Longest interval a correct answer can produce, about a century.
///
/// Keeps `interval_days * ease_factor` from growing without bound.
pub const MAX_INTERVAL_DAYS: f64 = 36_500.0;

//
// ─── SCHEDULER ─────────────────────────────────────────────────────────────────
//

/// SM-2 style scheduler driven by correct/incorrect answers.
///
/// `advance` is total and pure: it never fails and leaves persistence to
/// the caller.
///
/// # Examples
///
/// ```
/// # use quiz_core::scheduler::Scheduler;
/// # use quiz_core::model::{QuestionId, ReviewRecord};
/// # use quiz_core::time::fixed_now;
/// let scheduler = Scheduler::default();
/// let record = ReviewRecord::new(QuestionId::new(1), fixed_now());
///
/// let next = scheduler.advance(&record, true, fixed_now());
/// assert_eq!(next.repetitions, 1);
/// assert_eq!(next.interval_days, 1.0);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Scheduler {
    settings: SchedulerSettings,
}

impl Scheduler {
    #[must_use]
    pub fn new(settings: SchedulerSettings) -> Self {
        Self { settings }
    }

    #[must_use]
    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// Apply one answer to `record` at time `now` and return the new record.
    ///
    /// The next review is scheduled from `now`, not from the previously
    /// scheduled time, so early or late answers shift the whole schedule.
    #[must_use]
    pub fn advance(&self, record: &ReviewRecord, is_correct: bool, now: DateTime<Utc>) -> ReviewRecord {
        let quality = AnswerQuality::from_correct(is_correct);
        let mut next = record.clone();

        match quality {
            AnswerQuality::Correct => {
                next.times_correct = next.times_correct.saturating_add(1);
                next.streak = next.streak.saturating_add(1);
                next.interval_days = match record.repetitions {
                    0 => self.settings.first_interval_days(),
                    1 => self.settings.second_interval_days(),
                    _ => record.interval_days * record.ease_factor,
                }
                .min(MAX_INTERVAL_DAYS);
                next.repetitions = next.repetitions.saturating_add(1);
            }
            AnswerQuality::Incorrect => {
                next.times_incorrect = next.times_incorrect.saturating_add(1);
                next.streak = 0;
                next.repetitions = 0;
                next.interval_days = self.settings.incorrect_interval_days();
            }
        }

        next.ease_factor = self
            .settings
            .min_ease_factor()
            .max(record.ease_factor + quality.ease_delta());

        next.last_reviewed_at = Some(now);
        next.next_review_at = add_days(now, next.interval_days);
        next
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionId;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn fresh() -> ReviewRecord {
        ReviewRecord::new(QuestionId::new(1), fixed_now())
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn quality_mapping() {
        assert_eq!(AnswerQuality::from_correct(true).value(), 4);
        assert_eq!(AnswerQuality::from_correct(false).value(), 1);
        assert!(approx(AnswerQuality::Correct.ease_delta(), 0.0));
        assert!(approx(AnswerQuality::Incorrect.ease_delta(), -0.54));
    }

    #[test]
    fn three_correct_answers_follow_interval_ladder() {
        let s = Scheduler::default();
        let mut rec = fresh();
        let mut intervals = Vec::new();
        let mut reps = Vec::new();
        let mut now = fixed_now();

        for _ in 0..3 {
            rec = s.advance(&rec, true, now);
            intervals.push(rec.interval_days);
            reps.push(rec.repetitions);
            assert!(approx(rec.ease_factor, 2.5));
            now += Duration::days(1);
        }

        assert_eq!(reps, vec![1, 2, 3]);
        assert!(approx(intervals[0], 1.0));
        assert!(approx(intervals[1], 3.0));
        assert!(approx(intervals[2], 7.5));
        assert_eq!(rec.streak, 3);
        assert_eq!(rec.times_correct, 3);
    }

    #[test]
    fn incorrect_answer_resets_and_drops_ease() {
        let s = Scheduler::default();
        let mut rec = fresh();
        for _ in 0..3 {
            rec = s.advance(&rec, true, fixed_now());
        }

        let missed = s.advance(&rec, false, fixed_now());
        assert_eq!(missed.repetitions, 0);
        assert_eq!(missed.streak, 0);
        assert!(approx(missed.interval_days, 0.25));
        assert!(approx(missed.ease_factor, 2.5 - 0.54));
        assert_eq!(missed.times_incorrect, 1);
        assert_eq!(missed.times_correct, 3);
    }

    #[test]
    fn ease_never_drops_below_floor() {
        let s = Scheduler::default();
        let mut rec = fresh();
        for i in 0..10 {
            rec = s.advance(&rec, i % 3 == 0, fixed_now());
            assert!(rec.ease_factor >= s.settings().min_ease_factor());
        }
        assert!(approx(rec.ease_factor, 1.3));
    }

    #[test]
    fn schedule_starts_from_answer_time() {
        let s = Scheduler::default();
        let late = fixed_now() + Duration::days(30);

        let rec = s.advance(&fresh(), false, late);
        assert_eq!(rec.last_reviewed_at, Some(late));
        assert_eq!(rec.next_review_at, late + Duration::hours(6));
    }

    #[test]
    fn custom_settings_are_honored() {
        let settings = SchedulerSettings::new(0.5, 2.0, 0.1, 2.0).unwrap();
        let s = Scheduler::new(settings);

        let first = s.advance(&fresh(), true, fixed_now());
        assert!(approx(first.interval_days, 0.5));
        let second = s.advance(&first, true, fixed_now());
        assert!(approx(second.interval_days, 2.0));

        let missed = s.advance(&second, false, fixed_now());
        assert!(approx(missed.ease_factor, 2.0));
        assert!(approx(missed.interval_days, 0.1));
    }

    #[test]
    fn long_correct_runs_stay_bounded() {
        let s = Scheduler::default();
        let mut rec = fresh();
        let mut now = fixed_now();
        for _ in 0..60 {
            rec = s.advance(&rec, true, now);
            assert!(rec.interval_days.is_finite());
            assert!(rec.interval_days <= MAX_INTERVAL_DAYS);
            assert!(rec.next_review_at > now);
            assert!(rec.next_review_at <= crate::time::latest_schedule());
            now += Duration::hours(1);
        }
        assert!(approx(rec.interval_days, MAX_INTERVAL_DAYS));
        assert_eq!(rec.repetitions, 60);
    }

    #[test]
    fn input_record_is_untouched() {
        let s = Scheduler::default();
        let rec = fresh();
        let _ = s.advance(&rec, true, fixed_now());
        assert_eq!(rec, fresh());
    }
}
