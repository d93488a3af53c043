use chrono::{Days, NaiveDate};

use crate::model::review::ReviewRecord;

/// `part / whole` as a percentage rounded to one decimal; 0 for an empty whole.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn rounded_percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    let pct = part as f64 / whole as f64 * 100.0;
    (pct * 10.0).round() / 10.0
}

/// Per-day totals of completed practice sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub questions_answered: u32,
    pub questions_correct: u32,
    pub session_count: u32,
}

impl DailyStats {
    #[must_use]
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            questions_answered: 0,
            questions_correct: 0,
            session_count: 0,
        }
    }

    /// Fold one completed session into the day.
    pub fn record_session(&mut self, answered: u32, correct: u32) {
        self.questions_answered = self.questions_answered.saturating_add(answered);
        self.questions_correct = self.questions_correct.saturating_add(correct);
        self.session_count = self.session_count.saturating_add(1);
    }

    /// Percent of the day's answers that were correct.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        rounded_percent(
            u64::from(self.questions_correct),
            u64::from(self.questions_answered),
        )
    }

    /// Count consecutive days ending at `today` that have a recorded session.
    ///
    /// `days` must be sorted newest first. A gap, or no entry for today,
    /// ends the streak.
    #[must_use]
    pub fn streak_ending(days: &[DailyStats], today: NaiveDate) -> u32 {
        let mut streak = 0;
        let mut expected = Some(today);
        for day in days {
            match expected {
                Some(date) if day.date == date => {
                    streak += 1;
                    expected = date.checked_sub_days(Days::new(1));
                }
                _ => break,
            }
        }
        streak
    }

    /// Longest run of consecutive calendar days among `days`, in any order.
    #[must_use]
    pub fn longest_streak(days: &[DailyStats]) -> u32 {
        let mut dates: Vec<NaiveDate> = days.iter().map(|d| d.date).collect();
        dates.sort_unstable();
        dates.dedup();

        let mut longest = 0;
        let mut run = 0;
        let mut previous: Option<NaiveDate> = None;
        for date in dates {
            let follows = previous
                .and_then(|p| p.checked_add_days(Days::new(1)))
                .is_some_and(|next| next == date);
            run = if follows { run + 1 } else { 1 };
            longest = longest.max(run);
            previous = Some(date);
        }
        longest
    }
}

//
// ─── REVIEW TOTALS ─────────────────────────────────────────────────────────────
//

/// Aggregated review counters over a set of questions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewTotals {
    pub questions: u32,
    /// Answered at least once.
    pub seen: u32,
    pub mastered: u32,
    pub times_correct: u64,
    pub times_incorrect: u64,
}

impl ReviewTotals {
    /// Fold one question's record into the totals.
    pub fn add(&mut self, record: &ReviewRecord) {
        self.questions = self.questions.saturating_add(1);
        if !record.is_unseen() {
            self.seen = self.seen.saturating_add(1);
        }
        if record.is_mastered() {
            self.mastered = self.mastered.saturating_add(1);
        }
        self.times_correct += u64::from(record.times_correct);
        self.times_incorrect += u64::from(record.times_incorrect);
    }

    #[must_use]
    pub fn mastery_percentage(&self) -> f64 {
        rounded_percent(u64::from(self.mastered), u64::from(self.questions))
    }
}

impl<'a> FromIterator<&'a ReviewRecord> for ReviewTotals {
    fn from_iter<I: IntoIterator<Item = &'a ReviewRecord>>(iter: I) -> Self {
        let mut totals = Self::default();
        for record in iter {
            totals.add(record);
        }
        totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> DailyStats {
        let mut s = DailyStats::new(NaiveDate::from_ymd_opt(y, m, d).unwrap());
        s.record_session(5, 4);
        s
    }

    #[test]
    fn record_session_accumulates() {
        let mut s = day(2024, 1, 1);
        s.record_session(10, 3);
        assert_eq!(s.questions_answered, 15);
        assert_eq!(s.questions_correct, 7);
        assert_eq!(s.session_count, 2);
    }

    #[test]
    fn streak_counts_consecutive_days() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let days = vec![day(2024, 3, 1), day(2024, 2, 29), day(2024, 2, 28), day(2024, 2, 26)];
        assert_eq!(DailyStats::streak_ending(&days, today), 3);
    }

    #[test]
    fn longest_streak_finds_best_run() {
        let days = vec![
            day(2024, 3, 1),
            day(2024, 2, 20),
            day(2024, 2, 28),
            day(2024, 2, 21),
            day(2024, 2, 29),
            day(2024, 2, 22),
            day(2024, 2, 27),
        ];
        // 02-27..03-01 across the leap day beats 02-20..02-22.
        assert_eq!(DailyStats::longest_streak(&days), 4);
        assert_eq!(DailyStats::longest_streak(&[]), 0);
        assert_eq!(DailyStats::longest_streak(&[day(2024, 1, 1)]), 1);
    }

    #[test]
    fn accuracy_rounds_to_one_decimal() {
        assert_eq!(day(2024, 1, 1).accuracy(), 80.0);
        assert_eq!(DailyStats::new(NaiveDate::MIN).accuracy(), 0.0);
        assert_eq!(rounded_percent(2, 3), 66.7);
        assert_eq!(rounded_percent(1, 3), 33.3);
    }

    #[test]
    fn review_totals_count_seen_and_mastered() {
        use crate::model::QuestionId;
        use crate::time::fixed_now;

        let fresh = ReviewRecord::new(QuestionId::new(1), fixed_now());
        let mut learning = ReviewRecord::new(QuestionId::new(2), fixed_now());
        learning.last_reviewed_at = Some(fixed_now());
        learning.repetitions = 1;
        learning.times_correct = 2;
        learning.times_incorrect = 1;
        let mut mastered = learning.clone();
        mastered.question_id = QuestionId::new(3);
        mastered.repetitions = 4;
        mastered.times_correct = 4;
        mastered.times_incorrect = 0;

        let totals: ReviewTotals = [&fresh, &learning, &mastered].into_iter().collect();
        assert_eq!(
            totals,
            ReviewTotals {
                questions: 3,
                seen: 2,
                mastered: 1,
                times_correct: 6,
                times_incorrect: 1,
            }
        );
        assert_eq!(totals.mastery_percentage(), 33.3);
        assert_eq!(ReviewTotals::default().mastery_percentage(), 0.0);
    }

    #[test]
    fn streak_is_zero_without_today() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let days = vec![day(2024, 3, 1)];
        assert_eq!(DailyStats::streak_ending(&days, today), 0);
        assert_eq!(DailyStats::streak_ending(&[], today), 0);
    }
}
