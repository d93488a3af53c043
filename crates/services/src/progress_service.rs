use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Serialize;

use quiz_core::{
    model::{DailyStats, ReviewTotals, Source, SourceId, rounded_percent},
    time::Clock,
};
use storage::repository::{DailyStatsRepository, ProgressQueries, SourceRepository, StorageError};

use crate::error::ProgressError;

// Roughly ten years of daily rows; a streak cannot outrun the rows loaded.
const STREAK_LOOKBACK_DAYS: u32 = 3650;

/// Days shown by the streak calendar.
pub const CALENDAR_DAYS: u32 = 90;

/// Days listed by the recent-activity report.
pub const ACTIVITY_DAYS: u32 = 30;

//
// ─── REPORTS ───────────────────────────────────────────────────────────────────
//

/// Totals reported back after a session is completed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub questions_answered: u32,
    pub questions_correct: u32,
    /// Percent correct, rounded to one decimal place.
    pub accuracy: f64,
    /// Consecutive days, ending today, with at least one completed session.
    pub streak: u32,
}

/// Whole-bank progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressOverview {
    pub total_sources: usize,
    pub total_questions: u32,
    pub questions_seen: u32,
    pub mastery_percentage: f64,
    pub current_streak: u32,
    pub total_correct: u64,
    pub total_incorrect: u64,
}

/// Mastery of the questions generated from one source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceMastery {
    pub source_id: SourceId,
    pub title: String,
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub total_questions: u32,
    pub questions_mastered: u32,
    pub mastery_percentage: f64,
}

impl SourceMastery {
    fn new(source: Source, totals: ReviewTotals) -> Self {
        Self {
            source_id: source.id,
            title: source.title,
            url: source.url,
            created_at: source.created_at,
            total_questions: totals.questions,
            questions_mastered: totals.mastered,
            mastery_percentage: totals.mastery_percentage(),
        }
    }
}

/// One day of recorded practice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayActivity {
    pub date: NaiveDate,
    pub questions_answered: u32,
    pub questions_correct: u32,
    pub accuracy: f64,
}

impl From<&DailyStats> for DayActivity {
    fn from(day: &DailyStats) -> Self {
        Self {
            date: day.date,
            questions_answered: day.questions_answered,
            questions_correct: day.questions_correct,
            accuracy: day.accuracy(),
        }
    }
}

/// Current and best day streaks plus the recent calendar, newest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreakReport {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub calendar: Vec<DayActivity>,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Records completed sessions and reports learning progress.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    stats: Arc<dyn DailyStatsRepository>,
    sources: Arc<dyn SourceRepository>,
    totals: Arc<dyn ProgressQueries>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        stats: Arc<dyn DailyStatsRepository>,
        sources: Arc<dyn SourceRepository>,
        totals: Arc<dyn ProgressQueries>,
    ) -> Self {
        Self {
            clock,
            stats,
            sources,
            totals,
        }
    }

    fn today(&self) -> NaiveDate {
        self.clock.now().date_naive()
    }

    /// Recorded days within the last `span` calendar days, newest first.
    async fn days_within(&self, span: u32) -> Result<Vec<DailyStats>, ProgressError> {
        let today = self.today();
        let cutoff = today.checked_sub_days(Days::new(u64::from(span)));
        let mut days = self.stats.recent_days(span).await?;
        days.retain(|d| cutoff.is_none_or(|c| d.date > c) && d.date <= today);
        Ok(days)
    }

    async fn current_streak(&self, today: NaiveDate) -> Result<u32, ProgressError> {
        let days = self.stats.recent_days(STREAK_LOOKBACK_DAYS).await?;
        Ok(DailyStats::streak_ending(&days, today))
    }

    /// Fold a finished session into today's totals and report the summary.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::InvalidCounts` when `correct > answered`, or a
    /// storage error if persistence fails.
    pub async fn complete_session(
        &self,
        answered: u32,
        correct: u32,
    ) -> Result<SessionSummary, ProgressError> {
        if correct > answered {
            return Err(ProgressError::InvalidCounts { answered, correct });
        }

        let today = self.today();
        self.stats.record_session(today, answered, correct).await?;
        let streak = self.current_streak(today).await?;

        tracing::info!(answered, correct, streak, %today, "session completed");

        Ok(SessionSummary {
            questions_answered: answered,
            questions_correct: correct,
            accuracy: rounded_percent(u64::from(correct), u64::from(answered)),
            streak,
        })
    }

    /// Totals across every source.
    ///
    /// # Errors
    ///
    /// Returns a storage error if a query fails.
    pub async fn overview(&self) -> Result<ProgressOverview, ProgressError> {
        let sources = self.sources.list_sources().await?;
        let totals = self.totals.review_totals(None).await?;
        let current_streak = self.current_streak(self.today()).await?;

        Ok(ProgressOverview {
            total_sources: sources.len(),
            total_questions: totals.questions,
            questions_seen: totals.seen,
            mastery_percentage: totals.mastery_percentage(),
            current_streak,
            total_correct: totals.times_correct,
            total_incorrect: totals.times_incorrect,
        })
    }

    /// Mastery for a single source.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::SourceNotFound` for an unknown id, or a storage
    /// error if a query fails.
    pub async fn source_mastery(&self, id: SourceId) -> Result<SourceMastery, ProgressError> {
        let source = self.sources.get_source(id).await.map_err(|e| match e {
            StorageError::NotFound => ProgressError::SourceNotFound(id),
            other => other.into(),
        })?;
        let totals = self.totals.review_totals(Some(id)).await?;
        Ok(SourceMastery::new(source, totals))
    }

    /// Every source with its mastery, newest source first.
    ///
    /// # Errors
    ///
    /// Returns a storage error if a query fails.
    pub async fn list_sources(&self) -> Result<Vec<SourceMastery>, ProgressError> {
        let sources = self.sources.list_sources().await?;
        let mut out = Vec::with_capacity(sources.len());
        for source in sources {
            let totals = self.totals.review_totals(Some(source.id)).await?;
            out.push(SourceMastery::new(source, totals));
        }
        Ok(out)
    }

    /// Current and longest streak within the last [`CALENDAR_DAYS`] days.
    ///
    /// # Errors
    ///
    /// Returns a storage error if a query fails.
    pub async fn streak_report(&self) -> Result<StreakReport, ProgressError> {
        let days = self.days_within(CALENDAR_DAYS).await?;
        let current_streak = DailyStats::streak_ending(&days, self.today());
        let longest_streak = DailyStats::longest_streak(&days).max(current_streak);

        Ok(StreakReport {
            current_streak,
            longest_streak,
            calendar: days.iter().map(DayActivity::from).collect(),
        })
    }

    /// Practice within the last [`ACTIVITY_DAYS`] days, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn recent_activity(&self) -> Result<Vec<DayActivity>, ProgressError> {
        let days = self.days_within(ACTIVITY_DAYS).await?;
        Ok(days.iter().map(DayActivity::from).collect())
    }
}
