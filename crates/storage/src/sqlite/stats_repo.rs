use chrono::NaiveDate;
use quiz_core::model::DailyStats;

use super::{
    SqliteRepository,
    mapping::{db_err, map_stats_row},
};
use crate::repository::{DailyStatsRepository, StorageError};

#[async_trait::async_trait]
impl DailyStatsRepository for SqliteRepository {
    async fn record_session(
        &self,
        date: NaiveDate,
        answered: u32,
        correct: u32,
    ) -> Result<DailyStats, StorageError> {
        let row = sqlx::query(
            r"
            INSERT INTO daily_stats (date, questions_answered, questions_correct, session_count)
            VALUES (?1, ?2, ?3, 1)
            ON CONFLICT(date) DO UPDATE SET
                questions_answered = questions_answered + excluded.questions_answered,
                questions_correct = questions_correct + excluded.questions_correct,
                session_count = session_count + 1
            RETURNING date, questions_answered, questions_correct, session_count
            ",
        )
        .bind(date)
        .bind(i64::from(answered))
        .bind(i64::from(correct))
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        map_stats_row(&row)
    }

    async fn recent_days(&self, limit: u32) -> Result<Vec<DailyStats>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT date, questions_answered, questions_correct, session_count
            FROM daily_stats
            ORDER BY date DESC
            LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_stats_row(&row)?);
        }
        Ok(out)
    }
}
