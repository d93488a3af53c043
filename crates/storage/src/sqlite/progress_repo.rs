use quiz_core::model::{MASTERY_REPETITIONS, ReviewTotals, SourceId};

use super::{
    SqliteRepository,
    mapping::{db_err, id_i64, map_totals_row},
};
use crate::repository::{ProgressQueries, StorageError};

#[async_trait::async_trait]
impl ProgressQueries for SqliteRepository {
    async fn review_totals(&self, source: Option<SourceId>) -> Result<ReviewTotals, StorageError> {
        let source_id = source
            .map(|id| id_i64("source_id", id.value()))
            .transpose()?;

        let row = sqlx::query(
            r"
            SELECT
                COUNT(*) AS questions,
                COALESCE(SUM(r.last_reviewed_at IS NOT NULL), 0) AS seen,
                COALESCE(SUM(r.repetitions >= ?1), 0) AS mastered,
                COALESCE(SUM(r.times_correct), 0) AS times_correct,
                COALESCE(SUM(r.times_incorrect), 0) AS times_incorrect
            FROM questions q
            JOIN review_records r ON r.question_id = q.id
            WHERE ?2 IS NULL OR q.source_id = ?2
            ",
        )
        .bind(i64::from(MASTERY_REPETITIONS))
        .bind(source_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        map_totals_row(&row)
    }
}
