use chrono::{DateTime, Utc};
use quiz_core::model::{QuestionId, ReviewRecord};
use sqlx::sqlite::SqliteRow;

use super::{
    SqliteRepository,
    mapping::{CANDIDATE_COLUMNS, db_err, id_i64, map_candidate_row, map_review_row},
};
use crate::repository::{
    ReviewPersistence, ReviewUpdate, SessionCandidate, SessionQueries, StorageError,
};

/// `AND q.id NOT IN (?1, ?2, ...)`, or nothing for an empty exclusion list.
fn exclusion_clause(count: usize) -> String {
    if count == 0 {
        return String::new();
    }
    let mut sql = String::from("AND q.id NOT IN (");
    for i in 0..count {
        if i > 0 {
            sql.push_str(", ");
        }
        sql.push('?');
        sql.push_str(&(i + 1).to_string());
    }
    sql.push(')');
    sql
}

fn exclusion_ids(exclude: &[QuestionId]) -> Result<Vec<i64>, StorageError> {
    exclude
        .iter()
        .map(|id| id_i64("question_id", id.value()))
        .collect()
}

fn map_candidates(rows: Vec<SqliteRow>) -> Result<Vec<SessionCandidate>, StorageError> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(map_candidate_row(&row)?);
    }
    Ok(out)
}

impl SqliteRepository {
    async fn fetch_excluding(
        &self,
        sql: &str,
        exclude: &[QuestionId],
        limit: u32,
    ) -> Result<Vec<SessionCandidate>, StorageError> {
        let mut q = sqlx::query(sql);
        for id in exclusion_ids(exclude)? {
            q = q.bind(id);
        }
        let rows = q
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        map_candidates(rows)
    }
}

#[async_trait::async_trait]
impl SessionQueries for SqliteRepository {
    async fn due_reviews(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<SessionCandidate>, StorageError> {
        let sql = format!(
            r"
            SELECT {CANDIDATE_COLUMNS}
            FROM questions q
            JOIN review_records r ON r.question_id = q.id
            WHERE r.last_reviewed_at IS NOT NULL
              AND r.next_review_at <= ?1
            ORDER BY r.next_review_at ASC, q.id ASC
            LIMIT ?2
            "
        );

        let rows = sqlx::query(&sql)
            .bind(now)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        map_candidates(rows)
    }

    async fn unseen(
        &self,
        exclude: &[QuestionId],
        limit: u32,
    ) -> Result<Vec<SessionCandidate>, StorageError> {
        let sql = format!(
            r"
            SELECT {CANDIDATE_COLUMNS}
            FROM questions q
            JOIN review_records r ON r.question_id = q.id
            JOIN sources s ON s.id = q.source_id
            WHERE r.last_reviewed_at IS NULL
              {exclusion}
            ORDER BY s.created_at ASC, q.segment_start ASC, q.id ASC
            LIMIT ?{limit_idx}
            ",
            exclusion = exclusion_clause(exclude.len()),
            limit_idx = exclude.len() + 1,
        );
        self.fetch_excluding(&sql, exclude, limit).await
    }

    async fn by_ease_ascending(
        &self,
        exclude: &[QuestionId],
        limit: u32,
    ) -> Result<Vec<SessionCandidate>, StorageError> {
        let sql = format!(
            r"
            SELECT {CANDIDATE_COLUMNS}
            FROM questions q
            JOIN review_records r ON r.question_id = q.id
            WHERE 1 = 1
              {exclusion}
            ORDER BY r.ease_factor ASC, q.id ASC
            LIMIT ?{limit_idx}
            ",
            exclusion = exclusion_clause(exclude.len()),
            limit_idx = exclude.len() + 1,
        );
        self.fetch_excluding(&sql, exclude, limit).await
    }
}

#[async_trait::async_trait]
impl ReviewPersistence for SqliteRepository {
    async fn update_review(
        &self,
        id: QuestionId,
        apply: ReviewUpdate<'_>,
    ) -> Result<ReviewRecord, StorageError> {
        let question_id = id_i64("question_id", id.value())?;
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // Touch the row first so this transaction holds the write lock
        // before it reads; a concurrent writer waits on busy_timeout.
        let touched = sqlx::query(
            "UPDATE review_records SET updated_at = updated_at WHERE question_id = ?1",
        )
        .bind(question_id)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        if touched.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        let row = sqlx::query(
            r"
            SELECT
                question_id, repetitions, ease_factor, interval_days, next_review_at,
                last_reviewed_at, times_correct, times_incorrect, streak
            FROM review_records
            WHERE question_id = ?1
            ",
        )
        .bind(question_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;
        let current = map_review_row(&row, "question_id")?;

        let updated = apply(&current);
        if updated.question_id != id {
            return Err(StorageError::Conflict);
        }

        sqlx::query(
            r"
            UPDATE review_records SET
                repetitions = ?2,
                ease_factor = ?3,
                interval_days = ?4,
                next_review_at = ?5,
                last_reviewed_at = ?6,
                times_correct = ?7,
                times_incorrect = ?8,
                streak = ?9,
                updated_at = ?10
            WHERE question_id = ?1
            ",
        )
        .bind(question_id)
        .bind(i64::from(updated.repetitions))
        .bind(updated.ease_factor)
        .bind(updated.interval_days)
        .bind(updated.next_review_at)
        .bind(updated.last_reviewed_at)
        .bind(i64::from(updated.times_correct))
        .bind(i64::from(updated.times_incorrect))
        .bind(i64::from(updated.streak))
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(updated)
    }
}
