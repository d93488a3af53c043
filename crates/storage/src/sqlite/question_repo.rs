use chrono::Utc;
use quiz_core::model::{Question, QuestionId, ReviewRecord};

use super::{
    SqliteRepository,
    mapping::{choices_to_json, db_err, id_i64, map_question_row, map_review_row},
};
use crate::repository::{QuestionRepository, StorageError};

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn insert_question(&self, question: &Question) -> Result<ReviewRecord, StorageError> {
        let id = id_i64("question_id", question.id().value())?;
        let record = ReviewRecord::new(question.id(), question.created_at());

        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(
            r"
            INSERT INTO questions (
                id, source_id, prompt, choices, correct_choice_id, explanation,
                segment_start, segment_end, difficulty, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
        )
        .bind(id)
        .bind(id_i64("source_id", question.source_id().value())?)
        .bind(question.prompt())
        .bind(choices_to_json(question.choices())?)
        .bind(question.correct_choice_id())
        .bind(question.explanation())
        .bind(question.segment_start())
        .bind(question.segment_end())
        .bind(question.difficulty().as_str())
        .bind(question.created_at())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        sqlx::query(
            r"
            INSERT INTO review_records (
                question_id, repetitions, ease_factor, interval_days, next_review_at,
                last_reviewed_at, times_correct, times_incorrect, streak, updated_at
            )
            VALUES (?1, 0, ?2, ?3, ?4, NULL, 0, 0, 0, ?5)
            ",
        )
        .bind(id)
        .bind(record.ease_factor)
        .bind(record.interval_days)
        .bind(record.next_review_at)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(record)
    }

    async fn get_question(&self, id: QuestionId) -> Result<Question, StorageError> {
        let row = sqlx::query(
            r"
            SELECT
                id, source_id, prompt, choices, correct_choice_id, explanation,
                segment_start, segment_end, difficulty, created_at
            FROM questions
            WHERE id = ?1
            ",
        )
        .bind(id_i64("question_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(StorageError::NotFound)?;

        map_question_row(&row)
    }

    async fn get_review(&self, id: QuestionId) -> Result<ReviewRecord, StorageError> {
        let row = sqlx::query(
            r"
            SELECT
                question_id, repetitions, ease_factor, interval_days, next_review_at,
                last_reviewed_at, times_correct, times_incorrect, streak
            FROM review_records
            WHERE question_id = ?1
            ",
        )
        .bind(id_i64("question_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(StorageError::NotFound)?;

        map_review_row(&row, "question_id")
    }

    async fn delete_question(&self, id: QuestionId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM questions WHERE id = ?1")
            .bind(id_i64("question_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
