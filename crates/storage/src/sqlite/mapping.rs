use quiz_core::model::{
    Choice, DailyStats, Difficulty, Question, QuestionId, ReviewRecord, ReviewTotals, Source,
    SourceId,
};
use sqlx::Row;

use crate::repository::{SessionCandidate, StorageError};

/// Columns selected for every `SessionCandidate` query; `q` is `questions`,
/// `r` is `review_records`.
pub(crate) const CANDIDATE_COLUMNS: &str = r"
    q.id, q.source_id, q.prompt, q.choices, q.correct_choice_id, q.explanation,
    q.segment_start, q.segment_end, q.difficulty, q.created_at,
    r.repetitions, r.ease_factor, r.interval_days, r.next_review_at, r.last_reviewed_at,
    r.times_correct, r.times_incorrect, r.streak
";

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Classify driver errors: constraint violations become domain-level
/// storage errors, everything else is a connection failure.
pub(crate) fn db_err(e: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StorageError::Conflict;
        }
        if db.is_foreign_key_violation() {
            return StorageError::NotFound;
        }
    }
    StorageError::Connection(e.to_string())
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn source_id_from_i64(v: i64) -> Result<SourceId, StorageError> {
    Ok(SourceId::new(i64_to_u64("source_id", v)?))
}

pub(crate) fn choices_to_json(choices: &[Choice]) -> Result<String, StorageError> {
    serde_json::to_string(choices).map_err(ser)
}

pub(crate) fn map_source_row(row: &sqlx::sqlite::SqliteRow) -> Result<Source, StorageError> {
    Ok(Source {
        id: source_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        title: row.try_get("title").map_err(ser)?,
        url: row.try_get("url").map_err(ser)?,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

pub(crate) fn map_question_row(row: &sqlx::sqlite::SqliteRow) -> Result<Question, StorageError> {
    let choices_json: String = row.try_get("choices").map_err(ser)?;
    let choices: Vec<Choice> = serde_json::from_str(&choices_json).map_err(ser)?;
    let difficulty_str: String = row.try_get("difficulty").map_err(ser)?;

    Question::from_persisted(
        question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        source_id_from_i64(row.try_get::<i64, _>("source_id").map_err(ser)?)?,
        row.try_get("prompt").map_err(ser)?,
        choices,
        row.try_get("correct_choice_id").map_err(ser)?,
        row.try_get("explanation").map_err(ser)?,
        row.try_get("segment_start").map_err(ser)?,
        row.try_get("segment_end").map_err(ser)?,
        Difficulty::parse(&difficulty_str).map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

/// Maps the review columns of a row; `question_id_column` names the column
/// holding the owning question's id.
pub(crate) fn map_review_row(
    row: &sqlx::sqlite::SqliteRow,
    question_id_column: &str,
) -> Result<ReviewRecord, StorageError> {
    Ok(ReviewRecord {
        question_id: question_id_from_i64(row.try_get::<i64, _>(question_id_column).map_err(ser)?)?,
        repetitions: i64_to_u32("repetitions", row.try_get("repetitions").map_err(ser)?)?,
        ease_factor: row.try_get("ease_factor").map_err(ser)?,
        interval_days: row.try_get("interval_days").map_err(ser)?,
        next_review_at: row.try_get("next_review_at").map_err(ser)?,
        last_reviewed_at: row.try_get("last_reviewed_at").map_err(ser)?,
        times_correct: i64_to_u32("times_correct", row.try_get("times_correct").map_err(ser)?)?,
        times_incorrect: i64_to_u32(
            "times_incorrect",
            row.try_get("times_incorrect").map_err(ser)?,
        )?,
        streak: i64_to_u32("streak", row.try_get("streak").map_err(ser)?)?,
    })
}

pub(crate) fn map_candidate_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<SessionCandidate, StorageError> {
    Ok(SessionCandidate {
        question: map_question_row(row)?,
        review: map_review_row(row, "id")?,
    })
}

pub(crate) fn map_stats_row(row: &sqlx::sqlite::SqliteRow) -> Result<DailyStats, StorageError> {
    Ok(DailyStats {
        date: row.try_get("date").map_err(ser)?,
        questions_answered: i64_to_u32(
            "questions_answered",
            row.try_get("questions_answered").map_err(ser)?,
        )?,
        questions_correct: i64_to_u32(
            "questions_correct",
            row.try_get("questions_correct").map_err(ser)?,
        )?,
        session_count: i64_to_u32("session_count", row.try_get("session_count").map_err(ser)?)?,
    })
}

/// Maps the aggregate row of a review-totals query.
pub(crate) fn map_totals_row(row: &sqlx::sqlite::SqliteRow) -> Result<ReviewTotals, StorageError> {
    Ok(ReviewTotals {
        questions: i64_to_u32("questions", row.try_get("questions").map_err(ser)?)?,
        seen: i64_to_u32("seen", row.try_get("seen").map_err(ser)?)?,
        mastered: i64_to_u32("mastered", row.try_get("mastered").map_err(ser)?)?,
        times_correct: i64_to_u64("times_correct", row.try_get("times_correct").map_err(ser)?)?,
        times_incorrect: i64_to_u64(
            "times_incorrect",
            row.try_get("times_incorrect").map_err(ser)?,
        )?,
    })
}
