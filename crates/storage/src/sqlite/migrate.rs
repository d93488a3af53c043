use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs the versioned schema migrations.
///
/// Version 1 creates sources, questions, review records (one per question,
/// cascading on delete), daily stats, and the indexes the session pools use.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS sources (
                    id INTEGER PRIMARY KEY,
                    title TEXT NOT NULL,
                    url TEXT,
                    created_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS questions (
                    id INTEGER PRIMARY KEY,
                    source_id INTEGER NOT NULL,
                    prompt TEXT NOT NULL,
                    choices TEXT NOT NULL,
                    correct_choice_id TEXT NOT NULL,
                    explanation TEXT NOT NULL DEFAULT '',
                    segment_start REAL,
                    segment_end REAL,
                    difficulty TEXT NOT NULL DEFAULT 'medium',
                    created_at TEXT NOT NULL,
                    FOREIGN KEY (source_id) REFERENCES sources(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS review_records (
                    question_id INTEGER PRIMARY KEY,
                    repetitions INTEGER NOT NULL CHECK (repetitions >= 0),
                    ease_factor REAL NOT NULL,
                    interval_days REAL NOT NULL CHECK (interval_days >= 0),
                    next_review_at TEXT NOT NULL,
                    last_reviewed_at TEXT,
                    times_correct INTEGER NOT NULL CHECK (times_correct >= 0),
                    times_incorrect INTEGER NOT NULL CHECK (times_incorrect >= 0),
                    streak INTEGER NOT NULL CHECK (streak >= 0),
                    updated_at TEXT NOT NULL,
                    FOREIGN KEY (question_id) REFERENCES questions(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS daily_stats (
                    date TEXT PRIMARY KEY,
                    questions_answered INTEGER NOT NULL CHECK (questions_answered >= 0),
                    questions_correct INTEGER NOT NULL CHECK (questions_correct >= 0),
                    session_count INTEGER NOT NULL CHECK (session_count >= 0)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_review_records_next_review
                    ON review_records(next_review_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_review_records_ease
                    ON review_records(ease_factor);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_questions_source_segment
                    ON questions(source_id, segment_start);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(version = 1, "applied schema migration");
    }

    Ok(())
}
