use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use quiz_core::{
    model::{QuestionId, ReviewRecord},
    scheduler::Scheduler,
    time::Clock,
};
use storage::repository::{QuestionRepository, ReviewPersistence, StorageError};

use crate::error::ReviewServiceError;

//
// ─── ANSWER RESULT ─────────────────────────────────────────────────────────────
//

/// Feedback returned after an answer is graded and scheduled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerResult {
    pub is_correct: bool,
    pub correct_choice_id: String,
    pub explanation: String,
    pub streak: u32,
    pub ease_factor: f64,
    pub next_review_at: DateTime<Utc>,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Grades submitted answers and advances the question's review record.
#[derive(Clone)]
pub struct ReviewService {
    clock: Clock,
    scheduler: Scheduler,
    questions: Arc<dyn QuestionRepository>,
    reviews: Arc<dyn ReviewPersistence>,
}

impl ReviewService {
    #[must_use]
    pub fn new(
        scheduler: Scheduler,
        questions: Arc<dyn QuestionRepository>,
        reviews: Arc<dyn ReviewPersistence>,
    ) -> Self {
        Self {
            clock: Clock::default(),
            scheduler,
            questions,
            reviews,
        }
    }

    /// Override the clock (usually for deterministic testing).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Current time according to the service's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Grade `chosen_choice_id` against the stored answer and persist the
    /// advanced review record.
    ///
    /// A choice id that matches no choice is graded as incorrect.
    ///
    /// # Errors
    ///
    /// Returns `QuestionNotFound` or `ReviewNotFound` when the question or its
    /// record is missing, and storage errors if persistence fails.
    pub async fn submit_answer(
        &self,
        question_id: QuestionId,
        chosen_choice_id: &str,
    ) -> Result<AnswerResult, ReviewServiceError> {
        let question = self
            .questions
            .get_question(question_id)
            .await
            .map_err(|e| match e {
                StorageError::NotFound => ReviewServiceError::QuestionNotFound(question_id),
                other => other.into(),
            })?;

        let is_correct = question.is_correct(chosen_choice_id);
        if !is_correct && !question.choices().iter().any(|c| c.id == chosen_choice_id) {
            tracing::warn!(%question_id, chosen_choice_id, "answer names no known choice");
        }

        let reviewed_at = self.now();
        let scheduler = self.scheduler;
        let advance = move |record: &ReviewRecord| scheduler.advance(record, is_correct, reviewed_at);
        let record = self
            .reviews
            .update_review(question_id, &advance)
            .await
            .map_err(|e| match e {
                StorageError::NotFound => ReviewServiceError::ReviewNotFound(question_id),
                other => other.into(),
            })?;

        tracing::info!(
            %question_id,
            is_correct,
            streak = record.streak,
            interval_days = record.interval_days,
            "answer recorded"
        );

        Ok(AnswerResult {
            is_correct,
            correct_choice_id: question.correct_choice_id().to_owned(),
            explanation: question.explanation().to_owned(),
            streak: record.streak,
            ease_factor: record.ease_factor,
            next_review_at: record.next_review_at,
        })
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::{Choice, Difficulty, QuestionDraft, Source, SourceId};
    use quiz_core::time::fixed_now;
    use storage::repository::{InMemoryRepository, SourceRepository};

    async fn seeded_repo() -> InMemoryRepository {
        let repo = InMemoryRepository::new();
        repo.upsert_source(&Source::new(SourceId::new(1), "Lecture", None, fixed_now()))
            .await
            .unwrap();
        let question = QuestionDraft {
            source_id: SourceId::new(1),
            prompt: "Capital of France?".into(),
            choices: vec![Choice::new("a", "Paris"), Choice::new("b", "Lyon")],
            correct_choice_id: "a".into(),
            explanation: "Paris has been the capital since 987.".into(),
            segment_start: None,
            segment_end: None,
            difficulty: Difficulty::Easy,
        }
        .validate(fixed_now())
        .unwrap()
        .assign_id(QuestionId::new(1));
        repo.insert_question(&question).await.unwrap();
        repo
    }

    fn service(repo: &InMemoryRepository) -> ReviewService {
        ReviewService::new(
            Scheduler::default(),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        )
        .with_clock(Clock::fixed(fixed_now()))
    }

    #[tokio::test]
    async fn correct_answer_schedules_first_interval() {
        let repo = seeded_repo().await;
        let result = service(&repo)
            .submit_answer(QuestionId::new(1), "a")
            .await
            .unwrap();

        assert!(result.is_correct);
        assert_eq!(result.correct_choice_id, "a");
        assert_eq!(result.explanation, "Paris has been the capital since 987.");
        assert_eq!(result.streak, 1);
        assert!((result.ease_factor - 2.5).abs() < 1e-9);
        assert_eq!(result.next_review_at, fixed_now() + Duration::days(1));

        let stored = repo.get_review(QuestionId::new(1)).await.unwrap();
        assert_eq!(stored.last_reviewed_at, Some(fixed_now()));
        assert_eq!(stored.repetitions, 1);
    }

    #[tokio::test]
    async fn wrong_answer_resets_streak() {
        let repo = seeded_repo().await;
        let svc = service(&repo);
        svc.submit_answer(QuestionId::new(1), "a").await.unwrap();
        svc.submit_answer(QuestionId::new(1), "a").await.unwrap();

        let result = svc.submit_answer(QuestionId::new(1), "b").await.unwrap();
        assert!(!result.is_correct);
        assert_eq!(result.correct_choice_id, "a");
        assert_eq!(result.streak, 0);
        assert!((result.ease_factor - 1.96).abs() < 1e-9);
        assert_eq!(result.next_review_at, fixed_now() + Duration::hours(6));

        let stored = repo.get_review(QuestionId::new(1)).await.unwrap();
        assert_eq!(stored.times_correct, 2);
        assert_eq!(stored.times_incorrect, 1);
    }

    #[tokio::test]
    async fn unknown_choice_counts_as_incorrect() {
        let repo = seeded_repo().await;
        let result = service(&repo)
            .submit_answer(QuestionId::new(1), "zzz")
            .await
            .unwrap();
        assert!(!result.is_correct);
    }

    #[tokio::test]
    async fn missing_question_is_not_found() {
        let repo = seeded_repo().await;
        let err = service(&repo)
            .submit_answer(QuestionId::new(99), "a")
            .await
            .unwrap_err();
        assert!(matches!(err, ReviewServiceError::QuestionNotFound(id) if id == QuestionId::new(99)));
    }
}
