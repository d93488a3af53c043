use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use quiz_core::model::{
    DailyStats, Question, QuestionId, ReviewRecord, ReviewTotals, Source, SourceId,
};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A question together with its review record, as returned by session queries.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionCandidate {
    pub question: Question,
    pub review: ReviewRecord,
}

impl SessionCandidate {
    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.question.id()
    }
}

/// Replacement function applied by `ReviewPersistence::update_review`.
pub type ReviewUpdate<'a> = &'a (dyn Fn(&ReviewRecord) -> ReviewRecord + Send + Sync);

#[async_trait]
pub trait SourceRepository: Send + Sync {
    /// Persist or update a source.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the source cannot be stored.
    async fn upsert_source(&self, source: &Source) -> Result<(), StorageError>;

    /// Fetch a source by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_source(&self, id: SourceId) -> Result<Source, StorageError>;

    /// All sources, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on infrastructure failures.
    async fn list_sources(&self) -> Result<Vec<Source>, StorageError>;
}

#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Insert a question and its fresh review record in one step.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the ID is taken,
    /// `StorageError::NotFound` if the source does not exist.
    async fn insert_question(&self, question: &Question) -> Result<ReviewRecord, StorageError>;

    /// Fetch a question by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_question(&self, id: QuestionId) -> Result<Question, StorageError>;

    /// Fetch the review record owned by a question.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_review(&self, id: QuestionId) -> Result<ReviewRecord, StorageError>;

    /// Delete a question; its review record goes with it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn delete_question(&self, id: QuestionId) -> Result<(), StorageError>;
}

/// Read-only pools a practice session is assembled from.
#[async_trait]
pub trait SessionQueries: Send + Sync {
    /// Answered questions with `next_review_at <= now`, most overdue first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on infrastructure failures.
    async fn due_reviews(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<SessionCandidate>, StorageError>;

    /// Never-answered questions, oldest source first, then by position.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on infrastructure failures.
    async fn unseen(
        &self,
        exclude: &[QuestionId],
        limit: u32,
    ) -> Result<Vec<SessionCandidate>, StorageError>;

    /// Any question not in `exclude`, lowest ease factor first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on infrastructure failures.
    async fn by_ease_ascending(
        &self,
        exclude: &[QuestionId],
        limit: u32,
    ) -> Result<Vec<SessionCandidate>, StorageError>;
}

#[async_trait]
pub trait ReviewPersistence: Send + Sync {
    /// Atomically read, transform and write back one review record.
    ///
    /// Concurrent updates to the same record are serialized; the stored
    /// record after the call is exactly what `apply` returned.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the record is missing, or other
    /// storage errors. Nothing is written on error.
    async fn update_review(
        &self,
        id: QuestionId,
        apply: ReviewUpdate<'_>,
    ) -> Result<ReviewRecord, StorageError>;
}

/// Aggregates over review records for progress reporting.
#[async_trait]
pub trait ProgressQueries: Send + Sync {
    /// Totals over every question, or only those of `source` when given.
    ///
    /// An unknown source yields empty totals.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on infrastructure failures.
    async fn review_totals(&self, source: Option<SourceId>) -> Result<ReviewTotals, StorageError>;
}

#[async_trait]
pub trait DailyStatsRepository: Send + Sync {
    /// Add one completed session to the totals of `date`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the totals cannot be stored.
    async fn record_session(
        &self,
        date: NaiveDate,
        answered: u32,
        correct: u32,
    ) -> Result<DailyStats, StorageError>;

    /// Most recent days with a recorded session, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on infrastructure failures.
    async fn recent_days(&self, limit: u32) -> Result<Vec<DailyStats>, StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct MemoryState {
    sources: HashMap<SourceId, Source>,
    questions: HashMap<QuestionId, Question>,
    reviews: HashMap<QuestionId, ReviewRecord>,
    stats: HashMap<NaiveDate, DailyStats>,
}

impl MemoryState {
    fn candidates<'a>(
        &'a self,
        exclude: &'a HashSet<QuestionId>,
    ) -> impl Iterator<Item = (&'a Question, &'a ReviewRecord)> + 'a {
        self.questions
            .values()
            .filter(move |q| !exclude.contains(&q.id()))
            .filter_map(move |q| self.reviews.get(&q.id()).map(|r| (q, r)))
    }

    fn source_created_at(&self, question: &Question) -> Option<DateTime<Utc>> {
        self.sources.get(&question.source_id()).map(|s| s.created_at)
    }
}

fn to_candidates(
    picked: Vec<(&Question, &ReviewRecord)>,
    limit: u32,
) -> Vec<SessionCandidate> {
    picked
        .into_iter()
        .take(usize::try_from(limit).unwrap_or(usize::MAX))
        .map(|(q, r)| SessionCandidate {
            question: q.clone(),
            review: r.clone(),
        })
        .collect()
}

// NULL positions sort first, matching SQLite's ASC ordering.
fn cmp_position(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.total_cmp(&y),
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl SourceRepository for InMemoryRepository {
    async fn upsert_source(&self, source: &Source) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard
            .sources
            .entry(source.id)
            // created_at orders unseen questions; never rewrite it
            .and_modify(|existing| {
                existing.title.clone_from(&source.title);
                existing.url.clone_from(&source.url);
            })
            .or_insert_with(|| source.clone());
        Ok(())
    }

    async fn get_source(&self, id: SourceId) -> Result<Source, StorageError> {
        let guard = self.lock()?;
        guard.sources.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_sources(&self) -> Result<Vec<Source>, StorageError> {
        let guard = self.lock()?;
        let mut sources: Vec<Source> = guard.sources.values().cloned().collect();
        sources.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(sources)
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn insert_question(&self, question: &Question) -> Result<ReviewRecord, StorageError> {
        let mut guard = self.lock()?;
        if !guard.sources.contains_key(&question.source_id()) {
            return Err(StorageError::NotFound);
        }
        if guard.questions.contains_key(&question.id()) {
            return Err(StorageError::Conflict);
        }
        let record = ReviewRecord::new(question.id(), question.created_at());
        guard.questions.insert(question.id(), question.clone());
        guard.reviews.insert(question.id(), record.clone());
        Ok(record)
    }

    async fn get_question(&self, id: QuestionId) -> Result<Question, StorageError> {
        let guard = self.lock()?;
        guard.questions.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn get_review(&self, id: QuestionId) -> Result<ReviewRecord, StorageError> {
        let guard = self.lock()?;
        guard.reviews.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn delete_question(&self, id: QuestionId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.questions.remove(&id).ok_or(StorageError::NotFound)?;
        guard.reviews.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl SessionQueries for InMemoryRepository {
    async fn due_reviews(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<SessionCandidate>, StorageError> {
        let guard = self.lock()?;
        let none = HashSet::new();
        let mut due: Vec<_> = guard
            .candidates(&none)
            .filter(|(_, r)| r.is_due(now))
            .collect();
        due.sort_by_key(|(q, r)| (r.next_review_at, q.id()));
        Ok(to_candidates(due, limit))
    }

    async fn unseen(
        &self,
        exclude: &[QuestionId],
        limit: u32,
    ) -> Result<Vec<SessionCandidate>, StorageError> {
        let guard = self.lock()?;
        let exclude: HashSet<_> = exclude.iter().copied().collect();
        let mut fresh: Vec<_> = guard
            .candidates(&exclude)
            .filter(|(_, r)| r.is_unseen())
            .collect();
        fresh.sort_by(|(a, _), (b, _)| {
            guard
                .source_created_at(a)
                .cmp(&guard.source_created_at(b))
                .then_with(|| cmp_position(a.segment_start(), b.segment_start()))
                .then_with(|| a.id().cmp(&b.id()))
        });
        Ok(to_candidates(fresh, limit))
    }

    async fn by_ease_ascending(
        &self,
        exclude: &[QuestionId],
        limit: u32,
    ) -> Result<Vec<SessionCandidate>, StorageError> {
        let guard = self.lock()?;
        let exclude: HashSet<_> = exclude.iter().copied().collect();
        let mut weakest: Vec<_> = guard.candidates(&exclude).collect();
        weakest.sort_by(|(qa, ra), (qb, rb)| {
            ra.ease_factor
                .total_cmp(&rb.ease_factor)
                .then_with(|| qa.id().cmp(&qb.id()))
        });
        Ok(to_candidates(weakest, limit))
    }
}

#[async_trait]
impl ReviewPersistence for InMemoryRepository {
    async fn update_review(
        &self,
        id: QuestionId,
        apply: ReviewUpdate<'_>,
    ) -> Result<ReviewRecord, StorageError> {
        let mut guard = self.lock()?;
        let slot = guard.reviews.get_mut(&id).ok_or(StorageError::NotFound)?;
        let updated = apply(slot);
        if updated.question_id != id {
            return Err(StorageError::Conflict);
        }
        *slot = updated.clone();
        Ok(updated)
    }
}

#[async_trait]
impl ProgressQueries for InMemoryRepository {
    async fn review_totals(&self, source: Option<SourceId>) -> Result<ReviewTotals, StorageError> {
        let guard = self.lock()?;
        let none = HashSet::new();
        Ok(guard
            .candidates(&none)
            .filter(|(q, _)| source.is_none_or(|id| q.source_id() == id))
            .map(|(_, r)| r)
            .collect())
    }
}

#[async_trait]
impl DailyStatsRepository for InMemoryRepository {
    async fn record_session(
        &self,
        date: NaiveDate,
        answered: u32,
        correct: u32,
    ) -> Result<DailyStats, StorageError> {
        let mut guard = self.lock()?;
        let day = guard
            .stats
            .entry(date)
            .or_insert_with(|| DailyStats::new(date));
        day.record_session(answered, correct);
        Ok(day.clone())
    }

    async fn recent_days(&self, limit: u32) -> Result<Vec<DailyStats>, StorageError> {
        let guard = self.lock()?;
        let mut days: Vec<DailyStats> = guard.stats.values().cloned().collect();
        days.sort_by(|a, b| b.date.cmp(&a.date));
        days.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(days)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub sources: Arc<dyn SourceRepository>,
    pub questions: Arc<dyn QuestionRepository>,
    pub queries: Arc<dyn SessionQueries>,
    pub reviews: Arc<dyn ReviewPersistence>,
    pub progress: Arc<dyn ProgressQueries>,
    pub stats: Arc<dyn DailyStatsRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repo(InMemoryRepository::new())
    }

    pub(crate) fn from_repo<R>(repo: R) -> Self
    where
        R: SourceRepository
            + QuestionRepository
            + SessionQueries
            + ReviewPersistence
            + ProgressQueries
            + DailyStatsRepository
            + Clone
            + 'static,
    {
        Self {
            sources: Arc::new(repo.clone()),
            questions: Arc::new(repo.clone()),
            queries: Arc::new(repo.clone()),
            reviews: Arc::new(repo.clone()),
            progress: Arc::new(repo.clone()),
            stats: Arc::new(repo),
        }
    }
}
