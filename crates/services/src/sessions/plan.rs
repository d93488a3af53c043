use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use quiz_core::model::QuestionId;
use quiz_core::settings::SessionSettings;
use storage::SessionCandidate;
use storage::repository::SessionQueries;

use super::ShuffleMode;
use crate::error::SessionError;

/// Selection result for a session build.
///
/// `items` is already shuffled; the counts describe which pool each
/// selected question came from.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionPlan {
    pub items: Vec<SessionCandidate>,
    pub review_count: usize,
    pub new_count: usize,
    pub reinforcement_count: usize,
}

impl SessionPlan {
    /// Total number of questions in this plan.
    #[must_use]
    pub fn total(&self) -> usize {
        self.items.len()
    }

    /// Returns true when no questions were selected for this session.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn question_ids(&self) -> Vec<QuestionId> {
        self.items.iter().map(SessionCandidate::id).collect()
    }
}

/// Builds a practice session from three pools: due reviews, unseen
/// questions, then the weakest remaining questions as backfill.
#[derive(Clone)]
pub struct SessionComposer {
    settings: SessionSettings,
    queries: Arc<dyn SessionQueries>,
    shuffle: ShuffleMode,
}

impl SessionComposer {
    #[must_use]
    pub fn new(settings: SessionSettings, queries: Arc<dyn SessionQueries>) -> Self {
        Self {
            settings,
            queries,
            shuffle: ShuffleMode::default(),
        }
    }

    /// Override how the final list is permuted.
    #[must_use]
    pub fn with_shuffle(mut self, shuffle: ShuffleMode) -> Self {
        self.shuffle = shuffle;
        self
    }

    #[must_use]
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Compose a session of at most `clamp(requested)` questions as of `now`.
    ///
    /// - Due reviews first, most overdue first, capped at `max_review_per_session`.
    /// - Unseen questions fill the remaining slots, earliest source first.
    /// - Whatever is still free goes to the lowest-ease questions not yet picked.
    ///
    /// A short pool is not topped up from another pool except through the
    /// backfill step; a small question bank yields a short session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if a pool query fails.
    pub async fn compose(
        &self,
        requested: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<SessionPlan, SessionError> {
        let size = self.settings.clamp_size(requested);
        let review_cap = size.min(self.settings.max_review_per_session());

        let mut selected_ids: HashSet<QuestionId> = HashSet::new();
        let mut items: Vec<SessionCandidate> = Vec::new();

        let due = self.queries.due_reviews(now, review_cap).await?;
        let review_count = take_unique(&mut items, &mut selected_ids, due, review_cap);

        let mut remaining = size - to_u32(review_count);
        let mut new_count = 0;
        if remaining > 0 {
            let exclude: Vec<QuestionId> = selected_ids.iter().copied().collect();
            let unseen = self.queries.unseen(&exclude, remaining).await?;
            new_count = take_unique(&mut items, &mut selected_ids, unseen, remaining);
            remaining -= to_u32(new_count);
        }

        let mut reinforcement_count = 0;
        if remaining > 0 {
            let exclude: Vec<QuestionId> = selected_ids.iter().copied().collect();
            let weakest = self.queries.by_ease_ascending(&exclude, remaining).await?;
            reinforcement_count = take_unique(&mut items, &mut selected_ids, weakest, remaining);
        }

        self.shuffle.apply(&mut items);

        tracing::info!(
            size,
            review_count,
            new_count,
            reinforcement_count,
            "composed practice session"
        );

        Ok(SessionPlan {
            items,
            review_count,
            new_count,
            reinforcement_count,
        })
    }
}

/// Append up to `limit` candidates whose ids are not yet selected; returns
/// how many were taken.
fn take_unique(
    items: &mut Vec<SessionCandidate>,
    selected: &mut HashSet<QuestionId>,
    pool: Vec<SessionCandidate>,
    limit: u32,
) -> usize {
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    let before = items.len();
    for candidate in pool {
        if items.len() - before >= limit {
            break;
        }
        if selected.insert(candidate.id()) {
            items.push(candidate);
        }
    }
    items.len() - before
}

// Pool sizes are bounded by a u32 limit.
fn to_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
