use std::sync::Arc;

use quiz_core::scheduler::Scheduler;
use storage::repository::Storage;

use crate::config::QuizConfig;
use crate::error::{AppServicesError, SessionError};
use crate::progress_service::ProgressService;
use crate::review_service::ReviewService;
use crate::sessions::{SessionComposer, SessionPlan, ShuffleMode};
use crate::Clock;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    storage: Storage,
    composer: Arc<SessionComposer>,
    review: Arc<ReviewService>,
    progress: Arc<ProgressService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage at `config.database_url`.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the database cannot be opened or migrated.
    pub async fn new_sqlite(config: &QuizConfig, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(&config.database_url).await?;
        Ok(Self::from_storage(storage, config, clock))
    }

    /// Wire services over an existing storage aggregate.
    #[must_use]
    pub fn from_storage(storage: Storage, config: &QuizConfig, clock: Clock) -> Self {
        let composer = Arc::new(SessionComposer::new(
            config.session,
            Arc::clone(&storage.queries),
        ));
        let review = Arc::new(
            ReviewService::new(
                Scheduler::new(config.scheduler),
                Arc::clone(&storage.questions),
                Arc::clone(&storage.reviews),
            )
            .with_clock(clock),
        );
        let progress = Arc::new(ProgressService::new(
            clock,
            Arc::clone(&storage.stats),
            Arc::clone(&storage.sources),
            Arc::clone(&storage.progress),
        ));

        Self {
            clock,
            storage,
            composer,
            review,
            progress,
        }
    }

    /// Replace the composer's shuffle mode.
    #[must_use]
    pub fn with_shuffle(mut self, shuffle: ShuffleMode) -> Self {
        let composer = (*self.composer).clone().with_shuffle(shuffle);
        self.composer = Arc::new(composer);
        self
    }

    /// Compose a session as of the services' clock.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if a pool query fails.
    pub async fn start_session(&self, requested: Option<u32>) -> Result<SessionPlan, SessionError> {
        self.composer.compose(requested, self.clock.now()).await
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    #[must_use]
    pub fn review(&self) -> Arc<ReviewService> {
        Arc::clone(&self.review)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }
}
