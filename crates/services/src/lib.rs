#![forbid(unsafe_code)]

pub mod app_services;
pub mod config;
pub mod error;
pub mod progress_service;
pub mod review_service;
pub mod sessions;

pub use quiz_core::Clock;
pub use sessions as session;

pub use app_services::AppServices;
pub use config::QuizConfig;
pub use error::{AppServicesError, ConfigError, ProgressError, ReviewServiceError, SessionError};
pub use progress_service::{
    DayActivity, ProgressOverview, ProgressService, SessionSummary, SourceMastery, StreakReport,
};
pub use review_service::{AnswerResult, ReviewService};
pub use sessions::{PresentedQuestion, SessionComposer, SessionPlan, SessionView, ShuffleMode};
