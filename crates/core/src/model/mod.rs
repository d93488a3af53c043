mod ids;
mod question;
mod review;
mod source;
mod stats;

pub use ids::{ParseIdError, QuestionId, SourceId};
pub use question::{Choice, Difficulty, Question, QuestionDraft, QuestionError, ValidatedQuestion};
pub use review::{DEFAULT_EASE_FACTOR, MASTERY_REPETITIONS, ReviewRecord};
pub use source::Source;
pub use stats::{DailyStats, ReviewTotals, rounded_percent};
