use chrono::{DateTime, Utc};
use serde::Serialize;

use quiz_core::model::{Choice, Difficulty, QuestionId, SourceId};
use storage::SessionCandidate;

use super::SessionPlan;

/// A question as shown to the learner: no correct answer, no explanation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresentedQuestion {
    pub id: QuestionId,
    pub source_id: SourceId,
    pub prompt: String,
    pub choices: Vec<Choice>,
    pub difficulty: Difficulty,
    pub created_at: DateTime<Utc>,
}

impl PresentedQuestion {
    #[must_use]
    pub fn from_candidate(candidate: &SessionCandidate) -> Self {
        let q = &candidate.question;
        Self {
            id: q.id(),
            source_id: q.source_id(),
            prompt: q.prompt().to_owned(),
            choices: q.choices().to_vec(),
            difficulty: q.difficulty(),
            created_at: q.created_at(),
        }
    }
}

/// Serializable session payload handed to the transport layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub questions: Vec<PresentedQuestion>,
    pub total: usize,
    pub review_count: usize,
    pub new_count: usize,
}

impl SessionView {
    #[must_use]
    pub fn from_plan(plan: &SessionPlan) -> Self {
        Self {
            questions: plan.items.iter().map(PresentedQuestion::from_candidate).collect(),
            total: plan.total(),
            review_count: plan.review_count,
            new_count: plan.new_count,
        }
    }
}
