use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{QuestionId, SourceId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("a question needs at least 2 choices, got {0}")]
    TooFewChoices(usize),

    #[error("choice id cannot be empty")]
    EmptyChoiceId,

    #[error("choice text cannot be empty (choice {0})")]
    EmptyChoiceText(String),

    #[error("duplicate choice id: {0}")]
    DuplicateChoice(String),

    #[error("correct choice {0} is not one of the choices")]
    UnknownCorrectChoice(String),

    #[error("segment position must be finite and non-negative, got {0}")]
    InvalidPosition(f64),

    #[error("unknown difficulty: {0}")]
    UnknownDifficulty(String),
}

//
// ─── CHOICES & DIFFICULTY ──────────────────────────────────────────────────────
//

/// One selectable answer of a multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub id: String,
    pub text: String,
}

impl Choice {
    #[must_use]
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Parses the stored text form.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::UnknownDifficulty` for anything but easy/medium/hard.
    pub fn parse(s: &str) -> Result<Self, QuestionError> {
        match s {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(QuestionError::UnknownDifficulty(other.to_owned())),
        }
    }
}

//
// ─── QUESTION TYPES ────────────────────────────────────────────────────────────
//

/// Unvalidated question as produced by a generator or an import.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionDraft {
    pub source_id: SourceId,
    pub prompt: String,
    pub choices: Vec<Choice>,
    pub correct_choice_id: String,
    pub explanation: String,
    /// Offset of the passage this question was built from, in seconds.
    pub segment_start: Option<f64>,
    pub segment_end: Option<f64>,
    pub difficulty: Difficulty,
}

impl QuestionDraft {
    /// Validate the draft and stamp it with its creation time.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the prompt is blank, the choices are malformed,
    /// the correct choice is missing, or a segment offset is invalid.
    pub fn validate(self, now: DateTime<Utc>) -> Result<ValidatedQuestion, QuestionError> {
        let prompt = self.prompt.trim().to_owned();
        if prompt.is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }
        if self.choices.len() < 2 {
            return Err(QuestionError::TooFewChoices(self.choices.len()));
        }

        let mut seen = HashSet::with_capacity(self.choices.len());
        for choice in &self.choices {
            if choice.id.trim().is_empty() {
                return Err(QuestionError::EmptyChoiceId);
            }
            if choice.text.trim().is_empty() {
                return Err(QuestionError::EmptyChoiceText(choice.id.clone()));
            }
            if !seen.insert(choice.id.as_str()) {
                return Err(QuestionError::DuplicateChoice(choice.id.clone()));
            }
        }
        if !seen.contains(self.correct_choice_id.as_str()) {
            return Err(QuestionError::UnknownCorrectChoice(self.correct_choice_id));
        }

        for offset in [self.segment_start, self.segment_end].into_iter().flatten() {
            if !offset.is_finite() || offset < 0.0 {
                return Err(QuestionError::InvalidPosition(offset));
            }
        }

        Ok(ValidatedQuestion {
            source_id: self.source_id,
            prompt,
            choices: self.choices,
            correct_choice_id: self.correct_choice_id,
            explanation: self.explanation.trim().to_owned(),
            segment_start: self.segment_start,
            segment_end: self.segment_end,
            difficulty: self.difficulty,
            created_at: now,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedQuestion {
    source_id: SourceId,
    prompt: String,
    choices: Vec<Choice>,
    correct_choice_id: String,
    explanation: String,
    segment_start: Option<f64>,
    segment_end: Option<f64>,
    difficulty: Difficulty,
    created_at: DateTime<Utc>,
}

impl ValidatedQuestion {
    #[must_use]
    pub fn assign_id(self, id: QuestionId) -> Question {
        Question {
            id,
            source_id: self.source_id,
            prompt: self.prompt,
            choices: self.choices,
            correct_choice_id: self.correct_choice_id,
            explanation: self.explanation,
            segment_start: self.segment_start,
            segment_end: self.segment_end,
            difficulty: self.difficulty,
            created_at: self.created_at,
        }
    }
}

/// A multiple-choice quiz item. Owns exactly one `ReviewRecord` in storage.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    id: QuestionId,
    source_id: SourceId,
    prompt: String,
    choices: Vec<Choice>,
    correct_choice_id: String,
    explanation: String,
    segment_start: Option<f64>,
    segment_end: Option<f64>,
    difficulty: Difficulty,
    created_at: DateTime<Utc>,
}

impl Question {
    /// Rebuild a question from storage, re-running validation.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the persisted fields no longer validate.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: QuestionId,
        source_id: SourceId,
        prompt: String,
        choices: Vec<Choice>,
        correct_choice_id: String,
        explanation: String,
        segment_start: Option<f64>,
        segment_end: Option<f64>,
        difficulty: Difficulty,
        created_at: DateTime<Utc>,
    ) -> Result<Self, QuestionError> {
        let draft = QuestionDraft {
            source_id,
            prompt,
            choices,
            correct_choice_id,
            explanation,
            segment_start,
            segment_end,
            difficulty,
        };
        Ok(draft.validate(created_at)?.assign_id(id))
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn source_id(&self) -> SourceId {
        self.source_id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn choices(&self) -> &[Choice] {
        &self.choices
    }

    #[must_use]
    pub fn correct_choice_id(&self) -> &str {
        &self.correct_choice_id
    }

    #[must_use]
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    #[must_use]
    pub fn segment_start(&self) -> Option<f64> {
        self.segment_start
    }

    #[must_use]
    pub fn segment_end(&self) -> Option<f64> {
        self.segment_end
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// True when `choice_id` names the stored correct choice.
    #[must_use]
    pub fn is_correct(&self, choice_id: &str) -> bool {
        self.correct_choice_id == choice_id
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
