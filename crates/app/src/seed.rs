//! Demo content for `quiz seed`.

use quiz_core::model::{Choice, Difficulty, QuestionDraft, QuestionId, Source, SourceId};
use quiz_core::Clock;
use storage::repository::Storage;
use storage::StorageError;

struct DemoQuestion {
    prompt: &'static str,
    choices: [(&'static str, &'static str); 4],
    correct: &'static str,
    explanation: &'static str,
    segment_start: f64,
    difficulty: Difficulty,
}

const DEMO_SOURCE_TITLE: &str = "How memory works";

const DEMO_QUESTIONS: &[DemoQuestion] = &[
    DemoQuestion {
        prompt: "What does spaced repetition space out?",
        choices: [
            ("a", "Reviews of the same material"),
            ("b", "Breaks between study sessions"),
            ("c", "Different subjects"),
            ("d", "Sleep cycles"),
        ],
        correct: "a",
        explanation: "Reviews are spread over growing intervals so each one lands just before forgetting.",
        segment_start: 12.0,
        difficulty: Difficulty::Easy,
    },
    DemoQuestion {
        prompt: "Who first plotted the forgetting curve?",
        choices: [
            ("a", "Sigmund Freud"),
            ("b", "Hermann Ebbinghaus"),
            ("c", "Jean Piaget"),
            ("d", "B. F. Skinner"),
        ],
        correct: "b",
        explanation: "Ebbinghaus measured his own retention of nonsense syllables in the 1880s.",
        segment_start: 45.5,
        difficulty: Difficulty::Medium,
    },
    DemoQuestion {
        prompt: "Which practice strengthens memory more than rereading?",
        choices: [
            ("a", "Highlighting"),
            ("b", "Summarising from the text"),
            ("c", "Retrieval practice"),
            ("d", "Listening to music"),
        ],
        correct: "c",
        explanation: "Pulling an answer out of memory is what the testing effect rewards.",
        segment_start: 90.0,
        difficulty: Difficulty::Medium,
    },
    DemoQuestion {
        prompt: "In SM-2, what happens to the ease factor after a wrong answer?",
        choices: [
            ("a", "It is reset to 2.5"),
            ("b", "It drops, but not below a floor"),
            ("c", "It stays the same"),
            ("d", "It doubles"),
        ],
        correct: "b",
        explanation: "A low-quality answer lowers the ease factor, which is clamped at a minimum.",
        segment_start: 140.0,
        difficulty: Difficulty::Hard,
    },
    DemoQuestion {
        prompt: "Interleaving means studying topics...",
        choices: [
            ("a", "One at a time until mastered"),
            ("b", "Mixed together within a session"),
            ("c", "Only right before an exam"),
            ("d", "In alphabetical order"),
        ],
        correct: "b",
        explanation: "Mixing related topics forces you to pick the right strategy each time.",
        segment_start: 201.0,
        difficulty: Difficulty::Medium,
    },
    DemoQuestion {
        prompt: "When is the best time to review a memory?",
        choices: [
            ("a", "Immediately after learning, repeatedly"),
            ("b", "Just before it would be forgotten"),
            ("c", "Once, a year later"),
            ("d", "Never, memories are permanent"),
        ],
        correct: "b",
        explanation: "Effortful recall near the edge of forgetting produces the longest next interval.",
        segment_start: 260.0,
        difficulty: Difficulty::Easy,
    },
];

/// Insert the demo source and its questions. Questions that already exist
/// are left untouched; returns how many were inserted.
pub async fn seed_demo(storage: &Storage, clock: Clock) -> Result<usize, Box<dyn std::error::Error>> {
    let now = clock.now();
    let source_id = SourceId::new(1);
    storage
        .sources
        .upsert_source(&Source::new(source_id, DEMO_SOURCE_TITLE, None, now))
        .await?;

    let mut inserted = 0;
    for (idx, demo) in DEMO_QUESTIONS.iter().enumerate() {
        let draft = QuestionDraft {
            source_id,
            prompt: demo.prompt.into(),
            choices: demo
                .choices
                .iter()
                .map(|(id, text)| Choice::new(*id, *text))
                .collect(),
            correct_choice_id: demo.correct.into(),
            explanation: demo.explanation.into(),
            segment_start: Some(demo.segment_start),
            segment_end: None,
            difficulty: demo.difficulty,
        };
        let id = QuestionId::new(u64::try_from(idx)? + 1);
        let question = draft.validate(now)?.assign_id(id);

        match storage.questions.insert_question(&question).await {
            Ok(_) => inserted += 1,
            Err(StorageError::Conflict) => {
                tracing::debug!(%id, "demo question already present");
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(inserted)
}
