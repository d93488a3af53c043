use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use quiz_core::model::{
    Choice, Difficulty, Question, QuestionDraft, QuestionId, ReviewRecord, Source, SourceId,
};
use quiz_core::scheduler::Scheduler;
use quiz_core::time::fixed_now;
use storage::StorageError;
use storage::repository::{
    DailyStatsRepository, ProgressQueries, QuestionRepository, ReviewPersistence,
    SessionQueries, SourceRepository,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn build_question(id: u64, source: u64, position: Option<f64>) -> Question {
    QuestionDraft {
        source_id: SourceId::new(source),
        prompt: format!("Question {id}?"),
        choices: vec![
            Choice::new("a", "first"),
            Choice::new("b", "second"),
            Choice::new("c", "third"),
        ],
        correct_choice_id: "b".into(),
        explanation: "Because.".into(),
        segment_start: position,
        segment_end: position.map(|p| p + 30.0),
        difficulty: Difficulty::Hard,
    }
    .validate(fixed_now())
    .unwrap()
    .assign_id(QuestionId::new(id))
}

fn ids(c: &[storage::SessionCandidate]) -> Vec<u64> {
    c.iter().map(|c| c.id().value()).collect()
}

#[tokio::test]
async fn sqlite_round_trips_question_and_fresh_record() {
    let repo = connect("memdb_roundtrip").await;
    repo.upsert_source(&Source::new(SourceId::new(1), "Intro", None, fixed_now()))
        .await
        .unwrap();

    let question = build_question(1, 1, Some(12.0));
    let created = repo.insert_question(&question).await.unwrap();

    assert_eq!(repo.get_question(question.id()).await.unwrap(), question);
    let stored = repo.get_review(question.id()).await.unwrap();
    assert_eq!(stored, created);
    assert!(stored.is_unseen());

    let dup = repo.insert_question(&question).await.unwrap_err();
    assert!(matches!(dup, StorageError::Conflict));

    let orphan = repo
        .insert_question(&build_question(2, 99, None))
        .await
        .unwrap_err();
    assert!(matches!(orphan, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_delete_cascades_review_record() {
    let repo = connect("memdb_cascade").await;
    repo.upsert_source(&Source::new(SourceId::new(1), "Intro", None, fixed_now()))
        .await
        .unwrap();
    repo.insert_question(&build_question(1, 1, None)).await.unwrap();

    repo.delete_question(QuestionId::new(1)).await.unwrap();
    assert!(matches!(
        repo.get_review(QuestionId::new(1)).await,
        Err(StorageError::NotFound)
    ));
    assert!(matches!(
        repo.delete_question(QuestionId::new(1)).await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn sqlite_session_pools_follow_ordering_contracts() {
    let repo = connect("memdb_pools").await;
    let now = fixed_now();
    repo.upsert_source(&Source::new(SourceId::new(1), "Newer", None, now))
        .await
        .unwrap();
    repo.upsert_source(&Source::new(
        SourceId::new(2),
        "Older",
        None,
        now - Duration::days(2),
    ))
    .await
    .unwrap();

    repo.insert_question(&build_question(1, 1, Some(50.0))).await.unwrap();
    repo.insert_question(&build_question(2, 1, Some(10.0))).await.unwrap();
    repo.insert_question(&build_question(3, 2, Some(99.0))).await.unwrap();
    repo.insert_question(&build_question(4, 1, Some(70.0))).await.unwrap();
    repo.insert_question(&build_question(5, 1, Some(80.0))).await.unwrap();

    let scheduler = Scheduler::default();
    // 4: missed three days ago (due, low ease); 5: answered right a week ago (due).
    let missed = now - Duration::days(3);
    repo.update_review(QuestionId::new(4), &|r: &ReviewRecord| {
        scheduler.advance(r, false, missed)
    })
    .await
    .unwrap();
    let week_ago = now - Duration::days(7);
    repo.update_review(QuestionId::new(5), &|r: &ReviewRecord| {
        scheduler.advance(r, true, week_ago)
    })
    .await
    .unwrap();

    let due = repo.due_reviews(now, 10).await.unwrap();
    assert_eq!(ids(&due), vec![5, 4]);
    assert_eq!(repo.due_reviews(now, 1).await.unwrap().len(), 1);

    let unseen = repo.unseen(&[], 10).await.unwrap();
    assert_eq!(ids(&unseen), vec![3, 2, 1]);
    let unseen = repo.unseen(&[QuestionId::new(3)], 1).await.unwrap();
    assert_eq!(ids(&unseen), vec![2]);

    let weakest = repo
        .by_ease_ascending(&[QuestionId::new(1), QuestionId::new(2)], 2)
        .await
        .unwrap();
    assert_eq!(ids(&weakest)[0], 4);
    assert_eq!(weakest.len(), 2);
}

#[tokio::test]
async fn sqlite_update_review_persists_all_fields() {
    let repo = connect("memdb_update").await;
    repo.upsert_source(&Source::new(SourceId::new(1), "Intro", None, fixed_now()))
        .await
        .unwrap();
    repo.insert_question(&build_question(1, 1, None)).await.unwrap();

    let scheduler = Scheduler::default();
    let mut expected = repo.get_review(QuestionId::new(1)).await.unwrap();
    for correct in [true, true, false] {
        expected = scheduler.advance(&expected, correct, fixed_now());
        let stored = repo
            .update_review(QuestionId::new(1), &|r: &ReviewRecord| {
                scheduler.advance(r, correct, fixed_now())
            })
            .await
            .unwrap();
        assert_eq!(stored, expected);
    }

    let reloaded = repo.get_review(QuestionId::new(1)).await.unwrap();
    assert_eq!(reloaded, expected);
    assert_eq!(reloaded.times_correct, 2);
    assert_eq!(reloaded.times_incorrect, 1);
    assert_eq!(reloaded.streak, 0);

    let missing = repo
        .update_review(QuestionId::new(42), &|r: &ReviewRecord| r.clone())
        .await
        .unwrap_err();
    assert!(matches!(missing, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_well_learned_question_is_never_due_again() {
    let repo = connect("memdb_long_run").await;
    repo.upsert_source(&Source::new(SourceId::new(1), "Intro", None, fixed_now()))
        .await
        .unwrap();
    repo.insert_question(&build_question(1, 1, None)).await.unwrap();

    let scheduler = Scheduler::default();
    let mut now = fixed_now();
    for rep in 1..=40 {
        let stored = repo
            .update_review(QuestionId::new(1), &|r: &ReviewRecord| {
                scheduler.advance(r, true, now)
            })
            .await
            .unwrap();
        assert!(stored.next_review_at > now, "rep {rep}");

        let due = repo.due_reviews(now, 10).await.unwrap();
        assert!(due.is_empty(), "rep {rep}: scheduled {}", stored.next_review_at);
        now += Duration::hours(1);
    }

    let reloaded = repo.get_review(QuestionId::new(1)).await.unwrap();
    assert_eq!(reloaded.repetitions, 40);
    assert_eq!(reloaded.interval_days, quiz_core::scheduler::MAX_INTERVAL_DAYS);
    assert!(reloaded.next_review_at <= quiz_core::time::latest_schedule());

    // The ceiling itself still compares as far future.
    repo.update_review(QuestionId::new(1), &|r: &ReviewRecord| {
        let mut r = r.clone();
        r.next_review_at = quiz_core::time::latest_schedule();
        r
    })
    .await
    .unwrap();
    assert!(repo.due_reviews(now, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn sqlite_concurrent_updates_do_not_lose_counts() {
    // File-backed so WAL and busy_timeout apply between pool connections.
    let path = std::env::temp_dir().join(format!("quiz_concurrent_{}.sqlite3", std::process::id()));
    let _ = std::fs::remove_file(&path);
    let url = format!("sqlite://{}?mode=rwc", path.display());
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    let repo = Arc::new(repo);
    repo.upsert_source(&Source::new(SourceId::new(1), "Intro", None, fixed_now()))
        .await
        .unwrap();
    repo.insert_question(&build_question(1, 1, None)).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let repo = Arc::clone(&repo);
        handles.push(tokio::spawn(async move {
            let scheduler = Scheduler::default();
            repo.update_review(QuestionId::new(1), &|r: &ReviewRecord| {
                scheduler.advance(r, true, fixed_now())
            })
            .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let record = repo.get_review(QuestionId::new(1)).await.unwrap();
    assert_eq!(record.times_correct, 8);
    assert_eq!(record.repetitions, 8);
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn sqlite_daily_stats_accumulate() {
    let repo = connect("memdb_stats").await;
    let d1 = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    let d2 = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();

    repo.record_session(d1, 10, 8).await.unwrap();
    repo.record_session(d2, 15, 9).await.unwrap();
    let day = repo.record_session(d2, 5, 5).await.unwrap();
    assert_eq!(day.questions_answered, 20);
    assert_eq!(day.questions_correct, 14);
    assert_eq!(day.session_count, 2);

    let days = repo.recent_days(1).await.unwrap();
    assert_eq!(days.len(), 1);
    assert_eq!(days[0].date, d2);
}

#[tokio::test]
async fn sqlite_lists_sources_and_aggregates_progress() {
    let repo = connect("memdb_progress").await;
    let now = fixed_now();
    repo.upsert_source(&Source::new(SourceId::new(1), "Older", None, now - Duration::days(1)))
        .await
        .unwrap();
    repo.upsert_source(&Source::new(
        SourceId::new(2),
        "Newer",
        Some("https://example.com/v/2".into()),
        now,
    ))
    .await
    .unwrap();
    // Renaming keeps the original creation time.
    repo.upsert_source(&Source::new(SourceId::new(1), "Older, renamed", None, now + Duration::days(9)))
        .await
        .unwrap();

    let sources = repo.list_sources().await.unwrap();
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[0].id, SourceId::new(2));
    assert_eq!(sources[0].url.as_deref(), Some("https://example.com/v/2"));
    assert_eq!(sources[1].title, "Older, renamed");
    assert_eq!(sources[1].created_at, now - Duration::days(1));

    for id in 1..=3 {
        repo.insert_question(&build_question(id, 1, None)).await.unwrap();
    }
    repo.insert_question(&build_question(4, 2, None)).await.unwrap();

    let empty = repo.review_totals(None).await.unwrap();
    assert_eq!((empty.questions, empty.seen, empty.mastered), (4, 0, 0));

    let scheduler = Scheduler::default();
    for correct in [true, true, true] {
        repo.update_review(QuestionId::new(1), &|r: &ReviewRecord| {
            scheduler.advance(r, correct, now)
        })
        .await
        .unwrap();
    }
    repo.update_review(QuestionId::new(4), &|r: &ReviewRecord| scheduler.advance(r, false, now))
        .await
        .unwrap();

    let all = repo.review_totals(None).await.unwrap();
    assert_eq!((all.questions, all.seen, all.mastered), (4, 2, 1));
    assert_eq!((all.times_correct, all.times_incorrect), (3, 1));
    assert_eq!(all.mastery_percentage(), 25.0);

    let first = repo.review_totals(Some(SourceId::new(1))).await.unwrap();
    assert_eq!((first.questions, first.seen, first.mastered), (3, 1, 1));

    let unknown = repo.review_totals(Some(SourceId::new(77))).await.unwrap();
    assert_eq!(unknown, quiz_core::model::ReviewTotals::default());
}
