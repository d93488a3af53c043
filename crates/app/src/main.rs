use std::fmt;
use std::io;

use quiz_core::model::{QuestionId, SourceId};
use serde_json::json;
use services::{AppServices, Clock, QuizConfig, SessionView, ShuffleMode};
use tracing::Level;
use tracing_subscriber::EnvFilter;

mod seed;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    InvalidNumber { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn require_number<T: std::str::FromStr>(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<T, ArgsError> {
    let value = require_value(args, flag)?;
    value
        .trim()
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw: value })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  quiz session  [--size <n>] [--seed <u64>] [--db <sqlite_url>]");
    eprintln!("  quiz answer   --question <id> --choice <id> [--db <sqlite_url>]");
    eprintln!("  quiz complete --answered <n> --correct <n> [--db <sqlite_url>]");
    eprintln!("  quiz seed     [--db <sqlite_url>]");
    eprintln!("  quiz overview [--db <sqlite_url>]");
    eprintln!("  quiz sources  [--db <sqlite_url>]");
    eprintln!("  quiz source   --id <id> [--db <sqlite_url>]");
    eprintln!("  quiz streak   [--db <sqlite_url>]");
    eprintln!("  quiz daily    [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:quiz.sqlite3");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_DEFAULT_SESSION_SIZE, QUIZ_MIN_SESSION_SIZE,");
    eprintln!("  QUIZ_MAX_SESSION_SIZE, QUIZ_MAX_REVIEW_PER_SESSION,");
    eprintln!("  QUIZ_SM2_FIRST_INTERVAL, QUIZ_SM2_SECOND_INTERVAL,");
    eprintln!("  QUIZ_SM2_INCORRECT_INTERVAL, QUIZ_SM2_MIN_EASE_FACTOR, RUST_LOG");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Session { size: Option<u32>, seed: Option<u64> },
    Answer { question: QuestionId, choice: String },
    Complete { answered: u32, correct: u32 },
    Seed,
    Overview,
    Sources,
    Source { id: SourceId },
    Streak,
    Daily,
}

struct Args {
    db_url: Option<String>,
    command: Command,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Option<Self>, ArgsError> {
        let Some(name) = args.next() else {
            return Ok(None);
        };

        let mut db_url = None;
        let mut size = None;
        let mut seed = None;
        let mut question = None;
        let mut choice = None;
        let mut answered = None;
        let mut correct = None;
        let mut source = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = Some(value);
                }
                "--size" if name == "session" => size = Some(require_number(&mut args, "--size")?),
                "--seed" if name == "session" => seed = Some(require_number(&mut args, "--seed")?),
                "--question" if name == "answer" => {
                    question = Some(QuestionId::new(require_number(&mut args, "--question")?));
                }
                "--choice" if name == "answer" => choice = Some(require_value(&mut args, "--choice")?),
                "--answered" if name == "complete" => {
                    answered = Some(require_number(&mut args, "--answered")?);
                }
                "--correct" if name == "complete" => {
                    correct = Some(require_number(&mut args, "--correct")?);
                }
                "--id" if name == "source" => {
                    source = Some(SourceId::new(require_number(&mut args, "--id")?));
                }
                "--help" | "-h" => return Ok(None),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let command = match name.as_str() {
            "session" => Command::Session { size, seed },
            "answer" => Command::Answer {
                question: question.ok_or(ArgsError::MissingFlag { flag: "--question" })?,
                choice: choice.ok_or(ArgsError::MissingFlag { flag: "--choice" })?,
            },
            "complete" => Command::Complete {
                answered: answered.ok_or(ArgsError::MissingFlag { flag: "--answered" })?,
                correct: correct.ok_or(ArgsError::MissingFlag { flag: "--correct" })?,
            },
            "seed" => Command::Seed,
            "overview" => Command::Overview,
            "sources" => Command::Sources,
            "source" => Command::Source {
                id: source.ok_or(ArgsError::MissingFlag { flag: "--id" })?,
            },
            "streak" => Command::Streak,
            "daily" => Command::Daily,
            "--help" | "-h" => return Ok(None),
            _ => return Err(ArgsError::UnknownArg(name)),
        };

        Ok(Some(Self { db_url, command }))
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn print_json(value: &impl serde::Serialize) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let parsed = Args::parse(std::env::args().skip(1)).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    let Some(parsed) = parsed else {
        print_usage();
        return Ok(());
    };

    let mut config = QuizConfig::from_env()?;
    if let Some(db_url) = parsed.db_url {
        config.database_url = db_url;
    }
    config.database_url = normalize_sqlite_url(config.database_url);

    // Open + migrate SQLite here so services never touch the filesystem.
    prepare_sqlite_file(&config.database_url)?;
    let clock = Clock::default_clock();
    let services = AppServices::new_sqlite(&config, clock).await?;
    tracing::debug!(db = %config.database_url, "storage ready");

    match parsed.command {
        Command::Session { size, seed } => {
            let shuffle = seed.map_or(ShuffleMode::Random, ShuffleMode::Seeded);
            let plan = services.with_shuffle(shuffle).start_session(size).await?;
            print_json(&SessionView::from_plan(&plan))
        }
        Command::Answer { question, choice } => {
            let result = services.review().submit_answer(question, &choice).await?;
            print_json(&result)
        }
        Command::Complete { answered, correct } => {
            let summary = services
                .progress()
                .complete_session(answered, correct)
                .await?;
            print_json(&summary)
        }
        Command::Seed => {
            let inserted = seed::seed_demo(services.storage(), services.clock()).await?;
            print_json(&json!({ "inserted": inserted }))
        }
        Command::Overview => print_json(&services.progress().overview().await?),
        Command::Sources => print_json(&services.progress().list_sources().await?),
        Command::Source { id } => print_json(&services.progress().source_mastery(id).await?),
        Command::Streak => print_json(&services.progress().streak_report().await?),
        Command::Daily => print_json(&services.progress().recent_activity().await?),
    }
}

#[tokio::main]
async fn main() {
    // stdout carries JSON; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::WARN.into()))
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
