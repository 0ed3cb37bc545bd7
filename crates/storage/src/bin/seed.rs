use std::fmt;

use chrono::{DateTime, Utc};
use kuet_core::Clock;
use kuet_core::model::{
    CompletionFlags, CourseId, GradeMethod, Kuet, KuetId, QuestionId, QuestionResponse,
    ResponseResult, Session, SessionId, SessionSettings, SessionStatus, UserId,
};
use storage::repository::Storage;
use storage::sqlite::{DEFAULT_DB_URL, normalize_url};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    kuet_id: KuetId,
    course_id: CourseId,
    user_id: UserId,
    questions: u32,
    answers: u32,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidNumber { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
    TooManyAnswers { answers: u32, questions: u32 },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
            ArgsError::TooManyAnswers { answers, questions } => {
                write!(f, "--answers ({answers}) exceeds --questions ({questions})")
            }
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

fn parse_number<T: std::str::FromStr>(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<T, ArgsError> {
    let value = require_value(args, flag)?;
    value
        .parse::<T>()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw: value })
}

fn env_number<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<T>().ok())
        .unwrap_or(default)
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url = normalize_url(
            &std::env::var("KUET_DB_URL").unwrap_or_else(|_| DEFAULT_DB_URL.into()),
        );
        let mut kuet_id = KuetId::new(env_number("KUET_ID", 1));
        let mut course_id = CourseId::new(env_number("KUET_COURSE_ID", 1));
        let mut user_id = UserId::new(env_number("KUET_USER_ID", 2));
        let mut questions = env_number("KUET_QUESTIONS", 3_u32);
        let mut answers = env_number("KUET_ANSWERS", 1_u32);
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_url(&value);
                }
                "--kuet-id" => kuet_id = KuetId::new(parse_number(&mut args, "--kuet-id")?),
                "--course-id" => {
                    course_id = CourseId::new(parse_number(&mut args, "--course-id")?);
                }
                "--user-id" => user_id = UserId::new(parse_number(&mut args, "--user-id")?),
                "--questions" => questions = parse_number(&mut args, "--questions")?,
                "--answers" => answers = parse_number(&mut args, "--answers")?,
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        if answers > questions {
            return Err(ArgsError::TooManyAnswers { answers, questions });
        }

        Ok(Self {
            db_url,
            kuet_id,
            course_id,
            user_id,
            questions,
            answers,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:kuet.sqlite3)");
    eprintln!("  --kuet-id <id>            Activity id to upsert (default: 1)");
    eprintln!("  --course-id <id>          Course owning the activity (default: 1)");
    eprintln!("  --user-id <id>            User recording the answers (default: 2)");
    eprintln!("  --questions <n>           Questions attached to the demo session (default: 3)");
    eprintln!("  --answers <n>             Questions the user answers (default: 1)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!(
        "  KUET_DB_URL, KUET_ID, KUET_COURSE_ID, KUET_USER_ID, KUET_QUESTIONS, KUET_ANSWERS"
    );
}

fn demo_fixtures(args: &Args, now: DateTime<Utc>) -> Result<(Kuet, Session), kuet_core::error::Error> {
    let kuet = Kuet::new(
        args.kuet_id,
        args.course_id,
        "Demo kuet",
        Some("Seeded activity with the answer-all completion rule.".into()),
        GradeMethod::Highest,
        CompletionFlags::answer_all(),
        now,
    )?;
    let session = Session::new(
        SessionId::new(0),
        kuet.id(),
        "Demo Session",
        SessionSettings {
            question_time: 30,
            ..SessionSettings::default()
        },
        SessionStatus::Active,
        now,
    )?;
    Ok((kuet, session))
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let clock = args.now.map_or(Clock::System, Clock::fixed);
    let now = clock.now();

    let (kuet, session) = demo_fixtures(&args, now)?;
    storage.kuets.upsert_kuet(&kuet).await?;
    let session_id = storage.sessions.insert_session(&session).await?;

    let mut slots = Vec::with_capacity(args.questions as usize);
    for i in 0..args.questions {
        let question_id = QuestionId::new(u64::from(i + 1));
        let kid = storage
            .sessions
            .add_session_question(session_id, question_id, i)
            .await?;
        slots.push((kid, question_id));
    }

    for (kid, question_id) in slots.into_iter().take(args.answers as usize) {
        let response = QuestionResponse::new(
            kuet.id(),
            session_id,
            args.user_id,
            kid,
            question_id,
            ResponseResult::Success,
            now,
        );
        storage.responses.append_response(&response).await?;
    }

    println!(
        "Seeded kuet {} (session {}) with {} questions and {} answers by user {} into {}",
        kuet.id(),
        session_id,
        args.questions,
        args.answers,
        args.user_id,
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
