use std::fmt;

use kuet_core::model::{CompletionRule, KuetId, UserId};
use services::{CompletionService, CompletionSettings, CustomCompletion};
use storage::repository::Storage;
use storage::sqlite::{DEFAULT_DB_URL, normalize_url};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingRequired { flag: &'static str },
    UnknownArg(String),
    InvalidId { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingRequired { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidId { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
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

fn parse_id(args: &mut impl Iterator<Item = String>, flag: &'static str) -> Result<u64, ArgsError> {
    let value = require_value(args, flag)?;
    value
        .parse::<u64>()
        .map_err(|_| ArgsError::InvalidId { flag, raw: value })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  kuet rules");
    eprintln!("  kuet state   --kuet-id <id> --user-id <id> [--rule <rule>] [--db <sqlite_url>]");
    eprintln!("  kuet overall --kuet-id <id> --user-id <id> [--db <sqlite_url>]");
    eprintln!("  kuet report  --kuet-id <id> --user-id <id> [--db <sqlite_url>]  # JSON");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:kuet.sqlite3");
    eprintln!("  --rule completionanswerall");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  KUET_DB_URL, KUET_ANSWER_ALL_POLICY (any | every-question), KUET_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Rules,
    State,
    Overall,
    Report,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "rules" => Some(Self::Rules),
            "state" => Some(Self::State),
            "overall" => Some(Self::Overall),
            "report" => Some(Self::Report),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    kuet_id: KuetId,
    user_id: UserId,
    rule: String,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = normalize_url(
            &std::env::var("KUET_DB_URL").unwrap_or_else(|_| DEFAULT_DB_URL.into()),
        );
        let mut kuet_id = None;
        let mut user_id = None;
        let mut rule = CompletionRule::AnswerAll.as_str().to_owned();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_url(&value);
                }
                "--kuet-id" => kuet_id = Some(KuetId::new(parse_id(args, "--kuet-id")?)),
                "--user-id" => user_id = Some(UserId::new(parse_id(args, "--user-id")?)),
                "--rule" => rule = require_value(args, "--rule")?,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            kuet_id: kuet_id.ok_or(ArgsError::MissingRequired { flag: "--kuet-id" })?,
            user_id: user_id.ok_or(ArgsError::MissingRequired { flag: "--user-id" })?,
            rule,
        })
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("KUET_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_rules() {
    println!("defined rules:");
    for rule in CustomCompletion::list_defined_rules() {
        println!("  {rule}");
    }
    println!("sort order:");
    for rule in CustomCompletion::get_sort_order() {
        let kind = if rule.is_custom() { "custom" } else { "built-in" };
        println!("  {rule} ({kind})");
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let mut argv = std::env::args().skip(1);
    let cmd = match argv.next() {
        None => {
            print_usage();
            return Ok(());
        }
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(&first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if cmd == Command::Rules {
        print_rules();
        return Ok(());
    }

    let parsed = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let settings = CompletionSettings::from_env()?;
    let storage = Storage::sqlite(&parsed.db_url).await?;
    let service = CompletionService::from_storage(settings, &storage);
    tracing::debug!(
        db = %parsed.db_url,
        policy = settings.answer_all_policy.as_str(),
        "completion service ready"
    );

    match cmd {
        Command::State => {
            let completion = service.for_user(parsed.kuet_id, parsed.user_id).await?;
            let state = completion.get_state(&parsed.rule).await?;
            println!("{}: {state}", parsed.rule);
        }
        Command::Overall => {
            let completion = service.for_user(parsed.kuet_id, parsed.user_id).await?;
            for (rule, state) in completion.rule_states().await? {
                println!("{rule}: {state}");
            }
            println!("overall: {}", completion.get_overall_state().await?);
        }
        Command::Report => {
            let report = service.report(parsed.kuet_id, parsed.user_id).await?;
            println!("{}", report.to_json()?);
        }
        Command::Rules => {}
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
