use std::fmt;

use storage::sqlite::SqliteRepository;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    learner_id: String,
    learner_name: String,
    status: Option<String>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidLearnerId { raw: String },
    InvalidStatus { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidLearnerId { raw } => write!(f, "invalid --learner-id value: {raw:?}"),
            ArgsError::InvalidStatus { raw } => {
                write!(f, "invalid --status value (expected incomplete or completed): {raw}")
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

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("PLAYER_DB_URL")
            .unwrap_or_else(|_| "sqlite:player.sqlite3?mode=rwc".into());
        let mut learner_id = std::env::var("PLAYER_LEARNER_ID").unwrap_or_else(|_| "000000".into());
        let mut learner_name =
            std::env::var("PLAYER_LEARNER_NAME").unwrap_or_else(|_| "Student, Joe".into());
        let mut status = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--learner-id" => {
                    let value = require_value(&mut args, "--learner-id")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidLearnerId { raw: value });
                    }
                    learner_id = value;
                }
                "--learner-name" => {
                    learner_name = require_value(&mut args, "--learner-name")?;
                }
                "--status" => {
                    let value = require_value(&mut args, "--status")?;
                    if value != "incomplete" && value != "completed" {
                        return Err(ArgsError::InvalidStatus { raw: value });
                    }
                    status = Some(value);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            learner_id,
            learner_name,
            status,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:player.sqlite3?mode=rwc)");
    eprintln!("  --learner-id <id>         Learner id to provision (default: 000000)");
    eprintln!("  --learner-name <name>     Learner name, \"Last, First\" (default: Student, Joe)");
    eprintln!("  --status <status>         Preset lesson status for both SCORM vocabularies");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  PLAYER_DB_URL, PLAYER_LEARNER_ID, PLAYER_LEARNER_NAME");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let repo = SqliteRepository::connect(&args.db_url).await?;
    repo.migrate().await?;
    repo.upsert_learner(&args.learner_id, &args.learner_name).await?;

    if let Some(status) = &args.status {
        repo.put_values(
            &args.learner_id,
            &[
                ("cmi.core.lesson_status".to_owned(), status.clone()),
                ("cmi.completion_status".to_owned(), status.clone()),
            ],
        )
        .await?;
    }

    println!(
        "Seeded learner {} ({}) into {}",
        args.learner_id, args.learner_name, args.db_url
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
