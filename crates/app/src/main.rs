use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use player_core::format::chrono_label;
use player_core::model::{Course, ScreenPosition};
use services::{
    Bootstrap, Player, PlayerConfig, ResumeState, ScriptedPlayback, SessionBootstrap, TracingSink,
    initial_position, progress_percent,
};
use storage::scorm::ScormVersion;
use storage::sqlite::{SqliteRepository, SqliteRuntime};
use storage::{CmiVocabulary, JsonFileCache, ScormSession};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod script;

use script::Action;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingCourse,
    MissingScript,
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidScormVersion { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingCourse => write!(f, "no course given (--course or PLAYER_COURSE)"),
            ArgsError::MissingScript => write!(f, "play requires --script <file>"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidScormVersion { raw } => {
                write!(f, "invalid --scorm value (expected 1.2 or 2004): {raw}")
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Status,
    Play,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "status" => Some(Self::Status),
            "play" => Some(Self::Play),
            _ => None,
        }
    }
}

struct Args {
    course: PathBuf,
    cache_path: PathBuf,
    db_url: String,
    learner_id: String,
    scorm_version: Option<ScormVersion>,
    script: Option<PathBuf>,
    name: Option<String>,
    email: Option<String>,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- status [options]");
    eprintln!("  cargo run -p app -- play --script <file> [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --course <file>       Course JSON");
    eprintln!("  --cache <file>        Local cache file (default: player-cache.json)");
    eprintln!("  --scorm <1.2|2004>    Use the SQLite LMS runtime with this SCORM version");
    eprintln!("  --db <sqlite_url>     LMS runtime database (default: sqlite:player.sqlite3)");
    eprintln!("  --learner-id <id>     LMS learner (default: 000000)");
    eprintln!("  --name <name>         Name for a first local login");
    eprintln!("  --email <email>       Email for a first local login");
    eprintln!("  --script <file>       Actions for play, one per line");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  PLAYER_COURSE, PLAYER_CACHE_PATH, PLAYER_SCORM_VERSION, PLAYER_DB_URL,");
    eprintln!("  PLAYER_LEARNER_ID, PLAYER_EVENT_BASE, PLAYER_DEBUG");
}

impl Args {
    fn parse(
        command: Command,
        config: &PlayerConfig,
        args: &mut impl Iterator<Item = String>,
    ) -> Result<Self, ArgsError> {
        let mut course = std::env::var("PLAYER_COURSE").ok().map(PathBuf::from);
        let mut cache_path = std::env::var("PLAYER_CACHE_PATH")
            .map_or_else(|_| PathBuf::from("player-cache.json"), PathBuf::from);
        let mut db_url = std::env::var("PLAYER_DB_URL")
            .ok()
            .map_or_else(|| normalize_sqlite_url("sqlite:player.sqlite3".into()), normalize_sqlite_url);
        let mut learner_id =
            std::env::var("PLAYER_LEARNER_ID").unwrap_or_else(|_| "000000".into());
        let mut scorm_version = config.scorm_version;
        let mut script = None;
        let mut name = None;
        let mut email = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--course" => course = Some(require_value(args, "--course")?.into()),
                "--cache" => cache_path = require_value(args, "--cache")?.into(),
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--learner-id" => learner_id = require_value(args, "--learner-id")?,
                "--scorm" => {
                    let value = require_value(args, "--scorm")?;
                    let version = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidScormVersion { raw: value.clone() })?;
                    scorm_version = Some(version);
                }
                "--script" => script = Some(require_value(args, "--script")?.into()),
                "--name" => name = Some(require_value(args, "--name")?),
                "--email" => email = Some(require_value(args, "--email")?),
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        if command == Command::Play && script.is_none() {
            return Err(ArgsError::MissingScript);
        }

        Ok(Self {
            course: course.ok_or(ArgsError::MissingCourse)?,
            cache_path,
            db_url,
            learner_id,
            scorm_version,
            script,
            name,
            email,
        })
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
            .unwrap_or_else(|_| PathBuf::from("."))
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

fn init_tracing(debug: bool) {
    let fallback = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Connect the SQLite LMS runtime for one learner.
async fn open_store(
    args: &Args,
    version: ScormVersion,
) -> Result<Arc<ScormSession>, Box<dyn std::error::Error>> {
    prepare_sqlite_file(&args.db_url)?;
    let repo = SqliteRepository::connect(&args.db_url).await?;
    repo.migrate().await?;
    let vocabulary = CmiVocabulary::for_version(version);
    let runtime = SqliteRuntime::new(repo, args.learner_id.clone(), vocabulary);
    Ok(Arc::new(ScormSession::new(Arc::new(runtime), vocabulary)))
}

async fn resolve(
    bootstrap: &SessionBootstrap,
    args: &Args,
) -> Result<Option<ResumeState>, Box<dyn std::error::Error>> {
    match bootstrap.resolve().await? {
        Bootstrap::Ready(resume) => Ok(Some(resume)),
        Bootstrap::NeedsLogin => match (&args.name, &args.email) {
            (Some(name), Some(email)) => Ok(Some(bootstrap.login(name, email)?)),
            _ => Ok(None),
        },
    }
}

async fn status(
    course: &Course,
    bootstrap: &SessionBootstrap,
    resume: &ResumeState,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = resume.loaded.data.clone().unwrap_or_default();
    let position = initial_position(resume.loaded.data.as_ref(), course.len());
    println!("Course:    {}", course.title());
    println!("Learner:   {}", resume.user_name);
    println!("Status:    {}", resume.loaded.status);
    println!("Resume at: {position}");
    println!("Progress:  {:.0}%", progress_percent(&data, course.len()));

    if let Some(store) = bootstrap.store().filter(|store| store.is_active()) {
        println!("Time:      {}", chrono_label(store.total_time().await));
        store.terminate().await?;
    }
    Ok(())
}

async fn play(
    course: Course,
    config: &PlayerConfig,
    bootstrap: &SessionBootstrap,
    resume: ResumeState,
    actions: Vec<Action>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut player = Player::new(
        course,
        config,
        bootstrap,
        resume,
        Arc::new(TracingSink),
        Arc::new(ScriptedPlayback::new()),
    );
    player.start();
    println!("Hello, {}!", player.first_name());
    report(&player);

    for action in actions {
        debug!(?action, "script");
        let outcome = apply(&mut player, action).await;
        if let Err(err) = outcome {
            println!("  refused: {err}");
        }
        report(&player);
    }

    let seconds = player.terminate().await;
    println!("Session time: {}", chrono_label(seconds));
    Ok(())
}

async fn apply(player: &mut Player, action: Action) -> Result<(), services::PlayerError> {
    match action {
        Action::Next => {
            player.next().await?;
        }
        Action::Previous => {
            player.previous();
        }
        Action::GoTo(position) => {
            player.go_to(position)?;
        }
        Action::Play => player.play_video()?,
        Action::Alert(time) => {
            player.record_alert_at(time)?;
        }
        Action::End => {
            player.video_ended().await?;
        }
        Action::Retry => player.retry()?,
        Action::Replay(target) => {
            let segment = player.replay_segment(target)?;
            println!("  replaying {:?}", segment.title());
            player.settle_replay().await;
        }
        Action::Wait(duration) => tokio::time::sleep(duration).await,
    }
    Ok(())
}

fn report(player: &Player) {
    let phase = match (player.position(), player.screen()) {
        (ScreenPosition::Screen(_), Some(screen)) => format!(" {:?}", screen.phase()),
        _ => String::new(),
    };
    println!(
        "[{}{}] status={} progress={:.0}%",
        player.position(),
        phase,
        player.status(),
        player.progress_percent()
    );
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = PlayerConfig::from_env()?;
    init_tracing(config.debug);

    let mut argv = std::env::args().skip(1);
    let command = match argv.next() {
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
    let args = Args::parse(command, &config, &mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let course = Course::from_json(&std::fs::read_to_string(&args.course)?)?;
    let cache = Arc::new(JsonFileCache::open(&args.cache_path)?);
    let store = match args.scorm_version {
        Some(version) => Some(open_store(&args, version).await?),
        None => None,
    };
    info!(
        course = course.title(),
        scorm = ?args.scorm_version,
        "session backends ready"
    );

    let bootstrap = SessionBootstrap::new(cache, store, config.home_page.clone());
    let Some(resume) = resolve(&bootstrap, &args).await? else {
        eprintln!("No learner on record: pass --name and --email to log in.");
        std::process::exit(1);
    };

    match command {
        Command::Status => status(&course, &bootstrap, &resume).await,
        Command::Play => {
            let path = args.script.as_ref().ok_or(ArgsError::MissingScript)?;
            let actions = script::parse(&std::fs::read_to_string(path)?)?;
            play(course, &config, &bootstrap, resume, actions).await
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
