use std::fmt;

use backend::config::ENV_API_TOKEN;
use backend::{BackendConfig, InMemoryBackend};
use quiz_core::model::{Answer, QuestionId, QuizResults, UserId};
use services::{AppServices, AutosaveConfig, Clock, QuizProgressStore};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_HISTORY_LIMIT: u32 = 10;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingUser,
    UnknownArg(String),
    InvalidUserId { raw: String },
    InvalidNumber { flag: &'static str, raw: String },
    InvalidAnswer { raw: String },
    InvalidResults { reason: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingUser => write!(f, "a user id is required (--user or QUIZ_USER_ID)"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidUserId { raw } => write!(f, "invalid user id: {raw}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidAnswer { raw } => {
                write!(f, "invalid answer `{raw}` (expected question=value)")
            }
            ArgsError::InvalidResults { reason } => write!(f, "invalid --results JSON: {reason}"),
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

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app resume  [common]");
    eprintln!("  app answer  [common] [--step <n>] <question>=<value>...");
    eprintln!("  app submit  [common] --results <json> [--with-image]");
    eprintln!("  app history [common] [--limit <n>]");
    eprintln!();
    eprintln!("Common options:");
    eprintln!("  --user <uuid>    user the quiz belongs to");
    eprintln!("  --api <url>      quiz API base URL");
    eprintln!("  --memory         use a throwaway in-memory backend");
    eprintln!();
    eprintln!("Answer values: `true`/`false`, numbers, `a,b,c` for several choices, else text.");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_API_BASE_URL, QUIZ_API_TOKEN, QUIZ_HTTP_TIMEOUT_SECS,");
    eprintln!("  QUIZ_AUTOSAVE_DELAY_MS, QUIZ_USER_ID, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Resume,
    Answer,
    Submit,
    History,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "resume" => Some(Self::Resume),
            "answer" => Some(Self::Answer),
            "submit" => Some(Self::Submit),
            "history" => Some(Self::History),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Args {
    user_id: UserId,
    api_url: Option<String>,
    in_memory: bool,
    step: Option<u32>,
    answers: Vec<(QuestionId, Answer)>,
    results: Option<QuizResults>,
    with_image: bool,
    limit: u32,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut user_id = std::env::var("QUIZ_USER_ID").ok();
        let mut api_url = None;
        let mut in_memory = false;
        let mut step = None;
        let mut answers = Vec::new();
        let mut results = None;
        let mut with_image = false;
        let mut limit = DEFAULT_HISTORY_LIMIT;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--user" => user_id = Some(require_value(args, "--user")?),
                "--api" => api_url = Some(require_value(args, "--api")?),
                "--memory" => in_memory = true,
                "--step" => {
                    let value = require_value(args, "--step")?;
                    step = Some(parse_number("--step", &value)?);
                }
                "--limit" => {
                    let value = require_value(args, "--limit")?;
                    limit = parse_number("--limit", &value)?;
                }
                "--results" => {
                    let value = require_value(args, "--results")?;
                    let json = serde_json::from_str(&value).map_err(|e| {
                        ArgsError::InvalidResults {
                            reason: e.to_string(),
                        }
                    })?;
                    results = Some(QuizResults::new(json));
                }
                "--with-image" => with_image = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                other if other.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => answers.push(parse_answer(&arg)?),
            }
        }

        let raw_user = user_id.ok_or(ArgsError::MissingUser)?;
        let user_id = raw_user
            .parse::<UserId>()
            .map_err(|_| ArgsError::InvalidUserId { raw: raw_user })?;

        Ok(Self {
            user_id,
            api_url,
            in_memory,
            step,
            answers,
            results,
            with_image,
            limit,
        })
    }
}

fn parse_number(flag: &'static str, raw: &str) -> Result<u32, ArgsError> {
    raw.trim().parse().map_err(|_| ArgsError::InvalidNumber {
        flag,
        raw: raw.to_string(),
    })
}

/// `question=value`, where the value picks the narrowest `Answer` shape.
fn parse_answer(raw: &str) -> Result<(QuestionId, Answer), ArgsError> {
    let invalid = || ArgsError::InvalidAnswer {
        raw: raw.to_string(),
    };
    let (key, value) = raw.split_once('=').ok_or_else(invalid)?;
    let question = QuestionId::new(key).map_err(|_| invalid())?;
    let value = value.trim();

    let answer = if let Ok(flag) = value.parse::<bool>() {
        Answer::Flag(flag)
    } else if let Ok(scale) = value.parse::<i64>() {
        Answer::Scale(scale)
    } else if let Some(level) = value.parse::<f64>().ok().filter(|v| v.is_finite()) {
        Answer::from(level)
    } else if value.contains(',') {
        Answer::choices(
            value
                .split(',')
                .map(str::trim)
                .filter(|choice| !choice.is_empty()),
        )
    } else {
        Answer::choice(value)
    };
    Ok((question, answer))
}

fn build_services(args: &Args) -> Result<AppServices, Box<dyn std::error::Error>> {
    let autosave = AutosaveConfig::from_env()?;
    if args.in_memory {
        debug!("using in-memory quiz backend");
        return Ok(AppServices::in_memory(
            InMemoryBackend::new(),
            autosave,
            Clock::System,
        ));
    }

    // --api overrides the base URL; the token still comes from the environment.
    let backend_config = match &args.api_url {
        Some(url) => BackendConfig::new(url.as_str())?
            .with_api_token(std::env::var(ENV_API_TOKEN).ok()),
        None => BackendConfig::from_env()?,
    };
    Ok(AppServices::new_http(backend_config, autosave, Clock::System)?)
}

fn print_progress(store: &QuizProgressStore) {
    println!("step: {}", store.current_step());
    for (question, answer) in store.answers().iter() {
        let rendered = serde_json::to_string(answer).unwrap_or_else(|_| format!("{answer:?}"));
        println!("  {question} = {rendered}");
    }
    match store.last_saved() {
        Some(at) => println!("last saved: {at}"),
        None => println!("last saved: never"),
    }
    println!("autosave: {}", store.autosave_status());
    if let Some(error) = store.error() {
        println!("error: {error}");
    }
}

/// Pull the server copy into `store`. A failed load is fatal so a later
/// autosave cannot overwrite progress that was never read.
async fn restore_progress(
    store: &QuizProgressStore,
    user_id: UserId,
) -> Result<bool, Box<dyn std::error::Error>> {
    if store.load_autosaved_quiz(user_id).await {
        return Ok(true);
    }
    match store.error() {
        Some(error) => Err(format!("could not load saved progress: {error}").into()),
        None => Ok(false),
    }
}

async fn execute(
    cmd: Command,
    args: Args,
    store: &QuizProgressStore,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        Command::Resume => {
            if !restore_progress(store, args.user_id).await? {
                println!("no saved progress for {}", args.user_id);
                return Ok(());
            }
            print_progress(store);
        }
        Command::Answer => {
            restore_progress(store, args.user_id).await?;
            if let Some(step) = args.step {
                store.set_current_step(step);
            }
            for (question, answer) in args.answers {
                store.set_answer(question, answer);
            }
            if !store.flush_autosave().await {
                return Err(store
                    .error()
                    .unwrap_or_else(|| "autosave failed".to_string())
                    .into());
            }
            print_progress(store);
        }
        Command::Submit => {
            let results = args.results.ok_or(ArgsError::MissingValue { flag: "--results" })?;
            restore_progress(store, args.user_id).await?;
            store.set_complete(results);
            if !store.save_quiz_attempt(args.user_id, args.with_image).await {
                return Err(store
                    .error()
                    .unwrap_or_else(|| "saving attempt failed".to_string())
                    .into());
            }
            if let Some(attempt) = store.last_attempt() {
                println!("saved attempt {} at {}", attempt.id, attempt.created_at);
            }
            if let Some(cleanup) = store.cleanup_error() {
                println!("note: saved progress was not cleared: {cleanup}");
            }
        }
        Command::History => {
            let attempts = store.fetch_attempt_history(args.user_id, args.limit).await?;
            if attempts.is_empty() {
                println!("no attempts for {}", args.user_id);
            }
            for attempt in attempts {
                let image = if attempt.has_image_analysis { " +photo" } else { "" };
                println!(
                    "{}  {}  step {}  {} answers{image}",
                    attempt.created_at,
                    attempt.id,
                    attempt.quiz_data.current_step,
                    attempt.quiz_data.answers.len()
                );
            }
        }
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
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

    let args = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let services = build_services(&args)?;
    let store = services.progress_store(args.user_id)?;
    execute(cmd, args, &store).await?;

    store.shutdown();
    info!(command = ?cmd, "done");
    Ok(())
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_logging();
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backend::{BackendError, BackendOp};
    use quiz_core::model::{AutosaveRecord, QuizSnapshot};
    use quiz_core::time::fixed_now;

    const USER: &str = "7f1c2a34-5b6d-4e8f-9a0b-1c2d3e4f5a6b";

    fn memory_args(extra: &[&str]) -> Args {
        let mut raw = vec!["--user".to_string(), USER.to_string(), "--memory".to_string()];
        raw.extend(extra.iter().map(|s| (*s).to_string()));
        Args::parse(&mut raw.into_iter()).unwrap()
    }

    fn backend_with_saved_progress(user: UserId) -> (InMemoryBackend, AutosaveRecord) {
        let backend = InMemoryBackend::new();
        let record = AutosaveRecord {
            quiz_data: QuizSnapshot {
                current_step: 6,
                answers: [(QuestionId::new("skin_type").unwrap(), Answer::choice("oily"))]
                    .into_iter()
                    .collect(),
            },
            updated_at: fixed_now(),
        };
        backend.seed_autosave(user, record.clone());
        (backend, record)
    }

    fn store_on(backend: &InMemoryBackend, user: UserId) -> QuizProgressStore {
        AppServices::in_memory(backend.clone(), AutosaveConfig::default(), Clock::System)
            .progress_store(user)
            .unwrap()
    }

    #[test]
    fn answer_values_pick_the_narrowest_shape() {
        let (q, a) = parse_answer("skin_type=oily").unwrap();
        assert_eq!(q.as_str(), "skin_type");
        assert_eq!(a, Answer::choice("oily"));

        assert_eq!(parse_answer("spf=true").unwrap().1, Answer::Flag(true));
        assert_eq!(parse_answer("sensitivity=4").unwrap().1, Answer::Scale(4));
        assert_eq!(parse_answer("hydration=2.5").unwrap().1, Answer::from(2.5));
        assert_eq!(parse_answer("note=inf").unwrap().1, Answer::choice("inf"));
        assert_eq!(
            parse_answer("concerns=acne, redness,").unwrap().1,
            Answer::choices(["acne", "redness"])
        );
    }

    #[test]
    fn malformed_answers_are_rejected() {
        assert!(matches!(parse_answer("oily"), Err(ArgsError::InvalidAnswer { .. })));
        assert!(matches!(parse_answer("=oily"), Err(ArgsError::InvalidAnswer { .. })));
    }

    #[test]
    fn args_parse_flags_and_answers() {
        let raw = [
            "--user",
            "7f1c2a34-5b6d-4e8f-9a0b-1c2d3e4f5a6b",
            "--memory",
            "--step",
            "3",
            "q1=dry",
        ];
        let mut iter = raw.iter().map(|s| (*s).to_string());
        let args = Args::parse(&mut iter).unwrap();

        assert!(args.in_memory);
        assert_eq!(args.step, Some(3));
        assert_eq!(args.answers.len(), 1);
        assert_eq!(args.limit, DEFAULT_HISTORY_LIMIT);
    }

    #[tokio::test]
    async fn answer_stops_when_saved_progress_cannot_be_loaded() {
        let user: UserId = USER.parse().unwrap();
        let (backend, record) = backend_with_saved_progress(user);
        backend.fail_next(BackendOp::FetchAutosave, BackendError::Transport("timeout".into()));
        let store = store_on(&backend, user);

        let err = execute(Command::Answer, memory_args(&["q1=dry"]), &store)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("timeout"));
        assert_eq!(backend.call_count(BackendOp::UpsertAutosave), 0);
        assert_eq!(backend.autosave_for(user), Some(record));
    }

    #[tokio::test]
    async fn submit_stops_when_saved_progress_cannot_be_loaded() {
        let user: UserId = USER.parse().unwrap();
        let (backend, record) = backend_with_saved_progress(user);
        backend.fail_next(BackendOp::FetchAutosave, BackendError::Transport("timeout".into()));
        let store = store_on(&backend, user);

        let result = execute(Command::Submit, memory_args(&["--results", "{}"]), &store).await;

        assert!(result.is_err());
        assert_eq!(backend.call_count(BackendOp::SaveAttempt), 0);
        assert_eq!(backend.autosave_for(user), Some(record));
    }

    #[tokio::test]
    async fn answer_builds_on_loaded_progress() {
        let user: UserId = USER.parse().unwrap();
        let (backend, _) = backend_with_saved_progress(user);
        let store = store_on(&backend, user);

        execute(Command::Answer, memory_args(&["q1=dry"]), &store)
            .await
            .unwrap();

        let saved = backend.autosave_for(user).unwrap().quiz_data;
        assert_eq!(saved.current_step, 6);
        assert_eq!(saved.answers.len(), 2);
    }
}
