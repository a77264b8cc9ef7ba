//! LearnLog command line client
//!
//! Thin front end over the `learnlog_client` library: sign in, read the
//! cached views, submit entries through the vibe check, toggle the theme.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use learnlog_client::config::DEFAULT_API_URL;
use learnlog_client::{
    ClientConfig, JournalClient, Navigator, NewEntry, PreferenceStore, ProviderProfile,
    QueryState, Route, SessionToken, SubmissionState, ThemePreference,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// LearnLog - a journal that only keeps what you actually learned
#[derive(Parser, Debug)]
#[command(name = "learnlog")]
#[command(about = "Command line client for the LearnLog journal API")]
struct Args {
    /// API base URL, including the version prefix
    #[arg(long, env = "LEARNLOG_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Per-request transport timeout in milliseconds
    #[arg(long, env = "LEARNLOG_REQUEST_TIMEOUT_MS")]
    request_timeout_ms: Option<u64>,

    /// Upper bound on one entry submission in milliseconds
    #[arg(long, env = "LEARNLOG_SUBMIT_TIMEOUT_MS")]
    submit_timeout_ms: Option<u64>,

    /// Age in milliseconds after which cached views are refetched (0 = never)
    #[arg(long, env = "LEARNLOG_STALE_AFTER_MS")]
    stale_after_ms: Option<u64>,

    /// Where the session token is kept between runs
    #[arg(long, env = "LEARNLOG_SESSION_FILE", default_value = ".learnlog/session.json")]
    session_file: PathBuf,

    /// Where local preferences are kept
    #[arg(long, env = "LEARNLOG_PREFS_FILE", default_value = ".learnlog/prefs.json")]
    prefs_file: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Complete sign-in with an identity from the OAuth provider
    SignIn {
        #[arg(long)]
        provider: String,
        #[arg(long)]
        subject_id: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        image: Option<String>,
    },
    /// Forget the stored session
    SignOut,
    /// Show who is signed in
    Whoami,
    /// List journal entries
    Entries,
    /// Show the current streak
    Streak,
    /// List achievements
    Achievements,
    /// Show analytics
    Analytics,
    /// Submit a new entry
    Submit {
        /// Entry text
        content: String,
    },
    /// Show or toggle the theme
    Theme {
        #[arg(long)]
        toggle: bool,
        /// Treat the system as preferring dark mode when nothing is stored
        #[arg(long)]
        system_dark: bool,
    },
}

struct PrintNavigator;

impl Navigator for PrintNavigator {
    fn navigate(&self, route: Route) {
        info!(route = route.path(), "Navigate");
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("learnlog_client={},learnlog={},warn", args.log_level, args.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = client_config(&args);
    let client = JournalClient::new(config).context("invalid client configuration")?;
    debug!(base_url = %client.config().base_url, "Client ready");

    if let Some(token) = load_session(&args.session_file)? {
        client.restore(token).await;
    }

    match args.command {
        Command::SignIn {
            provider,
            subject_id,
            email,
            name,
            image,
        } => {
            let token = client
                .sign_in(ProviderProfile {
                    subject_id,
                    provider,
                    email,
                    name,
                    image,
                })
                .await;
            save_session(&args.session_file, &token)?;
            match &token.backend_user_id {
                Some(id) => println!("Signed in as {}", id),
                None => println!("Signed in, but the backend identity is not available yet"),
            }
        }
        Command::SignOut => {
            client.sign_out().await;
            if args.session_file.exists() {
                std::fs::remove_file(&args.session_file)
                    .with_context(|| format!("removing {}", args.session_file.display()))?;
            }
            println!("Signed out");
        }
        Command::Whoami => {
            let user = client.current_user().await;
            println!("state: {:?}", user.auth_state);
            if let Some(profile) = &user.profile {
                println!("provider: {} ({})", profile.provider, profile.subject_id);
                if let Some(email) = &profile.email {
                    println!("email: {}", email);
                }
            }
            match &user.backend_user_id {
                Some(id) => println!("backend id: {}", id),
                None => println!("backend id: <not available>"),
            }
        }
        Command::Entries => print_state(client.entries().await)?,
        Command::Streak => print_state(client.streak().await)?,
        Command::Achievements => print_state(client.achievements().await)?,
        Command::Analytics => {
            let snapshot = client.analytics().await;
            print_state(snapshot.stats)?;
            print_state(snapshot.summary)?;
            print_state(snapshot.activity)?;
        }
        Command::Submit { content } => {
            let draft = NewEntry::new(content.clone(), chrono::Local::now().date_naive());
            if let Err(issue) = draft.precheck() {
                anyhow::bail!("{}", issue);
            }

            let user_id = client.identity().backend_user_id().await;
            let pipeline = client.submission_pipeline(Arc::new(PrintNavigator));
            eprintln!("Analyzing...");
            match pipeline.submit(user_id.as_ref(), &content).await {
                SubmissionState::Succeeded(entry) => {
                    println!("Saved entry {} ({} words)", entry.id, entry.word_count)
                }
                SubmissionState::Failed(feedback) => {
                    println!("{}", feedback.headline);
                    println!("{}", feedback.detail);
                    return Ok(ExitCode::from(2));
                }
                SubmissionState::Idle | SubmissionState::Submitting => {}
            }
        }
        Command::Theme {
            toggle,
            system_dark,
        } => {
            let mut theme = ThemePreference::load(PreferenceStore::new(&args.prefs_file), system_dark)?;
            if toggle {
                theme.toggle()?;
            }
            println!("{}", theme.current());
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn client_config(args: &Args) -> ClientConfig {
    ClientConfig {
        base_url: args.api_url.clone(),
        request_timeout: args.request_timeout_ms.map(Duration::from_millis),
        submission_timeout: args.submit_timeout_ms.map(Duration::from_millis),
        stale_after: match args.stale_after_ms {
            Some(0) => None,
            Some(ms) => Some(Duration::from_millis(ms)),
            None => ClientConfig::default().stale_after,
        },
    }
}

fn print_state<T: Serialize>(state: QueryState<T>) -> Result<()> {
    match state {
        QueryState::Disabled => println!("Not signed in (no backend identity); nothing requested"),
        QueryState::Pending => println!("Loading..."),
        QueryState::Ready { data, .. } => println!("{}", serde_json::to_string_pretty(&data)?),
        QueryState::Failed(e) => anyhow::bail!(e),
    }
    Ok(())
}

fn load_session(path: &Path) -> Result<Option<SessionToken>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let token = serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    Ok(Some(token))
}

fn save_session(path: &Path, token: &SessionToken) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, serde_json::to_string_pretty(token)?)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_after_flag_reaches_config() {
        let args = Args::try_parse_from(["learnlog", "--stale-after-ms", "5000", "streak"]).unwrap();
        assert_eq!(client_config(&args).stale_after, Some(Duration::from_secs(5)));

        let args = Args::try_parse_from(["learnlog", "--stale-after-ms", "0", "streak"]).unwrap();
        assert_eq!(client_config(&args).stale_after, None);
    }

    #[test]
    fn test_defaults_without_flags() {
        let args = Args::try_parse_from(["learnlog", "--api-url", "http://localhost:9000/api/v1", "whoami"])
            .unwrap();
        let config = client_config(&args);
        assert_eq!(config.base_url, "http://localhost:9000/api/v1");
        assert_eq!(config.stale_after, ClientConfig::default().stale_after);
    }
}
