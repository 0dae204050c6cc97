//! twt-dust - timeline and search lookups, tweeting, bulk retweets and replies

mod report;

use std::sync::Arc;

use clap::{CommandFactory, Parser, ValueEnum};
use libtwtdust::config::Config;
use libtwtdust::logging::LoggingConfig;
use libtwtdust::pacing::{Pacing, ShutdownFlag, ShutdownSleeper};
use libtwtdust::platforms::twitter::TwitterClient;
use libtwtdust::{Credentials, Dispatcher, DispatchResult, Result, TargetSelector, TwtDustError};
use tracing::{debug, info, warn};

use report::{OutputFormat, Reporter};

const DEFAULT_TWEET: &str = "Hello, my friends!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Command {
    /// Reply to a tweet, a user's recent tweets, or popular tweets of a topic
    Reply,
    /// Retweet a tweet, a user's recent tweets, or popular tweets of a topic
    Retweet,
    /// Search popular tweets of a topic
    Search,
    /// Get the timeline of a user
    Timeline,
    /// Create a new tweet
    Tweet,
    /// Show this help
    Help,
}

#[derive(Parser, Debug)]
#[command(name = "twt-dust")]
#[command(version)]
#[command(about = "Search timelines and popular tweets; tweet, retweet and reply in bulk")]
#[command(long_about = "\
twt-dust - Search timelines and popular tweets; tweet, retweet and reply in bulk

TARGETS (retweet, reply):
    --id ID             act on one tweet (reply also needs --user, the author)
    --user NAME         act on NAME's most recent --count tweets
    --popular TOPIC     act on popular tweets for TOPIC (when neither is given)

    Batches pause a random 5-20s between retweets and 15-40s between
    replies. Batch replies are prefixed with a random 8-letter tag.

CREDENTIALS:
    ACCESS_TOKEN, ACCESS_TOKEN_SECRET, API_KEY, API_KEY_SECRET

CONFIGURATION:
    Optional file: ~/.config/twtdust/config.toml (override with TWTDUST_CONFIG)

EXIT CODES:
    0 - Success
    1 - Configuration or platform error
    2 - Authentication error
    3 - Invalid input
")]
struct Cli {
    /// Command to run
    #[arg(value_enum)]
    command: Command,

    /// Count of tweets returned by timeline or popular search (max 200)
    #[arg(short, long)]
    count: Option<u32>,

    /// Tweet id to reply to or retweet
    #[arg(short, long)]
    id: Option<u64>,

    /// Language of the popular tweets (en or zh)
    #[arg(short, long)]
    language: Option<String>,

    /// Topic to search popular tweets for
    #[arg(short, long, default_value = "")]
    popular: String,

    /// Text of the tweet or reply
    #[arg(short, long, default_value = "")]
    text: String,

    /// Twitter user name
    #[arg(short, long)]
    user: Option<String>,

    /// Output format
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[arg(long, env = "ACCESS_TOKEN", hide_env_values = true, hide = true)]
    access_token: Option<String>,

    #[arg(long, env = "ACCESS_TOKEN_SECRET", hide_env_values = true, hide = true)]
    access_token_secret: Option<String>,

    #[arg(long, env = "API_KEY", hide_env_values = true, hide = true)]
    api_key: Option<String>,

    #[arg(long, env = "API_KEY_SECRET", hide_env_values = true, hide = true)]
    api_key_secret: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    LoggingConfig::from_env(cli.verbose).init();

    if cli.command == Command::Help {
        eprintln!("{}", Cli::command().render_long_help());
        return;
    }

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    for (var, value) in [
        ("ACCESS_TOKEN", &cli.access_token),
        ("ACCESS_TOKEN_SECRET", &cli.access_token_secret),
        ("API_KEY", &cli.api_key),
        ("API_KEY_SECRET", &cli.api_key_secret),
    ] {
        debug!("{}: {}", var, if value.is_some() { "set" } else { "unset" });
    }
    let credentials = Credentials::new(
        cli.access_token,
        cli.access_token_secret,
        cli.api_key,
        cli.api_key_secret,
    )?;

    let format: OutputFormat = cli.format.parse().map_err(TwtDustError::InvalidInput)?;
    let count = cli.count.unwrap_or(config.defaults.count);
    let language = cli
        .language
        .unwrap_or_else(|| config.defaults.language.code().to_string());

    let shutdown = ShutdownFlag::new();
    setup_signal_handlers(&shutdown)?;

    let client = TwitterClient::new(&config.api, credentials)?;
    let dispatcher = Dispatcher::new(client, Pacing::from(&config.pacing))
        .with_sleeper(Arc::new(ShutdownSleeper::new(shutdown)))
        .with_observer(Box::new(Reporter::new(format)));
    let reporter = Reporter::new(format);

    match cli.command {
        Command::Timeline => {
            let handle = cli.user.ok_or_else(|| {
                TwtDustError::InvalidInput("timeline needs --user".to_string())
            })?;
            let targets = dispatcher.run_timeline(&handle, count).await?;
            targets.iter().for_each(|t| reporter.target(t));
            reporter.count("user tweets", targets.len());
        }
        Command::Search => {
            let targets = dispatcher.run_search(&cli.popular, &language, count).await?;
            targets.iter().for_each(|t| reporter.target(t));
            reporter.count("popular tweets", targets.len());
        }
        Command::Tweet => {
            let text = if cli.text.is_empty() {
                DEFAULT_TWEET
            } else {
                cli.text.as_str()
            };
            dispatcher.run_tweet(text).await?;
        }
        Command::Retweet => {
            let selector =
                TargetSelector::from_parts(cli.id, cli.user, count, cli.popular, &language)?;
            let result = dispatcher.run_retweet(&selector).await?;
            summarize(&reporter, "retweets", &result);
        }
        Command::Reply => {
            let selector =
                TargetSelector::from_parts(cli.id, cli.user, count, cli.popular, &language)?;
            let result = dispatcher.run_reply(&selector, &cli.text).await?;
            summarize(&reporter, "replies", &result);
        }
        Command::Help => {}
    }

    Ok(())
}

fn summarize(reporter: &Reporter, label: &str, result: &DispatchResult) {
    reporter.count(label, result.len());
    info!(
        "{}: {} succeeded, {} skipped, {} failed{}",
        label,
        result.succeeded(),
        result.skipped(),
        result.failed(),
        if result.interrupted { " (interrupted)" } else { "" }
    );
}

/// Stop a running batch between items on SIGINT/SIGTERM
#[cfg(unix)]
fn setup_signal_handlers(shutdown: &ShutdownFlag) -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM])
        .map_err(|e| TwtDustError::InvalidInput(format!("Signal setup failed: {}", e)))?;

    let shutdown = shutdown.clone();
    std::thread::spawn(move || {
        if signals.forever().next().is_some() {
            warn!("Received shutdown signal, stopping after the current item...");
            shutdown.trigger();
        }
    });

    Ok(())
}

#[cfg(not(unix))]
fn setup_signal_handlers(_shutdown: &ShutdownFlag) -> Result<()> {
    Ok(())
}
