//! Watchflix - a command line client for the Watchflix movie catalog.
//!
//! Browse movies, write reviews, rate what you watched and get
//! recommendations. Login state persists between runs and access tokens
//! are refreshed automatically.

mod commands;

use std::io;
use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use watchflix_core::models::{MovieSortColumn, PersonKind};
use watchflix_core::{ApiError, Config};

/// Rolling log file name inside the data directory
const LOG_FILE_NAME: &str = "watchflix.log";

#[derive(Parser)]
#[command(name = "watchflix")]
#[command(about = "Watchflix movie catalog client")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Also write logs to a daily rolling file in the data directory
    #[arg(long, global = true)]
    log_file: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Log in and remember the session
    Login {
        /// Defaults to the last user who logged in
        username: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show who is logged in
    Status,
    /// Create an account
    Register,
    /// List subscription plans
    Plans,
    /// List movies
    Movies {
        /// Only show movies in this genre (repeatable)
        #[arg(long = "genre")]
        genres: Vec<String>,

        /// year, rating or popularity
        #[arg(long, default_value = "default")]
        sort: MovieSortColumn,

        /// Sort descending
        #[arg(long)]
        desc: bool,
    },
    /// Show a movie's details
    Movie { id: i64 },
    /// Search movies by title, or by plot with --plot
    Search {
        query: String,

        #[arg(long)]
        plot: bool,
    },
    /// Show an actor and their movies
    Actor { id: i64 },
    /// Show a director and their movies
    Director { id: i64 },
    /// Follow an actor or director
    Follow { kind: PersonArg, id: i64 },
    /// List reviews of a movie
    Reviews { movie: i64 },
    /// Review a movie
    Review { movie: i64, text: String },
    /// Replace the text of one of your reviews
    EditReview { id: i64, text: String },
    /// Delete one of your reviews
    DeleteReview { id: i64 },
    /// Rate a movie from 0 to 5
    Rate { movie: i64, rating: f64 },
    /// Show watched movies and ratings
    History {
        username: Option<String>,

        /// Only show movies in this genre (repeatable)
        #[arg(long = "genre")]
        genres: Vec<String>,

        /// year, rating or popularity
        #[arg(long, default_value = "default")]
        sort: MovieSortColumn,

        /// Sort descending
        #[arg(long)]
        desc: bool,
    },
    /// Get movie recommendations
    Recommend {
        #[command(subcommand)]
        kind: Option<RecommendCommand>,
    },
    /// Show a user profile
    Profile { username: Option<String> },
    /// Change your name, email or birth date
    EditProfile,
    /// List movie genres
    Genres,
    /// Administration
    Admin {
        #[command(subcommand)]
        cmd: AdminCommand,
    },
    /// Keep the session alive and report changes until Ctrl+C
    Watch,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum PersonArg {
    Actor,
    Director,
}

impl From<PersonArg> for PersonKind {
    fn from(arg: PersonArg) -> Self {
        match arg {
            PersonArg::Actor => PersonKind::Actor,
            PersonArg::Director => PersonKind::Director,
        }
    }
}

#[derive(Subcommand)]
pub enum RecommendCommand {
    /// Watched by users with similar taste
    User,
    /// Featuring actors and directors you follow
    Follows,
    /// Similar plot to a movie
    Similar { movie: i64 },
}

#[derive(Subcommand)]
pub enum AdminCommand {
    /// List all user profiles
    Users,
    /// Delete a user
    DeleteUser { username: String },
    /// Import a movie from its IMDb URL
    AddMovie { url: String },
    /// Delete a movie
    DeleteMovie { id: i64 },
}

/// Initialize the tracing subscriber for logging.
/// The returned guard flushes the log file on drop.
fn init_tracing(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            if e
                .downcast_ref::<ApiError>()
                .is_some_and(ApiError::requires_login)
            {
                eprintln!("Run `watchflix login` to sign in again.");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let log_dir = if cli.log_file {
        Some(Config::data_dir()?)
    } else {
        None
    };
    let _guard = init_tracing(log_dir.as_deref())?;

    let mut config = Config::load()?;
    info!(api = %config.api_base_url, "Watchflix starting");

    let api = config.connect()?;
    commands::run(cli.command, &api, &mut config).await
}
