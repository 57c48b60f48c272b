//! Command handlers. Each one performs its calls and prints plain text.

use std::io::{self, Write};

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use tracing::warn;

use watchflix_core::api::{Landing, SearchBy};
use watchflix_core::auth::SessionStatus;
use watchflix_core::models::{
    all_genres, Movie, MovieFilter, MovieSortColumn, Person, PersonKind, ProfileUpdate,
    RecommendationKind, RegistrationProfile, SortOrder,
};
use watchflix_core::utils::{format_date, format_duration, format_optional, format_rating, truncate_string};
use watchflix_core::{ApiClient, Config};

use crate::{AdminCommand, Command, RecommendCommand};

/// Environment variable read instead of prompting for a password
const PASSWORD_ENV: &str = "WATCHFLIX_PASSWORD";

/// Width of the title column in movie listings
const TITLE_WIDTH: usize = 40;

pub async fn run(command: Command, api: &ApiClient, config: &mut Config) -> Result<()> {
    match command {
        Command::Login { username } => login(api, config, username).await,
        Command::Logout => {
            api.session().logout();
            println!("Logged out.");
            Ok(())
        }
        Command::Status => status(api, config),
        Command::Register => register(api).await,
        Command::Plans => plans(api).await,
        Command::Movies { genres, sort, desc } => movies(api, genres, sort, desc).await,
        Command::Movie { id } => movie(api, id).await,
        Command::Search { query, plot } => search(api, &query, plot).await,
        Command::Actor { id } => person(api, PersonKind::Actor, id).await,
        Command::Director { id } => person(api, PersonKind::Director, id).await,
        Command::Follow { kind, id } => {
            let username = current_user(api)?;
            let message = api.follow(kind.into(), id, &username).await?;
            println!("{}", message);
            Ok(())
        }
        Command::Reviews { movie } => reviews(api, movie).await,
        Command::Review { movie, text } => {
            let username = current_user(api)?;
            api.post_review(&username, movie, &text).await?;
            println!("Review posted.");
            Ok(())
        }
        Command::EditReview { id, text } => {
            current_user(api)?;
            api.edit_review(id, &text).await?;
            println!("Review updated.");
            Ok(())
        }
        Command::DeleteReview { id } => {
            current_user(api)?;
            api.delete_review(id).await?;
            println!("Review deleted.");
            Ok(())
        }
        Command::Rate { movie, rating } => {
            let username = current_user(api)?;
            api.rate_movie(&username, movie, rating).await?;
            println!("Rated {}.", format_rating(Some(rating)));
            Ok(())
        }
        Command::History {
            username,
            genres,
            sort,
            desc,
        } => history(api, username, sort_filter(genres, sort, desc)).await,
        Command::Recommend { kind } => recommend(api, kind).await,
        Command::Profile { username } => profile(api, username).await,
        Command::EditProfile => edit_profile(api).await,
        Command::Genres => {
            for genre in api.fetch_genres().await? {
                println!("{}", genre.name);
            }
            Ok(())
        }
        Command::Admin { cmd } => admin(api, cmd).await,
        Command::Watch => watch(api).await,
    }
}

fn current_user(api: &ApiClient) -> Result<String> {
    api.session()
        .require_authenticated()
        .map_err(|_| anyhow!("Not logged in. Run `watchflix login` first."))
}

fn prompt(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn prompt_with_default(label: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(default) => {
            let input = prompt(&format!("{} [{}]", label, default))?;
            Ok(if input.is_empty() { default.to_string() } else { input })
        }
        None => prompt(label),
    }
}

fn sort_filter(genres: Vec<String>, sort: MovieSortColumn, desc: bool) -> MovieFilter {
    MovieFilter {
        genres,
        sort,
        order: if desc {
            SortOrder::Descending
        } else {
            SortOrder::Ascending
        },
    }
}

/// Empty input clears an optional field.
fn non_empty(input: String) -> Option<String> {
    if input.is_empty() {
        None
    } else {
        Some(input)
    }
}

// ============================================================================
// Session
// ============================================================================

async fn login(api: &ApiClient, config: &mut Config, username: Option<String>) -> Result<()> {
    let username = match username {
        Some(username) => username,
        None => prompt_with_default("Username", config.last_username.as_deref())?,
    };
    let password = match std::env::var(PASSWORD_ENV) {
        Ok(password) => password,
        Err(_) => rpassword::prompt_password("Password: ")?,
    };

    println!("Authenticating...");
    let outcome = api.session().login(&username, &password).await;
    if !outcome.success {
        bail!(outcome.message);
    }

    config.last_username = Some(username.clone());
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }

    match api.landing_for(&username).await {
        Landing::Admin => println!("Logged in as {} (administrator).", username),
        Landing::Home => println!("Logged in as {}.", username),
    }
    Ok(())
}

fn status(api: &ApiClient, config: &Config) -> Result<()> {
    let state = api.session().state();
    match state.username() {
        Some(username) if !username.is_empty() => println!("Logged in as {}", username),
        Some(_) => println!("Logged in"),
        None => println!("Not logged in"),
    }
    println!("Server:  {}", config.api_base_url);
    println!("Storage: {:?}", config.token_storage);
    Ok(())
}

async fn register(api: &ApiClient) -> Result<()> {
    let plans = api.fetch_subscription_plans().await?;
    if plans.is_empty() {
        bail!("The server offers no subscription plans");
    }

    println!("\n=== Create a Watchflix account ===\n");
    let username = prompt("Username")?;
    let email = prompt("Email")?;
    let first_name = prompt("First name")?;
    let last_name = prompt("Last name")?;
    let birth_date = prompt("Birth date (YYYY-MM-DD)")?;
    let birth_date = NaiveDate::parse_from_str(&birth_date, "%Y-%m-%d")
        .with_context(|| format!("Invalid birth date: {}", birth_date))?;

    println!();
    for plan in &plans {
        println!("  {}) {} - {}", plan.id, plan.name, plan.display_price());
    }
    let choice = prompt("Plan")?;
    let subscription_plan: i64 = choice
        .parse()
        .ok()
        .filter(|id| plans.iter().any(|p| p.id == *id))
        .ok_or_else(|| anyhow!("Unknown plan: {}", choice))?;

    let password = rpassword::prompt_password("Password: ")?;
    let confirm = rpassword::prompt_password("Confirm password: ")?;
    if password != confirm {
        bail!("Passwords do not match");
    }

    let profile = RegistrationProfile {
        username,
        password,
        email,
        first_name,
        last_name,
        birth_date,
        subscription_plan,
    };
    let outcome = api.session().register(&profile).await;
    if !outcome.success {
        bail!(outcome.message);
    }
    println!("Account created. Run `watchflix login {}` to sign in.", profile.username);
    Ok(())
}

async fn watch(api: &ApiClient) -> Result<()> {
    let session = api.session();
    let username = current_user(api)?;

    let _refresher = session.spawn_background_refresh();
    let mut states = session.subscribe();
    println!(
        "Keeping {}'s session alive (refresh every {} min). Ctrl+C to stop.",
        username,
        session.options().refresh_interval.as_secs() / 60
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = states.borrow_and_update().status();
                let now = chrono::Local::now().format("%H:%M:%S");
                match status {
                    SessionStatus::RefreshInFlight => println!("[{}] Refreshing access token", now),
                    SessionStatus::Authenticated => println!("[{}] Session active", now),
                    SessionStatus::Anonymous => {
                        println!("[{}] Session ended", now);
                        bail!("Logged out. Run `watchflix login` to sign in again.");
                    }
                }
            }
            _ = &mut ctrl_c => break,
        }
    }
    Ok(())
}

// ============================================================================
// Catalog
// ============================================================================

fn print_movies(movies: &[Movie]) {
    for movie in movies {
        println!(
            "{:>5}  {:<width$}  {:>7}  {}",
            movie.id,
            truncate_string(&movie.display_title(), TITLE_WIDTH),
            format_rating(movie.avg_rating),
            movie.genres.join(", "),
            width = TITLE_WIDTH
        );
    }
}

fn print_people(label: &str, people: &[Person]) {
    if people.is_empty() {
        return;
    }
    let names: Vec<String> = people
        .iter()
        .map(|p| format!("{} (#{})", p.full_name(), p.id))
        .collect();
    println!("{}: {}", label, names.join(", "));
}

async fn plans(api: &ApiClient) -> Result<()> {
    for plan in api.fetch_subscription_plans().await? {
        println!("{}) {} - {}", plan.id, plan.name, plan.display_price());
        for feature in &plan.features {
            println!("     * {}", feature.description);
        }
    }
    Ok(())
}

async fn movies(
    api: &ApiClient,
    genres: Vec<String>,
    sort: MovieSortColumn,
    desc: bool,
) -> Result<()> {
    let mut movies = api.fetch_movies().await?;
    if sort == MovieSortColumn::Popularity {
        api.fill_popularity(&mut movies).await;
    }

    let shown = sort_filter(genres, sort, desc).apply(&movies);
    if shown.is_empty() {
        println!("No movies match. Genres: {}", all_genres(&movies).join(", "));
    } else {
        print_movies(&shown);
    }
    Ok(())
}

async fn movie(api: &ApiClient, id: i64) -> Result<()> {
    let movie = api.fetch_movie(id).await?;

    println!("{}", movie.display_title());
    println!(
        "{}  |  {}  |  {}",
        format_duration(movie.duration),
        format_rating(movie.avg_rating),
        movie.genres.join(", ")
    );
    print_people("Directed by", &movie.directors);
    print_people("Starring", &movie.actors);
    if let Some(ref synopsis) = movie.synopsis {
        println!("\n{}", synopsis);
    }

    if let Some(username) = api.session().username() {
        let watched = api.check_watched(id, &username).await?;
        if watched.watched {
            println!("\nYou watched this ({})", format_rating(watched.rating));
        }
    }
    Ok(())
}

async fn search(api: &ApiClient, query: &str, plot: bool) -> Result<()> {
    let by = if plot { SearchBy::Plot } else { SearchBy::Title };
    let found = api.search_movies(query, by).await?;
    if found.is_empty() {
        println!("No movies found.");
    } else {
        print_movies(&found);
    }
    Ok(())
}

async fn person(api: &ApiClient, kind: PersonKind, id: i64) -> Result<()> {
    let person = api.fetch_person(kind, id).await?;
    let filmography = api.fetch_person_movies(kind, id).await?;

    println!("{}: {}", kind, person.full_name());
    if let Some(year) = person.birth_year {
        println!("Born {}", year);
    }
    if let Some(username) = api.session().username() {
        if api.is_following(kind, id, &username).await? {
            println!("(following)");
        }
    }
    println!();
    print_movies(&filmography.movies);
    Ok(())
}

async fn reviews(api: &ApiClient, movie: i64) -> Result<()> {
    let reviews = api.fetch_movie_reviews(movie).await?;
    if reviews.is_empty() {
        println!("No reviews yet.");
    }
    let me = api.session().username();
    for review in &reviews {
        let mine = me.as_deref().is_some_and(|u| review.is_by(u));
        println!(
            "#{} {}{} - {}",
            review.id,
            review.author(),
            if mine { " (you)" } else { "" },
            review.date.as_deref().map(format_date).unwrap_or_default()
        );
        println!("    {}", review.text);
    }
    Ok(())
}

async fn history(api: &ApiClient, username: Option<String>, filter: MovieFilter) -> Result<()> {
    let username = match username {
        Some(username) => username,
        None => current_user(api)?,
    };
    let mut history = api.fetch_watch_history(&username).await?;
    if history.user_watched_movies.is_empty() {
        println!("{} hasn't watched anything yet.", username);
        return Ok(());
    }
    if filter.sort == MovieSortColumn::Popularity {
        let mut watched: Vec<Movie> = history
            .user_watched_movies
            .iter()
            .map(|e| e.movie.clone())
            .collect();
        api.fill_popularity(&mut watched).await;
        for (entry, movie) in history.user_watched_movies.iter_mut().zip(watched) {
            entry.movie = movie;
        }
    }

    let shown = filter.apply(&history.user_watched_movies);
    if shown.is_empty() {
        println!(
            "Nothing in {}'s history matches. Genres: {}",
            username,
            all_genres(&history.user_watched_movies).join(", ")
        );
    }
    for entry in &shown {
        println!(
            "{:<12}  {:<width$}  {}",
            entry.timestamp.as_deref().map(format_date).unwrap_or_default(),
            truncate_string(&entry.movie.display_title(), TITLE_WIDTH),
            format_rating(entry.rating),
            width = TITLE_WIDTH
        );
    }
    Ok(())
}

async fn recommend(api: &ApiClient, kind: Option<RecommendCommand>) -> Result<()> {
    let username = current_user(api)?;
    let kind = match kind {
        None | Some(RecommendCommand::User) => RecommendationKind::UserBased,
        Some(RecommendCommand::Follows) => RecommendationKind::FollowBased,
        Some(RecommendCommand::Similar { movie }) => RecommendationKind::Similar(movie),
    };

    let recs = api.fetch_recommendations(kind, &username).await?;
    println!("{}\n", kind.title());
    if recs.recommendations.is_empty() {
        println!("Nothing to recommend yet. Rate a few movies first.");
    } else {
        print_movies(&recs.recommendations);
    }
    Ok(())
}

async fn profile(api: &ApiClient, username: Option<String>) -> Result<()> {
    let username = match username {
        Some(username) => username,
        None => current_user(api)?,
    };
    let profile = api.fetch_profile(&username).await?;

    println!("{} ({})", profile.user.full_name(), profile.username());
    println!("Email:  {}", format_optional(&profile.user.email, "-"));
    if let Some(ref born) = profile.birth_date {
        println!("Born:   {}", format_date(born));
    }
    if let Some(ref plan) = profile.subscription_plan {
        println!("Plan:   {} ({})", plan.name, plan.display_price());
    }
    print_people("Following actors", &profile.followed_actors);
    print_people("Following directors", &profile.followed_directors);
    Ok(())
}

async fn edit_profile(api: &ApiClient) -> Result<()> {
    let username = current_user(api)?;
    let profile = api.fetch_profile(&username).await?;
    let mut update = ProfileUpdate::from(&profile);

    println!("Press Enter to keep the current value.\n");
    update.user.first_name = non_empty(prompt_with_default(
        "First name",
        update.user.first_name.as_deref(),
    )?);
    update.user.last_name = non_empty(prompt_with_default(
        "Last name",
        update.user.last_name.as_deref(),
    )?);
    update.user.email = non_empty(prompt_with_default("Email", update.user.email.as_deref())?);

    let birth_date = non_empty(prompt_with_default(
        "Birth date (YYYY-MM-DD)",
        update.birth_date.as_deref(),
    )?);
    if let Some(ref date) = birth_date {
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .with_context(|| format!("Invalid birth date: {}", date))?;
    }
    update.birth_date = birth_date;

    let saved = api.update_profile(&username, &update).await?;
    println!("Profile updated: {} ({})", saved.user.full_name(), saved.username());
    Ok(())
}

// ============================================================================
// Administration
// ============================================================================

async fn admin(api: &ApiClient, cmd: AdminCommand) -> Result<()> {
    let username = current_user(api)?;
    if !api.is_admin(&username).await? {
        bail!("{} is not an administrator", username);
    }

    match cmd {
        AdminCommand::Users => {
            for profile in api.fetch_profiles().await? {
                println!(
                    "{:<20}  {:<30}  {}",
                    profile.username(),
                    format_optional(&profile.user.email, "-"),
                    profile.created_at.as_deref().map(format_date).unwrap_or_default()
                );
            }
        }
        AdminCommand::DeleteUser { username } => {
            api.delete_profile(&username).await?;
            println!("Deleted user {}.", username);
        }
        AdminCommand::AddMovie { url } => {
            let added = api.add_movie_by_imdb(&url).await?;
            println!("{}", added.message);
            if let Some(movie) = added.movie {
                println!("{}", serde_json::to_string_pretty(&movie)?);
            }
        }
        AdminCommand::DeleteMovie { id } => {
            api.delete_movie(id).await?;
            println!("Deleted movie {}.", id);
        }
    }
    Ok(())
}
