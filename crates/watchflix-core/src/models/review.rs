use serde::{Deserialize, Serialize};

use super::account::User;
use super::movie::Movie;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewAuthor {
    #[serde(default)]
    pub id: Option<i64>,
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub user: ReviewAuthor,
    pub movie: i64,
    pub text: String,
    #[serde(default)]
    pub date: Option<String>,
}

impl Review {
    pub fn author(&self) -> &str {
        &self.user.user.username
    }

    pub fn is_by(&self, username: &str) -> bool {
        self.author() == username
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewReview {
    pub username: String,
    pub movie: i64,
    pub text: String,
}

/// Body of a rating submission. Rating a movie also records it as watched.
#[derive(Debug, Clone, Serialize)]
pub struct RatingUpdate {
    pub username: String,
    pub movie: i64,
    pub rating: f64,
}

/// Ratings are stars from 0 to 5
pub const MIN_RATING: f64 = 0.0;
pub const MAX_RATING: f64 = 5.0;

impl RatingUpdate {
    pub fn is_valid_rating(rating: f64) -> bool {
        rating.is_finite() && (MIN_RATING..=MAX_RATING).contains(&rating)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchEntry {
    pub movie: Movie,
    #[serde(default, deserialize_with = "super::decimal")]
    pub rating: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WatchHistory {
    #[serde(default)]
    pub username: String,
    #[serde(default, deserialize_with = "super::lenient_vec")]
    pub user_watched_movies: Vec<WatchEntry>,
    #[serde(default)]
    pub genres: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WatchStatus {
    pub watched: bool,
    #[serde(default, deserialize_with = "super::decimal")]
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Popularity {
    #[serde(default)]
    pub popularity: i64,
    #[serde(default)]
    pub detail: String,
}
