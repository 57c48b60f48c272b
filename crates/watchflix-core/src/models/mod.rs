//! Data models for Watchflix entities.
//!
//! This module contains the data structures returned by the REST API:
//!
//! - `Movie`, `Genre`, `Person`: catalog entries and cast/crew
//! - `Review`, `WatchEntry`, `WatchHistory`: reviews, ratings and viewing history
//! - `Recommendations`: personalized and content-based suggestions
//! - `UserProfile`, `SubscriptionPlan`, `RegistrationProfile`: accounts
//! - `MovieFilter`: client-side genre filtering and sorting of movie lists

pub mod account;
pub mod catalog;
pub mod movie;
pub mod recommendation;
pub mod review;

pub use account::{Feature, ProfileUpdate, RegistrationProfile, SubscriptionPlan, User, UserProfile};
pub use catalog::{all_genres, CatalogEntry, MovieFilter, MovieSortColumn, SortOrder};
pub use movie::{Genre, Movie, MovieAdded, MovieTitle, Person, PersonKind, PersonMovies};
pub use recommendation::{RecommendationKind, Recommendations};
pub use review::{NewReview, Popularity, RatingUpdate, Review, ReviewAuthor, WatchEntry, WatchHistory, WatchStatus};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use tracing::debug;

/// Decimal fields arrive as strings (`"4.25"`), numbers, or null.
pub(crate) fn decimal<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Raw::Text(s)) => s.trim().parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Deserialize a list, dropping entries that don't fit `T` instead of
/// failing the whole response. Graph queries can yield rows of nulls.
pub(crate) fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    let total = raw.len();
    let items: Vec<T> = raw
        .into_iter()
        .filter_map(|value| serde_json::from_value(value).ok())
        .collect();
    if items.len() < total {
        debug!(skipped = total - items.len(), "Dropped malformed list entries");
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Rated {
        #[serde(default, deserialize_with = "decimal")]
        rating: Option<f64>,
    }

    #[test]
    fn test_decimal_accepts_strings_numbers_and_null() {
        let parse = |json: &str| serde_json::from_str::<Rated>(json).unwrap().rating;
        assert_eq!(parse(r#"{"rating": "4.25"}"#), Some(4.25));
        assert_eq!(parse(r#"{"rating": 3}"#), Some(3.0));
        assert_eq!(parse(r#"{"rating": null}"#), None);
        assert_eq!(parse(r#"{"rating": ""}"#), None);
        assert_eq!(parse(r#"{}"#), None);
        assert!(serde_json::from_str::<Rated>(r#"{"rating": "abc"}"#).is_err());
    }
}
