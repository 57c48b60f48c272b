use serde::{Deserialize, Serialize};

use super::movie::Movie;

/// Which recommender to ask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommendationKind {
    /// Movies watched by users with overlapping history
    UserBased,
    /// Movies featuring followed actors and directors
    FollowBased,
    /// Movies with a similar plot to the given one
    Similar(i64),
}

impl RecommendationKind {
    pub fn title(&self) -> &'static str {
        match self {
            RecommendationKind::UserBased => "Viewers like you also watched",
            RecommendationKind::FollowBased => "From people you follow",
            RecommendationKind::Similar(_) => "Similar movies",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Recommendations {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub movie_id: Option<i64>,
    #[serde(default, deserialize_with = "super::lenient_vec")]
    pub recommendations: Vec<Movie>,
    #[serde(default)]
    pub genres: Vec<String>,
}
