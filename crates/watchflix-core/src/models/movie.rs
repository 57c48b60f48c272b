use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Genre {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
}

/// A catalog entry. The API sends several shapes of the same movie (full
/// detail, list summary, vector search payload, graph recommendation row);
/// fields missing from a shape stay at their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub release_year: Option<i32>,
    /// Minutes
    #[serde(default)]
    pub duration: Option<i32>,
    #[serde(default, alias = "plot")]
    pub synopsis: Option<String>,
    #[serde(default, alias = "imdbId")]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub poster_url: Option<String>,
    // {"name": ..} objects on detail, bare names on summaries
    #[serde(default, deserialize_with = "genre_names")]
    pub genres: Vec<String>,
    #[serde(default, deserialize_with = "super::decimal")]
    pub avg_rating: Option<f64>,
    #[serde(default)]
    pub popularity: Option<i64>,
    #[serde(default, deserialize_with = "super::lenient_vec")]
    pub actors: Vec<Person>,
    #[serde(default, deserialize_with = "super::lenient_vec")]
    pub directors: Vec<Person>,
}

impl Movie {
    pub fn has_any_genre(&self, genres: &[String]) -> bool {
        self.genres.iter().any(|g| genres.contains(g))
    }

    pub fn display_title(&self) -> String {
        match self.release_year {
            Some(year) => format!("{} ({})", self.title, year),
            None => self.title.clone(),
        }
    }
}

fn genre_names<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum GenreRef {
        Name(String),
        Named { name: String },
    }

    Ok(Option::<Vec<GenreRef>>::deserialize(deserializer)?
        .unwrap_or_default()
        .into_iter()
        .map(|g| match g {
            GenreRef::Name(name) | GenreRef::Named { name } => name,
        })
        .collect())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieTitle {
    pub id: i64,
    pub title: String,
}

/// An actor or director.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub birth_year: Option<i32>,
    #[serde(default)]
    pub movies: Vec<MovieTitle>,
}

impl Person {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonKind {
    Actor,
    Director,
}

impl PersonKind {
    /// Collection segment in API paths
    pub fn collection(self) -> &'static str {
        match self {
            PersonKind::Actor => "actors",
            PersonKind::Director => "directors",
        }
    }

    /// Profile action segment used to follow this kind of person
    pub fn follow_action(self) -> &'static str {
        match self {
            PersonKind::Actor => "follow-actor",
            PersonKind::Director => "follow-director",
        }
    }
}

impl fmt::Display for PersonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersonKind::Actor => write!(f, "Actor"),
            PersonKind::Director => write!(f, "Director"),
        }
    }
}

/// Filmography of an actor or director.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonMovies {
    #[serde(default, deserialize_with = "super::lenient_vec")]
    pub movies: Vec<Movie>,
    #[serde(default)]
    pub genres: Vec<String>,
}

/// Reply to an admin "add movie from IMDb" request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieAdded {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub movie: Option<serde_json::Value>,
}
