//! Genre filtering and sorting for movie lists.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::str::FromStr;

use super::movie::Movie;
use super::review::WatchEntry;

/// Anything listed as a movie card.
pub trait CatalogEntry {
    fn movie(&self) -> &Movie;
}

impl CatalogEntry for Movie {
    fn movie(&self) -> &Movie {
        self
    }
}

impl CatalogEntry for WatchEntry {
    fn movie(&self) -> &Movie {
        &self.movie
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MovieSortColumn {
    /// Keep the server's order
    #[default]
    Default,
    Year,
    AverageRating,
    Popularity,
}

impl FromStr for MovieSortColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "default" => Ok(MovieSortColumn::Default),
            "year" => Ok(MovieSortColumn::Year),
            "rating" | "avg_rating" => Ok(MovieSortColumn::AverageRating),
            "popularity" => Ok(MovieSortColumn::Popularity),
            other => Err(format!("unknown sort column: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Default)]
pub struct MovieFilter {
    /// Keep movies in any of these genres; empty keeps everything
    pub genres: Vec<String>,
    pub sort: MovieSortColumn,
    pub order: SortOrder,
}

impl MovieFilter {
    /// Add a genre, or remove it if already selected.
    pub fn toggle_genre(&mut self, genre: &str) {
        if let Some(pos) = self.genres.iter().position(|g| g == genre) {
            self.genres.remove(pos);
        } else {
            self.genres.push(genre.to_string());
        }
    }

    pub fn matches(&self, movie: &Movie) -> bool {
        self.genres.is_empty() || movie.has_any_genre(&self.genres)
    }

    /// Filtered and sorted copy of `entries`. Sorting is stable, and a
    /// missing year, rating or popularity counts as zero.
    pub fn apply<T: CatalogEntry + Clone>(&self, entries: &[T]) -> Vec<T> {
        let mut result: Vec<T> = entries
            .iter()
            .filter(|e| self.matches(e.movie()))
            .cloned()
            .collect();

        if self.sort != MovieSortColumn::Default {
            result.sort_by(|a, b| {
                let ordering = self.compare(a.movie(), b.movie());
                match self.order {
                    SortOrder::Ascending => ordering,
                    SortOrder::Descending => ordering.reverse(),
                }
            });
        }
        result
    }

    fn compare(&self, a: &Movie, b: &Movie) -> Ordering {
        match self.sort {
            MovieSortColumn::Default => Ordering::Equal,
            MovieSortColumn::Year => a.release_year.unwrap_or(0).cmp(&b.release_year.unwrap_or(0)),
            MovieSortColumn::AverageRating => a
                .avg_rating
                .unwrap_or(0.0)
                .total_cmp(&b.avg_rating.unwrap_or(0.0)),
            MovieSortColumn::Popularity => a.popularity.unwrap_or(0).cmp(&b.popularity.unwrap_or(0)),
        }
    }
}

/// Sorted, de-duplicated genres across a list.
pub fn all_genres<T: CatalogEntry>(entries: &[T]) -> Vec<String> {
    entries
        .iter()
        .flat_map(|e| e.movie().genres.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
