//! Typed client for the Watchflix REST API.
//!
//! Every call goes through `SessionManager::send`, so an expired access
//! token is refreshed and the call resubmitted transparently. Non-2xx
//! responses come back as `ApiError` variants.

use futures::stream::{self, StreamExt};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::auth::SessionManager;
use crate::models::{
    Genre, Movie, MovieAdded, NewReview, Person, PersonKind, PersonMovies, Popularity,
    ProfileUpdate, RatingUpdate, RecommendationKind, Recommendations, Review, SubscriptionPlan,
    UserProfile, WatchHistory, WatchStatus,
};

use super::error::ApiError;
use super::transport::{ApiResponse, PendingRequest};

// ============================================================================
// Constants
// ============================================================================

/// Maximum concurrent popularity lookups when decorating a movie list.
/// Each lookup is a small aggregate query, so a handful in parallel keeps
/// list rendering quick without flooding the server.
const POPULARITY_CONCURRENCY: usize = 8;

#[derive(Debug, Deserialize)]
struct AdminFlag {
    #[serde(default)]
    is_admin: bool,
}

#[derive(Debug, Deserialize)]
struct FollowingFlag {
    #[serde(default)]
    is_following: bool,
}

#[derive(Debug, Default, Deserialize)]
struct Detail {
    #[serde(default)]
    detail: String,
}

/// Which field `search_movies` matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchBy {
    #[default]
    Title,
    /// Semantic match against plot summaries
    Plot,
}

impl SearchBy {
    fn as_str(self) -> &'static str {
        match self {
            SearchBy::Title => "title",
            SearchBy::Plot => "plot",
        }
    }
}

/// Where a user goes after logging in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Landing {
    Admin,
    Home,
}

/// API client for Watchflix.
/// Clone is cheap - the session is shared behind an Arc.
#[derive(Clone)]
pub struct ApiClient {
    session: SessionManager,
}

impl ApiClient {
    pub fn new(session: SessionManager) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    // ========================================================================
    // Request helpers
    // ========================================================================

    async fn execute(&self, request: PendingRequest) -> Result<ApiResponse, ApiError> {
        let path = request.path.clone();
        let response = self.session.send(request).await?;
        if !response.is_success() {
            debug!(path = %path, status = %response.status(), "Request failed");
        }
        response.error_for_status()
    }

    async fn get<T: DeserializeOwned>(&self, request: PendingRequest) -> Result<T, ApiError> {
        self.execute(request).await?.json()
    }

    /// Send and discard the body. Deletes answer 204 with nothing to parse.
    async fn send_unit(&self, request: PendingRequest) -> Result<(), ApiError> {
        self.execute(request).await.map(|_| ())
    }

    fn require_rating(rating: f64) -> Result<(), ApiError> {
        if RatingUpdate::is_valid_rating(rating) {
            Ok(())
        } else {
            Err(ApiError::InvalidInput(format!(
                "Rating must be between 0 and 5, got {}",
                rating
            )))
        }
    }

    // ========================================================================
    // Accounts
    // ========================================================================

    /// Plans offered at registration. Does not require login.
    pub async fn fetch_subscription_plans(&self) -> Result<Vec<SubscriptionPlan>, ApiError> {
        let request = PendingRequest::get("/accounts/subscription-plans/");
        self.session
            .send_public(request)
            .await?
            .error_for_status()?
            .json()
    }

    pub async fn fetch_profile(&self, username: &str) -> Result<UserProfile, ApiError> {
        self.get(PendingRequest::get(format!("/user-profiles/{}/", username)))
            .await
    }

    pub async fn update_profile(
        &self,
        username: &str,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, ApiError> {
        let request =
            PendingRequest::put(format!("/user-profiles/{}/", username)).with_json(update)?;
        self.get(request).await
    }

    pub async fn is_admin(&self, username: &str) -> Result<bool, ApiError> {
        let flag: AdminFlag = self
            .get(PendingRequest::get(format!(
                "/user-profiles/{}/is-admin/",
                username
            )))
            .await?;
        Ok(flag.is_admin)
    }

    /// Admins land on the admin view, everyone else on home. A failed
    /// lookup is not worth blocking login over.
    pub async fn landing_for(&self, username: &str) -> Landing {
        match self.is_admin(username).await {
            Ok(true) => Landing::Admin,
            Ok(false) => Landing::Home,
            Err(e) => {
                warn!(error = %e, username, "Admin check failed, landing on home");
                Landing::Home
            }
        }
    }

    // ========================================================================
    // Catalog
    // ========================================================================

    pub async fn fetch_movies(&self) -> Result<Vec<Movie>, ApiError> {
        self.get(PendingRequest::get("/movies/")).await
    }

    pub async fn fetch_movie(&self, id: i64) -> Result<Movie, ApiError> {
        self.get(PendingRequest::get(format!("/movies/{}/", id))).await
    }

    pub async fn search_movies(&self, query: &str, by: SearchBy) -> Result<Vec<Movie>, ApiError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ApiError::InvalidInput("Search query is empty".to_string()));
        }
        let request = PendingRequest::get("/movie/search/")
            .with_query("query", query)
            .with_query("searchBy", by.as_str());
        self.get(request).await
    }

    pub async fn fetch_genres(&self) -> Result<Vec<Genre>, ApiError> {
        self.get(PendingRequest::get("/genres/")).await
    }

    pub async fn fetch_person(&self, kind: PersonKind, id: i64) -> Result<Person, ApiError> {
        self.get(PendingRequest::get(format!("/{}/{}/", kind.collection(), id)))
            .await
    }

    pub async fn fetch_actor(&self, id: i64) -> Result<Person, ApiError> {
        self.fetch_person(PersonKind::Actor, id).await
    }

    pub async fn fetch_director(&self, id: i64) -> Result<Person, ApiError> {
        self.fetch_person(PersonKind::Director, id).await
    }

    pub async fn fetch_person_movies(
        &self,
        kind: PersonKind,
        id: i64,
    ) -> Result<PersonMovies, ApiError> {
        self.get(PendingRequest::get(format!(
            "/{}/{}/movies/",
            kind.collection(),
            id
        )))
        .await
    }

    pub async fn fetch_actor_movies(&self, id: i64) -> Result<PersonMovies, ApiError> {
        self.fetch_person_movies(PersonKind::Actor, id).await
    }

    pub async fn fetch_director_movies(&self, id: i64) -> Result<PersonMovies, ApiError> {
        self.fetch_person_movies(PersonKind::Director, id).await
    }

    // ========================================================================
    // Following
    // ========================================================================

    pub async fn is_following(
        &self,
        kind: PersonKind,
        id: i64,
        username: &str,
    ) -> Result<bool, ApiError> {
        let flag: FollowingFlag = self
            .get(PendingRequest::get(format!(
                "/{}/{}/is-following/{}/",
                kind.collection(),
                id,
                username
            )))
            .await?;
        Ok(flag.is_following)
    }

    pub async fn is_following_actor(&self, id: i64, username: &str) -> Result<bool, ApiError> {
        self.is_following(PersonKind::Actor, id, username).await
    }

    pub async fn is_following_director(&self, id: i64, username: &str) -> Result<bool, ApiError> {
        self.is_following(PersonKind::Director, id, username).await
    }

    /// Follow an actor or director. Returns the server's confirmation text.
    pub async fn follow(
        &self,
        kind: PersonKind,
        id: i64,
        username: &str,
    ) -> Result<String, ApiError> {
        let request = PendingRequest::post(format!(
            "/user-profiles/{}/{}/{}/",
            username,
            kind.follow_action(),
            id
        ));
        let response = self.execute(request).await?;
        Ok(response.json::<Detail>().unwrap_or_default().detail)
    }

    pub async fn follow_actor(&self, id: i64, username: &str) -> Result<String, ApiError> {
        self.follow(PersonKind::Actor, id, username).await
    }

    pub async fn follow_director(&self, id: i64, username: &str) -> Result<String, ApiError> {
        self.follow(PersonKind::Director, id, username).await
    }

    // ========================================================================
    // Reviews
    // ========================================================================

    pub async fn fetch_movie_reviews(&self, movie: i64) -> Result<Vec<Review>, ApiError> {
        self.get(PendingRequest::get(format!("/reviews/movie/{}/", movie)))
            .await
    }

    pub async fn post_review(
        &self,
        username: &str,
        movie: i64,
        text: &str,
    ) -> Result<(), ApiError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ApiError::InvalidInput("Review text is empty".to_string()));
        }
        let review = NewReview {
            username: username.to_string(),
            movie,
            text: text.to_string(),
        };
        self.send_unit(PendingRequest::post("/reviews/").with_json(&review)?)
            .await
    }

    pub async fn edit_review(&self, id: i64, text: &str) -> Result<(), ApiError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ApiError::InvalidInput("Review text is empty".to_string()));
        }
        let request =
            PendingRequest::patch(format!("/reviews/{}/", id)).with_body(json!({ "text": text }));
        self.send_unit(request).await
    }

    pub async fn delete_review(&self, id: i64) -> Result<(), ApiError> {
        self.send_unit(PendingRequest::delete(format!("/reviews/{}/", id)))
            .await
    }

    // ========================================================================
    // Watch history and ratings
    // ========================================================================

    pub async fn fetch_watch_history(&self, username: &str) -> Result<WatchHistory, ApiError> {
        self.get(PendingRequest::get(format!(
            "/watch-history/user/{}/",
            username
        )))
        .await
    }

    /// Rate a movie from 0 to 5, which also marks it watched.
    pub async fn rate_movie(&self, username: &str, movie: i64, rating: f64) -> Result<(), ApiError> {
        Self::require_rating(rating)?;
        let update = RatingUpdate {
            username: username.to_string(),
            movie,
            rating,
        };
        self.send_unit(PendingRequest::post("/watch-history/").with_json(&update)?)
            .await
    }

    pub async fn check_watched(&self, movie: i64, username: &str) -> Result<WatchStatus, ApiError> {
        let request = PendingRequest::get(format!("/watch-history/check-watched/{}/", movie))
            .with_query("user", username);
        self.get(request).await
    }

    pub async fn fetch_popularity(&self, movie: i64) -> Result<Popularity, ApiError> {
        self.get(PendingRequest::get(format!(
            "/watch-history/get-popularity/{}/",
            movie
        )))
        .await
    }

    /// Fill in `popularity` for movies that lack it. Lookups run
    /// concurrently; a failed lookup leaves the movie unchanged.
    pub async fn fill_popularity(&self, movies: &mut [Movie]) {
        let missing: Vec<(usize, i64)> = movies
            .iter()
            .enumerate()
            .filter(|(_, m)| m.popularity.is_none())
            .map(|(i, m)| (i, m.id))
            .collect();

        let results: Vec<(usize, Result<Popularity, ApiError>)> = stream::iter(missing)
            .map(|(index, id)| async move { (index, self.fetch_popularity(id).await) })
            .buffer_unordered(POPULARITY_CONCURRENCY)
            .collect()
            .await;

        for (index, result) in results {
            match result {
                Ok(popularity) => movies[index].popularity = Some(popularity.popularity),
                Err(e) => debug!(movie = movies[index].id, error = %e, "Popularity lookup failed"),
            }
        }
    }

    // ========================================================================
    // Recommendations
    // ========================================================================

    pub async fn fetch_recommendations(
        &self,
        kind: RecommendationKind,
        username: &str,
    ) -> Result<Recommendations, ApiError> {
        let path = match kind {
            RecommendationKind::UserBased => {
                format!("/recommendations/neo4j/user-based/{}/", username)
            }
            RecommendationKind::FollowBased => {
                format!("/recommendations/neo4j/follow-based/{}/", username)
            }
            RecommendationKind::Similar(movie) => {
                format!("/recommendations/qdrant/content-based/{}/", movie)
            }
        };
        self.get(PendingRequest::get(path)).await
    }

    pub async fn fetch_user_recommendations(
        &self,
        username: &str,
    ) -> Result<Recommendations, ApiError> {
        self.fetch_recommendations(RecommendationKind::UserBased, username)
            .await
    }

    pub async fn fetch_follow_recommendations(
        &self,
        username: &str,
    ) -> Result<Recommendations, ApiError> {
        self.fetch_recommendations(RecommendationKind::FollowBased, username)
            .await
    }

    pub async fn fetch_similar_movies(&self, movie: i64) -> Result<Recommendations, ApiError> {
        self.fetch_recommendations(RecommendationKind::Similar(movie), "")
            .await
    }

    // ========================================================================
    // Administration
    // ========================================================================

    pub async fn fetch_profiles(&self) -> Result<Vec<UserProfile>, ApiError> {
        self.get(PendingRequest::get("/user-profiles/")).await
    }

    pub async fn delete_profile(&self, username: &str) -> Result<(), ApiError> {
        self.send_unit(PendingRequest::delete(format!("/user-profiles/{}/", username)))
            .await
    }

    /// Import a movie from its IMDb page.
    pub async fn add_movie_by_imdb(&self, imdb_url: &str) -> Result<MovieAdded, ApiError> {
        let imdb_url = imdb_url.trim();
        if imdb_url.is_empty() {
            return Err(ApiError::InvalidInput("IMDb URL is required".to_string()));
        }
        let request = PendingRequest::post("/movie/add/").with_body(json!({ "imdb_url": imdb_url }));
        self.get(request).await
    }

    pub async fn delete_movie(&self, id: i64) -> Result<(), ApiError> {
        self.send_unit(PendingRequest::delete(format!("/movies/{}/", id)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use reqwest::Method;

    use super::*;
    use crate::api::fake::FakeTransport;
    use crate::auth::{Credential, MemoryTokenStore, SessionOptions, TokenStore};

    fn client(transport: &Arc<FakeTransport>) -> ApiClient {
        let store = Arc::new(MemoryTokenStore::new());
        store
            .save_credential(&Credential::new("neo", "a1", "r1"))
            .unwrap();
        ApiClient::new(SessionManager::new(
            transport.clone(),
            store,
            SessionOptions::default(),
        ))
    }

    fn movie_json(id: i64, title: &str) -> serde_json::Value {
        json!({"id": id, "title": title, "release_year": 1999, "genres": ["Action"],
               "avg_rating": "4.00", "poster_url": null})
    }

    #[tokio::test]
    async fn test_fetch_movies_sends_bearer() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond("/movies/", 200, json!([movie_json(1, "The Matrix")]));
        let api = client(&transport);

        let movies = api.fetch_movies().await.unwrap();

        assert_eq!(movies.len(), 1);
        assert_eq!(movies[0].title, "The Matrix");
        assert_eq!(transport.requests_to("/movies/")[0].bearer_token(), Some("a1"));
    }

    #[tokio::test]
    async fn test_subscription_plans_are_public() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(
            "/accounts/subscription-plans/",
            200,
            json!([{"id": 1, "name": "Basic", "price": "4.99", "features": []}]),
        );
        let api = client(&transport);

        let plans = api.fetch_subscription_plans().await.unwrap();

        assert_eq!(plans[0].name, "Basic");
        assert_eq!(transport.requests()[0].bearer_token(), None);
    }

    #[tokio::test]
    async fn test_search_query_parameters() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond("/movie/search/", 200, json!([movie_json(3, "Inception")]));
        let api = client(&transport);

        let found = api.search_movies("  dream heist ", SearchBy::Plot).await.unwrap();

        assert_eq!(found[0].id, 3);
        let sent = &transport.requests()[0];
        assert_eq!(
            sent.query,
            vec![
                ("query".to_string(), "dream heist".to_string()),
                ("searchBy".to_string(), "plot".to_string()),
            ]
        );

        assert!(matches!(
            api.search_movies("   ", SearchBy::Title).await,
            Err(ApiError::InvalidInput(_))
        ));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_person_paths() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond("/directors/4/is-following/neo/", 200, json!({"is_following": true}));
        transport.respond(
            "/user-profiles/neo/follow-actor/9/",
            200,
            json!({"detail": "You are now following Keanu Reeves."}),
        );
        transport.respond("/actors/9/movies/", 200, json!({"movies": [movie_json(1, "Speed")], "genres": ["Action"]}));
        let api = client(&transport);

        assert!(api.is_following_director(4, "neo").await.unwrap());
        assert_eq!(
            api.follow_actor(9, "neo").await.unwrap(),
            "You are now following Keanu Reeves."
        );
        let filmography = api.fetch_actor_movies(9).await.unwrap();
        assert_eq!(filmography.movies[0].title, "Speed");
        assert_eq!(
            transport.requests_to("/user-profiles/neo/follow-actor/9/")[0].method,
            Method::POST
        );
    }

    #[tokio::test]
    async fn test_rating_out_of_range_is_rejected_locally() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond("/watch-history/", 200, json!({"detail": "Watch history updated", "rating": 4.5}));
        let api = client(&transport);

        assert!(matches!(
            api.rate_movie("neo", 7, 6.0).await,
            Err(ApiError::InvalidInput(_))
        ));
        assert!(transport.requests().is_empty());

        api.rate_movie("neo", 7, 4.5).await.unwrap();
        assert_eq!(
            transport.requests()[0].body,
            Some(json!({"username": "neo", "movie": 7, "rating": 4.5}))
        );
    }

    #[tokio::test]
    async fn test_review_lifecycle() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond("/reviews/", 201, json!({}));
        transport.respond_text("/reviews/5/", 200, "{}");
        transport.respond_text("/reviews/5/", 204, "");
        let api = client(&transport);

        api.post_review("neo", 7, "Whoa.").await.unwrap();
        api.edit_review(5, "Whoa!").await.unwrap();
        api.delete_review(5).await.unwrap();

        let sent = transport.requests();
        assert_eq!(sent[0].body, Some(json!({"username": "neo", "movie": 7, "text": "Whoa."})));
        assert_eq!(sent[1].method, Method::PATCH);
        assert_eq!(sent[1].body, Some(json!({"text": "Whoa!"})));
        assert_eq!(sent[2].method, Method::DELETE);
    }

    #[tokio::test]
    async fn test_blank_review_edit_is_rejected_locally() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond_text("/reviews/5/", 200, "{}");
        let api = client(&transport);

        assert!(matches!(
            api.edit_review(5, "   ").await,
            Err(ApiError::InvalidInput(_))
        ));
        assert!(transport.requests().is_empty());

        api.edit_review(5, "  Whoa!\n").await.unwrap();
        assert_eq!(transport.requests()[0].body, Some(json!({"text": "Whoa!"})));
    }

    #[tokio::test]
    async fn test_update_profile_puts_whole_editable_part() {
        let transport = Arc::new(FakeTransport::new());
        let profile = json!({
            "id": 3,
            "user": {"username": "neo", "email": "neo@zion.io", "first_name": "Thomas", "last_name": "Anderson"},
            "birth_date": "1971-09-13",
            "subscription_plan": {"id": 1, "name": "Basic", "price": "4.99", "features": []},
        });
        transport.respond("/user-profiles/neo/", 200, profile.clone());
        let mut updated = profile;
        updated["user"]["first_name"] = json!("Neo");
        transport.respond("/user-profiles/neo/", 200, updated);
        let api = client(&transport);

        let current = api.fetch_profile("neo").await.unwrap();
        let mut update = ProfileUpdate::from(&current);
        update.user.first_name = Some("Neo".to_string());
        let saved = api.update_profile("neo", &update).await.unwrap();

        assert_eq!(saved.user.full_name(), "Neo Anderson");
        let sent = transport.requests_to("/user-profiles/neo/");
        assert_eq!(sent[1].method, Method::PUT);
        assert_eq!(sent[1].bearer_token(), Some("a1"));
        assert_eq!(
            sent[1].body,
            Some(json!({
                "user": {"username": "neo", "email": "neo@zion.io", "first_name": "Neo", "last_name": "Anderson"},
                "birth_date": "1971-09-13",
            }))
        );
    }

    #[tokio::test]
    async fn test_fetch_genres() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(
            "/genres/",
            200,
            json!([{"id": 1, "name": "Drama"}, {"name": "Sci-Fi"}]),
        );
        let api = client(&transport);

        let genres = api.fetch_genres().await.unwrap();

        assert_eq!(genres.len(), 2);
        assert_eq!(genres[0].id, Some(1));
        assert_eq!(genres[0].name, "Drama");
        assert_eq!(genres[1].id, None);
        assert_eq!(transport.requests()[0].method, Method::GET);
    }

    #[tokio::test]
    async fn test_check_watched_passes_user() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond("/watch-history/check-watched/7/", 200, json!({"watched": true, "rating": 4.0}));
        let api = client(&transport);

        let status = api.check_watched(7, "neo").await.unwrap();

        assert!(status.watched);
        assert_eq!(status.rating, Some(4.0));
        assert_eq!(
            transport.requests()[0].query,
            vec![("user".to_string(), "neo".to_string())]
        );
    }

    #[tokio::test]
    async fn test_error_statuses_map_to_variants() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond("/movies/42/", 404, json!({"detail": "Not found."}));
        transport.respond("/user-profiles/", 403, json!({"detail": "Forbidden"}));
        transport.respond("/movie/add/", 500, json!({"error": "OMDb unavailable"}));
        let api = client(&transport);

        assert!(matches!(api.fetch_movie(42).await, Err(ApiError::NotFound(_))));
        assert!(matches!(api.fetch_profiles().await, Err(ApiError::AccessDenied(_))));
        assert!(matches!(
            api.add_movie_by_imdb("https://www.imdb.com/title/tt0133093/").await,
            Err(ApiError::ServerError(_))
        ));
    }

    #[tokio::test]
    async fn test_landing_for() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond("/user-profiles/morpheus/is-admin/", 200, json!({"is_admin": true}));
        transport.respond("/user-profiles/neo/is-admin/", 200, json!({"is_admin": false}));
        let api = client(&transport);

        assert_eq!(api.landing_for("morpheus").await, Landing::Admin);
        assert_eq!(api.landing_for("neo").await, Landing::Home);
        // Unscripted path answers 404
        assert_eq!(api.landing_for("smith").await, Landing::Home);
    }

    #[tokio::test]
    async fn test_recommendation_paths() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(
            "/recommendations/qdrant/content-based/7/",
            200,
            json!({"movie_id": 7, "recommendations": [movie_json(8, "Dark City")], "genres": []}),
        );
        transport.respond(
            "/recommendations/neo4j/follow-based/neo/",
            200,
            json!({"username": "neo", "recommendations": [], "genres": []}),
        );
        let api = client(&transport);

        let similar = api.fetch_similar_movies(7).await.unwrap();
        assert_eq!(similar.recommendations[0].title, "Dark City");
        let followed = api.fetch_follow_recommendations("neo").await.unwrap();
        assert!(followed.recommendations.is_empty());
    }

    #[tokio::test]
    async fn test_fill_popularity() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond("/watch-history/get-popularity/1/", 200, json!({"popularity": 12, "detail": ""}));
        let api = client(&transport);
        let mut movies: Vec<Movie> = serde_json::from_value(json!([
            movie_json(1, "The Matrix"),
            movie_json(2, "Speed"),
        ]))
        .unwrap();

        api.fill_popularity(&mut movies).await;

        assert_eq!(movies[0].popularity, Some(12));
        // Lookup for 2 is unscripted and fails quietly
        assert_eq!(movies[1].popularity, None);
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed_transparently() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond("/user-profiles/neo/", 401, json!({"detail": "Token is invalid or expired"}));
        transport.respond(
            "/user-profiles/neo/",
            200,
            json!({"user": {"username": "neo"}, "followed_actors": [], "followed_directors": []}),
        );
        transport.respond("/token/refresh/", 200, json!({"access": "a2"}));
        let api = client(&transport);

        let profile = api.fetch_profile("neo").await.unwrap();

        assert_eq!(profile.username(), "neo");
        assert_eq!(transport.requests_to("/user-profiles/neo/")[1].bearer_token(), Some("a2"));
    }
}
