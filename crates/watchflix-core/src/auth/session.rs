//! Session manager: credential lifecycle and the token refresh protocol.
//!
//! `SessionManager` is the single authority over who is logged in. It
//! persists credentials through a `TokenStore`, decorates outgoing requests
//! with the current access token, and recovers from an expired token by
//! refreshing it and resubmitting the failed request once.
//!
//! Concurrent refresh attempts (several requests hitting 401 together, or a
//! 401 racing the background interval) share a single in-flight exchange so
//! a rotating refresh token is never spent twice.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::api::{ApiError, ApiResponse, PendingRequest, RefreshError, Transport};
use crate::models::RegistrationProfile;

use super::credentials::{Credential, Slot};
use super::outcome::{AuthOutcome, LoginFailure, RegisterFailure};
use super::store::TokenStore;

const LOGIN_PATH: &str = "/token/";
const REFRESH_PATH: &str = "/token/refresh/";
const REGISTER_PATH: &str = "/accounts/register/";

/// How often the background task exchanges the refresh token.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionStatus {
    Anonymous,
    Authenticated,
    RefreshInFlight,
}

/// Contents of the observable session cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    status: SessionStatus,
    credential: Option<Credential>,
    // Bumped by login and logout. A refresh started under an older epoch
    // must not overwrite what came after it.
    epoch: u64,
}

impl SessionState {
    fn anonymous(epoch: u64) -> Self {
        Self {
            status: SessionStatus::Anonymous,
            credential: None,
            epoch,
        }
    }

    fn authenticated(credential: Credential, epoch: u64) -> Self {
        Self {
            status: SessionStatus::Authenticated,
            credential: Some(credential),
            epoch,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn username(&self) -> Option<&str> {
        self.credential.as_ref().map(Credential::username)
    }

    pub fn access_token(&self) -> Option<&str> {
        self.credential.as_ref().map(Credential::access_token)
    }

    pub fn is_authenticated(&self) -> bool {
        self.credential.is_some()
    }
}

/// Whether a request has already been resubmitted after a token refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    Original,
    Retried,
}

impl Attempt {
    pub fn is_retried(self) -> bool {
        self == Attempt::Retried
    }
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub refresh_interval: Duration,
    /// Also log out when a refresh triggered by a 401 fails. The interval
    /// path always logs out.
    pub logout_on_refresh_failure: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            logout_on_refresh_failure: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenPair {
    access: String,
    refresh: String,
}

#[derive(Debug, Deserialize)]
struct RefreshedTokens {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
}

type SharedRefresh = Shared<BoxFuture<'static, Result<Credential, RefreshError>>>;

struct Inner {
    transport: Arc<dyn Transport>,
    store: Arc<dyn TokenStore>,
    options: SessionOptions,
    state: watch::Sender<SessionState>,
    refresh_in_flight: Mutex<Option<SharedRefresh>>,
}

/// Handle to the session. Clone is cheap and every clone sees the same state.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    /// Create a session, restoring any credential persisted in `store`.
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn TokenStore>,
        options: SessionOptions,
    ) -> Self {
        let initial = match store.load_credential() {
            Ok(Some(credential)) => {
                debug!(username = %credential.username(), "Restored persisted session");
                SessionState::authenticated(credential, 0)
            }
            Ok(None) => SessionState::anonymous(0),
            Err(e) => {
                warn!(error = %e, "Failed to load persisted session, starting anonymous");
                SessionState::anonymous(0)
            }
        };
        let (state, _) = watch::channel(initial);

        Self {
            inner: Arc::new(Inner {
                transport,
                store,
                options,
                state,
                refresh_in_flight: Mutex::new(None),
            }),
        }
    }

    pub fn options(&self) -> &SessionOptions {
        &self.inner.options
    }

    // =========================================================================
    // Observation
    // =========================================================================

    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every session change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    pub fn username(&self) -> Option<String> {
        self.inner.state.borrow().username().map(str::to_owned)
    }

    pub fn access_token(&self) -> Option<String> {
        self.inner.state.borrow().access_token().map(str::to_owned)
    }

    /// Route guard: the current username, or `Unauthorized` when anonymous.
    pub fn require_authenticated(&self) -> Result<String, ApiError> {
        self.username().ok_or(ApiError::Unauthorized)
    }

    // =========================================================================
    // Credential-bearing actions
    // =========================================================================

    pub async fn login(&self, username: &str, password: &str) -> AuthOutcome {
        let request = PendingRequest::post(LOGIN_PATH)
            .with_body(json!({ "username": username, "password": password }));

        let response = match self.inner.transport.send(&request).await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "Login failed: no server response");
                return LoginFailure::NoResponse.into();
            }
        };

        if !response.is_success() {
            let failure = LoginFailure::from_status(response.status());
            error!(status = %response.status(), reason = %failure, "Login failed");
            return failure.into();
        }

        let tokens: TokenPair = match response.json() {
            Ok(tokens) => tokens,
            Err(e) => {
                error!(error = %e, "Login failed: unexpected token response");
                return LoginFailure::Other.into();
            }
        };

        let credential = Credential::new(username, tokens.access, tokens.refresh);
        // Persist under the state lock so a refresh can't interleave its writes
        self.inner.state.send_modify(|state| {
            if let Err(e) = self.inner.store.save_credential(&credential) {
                warn!(error = %e, "Failed to persist session");
            }
            *state = SessionState::authenticated(credential, state.epoch + 1);
        });

        info!(username, "Login successful");
        AuthOutcome::success()
    }

    /// Create an account. Does not log in.
    pub async fn register(&self, profile: &RegistrationProfile) -> AuthOutcome {
        let request = match PendingRequest::post(REGISTER_PATH).with_json(profile) {
            Ok(request) => request,
            Err(e) => {
                error!(error = %e, "Registration failed");
                return RegisterFailure::Other.into();
            }
        };

        match self.inner.transport.send(&request).await {
            Ok(response) if response.is_success() => {
                info!(username = %profile.username, "Registration successful");
                AuthOutcome::success()
            }
            Ok(response) => {
                let failure = RegisterFailure::from_response(response.status(), response.text());
                error!(status = %response.status(), reason = %failure, "Registration failed");
                failure.into()
            }
            Err(e) => {
                error!(error = %e, "Registration failed: no server response");
                RegisterFailure::NoResponse.into()
            }
        }
    }

    /// Forget the credential everywhere. Never fails.
    pub fn logout(&self) {
        self.inner.state.send_modify(|state| {
            if let Err(e) = self.inner.store.clear() {
                warn!(error = %e, "Failed to clear persisted session");
            }
            *state = SessionState::anonymous(state.epoch + 1);
        });
        info!("Logged out");
    }

    // =========================================================================
    // Request path
    // =========================================================================

    /// Attach the current access token as a bearer credential, if there is one.
    pub fn decorate_request(&self, request: PendingRequest) -> PendingRequest {
        match self.access_token() {
            Some(token) => request.with_bearer(&token),
            None => request,
        }
    }

    /// Send without credentials.
    pub async fn send_public(&self, request: PendingRequest) -> Result<ApiResponse, ApiError> {
        Ok(self.inner.transport.send(&request).await?)
    }

    /// Send with credentials, recovering once from an expired access token.
    /// Responses other than 401 are returned untouched.
    pub async fn send(&self, request: PendingRequest) -> Result<ApiResponse, ApiError> {
        let decorated = self.decorate_request(request);
        let response = self.inner.transport.send(&decorated).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            debug!(path = %decorated.path, "Request unauthorized, attempting token refresh");
            return self.handle_unauthorized(decorated, Attempt::Original).await;
        }
        Ok(response)
    }

    /// React to a 401 on `failed`. A request that was already retried fails
    /// for good; otherwise the token is refreshed and the request resubmitted
    /// exactly once. Refresh failures are returned, not retried.
    pub async fn handle_unauthorized(
        &self,
        failed: PendingRequest,
        attempt: Attempt,
    ) -> Result<ApiResponse, ApiError> {
        if attempt.is_retried() {
            warn!(path = %failed.path, "Request still unauthorized after token refresh");
            return Err(ApiError::Unauthorized);
        }

        // Another request may have refreshed while this one was in flight
        let current = self.access_token();
        let superseded = matches!(
            (failed.bearer_token(), current.as_deref()),
            (Some(used), Some(now)) if used != now
        );
        if superseded {
            debug!(path = %failed.path, "Access token already refreshed, resubmitting");
        } else {
            self.refresh().await?;
        }

        let retry = self.decorate_request(failed);
        let response = self.inner.transport.send(&retry).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            // Attempt::Retried is terminal
            warn!(path = %retry.path, "Request still unauthorized after token refresh");
            return Err(ApiError::Unauthorized);
        }
        Ok(response)
    }

    // =========================================================================
    // Refresh protocol
    // =========================================================================

    /// Exchange the refresh token for a new access token. Callers arriving
    /// while an exchange is in flight wait for that one instead of starting
    /// their own.
    pub async fn refresh(&self) -> Result<Credential, RefreshError> {
        let in_flight = {
            let mut slot = self
                .inner
                .refresh_in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            match slot.as_ref() {
                Some(shared) => {
                    debug!("Joining in-flight token refresh");
                    shared.clone()
                }
                None => {
                    let shared = Inner::run_refresh(Arc::clone(&self.inner)).boxed().shared();
                    *slot = Some(shared.clone());
                    shared
                }
            }
        };
        in_flight.await
    }

    /// One tick of the background refresh: skip when logged out, log out
    /// when the refresh fails.
    pub async fn refresh_on_interval(&self) {
        if self.access_token().is_none() {
            debug!("No access token, skipping scheduled refresh");
            return;
        }
        if let Err(e) = self.refresh().await {
            warn!(error = %e, "Scheduled token refresh failed, logging out");
            self.logout();
        }
    }

    /// Run `refresh_on_interval` every `refresh_interval` until the returned
    /// guard is dropped. The first tick fires one full interval from now.
    pub fn spawn_background_refresh(&self) -> BackgroundRefresh {
        let session = self.clone();
        let period = self.inner.options.refresh_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                session.refresh_on_interval().await;
            }
        });

        debug!(interval_secs = period.as_secs(), "Background token refresh started");
        BackgroundRefresh { handle }
    }
}

impl Inner {
    async fn run_refresh(self: Arc<Self>) -> Result<Credential, RefreshError> {
        let result = self.exchange_refresh_token().await;
        self.refresh_in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        result
    }

    async fn exchange_refresh_token(&self) -> Result<Credential, RefreshError> {
        let (current, epoch) = {
            let state = self.state.borrow();
            (state.credential.clone(), state.epoch)
        };
        let current = current.ok_or(RefreshError::NoCredential)?;

        self.state.send_modify(|state| state.status = SessionStatus::RefreshInFlight);

        let request = PendingRequest::post(REFRESH_PATH)
            .with_body(json!({ "refresh": current.refresh_token() }));
        let outcome = match self.transport.send(&request).await {
            Err(e) => Err(RefreshError::NoResponse(e.to_string())),
            Ok(response) if !response.is_success() => {
                Err(RefreshError::Rejected(response.status().as_u16()))
            }
            Ok(response) => response
                .json::<RefreshedTokens>()
                .map_err(|e| RefreshError::InvalidResponse(e.to_string())),
        };

        match outcome {
            Ok(tokens) => {
                let rotated = tokens.refresh.is_some();
                let credential = current.refreshed(tokens.access, tokens.refresh);
                let next = SessionState::authenticated(credential.clone(), epoch);
                let committed = self.commit(epoch, next, |store| {
                    if let Err(e) = store.write(Slot::AccessToken, credential.access_token()) {
                        warn!(error = %e, "Failed to persist refreshed access token");
                    }
                    if rotated {
                        if let Err(e) = store.write(Slot::RefreshToken, credential.refresh_token()) {
                            warn!(error = %e, "Failed to persist rotated refresh token");
                        }
                    }
                });
                if !committed {
                    return self.superseded_result();
                }

                info!(rotated, "Access token refreshed");
                Ok(credential)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed");
                let logout = self.options.logout_on_refresh_failure;
                let committed = self.commit(epoch, SessionState::anonymous(epoch), |store| {
                    if logout {
                        if let Err(e) = store.clear() {
                            warn!(error = %e, "Failed to clear persisted session");
                        }
                    }
                });
                if !committed {
                    return self.superseded_result();
                }
                Err(e)
            }
        }
    }

    /// Replace the state and run `persist` only if no login or logout
    /// happened since `epoch`. Both happen under the state lock, which login
    /// and logout also hold while touching the store.
    fn commit(
        &self,
        epoch: u64,
        next: SessionState,
        persist: impl FnOnce(&dyn TokenStore),
    ) -> bool {
        self.state.send_if_modified(|state| {
            if state.epoch != epoch {
                return false;
            }
            *state = next;
            persist(self.store.as_ref());
            true
        })
    }

    /// The session moved on while the refresh was in flight; hand back
    /// whatever it is now.
    fn superseded_result(&self) -> Result<Credential, RefreshError> {
        debug!("Session changed during token refresh, discarding result");
        self.state
            .borrow()
            .credential
            .clone()
            .ok_or(RefreshError::NoCredential)
    }
}

/// Stops the background refresh task when dropped.
pub struct BackgroundRefresh {
    handle: JoinHandle<()>,
}

impl BackgroundRefresh {
    pub fn stop(self) {}
}

impl Drop for BackgroundRefresh {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
