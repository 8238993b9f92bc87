use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use carelink_config::ApiConfig;
use carelink_model::{
    AccountKind, Credential, ErrorBody, LoginRequest, LoginResponse, Payload,
    RefreshRequest, RefreshResponse, UserProfile, routes,
};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use log::{debug, info, warn};
use reqwest::{Client, StatusCode, header::AUTHORIZATION};
use serde::Deserialize;
use tokio::sync::{Mutex as AsyncMutex, broadcast};
use tokio::task::JoinHandle;
use url::Url;

use super::errors::{AuthError, AuthResult, RefreshError};
use super::events::{SessionEvent, SessionEvents, SignOutReason};
use super::storage::CredentialStore;
use crate::infrastructure::api_client::endpoint_url;

const DEFAULT_LOGIN_FAILURE: &str = "Invalid credentials";

type SharedRefresh = Shared<BoxFuture<'static, Result<(), RefreshError>>>;

/// Bearer header value paired with the credential epoch it was read under.
#[derive(Clone)]
pub(crate) struct BearerSnapshot {
    pub(crate) header: String,
    pub(crate) epoch: u64,
}

/// Owner of the credential lifecycle
///
/// ## Session state
///
/// There is no session object. "Signed in" means the credential store holds
/// a token pair; the cached profile rides along as advisory data. The
/// manager is the only writer of the store.
///
/// ## Refresh
///
/// At most one `/auth/refresh` call is in flight. The first caller that
/// needs a refresh publishes a shared handle; concurrent callers await that
/// same handle. Every credential change bumps an epoch counter, and callers
/// hand in the epoch their rejected request was sent under. If the epoch
/// has moved on, someone else already rotated the credential and no new
/// refresh is issued.
///
/// The refresh runs on its own task, so it finishes and stores its result
/// even when every waiter has been dropped.
///
/// A failed refresh ends the session: the store is cleared and
/// [`SessionEvent::SignedOut`] is published. Failures reported under an
/// epoch that has since moved leave the newer session alone.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    http: Client,
    base_url: Url,
    request_timeout: Duration,
    logout_timeout: Duration,
    store: Arc<dyn CredentialStore>,
    /// Serializes every store mutation together with its epoch bump.
    write_gate: AsyncMutex<()>,
    epoch: AtomicU64,
    in_flight: parking_lot::Mutex<Option<SharedRefresh>>,
    events: SessionEvents,
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("base_url", &self.inner.base_url.as_str())
            .field("store", &self.inner.store)
            .field("epoch", &self.epoch())
            .field("refresh_in_flight", &self.inner.in_flight.lock().is_some())
            .finish()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MeBody {
    User { user: UserProfile },
    Other(Payload<UserProfile>),
}

impl MeBody {
    fn into_profile(self) -> UserProfile {
        match self {
            MeBody::User { user } => user,
            MeBody::Other(payload) => payload.into_inner(),
        }
    }
}

enum MeFailure {
    Unauthorized,
    Other(String),
}

impl SessionManager {
    pub fn new(
        http: Client,
        api: &ApiConfig,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                http,
                base_url: api.base_url.clone(),
                request_timeout: api.request_timeout,
                logout_timeout: api.logout_timeout,
                store,
                write_gate: AsyncMutex::new(()),
                epoch: AtomicU64::new(0),
                in_flight: parking_lot::Mutex::new(None),
                events: SessionEvents::new(),
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    pub(crate) fn http(&self) -> &Client {
        &self.inner.http
    }

    /// Whether a usable credential is cached. Says nothing about whether the
    /// backend still accepts it.
    pub async fn is_authenticated(&self) -> bool {
        self.inner.store.credential().await.is_some()
    }

    pub async fn access_token(&self) -> Option<String> {
        self.inner.store.access_token().await
    }

    pub async fn cached_user(&self) -> Option<UserProfile> {
        self.inner.store.cached_user().await
    }

    fn epoch(&self) -> u64 {
        self.inner.epoch.load(Ordering::SeqCst)
    }

    fn bump_epoch(&self) {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
    }

    /// Epoch first, then the token: a token is never paired with an epoch
    /// newer than the one it was issued under.
    pub(crate) async fn bearer_snapshot(&self) -> Option<BearerSnapshot> {
        let epoch = self.epoch();
        let credential = self.inner.store.credential().await?;
        Some(BearerSnapshot {
            header: credential.bearer(),
            epoch,
        })
    }

    /// Sign in through the provider or patient login flow.
    pub async fn login(
        &self,
        identity: &str,
        secret: &str,
        kind: AccountKind,
    ) -> AuthResult<UserProfile> {
        let identity = identity.trim();
        if identity.is_empty() {
            return Err(AuthError::MissingCredentials(match kind {
                AccountKind::Provider => "email",
                AccountKind::Patient => "patient id",
            }));
        }
        if secret.is_empty() {
            return Err(AuthError::MissingCredentials("password"));
        }

        let (path, body) = match kind {
            AccountKind::Provider => (
                routes::auth::LOGIN,
                LoginRequest::Provider {
                    email: identity.to_string(),
                    password: secret.to_string(),
                },
            ),
            AccountKind::Patient => (
                routes::auth::PATIENT_LOGIN,
                LoginRequest::Patient {
                    patient_id: identity.to_string(),
                    password: secret.to_string(),
                },
            ),
        };

        info!("[SessionManager] Signing in {} account", kind);
        let response = self
            .inner
            .http
            .post(endpoint_url(&self.inner.base_url, path))
            .json(&body)
            .timeout(self.inner.request_timeout)
            .send()
            .await
            .map_err(AuthError::BackendUnreachable)?;

        let status = response.status();
        let raw = response
            .bytes()
            .await
            .map_err(AuthError::BackendUnreachable)?;

        if !status.is_success() {
            let message = ErrorBody::parse(&raw).message_or(DEFAULT_LOGIN_FAILURE);
            warn!("[SessionManager] Login rejected with status {}", status);
            return Err(AuthError::LoginRejected { status, message });
        }

        let parsed: LoginResponse = serde_json::from_slice(&raw)
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
        let message = parsed.message.clone();
        let (credential, mut user) =
            parsed.into_session().ok_or_else(|| AuthError::LoginRejected {
                status,
                message: message
                    .unwrap_or_else(|| DEFAULT_LOGIN_FAILURE.to_string()),
            })?;
        user.account_kind = kind;

        {
            let _gate = self.inner.write_gate.lock().await;
            self.inner
                .store
                .save(credential.access_token(), credential.refresh_token())
                .await?;
            if let Err(e) = self.inner.store.save_user(&user).await {
                warn!("[SessionManager] Failed to cache user profile: {}", e);
            }
            self.bump_epoch();
        }

        info!("[SessionManager] Signed in as {} ({})", user.id, user.role);
        self.inner.events.publish(SessionEvent::SignedIn(user.clone()));
        Ok(user)
    }

    /// Sign out locally and notify the backend in the background.
    ///
    /// Never fails; the local session is gone when this returns. The handle
    /// of the backend notification is returned for callers that are about
    /// to shut the runtime down; dropping it does not cancel the task.
    pub async fn logout(&self) -> Option<JoinHandle<()>> {
        let notice = self
            .inner
            .store
            .credential()
            .await
            .map(|credential| self.notify_logout(&credential));
        self.end_session(SignOutReason::Logout).await;
        notice
    }

    fn notify_logout(&self, credential: &Credential) -> JoinHandle<()> {
        let request = self
            .inner
            .http
            .post(endpoint_url(&self.inner.base_url, routes::auth::LOGOUT))
            .header(AUTHORIZATION, credential.bearer())
            .timeout(self.inner.logout_timeout);

        // Fire and forget; the token may already be invalid
        tokio::spawn(async move {
            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    debug!("[SessionManager] Backend acknowledged logout");
                }
                Ok(response) => {
                    warn!(
                        "[SessionManager] Logout notification returned {}",
                        response.status()
                    );
                }
                Err(e) => {
                    warn!("[SessionManager] Logout notification failed: {}", e);
                }
            }
        })
    }

    /// Clear the session because a request proved it unusable.
    pub async fn force_sign_out(&self, reason: SignOutReason) {
        self.end_session(reason).await;
    }

    /// Clear the session, but only while the epoch is still `observed`.
    ///
    /// A failure seen under an older credential must not wipe a session
    /// that a logout and new login put in place meanwhile.
    pub(crate) async fn expire_session(&self, observed: u64, reason: SignOutReason) {
        self.end_session_at(Some(observed), reason).await;
    }

    async fn end_session(&self, reason: SignOutReason) {
        self.end_session_at(None, reason).await;
    }

    async fn end_session_at(&self, observed: Option<u64>, reason: SignOutReason) {
        let had_session = {
            let _gate = self.inner.write_gate.lock().await;
            if observed.is_some_and(|epoch| epoch != self.epoch()) {
                debug!(
                    "[SessionManager] Session changed since {:?}; keeping it",
                    reason
                );
                return;
            }
            let had_session = self.inner.store.credential().await.is_some();
            if let Err(e) = self.inner.store.clear().await {
                warn!("[SessionManager] Failed to clear credential store: {}", e);
            }
            self.bump_epoch();
            had_session
        };

        if had_session {
            info!("[SessionManager] Session ended ({:?})", reason);
            self.inner.events.publish(SessionEvent::SignedOut(reason));
        }
    }

    /// Profile of the signed-in account.
    ///
    /// Asks `/auth/me` and caches the answer. A 401 triggers one refresh and
    /// one more attempt; a second 401 ends the session. Any other failure
    /// falls back to the cached profile.
    pub async fn current_user(&self) -> Option<UserProfile> {
        let mut refreshed = false;

        loop {
            let bearer = self.bearer_snapshot().await?;

            match self.fetch_me(&bearer.header).await {
                Ok(user) => {
                    self.cache_profile(bearer.epoch, &user).await;
                    return Some(user);
                }
                Err(MeFailure::Unauthorized) if !refreshed => {
                    refreshed = true;
                    if let Err(e) = self.refresh_from(bearer.epoch).await {
                        warn!(
                            "[SessionManager] Could not refresh for profile lookup: {}",
                            e
                        );
                        return self.cached_user().await;
                    }
                }
                Err(MeFailure::Unauthorized) => {
                    warn!(
                        "[SessionManager] Backend rejected refreshed credential"
                    );
                    self.expire_session(bearer.epoch, SignOutReason::Rejected)
                        .await;
                    return None;
                }
                Err(MeFailure::Other(reason)) => {
                    warn!(
                        "[SessionManager] Profile lookup failed, using cache: {}",
                        reason
                    );
                    return self.cached_user().await;
                }
            }
        }
    }

    async fn fetch_me(&self, bearer: &str) -> Result<UserProfile, MeFailure> {
        let response = self
            .inner
            .http
            .get(endpoint_url(&self.inner.base_url, routes::auth::ME))
            .header(AUTHORIZATION, bearer)
            .timeout(self.inner.request_timeout)
            .send()
            .await
            .map_err(|e| MeFailure::Other(e.to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED => Err(MeFailure::Unauthorized),
            status if status.is_success() => response
                .json::<MeBody>()
                .await
                .map(MeBody::into_profile)
                .map_err(|e| MeFailure::Other(e.to_string())),
            status => Err(MeFailure::Other(format!("status {status}"))),
        }
    }

    /// Cache the profile unless the session changed while it was fetched.
    async fn cache_profile(&self, epoch: u64, user: &UserProfile) {
        let _gate = self.inner.write_gate.lock().await;
        if self.epoch() != epoch {
            // A refresh keeps the account; logout or a new login does not.
            let same_account = self
                .inner
                .store
                .cached_user()
                .await
                .is_some_and(|cached| cached.id == user.id);
            if !same_account || !self.is_authenticated().await {
                debug!("[SessionManager] Session changed during profile fetch");
                return;
            }
        }
        if let Err(e) = self.inner.store.save_user(user).await {
            warn!("[SessionManager] Failed to cache user profile: {}", e);
        }
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// Joins a refresh that is already in flight instead of starting a
    /// second one.
    pub async fn refresh(&self) -> AuthResult<()> {
        let epoch = self.epoch();
        self.refresh_from(epoch).await
    }

    /// Refresh on behalf of a request that was rejected while the credential
    /// epoch was `observed`.
    pub(crate) async fn refresh_from(&self, observed: u64) -> AuthResult<()> {
        let pending = {
            let mut slot = self.inner.in_flight.lock();
            match slot.as_ref() {
                Some(pending) => {
                    debug!("[SessionManager] Joining in-flight refresh");
                    pending.clone()
                }
                None if self.epoch() != observed => {
                    debug!("[SessionManager] Credential already rotated");
                    return Ok(());
                }
                None => {
                    let task = tokio::spawn(self.clone().run_refresh());
                    let pending = async move {
                        task.await.unwrap_or_else(|e| {
                            Err(RefreshError::Interrupted(e.to_string()))
                        })
                    }
                    .boxed()
                    .shared();
                    *slot = Some(pending.clone());
                    pending
                }
            }
        };

        pending.await.map_err(AuthError::from)
    }

    async fn run_refresh(self) -> Result<(), RefreshError> {
        let outcome = self.perform_refresh().await;
        // Epoch was already bumped by whichever store mutation happened.
        self.inner.in_flight.lock().take();
        outcome
    }

    async fn perform_refresh(&self) -> Result<(), RefreshError> {
        let started = self.epoch();
        let refresh_token = match self.inner.store.refresh_token().await {
            Some(token) if !token.is_empty() => token,
            _ => {
                debug!("[SessionManager] No refresh token; skipping refresh");
                return Err(RefreshError::NoRefreshToken);
            }
        };

        info!("[SessionManager] Refreshing access token");
        let result = self.request_refresh(refresh_token).await;

        match result {
            Ok(refreshed) => self.apply_refresh(started, refreshed).await,
            Err(e) => {
                warn!("[SessionManager] Token refresh failed: {}", e);
                self.expire_session(started, SignOutReason::RefreshFailed)
                    .await;
                Err(e)
            }
        }
    }

    async fn request_refresh(
        &self,
        refresh_token: String,
    ) -> Result<RefreshResponse, RefreshError> {
        let response = self
            .inner
            .http
            .post(endpoint_url(&self.inner.base_url, routes::auth::REFRESH))
            .json(&RefreshRequest { refresh_token })
            .timeout(self.inner.request_timeout)
            .send()
            .await
            .map_err(|e| RefreshError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RefreshError::Rejected(status));
        }

        let refreshed: RefreshResponse = response
            .json()
            .await
            .map_err(|e| RefreshError::InvalidResponse(e.to_string()))?;
        if refreshed.access_token.is_empty() {
            return Err(RefreshError::InvalidResponse(
                "empty access token".to_string(),
            ));
        }
        Ok(refreshed)
    }

    async fn apply_refresh(
        &self,
        started: u64,
        refreshed: RefreshResponse,
    ) -> Result<(), RefreshError> {
        let stored = {
            let _gate = self.inner.write_gate.lock().await;
            if self.epoch() != started {
                // Logout or a new login won the race; their state stands.
                debug!("[SessionManager] Session changed during refresh");
                return Ok(());
            }

            let stored = match refreshed.refresh_token.as_deref() {
                Some(rotated) if !rotated.is_empty() => {
                    debug!("[SessionManager] Refresh token rotated");
                    self.inner
                        .store
                        .save(&refreshed.access_token, rotated)
                        .await
                }
                _ => {
                    self.inner
                        .store
                        .replace_access_token(&refreshed.access_token)
                        .await
                }
            };
            if stored.is_ok() {
                self.bump_epoch();
            }
            stored
        };

        match stored {
            Ok(()) => {
                info!("[SessionManager] Access token refreshed");
                self.inner.events.publish(SessionEvent::Refreshed);
                Ok(())
            }
            Err(e) => {
                warn!("[SessionManager] Failed to store refreshed token: {}", e);
                self.expire_session(started, SignOutReason::RefreshFailed)
                    .await;
                Err(RefreshError::Storage(e.to_string()))
            }
        }
    }
}
