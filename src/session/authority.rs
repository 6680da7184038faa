use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    clock::{Clock, SystemClock},
    config::Settings,
    error::{ExchangeError, RefreshError, SessionError},
    session::{refresher::TokenRefresher, store::CredentialStore},
    spotify::auth::TokenExchange,
    types::{
        AuthorizationGrant, Credential, CredentialFailure, CredentialStatus, SessionPhase,
        SessionState,
    },
};

/// Safety margin used unless configured otherwise.
pub const DEFAULT_REFRESH_MARGIN: Duration = Duration::from_secs(60);

type RefreshOutcome = Result<String, SessionError>;
type SharedRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

struct InFlight {
    epoch: u64,
    refresh: SharedRefresh,
}

struct Inner {
    store: CredentialStore,
    refresher: TokenRefresher,
    exchange: Arc<dyn TokenExchange>,
    clock: Arc<dyn Clock>,
    margin_ms: i64,
    signing_in: AtomicBool,
    in_flight: Mutex<Option<InFlight>>,
    state_tx: watch::Sender<SessionState>,
    credential_tx: watch::Sender<Option<Arc<Credential>>>,
}

/// Single entry point for obtaining a currently-valid access token.
///
/// The authority owns the session's [`Credential`] and is its only writer.
/// It runs the sign-in exchange, decides when the stored token is too close
/// to expiry, drives the refresh exchange and folds every failure into a
/// [`SessionError`].
///
/// Cloning is cheap; all clones share one session.
///
/// # State machine
///
/// ```text
/// SignedOut -> SigningIn -> Authenticated(valid) <-> Authenticated(refreshing)
///                                                 \-> Failed
/// ```
///
/// `Failed` is left only through [`sign_out`](Self::sign_out) or a new
/// [`begin_sign_in`](Self::begin_sign_in).
///
/// # Single flight
///
/// At most one refresh exchange runs per session. Callers that find the
/// token inside the safety margin while a refresh is running await that same
/// refresh and receive its outcome.
#[derive(Clone)]
pub struct SessionAuthority {
    inner: Arc<Inner>,
}

/// Builder for [`SessionAuthority`].
pub struct SessionAuthorityBuilder {
    exchange: Arc<dyn TokenExchange>,
    clock: Arc<dyn Clock>,
    margin: Duration,
}

impl SessionAuthorityBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn refresh_margin(mut self, margin: Duration) -> Self {
        self.margin = margin;
        self
    }

    pub fn build(self) -> SessionAuthority {
        let (state_tx, _) = watch::channel(SessionState::default());
        let (credential_tx, _) = watch::channel(None);

        SessionAuthority {
            inner: Arc::new(Inner {
                store: CredentialStore::new(),
                refresher: TokenRefresher::new(Arc::clone(&self.exchange), Arc::clone(&self.clock)),
                exchange: self.exchange,
                clock: self.clock,
                margin_ms: i64::try_from(self.margin.as_millis()).unwrap_or(i64::MAX),
                signing_in: AtomicBool::new(false),
                in_flight: Mutex::new(None),
                state_tx,
                credential_tx,
            }),
        }
    }
}

impl SessionAuthority {
    pub fn builder(exchange: Arc<dyn TokenExchange>) -> SessionAuthorityBuilder {
        SessionAuthorityBuilder {
            exchange,
            clock: Arc::new(SystemClock),
            margin: DEFAULT_REFRESH_MARGIN,
        }
    }

    /// Authority with the system clock and the configured safety margin.
    pub fn from_settings(exchange: Arc<dyn TokenExchange>, settings: &Settings) -> Self {
        Self::builder(exchange)
            .refresh_margin(settings.refresh_margin)
            .build()
    }

    /// Exchanges a one-time authorization grant for the session's first credential.
    ///
    /// Any previous session is discarded first, including a refresh that may
    /// still be running for it. On failure the session stays signed out.
    ///
    /// # Errors
    ///
    /// [`SessionError::SignInFailed`] when the provider rejects the grant or
    /// cannot be reached, or when a sign-out or another sign-in happened
    /// while this exchange was running.
    pub async fn begin_sign_in(&self, grant: &AuthorizationGrant) -> Result<(), SessionError> {
        let inner = &self.inner;
        inner.abandon_refresh();
        let epoch = inner.store.clear();
        inner.signing_in.store(true, Ordering::SeqCst);
        inner.publish();
        info!("signing in");

        let issued_at = inner.clock.now_millis();
        let outcome = inner.exchange.exchange_code(grant).await;

        let result = match outcome {
            Ok(token_grant) => {
                let credential = Credential::from_grant(token_grant, issued_at);
                if inner.store.compare_and_set(epoch, credential) {
                    info!("signed in");
                    Ok(())
                } else {
                    warn!("sign-in superseded before it completed");
                    Err(SessionError::SignInFailed(
                        "sign-in was superseded".to_string(),
                    ))
                }
            }
            Err(ExchangeError::Rejected(reason)) | Err(ExchangeError::Unavailable(reason)) => {
                warn!(%reason, "sign-in failed");
                Err(SessionError::SignInFailed(reason))
            }
        };

        if inner.store.epoch() == epoch {
            inner.signing_in.store(false, Ordering::SeqCst);
        }
        inner.publish();
        result
    }

    /// Returns an access token that is valid for at least the safety margin.
    ///
    /// Resolves without I/O while the stored token is outside the margin.
    /// Otherwise the refresh token is exchanged, once, no matter how many
    /// callers arrive while that exchange is running.
    ///
    /// # Errors
    ///
    /// - [`SessionError::NotAuthenticated`]: nobody is signed in, or the
    ///   session ended while the caller was waiting.
    /// - [`SessionError::SessionExpired`]: the provider rejected the refresh
    ///   token; no further exchange happens until the next sign-in.
    /// - [`SessionError::RefreshTemporarilyUnavailable`]: the refresh could
    ///   not complete right now; the stored credential is unchanged and the
    ///   next call tries again.
    pub async fn current_access_token(&self) -> Result<String, SessionError> {
        let (epoch, credential) = self.inner.store.snapshot();
        let credential = credential.ok_or(SessionError::NotAuthenticated)?;
        if credential.is_failed() {
            return Err(SessionError::SessionExpired);
        }

        let now = self.inner.clock.now_millis();
        if !credential.expires_within(now, self.inner.margin_ms) {
            return Ok(credential.access_token.clone());
        }

        Inner::join_refresh(&self.inner, epoch).await
    }

    /// Ends the session. Synchronous; no provider call is made.
    pub fn sign_out(&self) {
        let inner = &self.inner;
        inner.abandon_refresh();
        inner.store.clear();
        inner.signing_in.store(false, Ordering::SeqCst);
        inner.publish();
        info!("signed out");
    }

    /// Seeds the session from a previously persisted credential.
    ///
    /// A credential persisted mid-refresh is restored as valid; one persisted
    /// in the error state restores the failed session.
    pub fn restore(&self, credential: Credential) {
        let credential = match credential.status {
            CredentialStatus::Refreshing => credential.with_status(CredentialStatus::Valid),
            _ => credential,
        };
        let inner = &self.inner;
        inner.abandon_refresh();
        inner.store.set(credential);
        inner.signing_in.store(false, Ordering::SeqCst);
        inner.publish();
        debug!("session restored");
    }

    pub fn phase(&self) -> SessionPhase {
        self.inner.phase()
    }

    /// Derived `{is_authenticated, is_session_expired}` pair.
    pub fn state(&self) -> SessionState {
        self.inner.phase().state()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state().is_authenticated
    }

    pub fn is_session_expired(&self) -> bool {
        self.state().is_session_expired
    }

    /// Receiver that observes every transition of the derived state.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state_tx.subscribe()
    }

    /// Milliseconds until the stored token expires, if there is a live one.
    pub fn expires_in_millis(&self) -> Option<i64> {
        let credential = self.inner.store.get()?;
        if credential.is_failed() {
            return None;
        }
        Some(credential.expires_at - self.inner.clock.now_millis())
    }

    /// Snapshot of the stored credential for persistence. Not a token source.
    pub(crate) fn credential(&self) -> Option<Arc<Credential>> {
        self.inner.store.get()
    }

    /// Receiver that sees the stored credential after every write.
    pub(crate) fn watch_credential(&self) -> watch::Receiver<Option<Arc<Credential>>> {
        self.inner.credential_tx.subscribe()
    }
}

impl Inner {
    fn phase(&self) -> SessionPhase {
        match self.store.get() {
            None if self.signing_in.load(Ordering::SeqCst) => SessionPhase::SigningIn,
            None => SessionPhase::SignedOut,
            Some(credential) => match credential.status {
                CredentialStatus::Valid => SessionPhase::Authenticated { refreshing: false },
                CredentialStatus::Refreshing => SessionPhase::Authenticated { refreshing: true },
                CredentialStatus::Error => SessionPhase::Failed,
            },
        }
    }

    fn publish(&self) {
        let state = self.phase().state();
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
        self.credential_tx.send_replace(self.store.get());
    }

    fn abandon_refresh(&self) {
        self.in_flight.lock().take();
    }

    /// Awaits the running refresh for `epoch`, starting one if there is none.
    fn join_refresh(this: &Arc<Self>, epoch: u64) -> SharedRefresh {
        let mut slot = this.in_flight.lock();
        if let Some(in_flight) = slot.as_ref() {
            if in_flight.epoch == epoch {
                return in_flight.refresh.clone();
            }
        }

        let inner = Arc::clone(this);
        let refresh = async move {
            let outcome = inner.refresh_once(epoch).await;
            inner.release_refresh(epoch);
            outcome
        }
        .boxed()
        .shared();

        *slot = Some(InFlight {
            epoch,
            refresh: refresh.clone(),
        });
        refresh
    }

    fn release_refresh(&self, epoch: u64) {
        let mut slot = self.in_flight.lock();
        if slot.as_ref().is_some_and(|f| f.epoch == epoch) {
            slot.take();
        }
    }

    async fn refresh_once(&self, epoch: u64) -> RefreshOutcome {
        let (current_epoch, credential) = self.store.snapshot();
        if current_epoch != epoch {
            return Err(SessionError::NotAuthenticated);
        }
        let credential = credential.ok_or(SessionError::NotAuthenticated)?;
        if credential.is_failed() {
            return Err(SessionError::SessionExpired);
        }

        // A refresh that finished between the caller's check and this one
        // already produced a usable token.
        if !credential.expires_within(self.clock.now_millis(), self.margin_ms) {
            return Ok(credential.access_token.clone());
        }

        if credential.refresh_token.is_empty() {
            warn!("credential has no refresh token, session expired");
            self.fail(epoch, &credential, CredentialFailure::MissingRefreshToken);
            return Err(SessionError::SessionExpired);
        }

        self.store
            .compare_and_set(epoch, credential.with_status(CredentialStatus::Refreshing));
        self.publish();

        match self.refresher.refresh(&credential.refresh_token).await {
            Ok(fragment) => {
                let updated = credential.apply(fragment);
                let access_token = updated.access_token.clone();
                let rotated = updated.refresh_token != credential.refresh_token;
                if !self.store.compare_and_set(epoch, updated) {
                    debug!("session ended during refresh, discarding result");
                    return Err(SessionError::NotAuthenticated);
                }
                self.publish();
                info!(rotated, "access token refreshed");
                Ok(access_token)
            }
            Err(RefreshError::Rejected(reason)) => {
                warn!(%reason, "refresh token rejected, session expired");
                self.fail(
                    epoch,
                    &credential,
                    CredentialFailure::RefreshRejected { reason },
                );
                Err(SessionError::SessionExpired)
            }
            Err(RefreshError::Unavailable(reason)) => {
                warn!(%reason, "refresh unavailable, keeping current credential");
                self.store.compare_and_set(epoch, (*credential).clone());
                self.publish();
                Err(SessionError::RefreshTemporarilyUnavailable)
            }
        }
    }

    fn fail(&self, epoch: u64, credential: &Credential, failure: CredentialFailure) {
        self.store
            .compare_and_set(epoch, credential.clone().into_failed(failure));
        self.publish();
    }
}
