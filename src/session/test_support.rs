use std::{
    collections::VecDeque,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{
    error::{ExchangeError, RefreshError},
    spotify::auth::TokenExchange,
    types::{AuthorizationGrant, RefreshGrant, TokenGrant},
};

/// Token endpoint stand-in that replays queued outcomes and counts calls.
#[derive(Default)]
pub struct ScriptedExchange {
    codes: Mutex<VecDeque<Result<TokenGrant, ExchangeError>>>,
    refreshes: Mutex<VecDeque<Result<RefreshGrant, RefreshError>>>,
    seen: Mutex<Vec<String>>,
    code_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    delay: Mutex<Duration>,
}

impl ScriptedExchange {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock() = delay;
        self
    }

    pub fn push_code(&self, outcome: Result<TokenGrant, ExchangeError>) {
        self.codes.lock().push_back(outcome);
    }

    pub fn push_refresh(&self, outcome: Result<RefreshGrant, RefreshError>) {
        self.refreshes.lock().push_back(outcome);
    }

    pub fn code_calls(&self) -> usize {
        self.code_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_tokens_seen(&self) -> Vec<String> {
        self.seen.lock().clone()
    }

    async fn pause(&self) {
        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl TokenExchange for ScriptedExchange {
    async fn exchange_code(&self, _grant: &AuthorizationGrant) -> Result<TokenGrant, ExchangeError> {
        self.code_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.codes
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ExchangeError::Unavailable("nothing scripted".into())))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshGrant, RefreshError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(refresh_token.to_string());
        self.pause().await;
        self.refreshes
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(RefreshError::Unavailable("nothing scripted".into())))
    }
}

pub fn grant(access: &str, refresh: &str, expires_in_secs: u64) -> TokenGrant {
    TokenGrant {
        access_token: access.into(),
        refresh_token: refresh.into(),
        scope: Some("streaming".into()),
        expires_in_secs,
    }
}

pub fn refreshed(access: &str, refresh: Option<&str>, expires_in_secs: u64) -> RefreshGrant {
    RefreshGrant {
        access_token: access.into(),
        refresh_token: refresh.map(str::to_string),
        scope: None,
        expires_in_secs,
    }
}

pub fn authorization(code: &str) -> AuthorizationGrant {
    AuthorizationGrant {
        code: code.into(),
        code_verifier: "verifier".into(),
        redirect_uri: "http://127.0.0.1:8888/callback".into(),
    }
}
