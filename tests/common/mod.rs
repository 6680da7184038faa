#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use sporlplay::{
    clock::ManualClock,
    error::{ExchangeError, RefreshError},
    session::SessionAuthority,
    spotify::auth::TokenExchange,
    types::{AuthorizationGrant, RefreshGrant, TokenGrant},
};

pub const START: i64 = 1_700_000_000_000;

/// Token endpoint stand-in: replays queued outcomes and counts calls.
#[derive(Default)]
pub struct FakeExchange {
    codes: Mutex<VecDeque<Result<TokenGrant, ExchangeError>>>,
    refreshes: Mutex<VecDeque<Result<RefreshGrant, RefreshError>>>,
    seen: Mutex<Vec<String>>,
    refresh_calls: AtomicUsize,
    delay: Duration,
}

impl FakeExchange {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slow(delay: Duration) -> Self {
        FakeExchange {
            delay,
            ..Self::default()
        }
    }

    pub fn push_code(&self, outcome: Result<TokenGrant, ExchangeError>) {
        self.codes.lock().push_back(outcome);
    }

    pub fn push_refresh(&self, outcome: Result<RefreshGrant, RefreshError>) {
        self.refreshes.lock().push_back(outcome);
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_tokens_seen(&self) -> Vec<String> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl TokenExchange for FakeExchange {
    async fn exchange_code(&self, _grant: &AuthorizationGrant) -> Result<TokenGrant, ExchangeError> {
        self.codes
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ExchangeError::Unavailable("nothing queued".into())))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshGrant, RefreshError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(refresh_token.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.refreshes
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(RefreshError::Unavailable("nothing queued".into())))
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

pub fn session(exchange: &Arc<FakeExchange>, clock: &Arc<ManualClock>) -> SessionAuthority {
    SessionAuthority::builder(exchange.clone())
        .clock(clock.clone())
        .build()
}

/// Session signed in with `A1`/`R1`, valid for one hour from `START`.
pub async fn signed_in(exchange: &Arc<FakeExchange>, clock: &Arc<ManualClock>) -> SessionAuthority {
    exchange.push_code(Ok(grant("A1", "R1", 3600)));
    let session = session(exchange, clock);
    session
        .begin_sign_in(&authorization("grant123"))
        .await
        .expect("sign-in");
    session
}
