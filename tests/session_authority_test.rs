mod common;

use std::{sync::Arc, time::Duration};

use common::*;
use sporlplay::{
    clock::{Clock, ManualClock},
    error::{ExchangeError, RefreshError, SessionError},
    types::{SessionPhase, SessionState},
};

fn setup() -> (Arc<FakeExchange>, Arc<ManualClock>) {
    (Arc::new(FakeExchange::new()), Arc::new(ManualClock::new(START)))
}

#[tokio::test]
async fn fresh_sign_in_returns_the_granted_token() {
    let (exchange, clock) = setup();
    let session = signed_in(&exchange, &clock).await;

    assert_eq!(session.current_access_token().await.unwrap(), "A1");
    assert_eq!(exchange.refresh_calls(), 0);
    assert_eq!(
        session.state(),
        SessionState {
            is_authenticated: true,
            is_session_expired: false
        }
    );
    assert_eq!(session.expires_in_millis(), Some(3_600_000));
}

#[tokio::test]
async fn token_outside_margin_needs_no_refresh() {
    let (exchange, clock) = setup();
    let session = signed_in(&exchange, &clock).await;

    for _ in 0..10 {
        clock.advance(Duration::from_secs(300));
        assert_eq!(session.current_access_token().await.unwrap(), "A1");
    }
    // 50 minutes in, 10 minutes left
    assert_eq!(exchange.refresh_calls(), 0);
}

#[tokio::test]
async fn near_expiry_refresh_preserves_refresh_token() {
    let (exchange, clock) = setup();
    let session = signed_in(&exchange, &clock).await;

    clock.advance(Duration::from_secs(3600 - 30));
    exchange.push_refresh(Ok(refreshed("A2", None, 3600)));

    assert_eq!(session.current_access_token().await.unwrap(), "A2");
    assert_eq!(exchange.refresh_tokens_seen(), vec!["R1".to_string()]);

    // Still fresh: no second exchange
    assert_eq!(session.current_access_token().await.unwrap(), "A2");
    assert_eq!(exchange.refresh_calls(), 1);
}

#[tokio::test]
async fn rotated_refresh_token_is_used_next_time() {
    let (exchange, clock) = setup();
    let session = signed_in(&exchange, &clock).await;

    clock.advance(Duration::from_secs(3600));
    exchange.push_refresh(Ok(refreshed("A2", Some("R2"), 3600)));
    assert_eq!(session.current_access_token().await.unwrap(), "A2");

    clock.advance(Duration::from_secs(3600));
    exchange.push_refresh(Ok(refreshed("A3", None, 3600)));
    assert_eq!(session.current_access_token().await.unwrap(), "A3");

    assert_eq!(
        exchange.refresh_tokens_seen(),
        vec!["R1".to_string(), "R2".to_string()]
    );
}

#[tokio::test]
async fn terminal_rejection_expires_the_session() {
    let (exchange, clock) = setup();
    let session = signed_in(&exchange, &clock).await;
    let mut updates = session.subscribe();
    updates.borrow_and_update();

    clock.advance(Duration::from_secs(3600));
    exchange.push_refresh(Err(RefreshError::Rejected("invalid_grant".into())));

    assert_eq!(
        session.current_access_token().await,
        Err(SessionError::SessionExpired)
    );
    assert!(session.is_session_expired());
    assert!(updates.has_changed().unwrap());
    assert!(updates.borrow_and_update().is_session_expired);

    // No further network call
    assert_eq!(
        session.current_access_token().await,
        Err(SessionError::SessionExpired)
    );
    assert_eq!(exchange.refresh_calls(), 1);
    assert_eq!(session.expires_in_millis(), None);
}

#[tokio::test]
async fn transient_failure_keeps_the_credential_and_retries_later() {
    let (exchange, clock) = setup();
    let session = signed_in(&exchange, &clock).await;

    clock.advance(Duration::from_secs(3600 + 1));
    exchange.push_refresh(Err(RefreshError::Unavailable("timed out".into())));

    assert_eq!(
        session.current_access_token().await,
        Err(SessionError::RefreshTemporarilyUnavailable)
    );
    assert!(!session.is_session_expired());
    assert!(session.is_authenticated());
    assert_eq!(session.expires_in_millis(), Some(-1000));

    clock.advance(Duration::from_secs(5));
    exchange.push_refresh(Ok(refreshed("A2", None, 3600)));

    assert_eq!(session.current_access_token().await.unwrap(), "A2");
    assert_eq!(
        exchange.refresh_tokens_seen(),
        vec!["R1".to_string(), "R1".to_string()]
    );
}

#[tokio::test]
async fn concurrent_callers_share_one_refresh() {
    let exchange = Arc::new(FakeExchange::slow(Duration::from_millis(50)));
    let clock = Arc::new(ManualClock::new(START));
    let session = signed_in(&exchange, &clock).await;

    clock.advance(Duration::from_secs(3600));
    exchange.push_refresh(Ok(refreshed("A2", None, 3600)));

    let (a, b, c) = tokio::join!(
        session.current_access_token(),
        session.current_access_token(),
        session.current_access_token()
    );

    assert_eq!(a.unwrap(), "A2");
    assert_eq!(b.unwrap(), "A2");
    assert_eq!(c.unwrap(), "A2");
    assert_eq!(exchange.refresh_calls(), 1);
}

#[tokio::test]
async fn concurrent_callers_share_one_failure() {
    let exchange = Arc::new(FakeExchange::slow(Duration::from_millis(50)));
    let clock = Arc::new(ManualClock::new(START));
    let session = signed_in(&exchange, &clock).await;

    clock.advance(Duration::from_secs(3600));
    exchange.push_refresh(Err(RefreshError::Unavailable("503".into())));

    let callers = (0..4).map(|_| {
        let session = session.clone();
        tokio::spawn(async move { session.current_access_token().await })
    });
    let results = futures::future::join_all(callers).await;

    for result in results {
        assert_eq!(
            result.unwrap(),
            Err(SessionError::RefreshTemporarilyUnavailable)
        );
    }
    assert_eq!(exchange.refresh_calls(), 1);
}

#[tokio::test]
async fn sign_out_then_access_is_not_authenticated() {
    let (exchange, clock) = setup();
    let session = signed_in(&exchange, &clock).await;

    session.sign_out();

    assert_eq!(
        session.current_access_token().await,
        Err(SessionError::NotAuthenticated)
    );
    assert_eq!(session.phase(), SessionPhase::SignedOut);
    assert_eq!(session.state(), SessionState::default());
    assert_eq!(exchange.refresh_calls(), 0);
}

#[tokio::test]
async fn access_before_sign_in_is_not_authenticated() {
    let (exchange, clock) = setup();
    let session = session(&exchange, &clock);

    assert_eq!(
        session.current_access_token().await,
        Err(SessionError::NotAuthenticated)
    );
    assert!(SessionError::NotAuthenticated.requires_sign_in());
}

#[tokio::test]
async fn failed_sign_in_stays_signed_out() {
    let (exchange, clock) = setup();
    let session = session(&exchange, &clock);
    exchange.push_code(Err(ExchangeError::Rejected("invalid_grant".into())));

    let err = session
        .begin_sign_in(&authorization("used-code"))
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::SignInFailed(_)));
    assert_eq!(session.phase(), SessionPhase::SignedOut);
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn sign_in_after_expiry_recovers_the_session() {
    let (exchange, clock) = setup();
    let session = signed_in(&exchange, &clock).await;

    clock.advance(Duration::from_secs(3600));
    exchange.push_refresh(Err(RefreshError::Rejected("invalid_grant".into())));
    let _ = session.current_access_token().await;
    assert_eq!(session.phase(), SessionPhase::Failed);

    exchange.push_code(Ok(grant("B1", "S1", 3600)));
    session
        .begin_sign_in(&authorization("grant456"))
        .await
        .unwrap();

    assert_eq!(session.current_access_token().await.unwrap(), "B1");
    assert_eq!(
        session.expires_in_millis(),
        Some(START + 7_200_000 - clock.now_millis())
    );
}

#[tokio::test]
async fn custom_margin_moves_the_refresh_point() {
    let (exchange, clock) = setup();
    exchange.push_code(Ok(grant("A1", "R1", 3600)));
    let session = sporlplay::session::SessionAuthority::builder(exchange.clone())
        .clock(clock.clone())
        .refresh_margin(Duration::from_secs(600))
        .build();
    session
        .begin_sign_in(&authorization("grant123"))
        .await
        .unwrap();

    clock.advance(Duration::from_secs(3600 - 700));
    assert_eq!(session.current_access_token().await.unwrap(), "A1");

    clock.advance(Duration::from_secs(100));
    exchange.push_refresh(Ok(refreshed("A2", None, 3600)));
    assert_eq!(session.current_access_token().await.unwrap(), "A2");
}
