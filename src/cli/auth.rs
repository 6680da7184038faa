use std::time::Duration;

use tokio::{sync::watch, time::timeout};

use super::{Context, spinner};
use crate::{
    api::AppState, config::Settings, error, server::start_api_server,
    spotify::client::SpotifyClient, success, types::SessionState, warning,
};

/// How long the user has to finish the browser consent screen.
const AUTH_TIMEOUT: Duration = Duration::from_secs(120);

/// Runs the authorization-code flow: local server, browser, wait, persist.
pub async fn auth(settings: Settings) {
    let ctx = Context::load(settings).await;
    let client = match SpotifyClient::from_settings(&ctx.settings, ctx.session.clone()) {
        Ok(client) => client,
        Err(e) => error!("Cannot set up API client: {}", e),
    };

    let addr = ctx.settings.server_addr;
    let state = AppState::new(ctx.settings.clone(), ctx.session.clone(), client);
    let mut updates = ctx.session.subscribe();
    updates.mark_unchanged();

    let mut server = tokio::spawn(async move { start_api_server(state, addr).await });

    let login_url = format!("http://{addr}/login");
    if webbrowser::open(&login_url).is_err() {
        warning!(
            "Failed to open browser. Please navigate to the following URL manually:\n{}",
            login_url
        )
    }

    let pb = spinner("Waiting for authorization in the browser...");
    let signed_in = tokio::select! {
        outcome = timeout(AUTH_TIMEOUT, wait_for_sign_in(&mut updates)) => outcome.unwrap_or(false),
        stopped = &mut server => {
            pb.finish_and_clear();
            match stopped {
                Ok(Err(e)) => error!("Cannot run callback server on {}. Err: {}", addr, e),
                _ => error!("Callback server stopped before sign-in completed."),
            }
        }
    };
    pb.finish_and_clear();
    server.abort();

    if !signed_in {
        error!("Authentication failed or timed out.");
    }
    ctx.persist().await;
    success!("Authentication successful!");
}

async fn wait_for_sign_in(updates: &mut watch::Receiver<SessionState>) -> bool {
    while updates.changed().await.is_ok() {
        let state = *updates.borrow_and_update();
        if state.is_authenticated && !state.is_session_expired {
            return true;
        }
    }
    false
}
