use axum::{
    Extension,
    extract::Query,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use super::AppState;
use crate::{
    spotify::auth::authorize_url,
    types::{AuthorizationGrant, PkceToken},
    utils, warning,
};

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

pub async fn login(Extension(state): Extension<AppState>) -> Response {
    let code_verifier = utils::generate_code_verifier();
    let code_challenge = utils::generate_code_challenge(&code_verifier);
    let oauth_state = utils::generate_state();

    let url = match authorize_url(&state.settings, &code_challenge, &oauth_state) {
        Ok(url) => url,
        Err(e) => {
            warning!("Cannot build authorization URL: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, Html("<h4>Login unavailable.</h4>"))
                .into_response();
        }
    };

    // Store verifier in shared state before redirect
    *state.pending.lock().await = Some(PkceToken {
        code_verifier,
        state: oauth_state,
    });

    Redirect::temporary(&url).into_response()
}

pub async fn callback(
    Query(params): Query<CallbackParams>,
    Extension(state): Extension<AppState>,
) -> (StatusCode, Html<&'static str>) {
    if let Some(error) = params.error {
        warning!("Authorization was not granted: {}", error);
        state.pending.lock().await.take();
        return (StatusCode::UNAUTHORIZED, Html("<h4>Login cancelled.</h4>"));
    }

    let Some(code) = params.code else {
        return (StatusCode::BAD_REQUEST, Html("<h4>Missing authorization code.</h4>"));
    };

    // The verifier is single use whatever the outcome
    let Some(pending) = state.pending.lock().await.take() else {
        return (StatusCode::BAD_REQUEST, Html("<h4>Missing PKCE code verifier.</h4>"));
    };

    if params.state.as_deref() != Some(pending.state.as_str()) {
        warning!("Callback state mismatch, ignoring authorization code");
        return (StatusCode::BAD_REQUEST, Html("<h4>Login failed.</h4>"));
    }

    let grant = AuthorizationGrant {
        code,
        code_verifier: pending.code_verifier,
        redirect_uri: state.settings.redirect_uri.clone(),
    };

    match state.session.begin_sign_in(&grant).await {
        Ok(()) => (
            StatusCode::OK,
            Html("<h2>Authentication successful.</h2><p>Close browser window.</p>"),
        ),
        Err(e) => {
            warning!("Token exchange failed: {}", e);
            (StatusCode::UNAUTHORIZED, Html("<h4>Login failed.</h4>"))
        }
    }
}
