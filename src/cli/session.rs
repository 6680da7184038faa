use super::Context;
use crate::{
    config::Settings, error, info, success, types::SessionPhase, utils::format_remaining, warning,
};

/// Prints a currently-valid access token, refreshing it first if needed.
pub async fn token(settings: Settings) {
    let ctx = Context::load(settings).await;
    let result = ctx.session.current_access_token().await;
    ctx.persist().await;

    match result {
        Ok(token) => println!("{}", token),
        Err(e) if e.requires_sign_in() => error!("{}\nRun sporlplay auth.", e),
        Err(e) => error!("{}", e),
    }
}

pub async fn status(settings: Settings) {
    let ctx = Context::load(settings).await;

    match ctx.session.phase() {
        SessionPhase::SignedOut | SessionPhase::SigningIn => {
            warning!("Not signed in. Run sporlplay auth.")
        }
        SessionPhase::Failed => warning!("Session expired. Run sporlplay auth."),
        SessionPhase::Authenticated { .. } => {
            let remaining = ctx.session.expires_in_millis().unwrap_or(0);
            success!("Signed in.");
            info!("Access token expires in {}", format_remaining(remaining));
        }
    }
    info!("Credential cache: {}", ctx.cache.path().display());
}

pub async fn logout(settings: Settings) {
    let ctx = Context::load(settings).await;
    ctx.session.sign_out();
    ctx.persist().await;
    success!("Signed out.");
}
