use super::Context;
use crate::{
    api::AppState, config::Settings, error, info, server::start_api_server,
    spotify::client::SpotifyClient, warning,
};

pub async fn serve(settings: Settings) {
    let ctx = Context::load(settings).await;
    let client = match SpotifyClient::from_settings(&ctx.settings, ctx.session.clone()) {
        Ok(client) => client,
        Err(e) => error!("Cannot set up API client: {}", e),
    };

    let addr = ctx.settings.server_addr;
    let _sync = ctx.cache.clone().spawn_sync(&ctx.session);

    if !ctx.session.is_authenticated() {
        warning!("Not signed in. Open http://{}/login to sign in.", addr);
    }
    info!("Serving on http://{}", addr);

    let state = AppState::new(ctx.settings, ctx.session, client);
    if let Err(e) = start_api_server(state, addr).await {
        error!("Server stopped: {}", e);
    }
}
