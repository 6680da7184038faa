use tabled::Table;

use super::{Context, spinner};
use crate::{
    config::Settings,
    error,
    error::{ApiError, SessionError},
    info,
    spotify::client::SpotifyClient,
    types::{Playlist, PlaylistTableRow},
};

const PAGE_SIZE: u32 = 50;

pub async fn playlists(settings: Settings) {
    let ctx = Context::load(settings).await;
    let client = match SpotifyClient::from_settings(&ctx.settings, ctx.session.clone()) {
        Ok(client) => client,
        Err(e) => error!("Cannot set up API client: {}", e),
    };

    let pb = spinner("Fetching playlists...");
    let result = fetch_all(&client).await;
    pb.finish_and_clear();
    ctx.persist().await;

    match result {
        Ok(playlists) if playlists.is_empty() => info!("No playlists found."),
        Ok(playlists) => {
            let rows: Vec<PlaylistTableRow> = playlists.iter().map(PlaylistTableRow::from).collect();
            println!("{}", Table::new(rows));
        }
        Err(ApiError::Session(e @ (SessionError::NotAuthenticated | SessionError::SessionExpired))) => {
            error!("{}\nRun sporlplay auth.", e)
        }
        Err(e) => error!("Failed to fetch playlists: {}", e),
    }
}

async fn fetch_all(client: &SpotifyClient) -> Result<Vec<Playlist>, ApiError> {
    let mut all = Vec::new();
    let mut offset = 0;
    loop {
        let page = client.playlists(PAGE_SIZE, offset).await?;
        let fetched = page.items.len() as u32;
        all.extend(page.items);
        if page.next.is_none() || fetched == 0 {
            return Ok(all);
        }
        offset += fetched;
    }
}
