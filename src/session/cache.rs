use std::{io::ErrorKind, path::PathBuf};

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{config, error::CacheError, session::SessionAuthority, types::Credential};

/// On-disk copy of the session credential, so a sign-in survives between
/// invocations of the binary.
#[derive(Debug, Clone)]
pub struct CredentialCache {
    path: PathBuf,
}

impl CredentialCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CredentialCache { path: path.into() }
    }

    /// `<data_local_dir>/sporlplay/cache/credential.json`
    pub fn default_location() -> Self {
        let mut path = config::data_dir();
        path.push("cache/credential.json");
        Self::new(path)
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Returns `None` when nothing was cached yet.
    pub async fn load(&self) -> Result<Option<Credential>, CacheError> {
        let content = match async_fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let credential: Credential = serde_json::from_str(&content)?;
        Ok(Some(credential))
    }

    pub async fn save(&self, credential: &Credential) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(credential)?;
        async_fs::write(&self.path, json).await?;
        Ok(())
    }

    pub async fn remove(&self) -> Result<(), CacheError> {
        match async_fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes the authority's current credential, or removes the file when
    /// signed out.
    pub async fn sync_from(&self, session: &SessionAuthority) -> Result<(), CacheError> {
        match session.credential() {
            Some(credential) => self.save(&credential).await,
            None => self.remove().await,
        }
    }

    /// Keeps the file in step with the session for as long as it lives.
    pub fn spawn_sync(self, session: &SessionAuthority) -> JoinHandle<()> {
        let mut updates = session.watch_credential();
        tokio::spawn(async move {
            while updates.changed().await.is_ok() {
                let snapshot = updates.borrow_and_update().clone();
                let result = match snapshot {
                    Some(credential) => self.save(&credential).await,
                    None => self.remove().await,
                };
                match result {
                    Ok(()) => debug!(path = %self.path.display(), "credential cache updated"),
                    Err(e) => warn!(error = %e, "credential cache update failed"),
                }
            }
        })
    }
}
