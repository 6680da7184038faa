use std::sync::Arc;

use parking_lot::RwLock;

use crate::types::Credential;

#[derive(Debug, Default)]
struct Slot {
    epoch: u64,
    credential: Option<Arc<Credential>>,
}

/// Holder of the single live credential.
///
/// Readers get an `Arc` snapshot, so a reader sees either the old or the new
/// credential in full. The epoch changes whenever the session itself changes
/// (`set` for a new sign-in, `clear` for sign-out) and stays put across
/// refreshes, which go through [`CredentialStore::compare_and_set`].
#[derive(Debug, Default)]
pub struct CredentialStore {
    slot: RwLock<Slot>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<Arc<Credential>> {
        self.slot.read().credential.clone()
    }

    /// The credential together with the epoch it belongs to.
    pub fn snapshot(&self) -> (u64, Option<Arc<Credential>>) {
        let slot = self.slot.read();
        (slot.epoch, slot.credential.clone())
    }

    pub fn epoch(&self) -> u64 {
        self.slot.read().epoch
    }

    /// Starts a new session lineage with `credential`. Returns the new epoch.
    pub fn set(&self, credential: Credential) -> u64 {
        let mut slot = self.slot.write();
        slot.epoch += 1;
        slot.credential = Some(Arc::new(credential));
        slot.epoch
    }

    /// Replaces the credential only if the session is still `expected_epoch`.
    pub fn compare_and_set(&self, expected_epoch: u64, credential: Credential) -> bool {
        let mut slot = self.slot.write();
        if slot.epoch != expected_epoch {
            return false;
        }
        slot.credential = Some(Arc::new(credential));
        true
    }

    /// Removes the credential. Returns the new epoch.
    pub fn clear(&self) -> u64 {
        let mut slot = self.slot.write();
        slot.epoch += 1;
        slot.credential = None;
        slot.epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CredentialStatus;

    fn credential(access: &str) -> Credential {
        Credential {
            access_token: access.into(),
            refresh_token: "R1".into(),
            scope: None,
            expires_at: 0,
            status: CredentialStatus::Valid,
            last_error: None,
        }
    }

    #[test]
    fn empty_until_set() {
        let store = CredentialStore::new();
        assert!(store.get().is_none());
        store.set(credential("A1"));
        assert_eq!(store.get().unwrap().access_token, "A1");
    }

    #[test]
    fn clear_empties_and_advances_epoch() {
        let store = CredentialStore::new();
        let epoch = store.set(credential("A1"));
        let cleared = store.clear();
        assert!(cleared > epoch);
        assert!(store.get().is_none());
    }

    #[test]
    fn compare_and_set_rejects_a_stale_epoch() {
        let store = CredentialStore::new();
        let first = store.set(credential("A1"));
        assert!(store.compare_and_set(first, credential("A2")));
        assert_eq!(store.epoch(), first);

        store.clear();
        assert!(!store.compare_and_set(first, credential("A3")));
        assert!(store.get().is_none());
    }

    #[test]
    fn snapshots_are_not_affected_by_later_writes() {
        let store = CredentialStore::new();
        store.set(credential("A1"));
        let (_, before) = store.snapshot();
        store.set(credential("A2"));
        assert_eq!(before.unwrap().access_token, "A1");
        assert_eq!(store.get().unwrap().access_token, "A2");
    }
}
