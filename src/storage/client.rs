use std::sync::Arc;

use crate::{app::repositories::KeyValueStore, model::Credential};

const TOKEN_KEY: &str = "token";
const LAST_LOADING_TIME_KEY: &str = "lastLoadingTime";

/// Typed view over the durable client store.
///
/// Write failures are logged and swallowed: the in-memory session is the
/// state the user sees, and the next successful write catches the file up.
#[derive(Clone)]
pub struct ClientStorage {
    store: Arc<dyn KeyValueStore>,
}

impl ClientStorage {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn credential(&self) -> Option<Credential> {
        let raw = self.store.get(TOKEN_KEY)?;

        Credential::from_str(&raw)
    }

    pub fn has_credential(&self) -> bool {
        self.credential().is_some()
    }

    pub fn store_credential(&self, credential: &Credential) {
        if let Err(err) = self.store.set(TOKEN_KEY, credential.as_str()) {
            log::error!("Failed to persist credential: {:#}", err);
        }
    }

    pub fn clear_credential(&self) {
        if let Err(err) = self.store.remove(TOKEN_KEY) {
            log::error!("Failed to remove stored credential: {:#}", err);
        }
    }

    /// Epoch milliseconds of the last time the splash view was shown.
    pub fn last_loading_time(&self) -> Option<i64> {
        let raw = self.store.get(LAST_LOADING_TIME_KEY)?;

        match raw.trim().parse() {
            Ok(millis) => Some(millis),
            Err(_) => {
                log::warn!("Ignoring malformed {}: {:?}", LAST_LOADING_TIME_KEY, raw);
                None
            }
        }
    }

    pub fn set_last_loading_time(&self, epoch_millis: i64) {
        if let Err(err) = self
            .store
            .set(LAST_LOADING_TIME_KEY, &epoch_millis.to_string())
        {
            log::error!("Failed to persist {}: {:#}", LAST_LOADING_TIME_KEY, err);
        }
    }
}
