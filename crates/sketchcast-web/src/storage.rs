//! localStorage-backed credential store.

use crate::fetch::js_error;
use sketchcast_core::session::{CredentialStore, SessionError, SessionResult};
use sketchcast_core::transport::BoxFuture;

const CREDENTIALS_KEY: &str = "sketchcast.session";

/// Keeps the signed-in identity in `window.localStorage`.
#[derive(Debug, Default)]
pub struct LocalStorageCredentialStore;

impl LocalStorageCredentialStore {
    pub fn new() -> Self {
        Self
    }

    fn storage() -> SessionResult<web_sys::Storage> {
        web_sys::window()
            .ok_or_else(|| SessionError::Storage("No window object".to_string()))?
            .local_storage()
            .map_err(|e| SessionError::Storage(js_error(&e)))?
            .ok_or_else(|| SessionError::Storage("localStorage not available".to_string()))
    }
}

impl CredentialStore for LocalStorageCredentialStore {
    fn load(&self) -> BoxFuture<'_, SessionResult<Option<String>>> {
        Box::pin(async move {
            Self::storage()?
                .get_item(CREDENTIALS_KEY)
                .map_err(|e| SessionError::Storage(js_error(&e)))
        })
    }

    fn save(&self, credentials: &str) -> BoxFuture<'_, SessionResult<()>> {
        let credentials = credentials.to_string();
        Box::pin(async move {
            Self::storage()?
                .set_item(CREDENTIALS_KEY, &credentials)
                .map_err(|e| SessionError::Storage(js_error(&e)))
        })
    }

    fn clear(&self) -> BoxFuture<'_, SessionResult<()>> {
        Box::pin(async move {
            Self::storage()?
                .remove_item(CREDENTIALS_KEY)
                .map_err(|e| SessionError::Storage(js_error(&e)))
        })
    }
}
