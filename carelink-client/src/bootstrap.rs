//! Wiring from a resolved [`ClientConfig`] to a ready [`ApiClient`].

use std::sync::Arc;

use carelink_config::{ClientConfig, StorageBackend};
use log::{info, warn};

use crate::domains::auth::{
    CredentialStore, FileCredentialStore, MemoryCredentialStore, SessionManager,
};
use crate::infrastructure::ApiClient;

/// Open the credential store the configuration asks for.
///
/// Falls back to memory when a file store was requested but no location
/// could be determined.
pub fn open_store(config: &ClientConfig) -> Arc<dyn CredentialStore> {
    match (config.storage.backend, config.storage.path.as_ref()) {
        (StorageBackend::File, Some(path)) => {
            info!("[CredentialStore] Using session file {}", path.display());
            Arc::new(FileCredentialStore::open(
                path.clone(),
                &config.storage.namespace,
            ))
        }
        (StorageBackend::File, None) => {
            warn!(
                "[CredentialStore] No session file location available, keeping session in memory"
            );
            Arc::new(MemoryCredentialStore::new())
        }
        (StorageBackend::Memory, _) => Arc::new(MemoryCredentialStore::new()),
    }
}

pub fn build_http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("carelink/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Build the session manager and API client over an explicit store.
pub fn build_client_with_store(
    config: &ClientConfig,
    store: Arc<dyn CredentialStore>,
) -> reqwest::Result<ApiClient> {
    let http = build_http_client()?;
    let session = SessionManager::new(http, &config.api, store);
    Ok(ApiClient::new(session, &config.api))
}

pub fn build_client(config: &ClientConfig) -> reqwest::Result<ApiClient> {
    build_client_with_store(config, open_store(config))
}
