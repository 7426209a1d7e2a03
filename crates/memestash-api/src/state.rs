//! Shared state for the asset-serving routes.

use memestash_storage::AssetStore;

pub struct AppState {
    pub store: AssetStore,
    /// Token-signing secret, loaded once at startup.
    pub secret: Vec<u8>,
}
