use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use waypost_core::{DirectoryClient, RegistryError};

/// JSON values in the directory's key-value store. Last writer wins.
pub struct KeyValueStore {
    directory: Arc<dyn DirectoryClient>,
}

impl KeyValueStore {
    pub fn new(directory: Arc<dyn DirectoryClient>) -> Self {
        Self { directory }
    }

    pub async fn put<T>(&self, key: &str, value: &T) -> Result<(), RegistryError>
    where
        T: Serialize + ?Sized,
    {
        let payload = serde_json::to_vec(value)?;
        self.directory.kv_put(key, payload).await
    }

    /// Fails with `NotFound` for a missing key and `Serialization` when the
    /// stored value does not fit `T`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, RegistryError> {
        let payload = self.directory.kv_get(key).await?;
        Ok(serde_json::from_slice(&payload)?)
    }
}
