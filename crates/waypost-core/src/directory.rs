use async_trait::async_trait;

use crate::errors::RegistryError;
use crate::health::HealthState;
use crate::instance::CatalogEntry;
use crate::registration::ServiceRegistration;

/// Boundary to the external service directory.
///
/// Implementations are shared behind an `Arc` by every component of a host;
/// the directory itself is the only synchronization point.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Upserts a service record by id.
    async fn register_service(&self, registration: &ServiceRegistration) -> Result<(), RegistryError>;

    /// Removes a service record. Removing an unknown id succeeds.
    async fn deregister_service(&self, service_id: &str) -> Result<(), RegistryError>;

    /// Passing instances of `service_name`, in the directory's own order.
    async fn healthy_instances(&self, service_name: &str) -> Result<Vec<CatalogEntry>, RegistryError>;

    /// Ids of every service, of any owner, currently in `state`.
    async fn services_in_state(&self, state: HealthState) -> Result<Vec<String>, RegistryError>;

    async fn kv_put(&self, key: &str, value: Vec<u8>) -> Result<(), RegistryError>;

    /// Raw bytes stored under `key`; [`RegistryError::NotFound`] when absent.
    async fn kv_get(&self, key: &str) -> Result<Vec<u8>, RegistryError>;
}
