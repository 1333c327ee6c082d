//! Directory doubles shared by the unit tests in this crate.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use waypost_core::{
    CatalogEntry, DirectoryClient, HealthCheck, HealthState, MemoryDirectory, RegistryError,
    ServiceRegistration,
};

pub fn registration(id: &str, name: &str) -> ServiceRegistration {
    let check = HealthCheck {
        url: format!("http://{id}:8080/status"),
        interval: Duration::from_secs(1),
    };
    ServiceRegistration::new(id, name, id, 8080, check)
}

/// Registers `critical` services in critical state and `others` split between
/// passing and warning.
pub async fn seeded_directory(critical: &[&str], others: &[&str]) -> Arc<MemoryDirectory> {
    let directory = Arc::new(MemoryDirectory::new());
    for id in critical.iter().chain(others) {
        directory.register_service(&registration(id, "seeded")).await.unwrap();
    }
    for id in critical {
        directory.set_health(id, HealthState::Critical);
    }
    for id in others.iter().skip(1).step_by(2) {
        directory.set_health(id, HealthState::Warning);
    }
    directory
}

fn unreachable() -> RegistryError {
    RegistryError::Transport("connection refused".to_string())
}

/// Wraps a [`MemoryDirectory`] and fails chosen calls to `services_in_state`
/// (1-based).
pub struct FlakyDirectory {
    pub inner: Arc<MemoryDirectory>,
    failing_queries: Vec<usize>,
    queries: AtomicUsize,
}

impl FlakyDirectory {
    pub fn new(inner: Arc<MemoryDirectory>, failing_queries: Vec<usize>) -> Self {
        Self {
            inner,
            failing_queries,
            queries: AtomicUsize::new(0),
        }
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DirectoryClient for FlakyDirectory {
    async fn register_service(&self, registration: &ServiceRegistration) -> Result<(), RegistryError> {
        self.inner.register_service(registration).await
    }

    async fn deregister_service(&self, service_id: &str) -> Result<(), RegistryError> {
        self.inner.deregister_service(service_id).await
    }

    async fn healthy_instances(&self, service_name: &str) -> Result<Vec<CatalogEntry>, RegistryError> {
        self.inner.healthy_instances(service_name).await
    }

    async fn services_in_state(&self, state: HealthState) -> Result<Vec<String>, RegistryError> {
        let call = self.queries.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing_queries.contains(&call) {
            return Err(unreachable());
        }
        self.inner.services_in_state(state).await
    }

    async fn kv_put(&self, key: &str, value: Vec<u8>) -> Result<(), RegistryError> {
        self.inner.kv_put(key, value).await
    }

    async fn kv_get(&self, key: &str) -> Result<Vec<u8>, RegistryError> {
        self.inner.kv_get(key).await
    }
}

/// Every call fails as if the directory were down.
pub struct UnreachableDirectory;

#[async_trait]
impl DirectoryClient for UnreachableDirectory {
    async fn register_service(&self, _registration: &ServiceRegistration) -> Result<(), RegistryError> {
        Err(unreachable())
    }

    async fn deregister_service(&self, _service_id: &str) -> Result<(), RegistryError> {
        Err(unreachable())
    }

    async fn healthy_instances(&self, _service_name: &str) -> Result<Vec<CatalogEntry>, RegistryError> {
        Err(unreachable())
    }

    async fn services_in_state(&self, _state: HealthState) -> Result<Vec<String>, RegistryError> {
        Err(unreachable())
    }

    async fn kv_put(&self, _key: &str, _value: Vec<u8>) -> Result<(), RegistryError> {
        Err(unreachable())
    }

    async fn kv_get(&self, _key: &str) -> Result<Vec<u8>, RegistryError> {
        Err(unreachable())
    }
}
