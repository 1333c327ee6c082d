use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::directory::DirectoryClient;
use crate::errors::RegistryError;
use crate::health::HealthState;
use crate::instance::CatalogEntry;
use crate::registration::ServiceRegistration;
use crate::tags;

struct StoredService {
    registration: ServiceRegistration,
    health: HealthState,
}

#[derive(Default)]
struct Inner {
    services: Vec<StoredService>,
    kv: HashMap<String, Vec<u8>>,
    deregister_calls: usize,
}

/// In-process directory with the same observable contract as a remote one.
///
/// New registrations start out passing; use [`MemoryDirectory::set_health`]
/// to move them between states.
#[derive(Default)]
pub struct MemoryDirectory {
    inner: Mutex<Inner>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns false when no service has this id.
    pub fn set_health(&self, service_id: &str, health: HealthState) -> bool {
        let mut inner = self.lock();
        match inner.services.iter_mut().find(|s| s.registration.id == service_id) {
            Some(service) => {
                service.health = health;
                true
            }
            None => false,
        }
    }

    pub fn registration(&self, service_id: &str) -> Option<ServiceRegistration> {
        self.lock()
            .services
            .iter()
            .find(|s| s.registration.id == service_id)
            .map(|s| s.registration.clone())
    }

    pub fn contains(&self, service_id: &str) -> bool {
        self.registration(service_id).is_some()
    }

    pub fn service_ids(&self) -> Vec<String> {
        self.lock().services.iter().map(|s| s.registration.id.clone()).collect()
    }

    pub fn deregister_calls(&self) -> usize {
        self.lock().deregister_calls
    }
}

#[async_trait]
impl DirectoryClient for MemoryDirectory {
    async fn register_service(&self, registration: &ServiceRegistration) -> Result<(), RegistryError> {
        let mut inner = self.lock();
        match inner.services.iter_mut().find(|s| s.registration.id == registration.id) {
            Some(existing) => existing.registration = registration.clone(),
            None => inner.services.push(StoredService {
                registration: registration.clone(),
                health: HealthState::Passing,
            }),
        }
        Ok(())
    }

    async fn deregister_service(&self, service_id: &str) -> Result<(), RegistryError> {
        let mut inner = self.lock();
        inner.deregister_calls += 1;
        inner.services.retain(|s| s.registration.id != service_id);
        Ok(())
    }

    async fn healthy_instances(&self, service_name: &str) -> Result<Vec<CatalogEntry>, RegistryError> {
        let inner = self.lock();
        Ok(inner
            .services
            .iter()
            .filter(|s| s.registration.name == service_name && s.health == HealthState::Passing)
            .map(|s| CatalogEntry {
                id: s.registration.id.clone(),
                address: s.registration.address.clone(),
                port: s.registration.port,
                tags: tags::registration_tags(&s.registration),
            })
            .collect())
    }

    async fn services_in_state(&self, state: HealthState) -> Result<Vec<String>, RegistryError> {
        let inner = self.lock();
        Ok(inner
            .services
            .iter()
            .filter(|s| s.health == state)
            .map(|s| s.registration.id.clone())
            .collect())
    }

    async fn kv_put(&self, key: &str, value: Vec<u8>) -> Result<(), RegistryError> {
        self.lock().kv.insert(key.to_string(), value);
        Ok(())
    }

    async fn kv_get(&self, key: &str) -> Result<Vec<u8>, RegistryError> {
        self.lock()
            .kv
            .get(key)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(key.to_string()))
    }
}
