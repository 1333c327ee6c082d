use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{info, Span};
use url::Url;
use waypost_core::{DirectoryClient, RegistryError, ServiceInstance};

use crate::config::RegistryConfig;
use crate::discovery::DiscoveryResolver;
use crate::kv::KeyValueStore;
use crate::reaper::CriticalServiceReaper;
use crate::registration::RegistrationManager;

/// One client of the service directory: registration, discovery, key-value
/// access and the critical-service reaper over a single shared connection.
pub struct RegistryHost {
    directory: Arc<dyn DirectoryClient>,
    registration: RegistrationManager,
    discovery: DiscoveryResolver,
    kv: KeyValueStore,
    reaper: Arc<CriticalServiceReaper>,
    span: Span,
}

impl RegistryHost {
    pub fn new(directory: Arc<dyn DirectoryClient>, config: &RegistryConfig) -> Self {
        Self::with_span(directory, config, Span::current())
    }

    /// Every component of the host logs inside `span`.
    pub fn with_span(directory: Arc<dyn DirectoryClient>, config: &RegistryConfig, span: Span) -> Self {
        let reaper = Arc::new(
            CriticalServiceReaper::new(directory.clone(), config.reaper_schedule()).with_span(span.clone()),
        );
        let registration = RegistrationManager::new(directory.clone(), reaper.clone(), config.check_interval())
            .with_span(span.clone());
        let discovery = DiscoveryResolver::new(directory.clone()).with_span(span.clone());
        let kv = KeyValueStore::new(directory.clone());

        Self {
            directory,
            registration,
            discovery,
            kv,
            reaper,
            span,
        }
    }

    pub fn directory(&self) -> &Arc<dyn DirectoryClient> {
        &self.directory
    }

    pub fn reaper(&self) -> &Arc<CriticalServiceReaper> {
        &self.reaper
    }

    pub async fn register_service(
        &self,
        service_name: &str,
        service_id: &str,
        version: &str,
        endpoint: &Url,
        health_check: Option<&Url>,
    ) -> Result<(), RegistryError> {
        self.registration
            .register(service_name, service_id, version, endpoint, health_check)
            .await
    }

    /// Removes a registration by id. Unknown ids succeed.
    pub async fn deregister_service(&self, service_id: &str) -> Result<(), RegistryError> {
        self.directory.deregister_service(service_id).await?;
        info!(parent: &self.span, service_id, "Deregistered service");
        Ok(())
    }

    pub async fn find_service_instances(&self, service_name: &str) -> Result<Vec<ServiceInstance>, RegistryError> {
        self.discovery.find_instances(service_name).await
    }

    pub async fn find_service_instances_with_version(
        &self,
        service_name: &str,
        version: &str,
    ) -> Result<Vec<ServiceInstance>, RegistryError> {
        self.discovery.find_instances_with_version(service_name, version).await
    }

    pub async fn key_value_put<T>(&self, key: &str, value: &T) -> Result<(), RegistryError>
    where
        T: Serialize + ?Sized,
    {
        self.kv.put(key, value).await
    }

    pub async fn key_value_get<T: DeserializeOwned>(&self, key: &str) -> Result<T, RegistryError> {
        self.kv.get(key).await
    }

    /// Starts the reaper without registering anything. Needs a Tokio runtime.
    pub fn start_client(&self) {
        self.reaper.start();
    }

    pub async fn shutdown(&self) {
        self.reaper.shutdown().await;
        info!(parent: &self.span, "Registry host shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::sleep;
    use waypost_core::{HealthState, MemoryDirectory};

    fn host() -> (RegistryHost, Arc<MemoryDirectory>) {
        let directory = Arc::new(MemoryDirectory::new());
        (RegistryHost::new(directory.clone(), &RegistryConfig::default()), directory)
    }

    #[tokio::test(start_paused = true)]
    async fn registered_version_is_discoverable() {
        let (host, directory) = host();
        let endpoint = Url::parse("http://host:8080").unwrap();
        host.register_service("orders", "orders-1", "2.1", &endpoint, None).await.unwrap();

        let registration = directory.registration("orders-1").unwrap();
        assert_eq!(registration.check.url, "http://host:8080/status");

        let found = host.find_service_instances_with_version("orders", "2.1").await.unwrap();
        assert_eq!(found, vec![ServiceInstance::new("host", 8080, Some("2.1".to_string()))]);
        assert!(host.find_service_instances_with_version("orders", "2.2").await.unwrap().is_empty());

        host.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_registration_keeps_one_reaper() {
        let (host, directory) = host();
        let endpoint = Url::parse("http://host:8080").unwrap();
        host.start_client();
        host.register_service("orders", "orders-1", "2.1", &endpoint, None).await.unwrap();
        host.register_service("orders", "orders-2", "2.1", &endpoint, None).await.unwrap();
        assert!(host.reaper().is_running());

        directory.set_health("orders-2", HealthState::Critical);
        sleep(Duration::from_secs(11)).await;

        assert_eq!(directory.service_ids(), vec!["orders-1"]);
        assert_eq!(directory.deregister_calls(), 1);

        host.shutdown().await;
        assert!(!host.reaper().is_running());
    }

    #[tokio::test]
    async fn deregistration_is_idempotent() {
        let (host, directory) = host();
        host.deregister_service("missing-1").await.unwrap();
        host.deregister_service("missing-1").await.unwrap();
        assert!(directory.service_ids().is_empty());
    }

    #[tokio::test]
    async fn key_values_round_trip_through_the_host() {
        let (host, _) = host();
        host.key_value_put("config/regions", &vec!["eu", "us"]).await.unwrap();
        let regions: Vec<String> = host.key_value_get("config/regions").await.unwrap();
        assert_eq!(regions, vec!["eu", "us"]);
    }
}
