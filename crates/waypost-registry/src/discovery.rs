use std::sync::Arc;

use tracing::{debug, Span};
use waypost_core::{DirectoryClient, RegistryError, ServiceInstance};

/// Looks up healthy instances. Results are rebuilt on every call, in the
/// directory's order.
pub struct DiscoveryResolver {
    directory: Arc<dyn DirectoryClient>,
    span: Span,
}

impl DiscoveryResolver {
    pub fn new(directory: Arc<dyn DirectoryClient>) -> Self {
        Self {
            directory,
            span: Span::current(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub async fn find_instances(&self, service_name: &str) -> Result<Vec<ServiceInstance>, RegistryError> {
        let entries = self.directory.healthy_instances(service_name).await?;
        debug!(parent: &self.span, service_name, count = entries.len(), "resolved healthy instances");
        Ok(entries.into_iter().map(ServiceInstance::from).collect())
    }

    /// Exact match on version; instances without a version never match.
    pub async fn find_instances_with_version(
        &self,
        service_name: &str,
        version: &str,
    ) -> Result<Vec<ServiceInstance>, RegistryError> {
        let instances = self.find_instances(service_name).await?;
        Ok(instances
            .into_iter()
            .filter(|instance| instance.has_version(version))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{registration, UnreachableDirectory};
    use waypost_core::{HealthState, MemoryDirectory};

    async fn svc_directory() -> Arc<MemoryDirectory> {
        let directory = Arc::new(MemoryDirectory::new());
        let mut first = registration("svc-1", "svc").with_version("1.0");
        first.address = "10.0.0.1".to_string();
        first.port = 9000;
        let mut second = registration("svc-2", "svc");
        second.address = "10.0.0.2".to_string();
        second.port = 9000;

        directory.register_service(&first).await.unwrap();
        directory.register_service(&second).await.unwrap();
        directory
    }

    #[tokio::test]
    async fn versions_are_read_from_tags() {
        let resolver = DiscoveryResolver::new(svc_directory().await);

        let instances = resolver.find_instances("svc").await.unwrap();

        assert_eq!(
            instances,
            vec![
                ServiceInstance::new("10.0.0.1", 9000, Some("1.0".to_string())),
                ServiceInstance::new("10.0.0.2", 9000, None),
            ]
        );
    }

    #[tokio::test]
    async fn version_filter_is_exact() {
        let resolver = DiscoveryResolver::new(svc_directory().await);

        let matching = resolver.find_instances_with_version("svc", "1.0").await.unwrap();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].address, "10.0.0.1");

        assert!(resolver.find_instances_with_version("svc", "1.0.1").await.unwrap().is_empty());
        assert!(resolver.find_instances_with_version("svc", "").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unhealthy_or_unknown_services_resolve_to_nothing() {
        let directory = svc_directory().await;
        directory.set_health("svc-1", HealthState::Critical);
        directory.set_health("svc-2", HealthState::Warning);
        let resolver = DiscoveryResolver::new(directory);

        assert!(resolver.find_instances("svc").await.unwrap().is_empty());
        assert!(resolver.find_instances("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn transport_errors_propagate() {
        let resolver = DiscoveryResolver::new(Arc::new(UnreachableDirectory));
        let err = resolver.find_instances("svc").await.unwrap_err();
        assert!(err.is_transport());
    }
}
