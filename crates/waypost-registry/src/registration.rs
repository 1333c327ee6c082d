use std::sync::Arc;
use std::time::Duration;

use tracing::{info, Span};
use url::Url;
use waypost_core::{tags, DirectoryClient, HealthCheck, RegistryError, ServiceRegistration};

use crate::reaper::CriticalServiceReaper;

pub struct RegistrationManager {
    directory: Arc<dyn DirectoryClient>,
    reaper: Arc<CriticalServiceReaper>,
    check_interval: Duration,
    span: Span,
}

impl RegistrationManager {
    pub fn new(
        directory: Arc<dyn DirectoryClient>,
        reaper: Arc<CriticalServiceReaper>,
        check_interval: Duration,
    ) -> Self {
        Self {
            directory,
            reaper,
            check_interval,
            span: Span::current(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Builds the record `register` would submit.
    ///
    /// The health check targets `health_check` when given, otherwise
    /// `<endpoint>/status`. An empty version produces no version tag.
    pub fn build_registration(
        &self,
        service_name: &str,
        service_id: &str,
        version: &str,
        endpoint: &Url,
        health_check: Option<&Url>,
    ) -> Result<ServiceRegistration, RegistryError> {
        let address = endpoint
            .host_str()
            .ok_or_else(|| RegistryError::InvalidEndpoint(format!("{endpoint} has no host")))?;
        let port = endpoint
            .port_or_known_default()
            .ok_or_else(|| RegistryError::InvalidEndpoint(format!("{endpoint} has no port")))?;

        let check = HealthCheck {
            url: health_check_url(endpoint, health_check),
            interval: self.check_interval,
        };
        let mut registration = ServiceRegistration::new(service_id, service_name, address, port, check);
        registration.add_tag(tags::url_prefix(service_name));
        if !version.is_empty() {
            registration = registration.with_version(version);
        }
        Ok(registration)
    }

    /// Submits the registration, then makes sure the reaper is running.
    ///
    /// Directory errors are returned as-is; nothing is retried.
    pub async fn register(
        &self,
        service_name: &str,
        service_id: &str,
        version: &str,
        endpoint: &Url,
        health_check: Option<&Url>,
    ) -> Result<(), RegistryError> {
        let registration = self.build_registration(service_name, service_id, version, endpoint, health_check)?;

        info!(
            parent: &self.span,
            service_id,
            "Registering {} service at {} with status check {}",
            service_name,
            endpoint,
            registration.check.url
        );
        self.directory.register_service(&registration).await?;
        info!(parent: &self.span, service_id, "Registration of {} succeeded", service_name);

        self.reaper.start();
        Ok(())
    }
}

fn health_check_url(endpoint: &Url, health_check: Option<&Url>) -> String {
    match health_check {
        Some(url) => url.to_string(),
        None => format!("{}/status", endpoint.as_str().trim_end_matches('/')),
    }
}
