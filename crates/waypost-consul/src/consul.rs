//! `DirectoryClient` over the Consul HTTP API.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use waypost_core::{
    tags, CatalogEntry, DirectoryClient, HealthState, RegistryError, ServiceRegistration,
};

use crate::config::ConsulConfig;

pub struct ConsulDirectory {
    base_url: String,
    http_client: reqwest::Client,
    token: Option<String>,
    datacenter: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct AgentServiceRegistration<'a> {
    #[serde(rename = "ID")]
    id: &'a str,
    name: &'a str,
    tags: Vec<String>,
    address: &'a str,
    port: u16,
    check: AgentServiceCheck,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct AgentServiceCheck {
    #[serde(rename = "HTTP")]
    http: String,
    interval: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ServiceEntry {
    #[serde(default)]
    node: Option<NodeInfo>,
    service: AgentService,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NodeInfo {
    #[serde(default)]
    address: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AgentService {
    #[serde(rename = "ID")]
    id: String,
    #[serde(default)]
    address: String,
    port: u16,
    #[serde(default)]
    tags: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct HealthCheckEntry {
    #[serde(rename = "ServiceID", default)]
    service_id: String,
}

impl ConsulDirectory {
    pub fn new(config: &ConsulConfig) -> Result<Self, RegistryError> {
        let base_url = config.base_url();
        debug!(
            "Creating ConsulDirectory with base_url={}, timeout={:?}",
            base_url,
            config.timeout()
        );

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| RegistryError::Transport(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            http_client,
            token: config.token.clone(),
            datacenter: config.datacenter.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("Consul request: {} {}", method, url);

        let mut builder = self.http_client.request(method, url);
        if let Some(token) = &self.token {
            builder = builder.header("X-Consul-Token", token);
        }
        if let Some(dc) = &self.datacenter {
            builder = builder.query(&[("dc", dc)]);
        }
        builder
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, RegistryError> {
        builder.send().await.map_err(map_reqwest_error)
    }

    async fn get_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, RegistryError> {
        let response = ensure_success(self.send(builder).await?).await?;
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        Ok(serde_json::from_slice(&body)?)
    }
}

fn map_reqwest_error(error: reqwest::Error) -> RegistryError {
    if error.is_timeout() {
        RegistryError::Transport(format!("timed out: {error}"))
    } else {
        RegistryError::Transport(error.to_string())
    }
}

async fn ensure_success(response: Response) -> Result<Response, RegistryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RegistryError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Renders a duration the way Consul parses check intervals.
fn go_duration(duration: Duration) -> String {
    if duration.subsec_nanos() == 0 {
        format!("{}s", duration.as_secs())
    } else {
        format!("{}ms", duration.as_millis())
    }
}

#[async_trait]
impl DirectoryClient for ConsulDirectory {
    async fn register_service(&self, registration: &ServiceRegistration) -> Result<(), RegistryError> {
        let body = AgentServiceRegistration {
            id: &registration.id,
            name: &registration.name,
            tags: tags::registration_tags(registration),
            address: &registration.address,
            port: registration.port,
            check: AgentServiceCheck {
                http: registration.check.url.clone(),
                interval: go_duration(registration.check.interval),
            },
        };
        let builder = self
            .request(Method::PUT, "/v1/agent/service/register")
            .json(&body);
        ensure_success(self.send(builder).await?).await?;
        Ok(())
    }

    async fn deregister_service(&self, service_id: &str) -> Result<(), RegistryError> {
        let path = format!("/v1/agent/service/deregister/{service_id}");
        let response = self.send(self.request(Method::PUT, &path)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(service_id, "service already absent");
            return Ok(());
        }
        ensure_success(response).await?;
        Ok(())
    }

    async fn healthy_instances(&self, service_name: &str) -> Result<Vec<CatalogEntry>, RegistryError> {
        let path = format!("/v1/health/service/{service_name}");
        let builder = self.request(Method::GET, &path).query(&[("passing", "true")]);
        let entries: Vec<ServiceEntry> = self.get_json(builder).await?;

        Ok(entries
            .into_iter()
            .map(|entry| {
                let address = if entry.service.address.is_empty() {
                    entry.node.map(|node| node.address).unwrap_or_default()
                } else {
                    entry.service.address
                };
                CatalogEntry {
                    id: entry.service.id,
                    address,
                    port: entry.service.port,
                    tags: entry.service.tags.unwrap_or_default(),
                }
            })
            .collect())
    }

    async fn services_in_state(&self, state: HealthState) -> Result<Vec<String>, RegistryError> {
        let path = format!("/v1/health/state/{}", state.as_str());
        let checks: Vec<HealthCheckEntry> = self.get_json(self.request(Method::GET, &path)).await?;

        // Node checks carry no service id; a service may fail several checks.
        let mut seen = HashSet::new();
        Ok(checks
            .into_iter()
            .map(|check| check.service_id)
            .filter(|id| !id.is_empty() && seen.insert(id.clone()))
            .collect())
    }

    async fn kv_put(&self, key: &str, value: Vec<u8>) -> Result<(), RegistryError> {
        let path = format!("/v1/kv/{key}");
        let builder = self.request(Method::PUT, &path).body(value);
        ensure_success(self.send(builder).await?).await?;
        Ok(())
    }

    async fn kv_get(&self, key: &str) -> Result<Vec<u8>, RegistryError> {
        let path = format!("/v1/kv/{key}");
        let builder = self.request(Method::GET, &path).query(&[("raw", "true")]);
        let response = self.send(builder).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound(key.to_string()));
        }
        let response = ensure_success(response).await?;
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        Ok(body.to_vec())
    }
}
