use std::net::SocketAddr;

use url::Url;

/// How this process advertises itself to the directory.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub service_name: String,
    pub service_id: String,
    pub service_version: String,
    pub advertise_url: Url,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, Box<dyn std::error::Error>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind: SocketAddr = get("WAYPOST_BIND")
            .unwrap_or_else(|| "127.0.0.1:3000".to_string())
            .parse()?;
        let service_name = get("WAYPOST_SERVICE_NAME").unwrap_or_else(|| "waypost".to_string());
        let service_id =
            get("WAYPOST_SERVICE_ID").unwrap_or_else(|| format!("{}-{}", service_name, uuid::Uuid::new_v4()));
        let service_version =
            get("WAYPOST_SERVICE_VERSION").unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());
        let advertise_url = match get("WAYPOST_ADVERTISE_URL") {
            Some(url) => Url::parse(&url)?,
            None => Url::parse(&format!("http://{bind}"))?,
        };

        Ok(Self {
            bind,
            service_name,
            service_id,
            service_version,
            advertise_url,
        })
    }
}
