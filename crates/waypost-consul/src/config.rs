use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection settings for the Consul HTTP API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsulConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_scheme")]
    pub scheme: String,
    /// ACL token sent as `X-Consul-Token`.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub datacenter: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ConsulConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            scheme: default_scheme(),
            token: None,
            datacenter: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ConsulConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads `WAYPOST_CONSUL_*` keys through `lookup`; unset or unparseable
    /// values keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(host) = lookup("WAYPOST_CONSUL_HOST").filter(|v| !v.is_empty()) {
            config.host = host;
        }
        if let Some(port) = parse_var(&lookup, "WAYPOST_CONSUL_PORT") {
            config.port = port;
        }
        if let Some(scheme) = lookup("WAYPOST_CONSUL_SCHEME").filter(|v| !v.is_empty()) {
            config.scheme = scheme;
        }
        config.token = lookup("WAYPOST_CONSUL_TOKEN").filter(|v| !v.is_empty());
        config.datacenter = lookup("WAYPOST_CONSUL_DATACENTER").filter(|v| !v.is_empty());
        if let Some(timeout) = parse_var(&lookup, "WAYPOST_CONSUL_TIMEOUT_SECS") {
            config.timeout_secs = timeout;
        }
        config
    }

    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable setting");
            None
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8500
}

fn default_scheme() -> String {
    "http".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_point_at_local_agent() {
        let config = ConsulConfig::from_lookup(|_| None);
        assert_eq!(config.base_url(), "http://127.0.0.1:8500");
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert!(config.token.is_none());
    }

    #[test]
    fn env_overrides_and_bad_numbers_fall_back() {
        let vars: HashMap<&str, &str> = [
            ("WAYPOST_CONSUL_HOST", "consul.internal"),
            ("WAYPOST_CONSUL_PORT", "not-a-port"),
            ("WAYPOST_CONSUL_TOKEN", "secret"),
            ("WAYPOST_CONSUL_DATACENTER", ""),
        ]
        .into_iter()
        .collect();
        let config = ConsulConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.base_url(), "http://consul.internal:8500");
        assert_eq!(config.token.as_deref(), Some("secret"));
        assert!(config.datacenter.is_none());
    }
}
