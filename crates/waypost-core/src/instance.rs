use serde::{Deserialize, Serialize};

use crate::tags;

/// A healthy service entry as the directory reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub address: String,
    pub port: u16,
    pub tags: Vec<String>,
}

/// Discovery result: where an instance lives and which version it runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInstance {
    pub address: String,
    pub port: u16,
    pub version: Option<String>,
}

impl ServiceInstance {
    pub fn new(address: impl Into<String>, port: u16, version: Option<String>) -> Self {
        Self {
            address: address.into(),
            port,
            version,
        }
    }

    pub fn has_version(&self, version: &str) -> bool {
        self.version.as_deref() == Some(version)
    }
}

impl From<CatalogEntry> for ServiceInstance {
    fn from(entry: CatalogEntry) -> Self {
        let version = tags::decode_version(&entry.tags);
        Self {
            address: entry.address,
            port: entry.port,
            version,
        }
    }
}
