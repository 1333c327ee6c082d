use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP check the directory polls to move a service between health states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub url: String,
    pub interval: Duration,
}

/// Record submitted to the directory for one service instance.
///
/// The version is kept as a typed field; it only becomes a tag when a
/// directory client writes the record out (see [`crate::tags`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRegistration {
    pub id: String,
    pub name: String,
    pub version: Option<String>,
    pub address: String,
    pub port: u16,
    pub tags: Vec<String>,
    pub check: HealthCheck,
}

impl ServiceRegistration {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        address: impl Into<String>,
        port: u16,
        check: HealthCheck,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: None,
            address: address.into(),
            port,
            tags: Vec::new(),
            check,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn add_tag(&mut self, tag: impl Into<String>) {
        self.tags.push(tag.into());
    }
}
