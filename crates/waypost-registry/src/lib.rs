//! Registration, discovery, key-value access and critical-service reaping on
//! top of a [`waypost_core::DirectoryClient`].

pub mod config;
pub mod discovery;
pub mod host;
pub mod kv;
pub mod reaper;
pub mod registration;

#[cfg(test)]
mod test_support;

pub use config::RegistryConfig;
pub use discovery::DiscoveryResolver;
pub use host::RegistryHost;
pub use kv::KeyValueStore;
pub use reaper::{CriticalServiceReaper, PassReport};
pub use registration::RegistrationManager;
