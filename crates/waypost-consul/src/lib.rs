pub mod config;
pub mod consul;

pub use config::ConsulConfig;
pub use consul::ConsulDirectory;
