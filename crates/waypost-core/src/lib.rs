pub mod directory;
pub mod errors;
pub mod health;
pub mod instance;
pub mod memory;
pub mod registration;
pub mod schedule;
pub mod tags;

pub use directory::DirectoryClient;
pub use errors::RegistryError;
pub use health::HealthState;
pub use instance::{CatalogEntry, ServiceInstance};
pub use memory::MemoryDirectory;
pub use registration::{HealthCheck, ServiceRegistration};
pub use schedule::ReaperSchedule;
