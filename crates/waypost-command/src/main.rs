use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use url::Url;
use waypost_consul::{ConsulConfig, ConsulDirectory};
use waypost_core::{DirectoryClient, HealthState};
use waypost_registry::{RegistryConfig, RegistryHost};

#[derive(Parser)]
#[command(name = "waypost")]
#[command(about = "Service directory client: register, discover, reap", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, env = "WAYPOST_CONSUL_HOST", default_value = "127.0.0.1")]
    consul_host: String,

    #[arg(long, env = "WAYPOST_CONSUL_PORT", default_value_t = 8500)]
    consul_port: u16,

    #[arg(long, env = "WAYPOST_CONSUL_SCHEME", default_value = "http")]
    consul_scheme: String,

    #[arg(long, env = "WAYPOST_CONSUL_TOKEN", hide_env_values = true)]
    consul_token: Option<String>,

    #[arg(long, env = "WAYPOST_CONSUL_DATACENTER")]
    datacenter: Option<String>,

    #[arg(long, env = "WAYPOST_CONSUL_TIMEOUT_SECS", default_value_t = 10)]
    timeout_secs: u64,

    /// Seconds before the reaper's first pass (0 = default)
    #[arg(long, env = "WAYPOST_REAPER_DELAY_SECS")]
    reaper_delay_secs: Option<u64>,

    /// Seconds between reaper passes (0 = default)
    #[arg(long, env = "WAYPOST_REAPER_INTERVAL_SECS")]
    reaper_interval_secs: Option<u64>,

    /// Health check poll interval attached to registrations
    #[arg(long, env = "WAYPOST_CHECK_INTERVAL_SECS")]
    check_interval_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a service instance with a health check
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        id: String,
        #[arg(long, default_value = "")]
        version: String,
        #[arg(long)]
        endpoint: Url,
        /// Defaults to <endpoint>/status
        #[arg(long)]
        health_check: Option<Url>,
    },
    /// Remove a service by id
    Deregister { id: String },
    /// List healthy instances of a service
    Find {
        name: String,
        #[arg(long)]
        version: Option<String>,
    },
    /// List services currently in critical state
    Critical,
    /// Key-value store access
    Kv {
        #[command(subcommand)]
        sub: KvCommands,
    },
    /// Remove services in critical state, until Ctrl-C
    Reap {
        /// Run a single pass and exit
        #[arg(long)]
        once: bool,
    },
}

#[derive(Subcommand)]
enum KvCommands {
    /// Store a JSON value
    Put { key: String, value: String },
    /// Print the JSON value stored under a key
    Get { key: String },
}

impl Cli {
    fn consul_config(&self) -> ConsulConfig {
        ConsulConfig {
            host: self.consul_host.clone(),
            port: self.consul_port,
            scheme: self.consul_scheme.clone(),
            token: self.consul_token.clone(),
            datacenter: self.datacenter.clone(),
            timeout_secs: self.timeout_secs,
        }
    }

    fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            reaper_delay_secs: self.reaper_delay_secs,
            reaper_interval_secs: self.reaper_interval_secs,
            check_interval_secs: self.check_interval_secs,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let directory = Arc::new(ConsulDirectory::new(&cli.consul_config())?);
    let host = RegistryHost::new(directory, &cli.registry_config());

    match cli.command {
        Commands::Register { name, id, version, endpoint, health_check } => {
            host.register_service(&name, &id, &version, &endpoint, health_check.as_ref())
                .await?;
            println!("Service registered successfully: {}", id);
        }
        Commands::Deregister { id } => {
            host.deregister_service(&id).await?;
            println!("Service deregistered: {}", id);
        }
        Commands::Find { name, version } => {
            let instances = match version {
                Some(version) => host.find_service_instances_with_version(&name, &version).await?,
                None => host.find_service_instances(&name).await?,
            };

            println!("Healthy instances of {}:", name);
            println!("{:<30} {:<8} {:<15}", "Address", "Port", "Version");
            println!("{}", "-".repeat(55));
            for inst in instances {
                println!(
                    "{:<30} {:<8} {:<15}",
                    inst.address,
                    inst.port,
                    inst.version.as_deref().unwrap_or("-")
                );
            }
        }
        Commands::Critical => {
            let ids = host.directory().services_in_state(HealthState::Critical).await?;
            println!("Services in critical state: {}", ids.len());
            for id in ids {
                println!("  {}", id);
            }
        }
        Commands::Kv { sub } => match sub {
            KvCommands::Put { key, value } => {
                let value: serde_json::Value = serde_json::from_str(&value)?;
                host.key_value_put(&key, &value).await?;
                println!("Stored {}", key);
            }
            KvCommands::Get { key } => {
                let value: serde_json::Value = host.key_value_get(&key).await?;
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
        },
        Commands::Reap { once } => {
            if once {
                let report = host.reaper().reap_once().await?;
                println!("Critical services found:   {}", report.found);
                println!("Deregistered:              {}", report.deregistered);
                println!("Failed:                    {}", report.failed);
            } else {
                host.start_client();
                tokio::signal::ctrl_c().await?;
            }
        }
    }

    host.shutdown().await;
    Ok(())
}
