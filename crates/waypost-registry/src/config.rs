use serde::{Deserialize, Serialize};
use std::time::Duration;
use waypost_core::ReaperSchedule;

/// Host-level settings. A missing or zero duration means "use the default".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub reaper_delay_secs: Option<u64>,
    #[serde(default)]
    pub reaper_interval_secs: Option<u64>,
    #[serde(default)]
    pub check_interval_secs: Option<u64>,
}

impl RegistryConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            reaper_delay_secs: parse_secs(&lookup, "WAYPOST_REAPER_DELAY_SECS"),
            reaper_interval_secs: parse_secs(&lookup, "WAYPOST_REAPER_INTERVAL_SECS"),
            check_interval_secs: parse_secs(&lookup, "WAYPOST_CHECK_INTERVAL_SECS"),
        }
    }

    pub fn reaper_schedule(&self) -> ReaperSchedule {
        ReaperSchedule::resolve(
            self.reaper_delay_secs.map(Duration::from_secs),
            self.reaper_interval_secs.map(Duration::from_secs),
        )
    }

    /// How often the directory polls each registered health check.
    pub fn check_interval(&self) -> Duration {
        match self.check_interval_secs {
            Some(secs) if secs > 0 => Duration::from_secs(secs),
            _ => default_check_interval(),
        }
    }
}

fn default_check_interval() -> Duration {
    Duration::from_secs(1)
}

fn parse_secs<F>(lookup: &F, key: &str) -> Option<u64>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(secs) => Some(secs),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable duration");
            None
        }
    }
}
