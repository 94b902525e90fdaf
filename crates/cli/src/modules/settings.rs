use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use config::Config;
use serde::Deserialize;

const ENV_PREFIX: &str = "ISSUER";

/// Settings read from `ISSUER_*` environment variables (and `.env`).
#[derive(Clone, Debug, Deserialize)]
pub struct Settings {
    pub registry_path: PathBuf,
    pub reserve_ttl_secs: u64,
    pub lookup_timeout_ms: u64,
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::from_source(None)
    }

    fn from_source(vars: Option<config::Map<String, String>>) -> Result<Self> {
        let cfg = Config::builder()
            .set_default("registry_path", "registry.json")?
            .set_default("reserve_ttl_secs", 60)?
            .set_default("lookup_timeout_ms", 5_000)?
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(vars),
            )
            .build()?;

        let settings: Self = cfg
            .try_deserialize()
            .context("invalid ISSUER_* settings")?;

        ensure!(
            settings.reserve_ttl_secs > 0,
            "ISSUER_RESERVE_TTL_SECS must be positive"
        );
        ensure!(
            settings.lookup_timeout_ms > 0,
            "ISSUER_LOOKUP_TIMEOUT_MS must be positive"
        );

        Ok(settings)
    }

    #[must_use]
    pub const fn reserve_ttl(&self) -> Duration {
        Duration::from_secs(self.reserve_ttl_secs)
    }

    #[must_use]
    pub const fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }
}
