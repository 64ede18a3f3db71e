use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use sala_api::sweeper::SweepConfig;

/// Process configuration, read from the environment (and `.env`, if present).
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub sweep: SweepConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = SweepConfig::default();

        let sweep = SweepConfig {
            interval: Duration::from_secs(parse_or(
                &lookup,
                "SALA_SWEEP_INTERVAL_SECS",
                defaults.interval.as_secs(),
            )?),
            stale_after: Duration::from_secs(parse_or(
                &lookup,
                "SALA_STALE_AFTER_SECS",
                defaults.stale_after.as_secs(),
            )?),
        };
        if sweep.interval.is_zero() {
            anyhow::bail!("SALA_SWEEP_INTERVAL_SECS must be greater than zero");
        }

        Ok(Self {
            host: lookup("SALA_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&lookup, "SALA_PORT", 5000)?,
            db_path: lookup("SALA_DB_PATH").unwrap_or_else(|| "sala.db".into()).into(),
            sweep,
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value '{}'", key, raw)),
        None => Ok(default),
    }
}
