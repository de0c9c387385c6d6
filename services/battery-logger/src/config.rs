use std::{net::SocketAddr, path::PathBuf};

use anyhow::{Context, Result, anyhow};

use crate::record::Variant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Csv,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub variant: Variant,
    pub sheet: String,
    pub store: StoreKind,
    pub data_dir: PathBuf,
}

pub fn read_env(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => default.to_string(),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let host = read_env("BATTERY_LOGGER_HOST", "0.0.0.0");
        // PORT is what most hosting platforms hand out
        let port_raw = match std::env::var("BATTERY_LOGGER_PORT") {
            Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
            _ => read_env("PORT", "8080"),
        };
        let port: u16 = port_raw
            .parse()
            .with_context(|| format!("invalid port '{port_raw}'"))?;

        let variant = read_env("BATTERY_LOGGER_VARIANT", "usage")
            .parse::<Variant>()
            .map_err(|e| anyhow!(e))
            .context("BATTERY_LOGGER_VARIANT")?;

        let store = match read_env("BATTERY_LOGGER_STORE", "csv")
            .to_ascii_lowercase()
            .as_str()
        {
            "csv" => StoreKind::Csv,
            "memory" => StoreKind::Memory,
            other => {
                return Err(anyhow!(
                    "BATTERY_LOGGER_STORE: unknown store '{other}' (expected csv or memory)"
                ));
            }
        };

        Ok(Self {
            host,
            port,
            variant,
            sheet: read_env("BATTERY_LOGGER_SHEET", "Sheet1"),
            store,
            data_dir: PathBuf::from(read_env("BATTERY_LOGGER_DATA_DIR", "data")),
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))
    }
}
