// Runtime configuration
// Read from the environment, with an optional .env file loaded first.

use crate::error::{InventoryError, Result};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_DATABASE: &str = "machines.db";
pub const DEFAULT_ADDR: &str = "127.0.0.1:5000";
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";
pub const DEFAULT_EXPORT_DIR: &str = ".";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub upload_dir: PathBuf,
    pub export_dir: PathBuf,
}

impl Config {
    /// Load `.env` if present, then read `INVENTORY_*` variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup; unset keys take their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let addr = get("INVENTORY_ADDR", DEFAULT_ADDR);
        let bind_addr = addr.parse().map_err(|_| {
            InventoryError::validation("INVENTORY_ADDR", format!("'{}' is not a socket address", addr))
        })?;

        Ok(Config {
            database_path: PathBuf::from(get("INVENTORY_DB", DEFAULT_DATABASE)),
            bind_addr,
            upload_dir: PathBuf::from(get("INVENTORY_UPLOAD_DIR", DEFAULT_UPLOAD_DIR)),
            export_dir: PathBuf::from(get("INVENTORY_EXPORT_DIR", DEFAULT_EXPORT_DIR)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.database_path, PathBuf::from("machines.db"));
        assert_eq!(config.bind_addr.port(), 5000);
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("INVENTORY_DB", "/tmp/inv.db"),
            ("INVENTORY_ADDR", "0.0.0.0:8080"),
        ]
        .into_iter()
        .collect();

        let config = Config::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/inv.db"));
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.export_dir, PathBuf::from("."));
    }

    #[test]
    fn test_bad_address() {
        let err = Config::from_lookup(|k| (k == "INVENTORY_ADDR").then(|| "nowhere".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("INVENTORY_ADDR"));
    }
}
