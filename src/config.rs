//! EVENTLOG - Service Configuration
//! Defines where the log lives, where the API listens, and how hard writes sync.

use std::path::PathBuf;

use crate::error::{EventLogError, Result};

const DATA_DIR_VAR: &str = "EVENTLOG_DATA_DIR";
const API_PORT_VAR: &str = "API_PORT";
const SYNC_WRITES_VAR: &str = "EVENTLOG_SYNC_WRITES";

/// Configuration for the event log service.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base directory for the write-ahead log.
    pub data_dir: PathBuf,

    /// Socket address the HTTP API binds to.
    pub listen_addr: String,

    /// Whether to fsync every WAL append.
    pub sync_writes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            listen_addr: "0.0.0.0:8080".to_string(),
            sync_writes: true,
        }
    }
}

impl Config {
    /// Create a new Config with a custom data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Set the listen address for the HTTP API.
    pub fn with_listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.listen_addr = addr.into();
        self
    }

    /// Enable or disable fsync on every append.
    pub fn with_sync_writes(mut self, sync: bool) -> Self {
        self.sync_writes = sync;
        self
    }

    /// Build a Config from the process environment.
    ///
    /// A `.env` file in the working directory is loaded first when present.
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                return Err(EventLogError::Config(format!("invalid .env file: {}", err)));
            }
        }

        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a Config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup(DATA_DIR_VAR) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(port) = lookup(API_PORT_VAR) {
            config.listen_addr = normalize_listen_addr(&port)?;
        }
        if let Some(sync) = lookup(SYNC_WRITES_VAR) {
            config.sync_writes = parse_bool(&sync).ok_or_else(|| {
                EventLogError::Config(format!("{} must be true or false, got {:?}", SYNC_WRITES_VAR, sync))
            })?;
        }

        Ok(config)
    }

    /// Ensure the data directory exists.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)
    }
}

/// Accepts `8080`, `:8080` or `host:8080`.
fn normalize_listen_addr(raw: &str) -> Result<String> {
    let raw = raw.trim();
    let (host, port) = match raw.rsplit_once(':') {
        Some(("", port)) => ("0.0.0.0", port),
        Some((host, port)) => (host, port),
        None => ("0.0.0.0", raw),
    };

    port.parse::<u16>()
        .map_err(|_| EventLogError::Config(format!("{} is not a valid port: {:?}", API_PORT_VAR, raw)))?;

    Ok(format!("{}:{}", host, port))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert!(config.sync_writes);
    }

    #[test]
    fn test_go_style_port() {
        let config = Config::from_lookup(lookup_from(&[("API_PORT", ":9000")])).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:9000");
    }

    #[test]
    fn test_host_and_port() {
        let config = Config::from_lookup(lookup_from(&[("API_PORT", "127.0.0.1:3000")])).unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:3000");
    }

    #[test]
    fn test_bad_port_rejected() {
        let result = Config::from_lookup(lookup_from(&[("API_PORT", ":http")]));
        assert!(matches!(result, Err(EventLogError::Config(_))));
    }

    #[test]
    fn test_sync_writes_flag() {
        let config = Config::from_lookup(lookup_from(&[
            ("EVENTLOG_SYNC_WRITES", "off"),
            ("EVENTLOG_DATA_DIR", "/tmp/events"),
        ]))
        .unwrap();
        assert!(!config.sync_writes);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/events"));

        let bad = Config::from_lookup(lookup_from(&[("EVENTLOG_SYNC_WRITES", "maybe")]));
        assert!(bad.is_err());
    }

    #[test]
    fn test_builder() {
        let config = Config::new("/var/lib/eventlog")
            .with_listen_addr("127.0.0.1:1234")
            .with_sync_writes(false);
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/eventlog"));
        assert_eq!(config.listen_addr, "127.0.0.1:1234");
        assert!(!config.sync_writes);
    }
}
