//! Server configuration.
//!
//! Loaded from a YAML file (path in `TIDEWAY_CONFIG`, default `tideway.yaml`).
//! Every field has a default, so a missing file or a partial file is fine.
//! `LISTEN` overrides the listen address.

use anyhow::Context;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "TIDEWAY_CONFIG";
pub const LISTEN_ENV: &str = "LISTEN";
pub const DEFAULT_CONFIG_PATH: &str = "tideway.yaml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub routes: RouteConfig,
    pub credentials: CredentialConfig,
}

/// How the reactor reports readiness for a connection's socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerMode {
    /// Drain and send until the socket would block.
    Edge,
    /// One read or write per readiness event.
    Level,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub doc_root: PathBuf,
    pub trigger_mode: TriggerMode,
    pub workers: usize,
    pub idle_timeout_secs: u64,
    pub max_connections: usize,
    pub log_level: String,
    /// Log one line per served request.
    pub access_log: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            doc_root: PathBuf::from("./root"),
            trigger_mode: TriggerMode::Edge,
            workers: 8,
            idle_timeout_secs: 15,
            max_connections: 65536,
            log_level: "info".to_string(),
            access_log: true,
        }
    }
}

impl ServerConfig {
    pub fn log_level(&self) -> tracing::Level {
        self.log_level.parse().unwrap_or(tracing::Level::INFO)
    }

    pub fn idle_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.idle_timeout_secs)
    }
}

/// URL routes with special handling.
///
/// Page values are file names relative to the document root.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RouteConfig {
    /// Served for `/`.
    pub default_page: String,
    /// POST target that checks credentials.
    pub login: String,
    /// POST target that creates credentials.
    pub register: String,
    pub login_success: String,
    pub login_failure: String,
    pub register_success: String,
    pub register_failure: String,
    /// Extra URL → page mappings, e.g. `/signup: register.html`.
    pub aliases: HashMap<String, String>,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            default_page: "index.html".to_string(),
            login: "/login".to_string(),
            register: "/register".to_string(),
            login_success: "welcome.html".to_string(),
            login_failure: "login_error.html".to_string(),
            register_success: "login.html".to_string(),
            register_failure: "register_error.html".to_string(),
            aliases: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CredentialConfig {
    /// SQLite database file. Credentials stay in memory when unset.
    pub database: Option<PathBuf>,
    pub table: String,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            database: None,
            table: "user".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let mut cfg = if Path::new(&path).exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };

        if let Ok(listen_addr) = std::env::var(LISTEN_ENV) {
            cfg.server.listen_addr = listen_addr;
        }

        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(text).context("Failed to parse YAML configuration")
    }
}
