//! Server configuration
//!
//! Priority: environment variables > TOML file > defaults. The file is the
//! one passed with `--config`, or `replix.toml` in the working directory
//! when it exists.

use anyhow::{Context, anyhow};
use replix_core::{ProxyConfig, ReplicationConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "replix.toml";

/// What a node does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Accepts queries and writes, fans writes out to replicas
    #[default]
    Primary,
    /// Receives replicated writes
    Replica,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => f.write_str("primary"),
            Self::Replica => f.write_str("replica"),
        }
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary" => Ok(Self::Primary),
            "replica" => Ok(Self::Replica),
            other => Err(anyhow!("unknown role '{other}' (expected primary or replica)")),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server bind address
    pub addr: SocketAddr,
    /// Node role
    pub role: Role,
    /// Directory holding the durability log
    pub data_dir: PathBuf,
    /// Call `sync_data` after every log append
    pub fsync: bool,
    /// Query proxy settings (primary only)
    pub proxy: ProxyConfig,
    /// Replication settings (primary only)
    pub replication: ReplicationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            role: Role::Primary,
            data_dir: PathBuf::from("./data"),
            fsync: false,
            proxy: ProxyConfig::default(),
            replication: ReplicationConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment, then validate it
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let default_file = Path::new(DEFAULT_CONFIG_FILE);
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if default_file.exists() => Self::from_file(default_file)?,
            None => {
                tracing::debug!("No config file found, using defaults");
                Self::default()
            }
        };

        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Override fields from `REPLIX_*` environment variables
    pub fn apply_env(&mut self) -> anyhow::Result<()> {
        if let Some(addr) = env_var("REPLIX_ADDR") {
            self.addr = parse_var("REPLIX_ADDR", &addr)?;
        }
        if let Some(role) = env_var("REPLIX_ROLE") {
            self.role = parse_var("REPLIX_ROLE", &role)?;
        }
        if let Some(data_dir) = env_var("REPLIX_DATA_DIR") {
            self.data_dir = PathBuf::from(data_dir);
        }
        if let Some(fsync) = env_var("REPLIX_FSYNC") {
            self.fsync = parse_var("REPLIX_FSYNC", &fsync)?;
        }

        if let Some(primary) = env_var("REPLIX_PRIMARY") {
            self.proxy.primary = primary.trim().to_string();
        }
        if let Some(readers) = env_var("REPLIX_READ_REPLICAS") {
            self.proxy.replicas = split_list(&readers);
        }
        if let Some(capacity) = env_var("REPLIX_POOL_CAPACITY") {
            self.proxy.pool_capacity = parse_var("REPLIX_POOL_CAPACITY", &capacity)?;
        }
        if let Some(ttl) = env_var("REPLIX_CACHE_TTL_MS") {
            self.proxy.cache_ttl_ms = parse_var("REPLIX_CACHE_TTL_MS", &ttl)?;
        }

        if let Some(replicas) = env_var("REPLIX_REPLICAS") {
            self.replication.replicas = split_list(&replicas);
        }
        if let Some(timeout) = env_var("REPLIX_SEND_TIMEOUT_MS") {
            self.replication.send_timeout_ms = parse_var("REPLIX_SEND_TIMEOUT_MS", &timeout)?;
        }

        Ok(())
    }

    /// Check the sections the configured role depends on
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.role == Role::Primary {
            self.proxy.validate().context("Invalid [proxy] section")?;
            self.replication
                .validate()
                .context("Invalid [replication] section")?;
        }
        Ok(())
    }

    /// Location of this node's durability log
    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.log", self.role))
    }

    /// Set a new data directory
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Set a new bind address
    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    /// Set the role
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(name: &str, value: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| anyhow!("Invalid {name} '{value}': {e}"))
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
