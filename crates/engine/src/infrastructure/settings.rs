//! Engine configuration, read from the environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_WORLD_NAMESPACE: &str = "/";

/// Buffer size for per-connection outbound channel.
pub const CONNECTION_CHANNEL_BUFFER: usize = 256;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_AUTH_TIMEOUT_SECS: u64 = 10;
const DEFAULT_REDIS_PORT: u16 = 6379;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub server_host: String,
    pub server_port: u16,
    /// HS256 secret for access tokens
    pub secret_key: String,
    pub namespace: String,
    pub auth_timeout: Duration,
    pub channel_buffer: usize,
    pub accounts_file: Option<PathBuf>,
    /// CORS origins; empty allows any
    pub allowed_hosts: Vec<String>,
    /// Shared relay/session backplane; `None` runs single-process
    pub backplane_url: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".into(),
            server_port: DEFAULT_PORT,
            secret_key: String::new(),
            namespace: DEFAULT_WORLD_NAMESPACE.into(),
            auth_timeout: Duration::from_secs(DEFAULT_AUTH_TIMEOUT_SECS),
            channel_buffer: CONNECTION_CHANNEL_BUFFER,
            accounts_file: None,
            allowed_hosts: Vec::new(),
            backplane_url: None,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let secret_key = lookup("SECRET_KEY")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("SECRET_KEY"))?;

        let port_raw = lookup("SERVER_PORT").or_else(|| lookup("PORT"));
        let server_port = parse_or("SERVER_PORT", port_raw, defaults.server_port);

        let auth_timeout_secs = parse_or(
            "AUTH_TIMEOUT_SECS",
            lookup("AUTH_TIMEOUT_SECS"),
            DEFAULT_AUTH_TIMEOUT_SECS,
        );
        let channel_buffer = parse_or(
            "CONNECTION_CHANNEL_BUFFER",
            lookup("CONNECTION_CHANNEL_BUFFER"),
            defaults.channel_buffer,
        )
        .max(1);

        let allowed_hosts = lookup("ALLOWED_HOSTS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            server_host: lookup("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port,
            secret_key,
            namespace: lookup("DEFAULT_WORLD_NAMESPACE")
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.namespace),
            auth_timeout: Duration::from_secs(auth_timeout_secs),
            channel_buffer,
            accounts_file: lookup("ACCOUNTS_FILE")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            allowed_hosts,
            backplane_url: backplane_url(&lookup),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

/// `BACKPLANE_URL`, or a redis URL assembled from the `REDIS_*` parts.
fn backplane_url(lookup: &impl Fn(&str) -> Option<String>) -> Option<String> {
    if let Some(url) = lookup("BACKPLANE_URL").filter(|s| !s.trim().is_empty()) {
        return Some(url.trim().to_string());
    }
    let host = lookup("REDIS_HOST").filter(|s| !s.trim().is_empty())?;
    let port = parse_or("REDIS_PORT", lookup("REDIS_PORT"), DEFAULT_REDIS_PORT);
    let db = parse_or("REDIS_SIO_DB", lookup("REDIS_SIO_DB"), 0u32);
    Some(format!("redis://{}:{port}/{db}", host.trim()))
}

fn parse_or<T: FromStr + Copy + std::fmt::Display>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %value, default = %default, "Unparseable setting, using default");
            default
        }),
    }
}
