//! Server configuration from environment variables.

use std::fmt;
use std::net::SocketAddr;

use sqlx::postgres::PgConnectOptions;
use tracing::warn;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_REDIS_URL: &str = "redis://langgraph-redis:6379";

/// Postgres connection parameters. Fixed in this version; not read from the environment.
#[derive(Clone)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            host: "host.docker.internal".into(),
            port: 5432,
            database: "langgraph".into(),
            username: "postgres".into(),
            password: "postgres".into(),
        }
    }
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl DatabaseSettings {
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.username)
            .password(&self.password)
    }
}

/// Runtime configuration for the health server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen port (`PORT`).
    pub port: u16,
    /// Redis connection URL (`REDIS_URL`).
    pub redis_url: String,
    pub database: DatabaseSettings,
}

impl ServerConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, falling back to defaults for
    /// missing or unparseable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!("Ignoring invalid PORT '{}', using {}", raw, DEFAULT_PORT);
                DEFAULT_PORT
            }),
            None => DEFAULT_PORT,
        };

        let redis_url = lookup("REDIS_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REDIS_URL.to_string());

        Self {
            port,
            redis_url,
            database: DatabaseSettings::default(),
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}
