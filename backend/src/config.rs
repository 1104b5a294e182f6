//! Application configuration.
//!
//! Pipeline constants plus the database configuration shared by the
//! loader and the dashboard. [`DbConfig`] is built once at startup
//! (usually from the environment after `dotenvy` has loaded `.env`)
//! and passed by reference to every stage that needs the database.

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Columns every raw sales CSV must provide.
pub const REQUIRED_COLUMNS: [&str; 5] = ["date", "product", "category", "quantity", "price"];

/// Substitute for a missing product or category.
pub const UNKNOWN_TEXT: &str = "Unknown";

/// Cell values treated as missing text.
pub const NULL_TOKENS: [&str; 8] = ["", "NA", "N/A", "NaN", "nan", "NULL", "null", "None"];

/// Name of the persisted table.
pub const SALES_TABLE: &str = "sales_data";

/// Fractional digits of the persisted `price` and `revenue` columns.
pub const MONEY_SCALE: u32 = 2;

/// Number of products in the "top products" chart.
pub const TOP_PRODUCTS: usize = 5;

/// Default PostgreSQL port.
pub const DEFAULT_PG_PORT: u16 = 5432;

/// Default dashboard server port.
pub const DEFAULT_SERVER_PORT: u16 = 3000;

/// Seconds a dashboard fetch stays cached in the server.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 60;

/// Maximum upload size accepted by the server (50 MB).
pub const MAX_UPLOAD_SIZE: usize = 50 * 1024 * 1024;

/// Environment variable names.
pub mod env {
    pub const BACKEND: &str = "DB_BACKEND";
    pub const HOST: &str = "DB_HOST";
    pub const PORT: &str = "DB_PORT";
    pub const USER: &str = "DB_USER";
    pub const PASSWORD: &str = "DB_PASSWORD";
    pub const NAME: &str = "DB_NAME";
}

/// Database engine holding the sales table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Embedded SQLite file; `database` is the file path.
    #[default]
    Sqlite,
    /// PostgreSQL server (requires the `postgres` feature).
    Postgres,
}

impl FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            other => Err(ConfigError::Invalid {
                var: env::BACKEND,
                message: format!("unknown backend '{}' (expected sqlite or postgres)", other),
            }),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Sqlite => write!(f, "sqlite"),
            Backend::Postgres => write!(f, "postgres"),
        }
    }
}

/// Connection parameters for the sales database.
#[derive(Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub backend: Backend,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// Database name, or the database file path for SQLite.
    pub database: String,
}

impl DbConfig {
    /// SQLite database stored at `path`.
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            backend: Backend::Sqlite,
            host: String::new(),
            port: 0,
            user: String::new(),
            password: String::new(),
            database: path.into(),
        }
    }

    /// Read the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup.
    ///
    /// `DB_NAME` is always required. For PostgreSQL `DB_HOST` and `DB_USER`
    /// are required too; `DB_PASSWORD` may be empty and `DB_PORT` defaults
    /// to 5432.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend: Backend = lookup(env::BACKEND).unwrap_or_default().parse()?;
        let database = required(&lookup, env::NAME)?;

        match backend {
            Backend::Sqlite => Ok(Self::sqlite(database)),
            Backend::Postgres => {
                let port = match lookup(env::PORT).filter(|p| !p.trim().is_empty()) {
                    Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
                        var: env::PORT,
                        message: e.to_string(),
                    })?,
                    None => DEFAULT_PG_PORT,
                };
                Ok(Self {
                    backend,
                    host: required(&lookup, env::HOST)?,
                    port,
                    user: required(&lookup, env::USER)?,
                    password: lookup(env::PASSWORD).unwrap_or_default(),
                    database,
                })
            }
        }
    }

    /// Short human-readable location, without credentials.
    pub fn describe(&self) -> String {
        match self.backend {
            Backend::Sqlite => format!("sqlite:{}", self.database),
            Backend::Postgres => format!(
                "postgres://{}@{}:{}/{}",
                self.user, self.host, self.port, self.database
            ),
        }
    }
}

fn required<F>(lookup: &F, var: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(var))
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("backend", &self.backend)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .finish()
    }
}
