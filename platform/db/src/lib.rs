//! Database primitives: connection settings, the shared error type and the
//! repository functions that load, mutate and persist users and their works.

use std::{str::FromStr, time::Duration};

use entity::PasswordError;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr, SqlErr};
use serde::Deserialize;
use thiserror::Error;

pub mod follows;
pub mod users;
pub mod works;

/// Pooled connection handle; sqlx owns the pool behind it.
pub type DbPool = DatabaseConnection;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database url missing")]
    MissingUrl,
    #[error("invalid value for {key}: {value:?}")]
    InvalidSetting { key: &'static str, value: String },
    #[error("{entity} {key} not found")]
    NotFound { entity: &'static str, key: String },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error(transparent)]
    Db(DbErr),
}

/// Unique-index violations surface as [`DbError::Conflict`].
impl From<DbErr> for DbError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => Self::Conflict(detail),
            _ => Self::Db(err),
        }
    }
}

impl DbError {
    pub(crate) fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;

/// Environment-driven connection settings.
#[derive(Clone, Debug, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default)]
    pub sql_logging: bool,
}

fn default_max_connections() -> u32 {
    10
}

impl DatabaseSettings {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: default_max_connections(),
            sql_logging: false,
        }
    }

    /// Reads `DATABASE_URL`, `DATABASE_MAX_CONNECTIONS` and `DATABASE_SQL_LOGGING`.
    pub fn from_env() -> DbResult<Self> {
        let url = std::env::var("DATABASE_URL").map_err(|_| DbError::MissingUrl)?;
        Ok(Self {
            url,
            max_connections: env_parse("DATABASE_MAX_CONNECTIONS", default_max_connections())?,
            sql_logging: env_parse("DATABASE_SQL_LOGGING", false)?,
        })
    }
}

fn env_parse<T: FromStr>(key: &'static str, default: T) -> DbResult<T> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| DbError::InvalidSetting { key, value }),
        Err(_) => Ok(default),
    }
}

pub async fn connect(settings: &DatabaseSettings) -> DbResult<DbPool> {
    let mut options = ConnectOptions::new(settings.url.clone());
    options
        .max_connections(settings.max_connections)
        .connect_timeout(Duration::from_secs(8))
        .sqlx_logging(settings.sql_logging);
    let pool = Database::connect(options).await?;
    tracing::info!(
        max_connections = settings.max_connections,
        "database connected"
    );
    Ok(pool)
}
