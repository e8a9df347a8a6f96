//! Environment-driven daemon configuration.
//!
//! The daemon runs inside a container whose surface is environment
//! variables; parsing is split from the `std::env` lookup so tests can
//! inject a map instead of mutating process state.

use anyhow::{anyhow, Context};

use dblease_mysql::MysqlConnParams;

#[derive(Debug, Clone)]
pub struct Config {
    /// Port the lease service listens on.
    pub port: u16,

    /// Number of databases in the pool.
    pub instances: usize,

    /// MySQL host pattern allowed to connect as the app user.
    pub allow_connections_from: String,

    pub mysql: MysqlConnParams,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| anyhow!("environment variable missing: {key:?}"))
        };

        Ok(Self {
            port: required("PROVIDER_PORT")?
                .parse()
                .context("invalid PROVIDER_PORT")?,
            instances: required("PROVIDER_DB_INSTANCES")?
                .parse()
                .context("invalid PROVIDER_DB_INSTANCES")?,
            allow_connections_from: required("MYSQL_ROOT_HOST")?,
            mysql: MysqlConnParams {
                user: required("PROVIDER_MYSQL_USER")?,
                user_password: required("PROVIDER_MYSQL_USER_PASSWORD")?,
                root_password: required("MYSQL_ROOT_PASSWORD")?,
                address: required("PROVIDER_MYSQL_ADDRESS")?,
                port: required("PROVIDER_MYSQL_PORT")?
                    .parse()
                    .context("invalid PROVIDER_MYSQL_PORT")?,
            },
        })
    }
}
