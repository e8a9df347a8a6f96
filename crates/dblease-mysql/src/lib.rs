//! dblease-mysql — the MySQL backing for the lease service.
//!
//! [`MysqlProvider`] implements the pool's provider contract with plain
//! DDL; [`bootstrap`] prepares a fresh MySQL server for leasing
//! (provisioning the row-limited app user); [`connect`] builds a pool
//! from wire-level connection details.

pub mod bootstrap;

mod provider;

pub use provider::{MysqlConnParams, MysqlProvider};

use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};

use dblease_proto::ConnectionDetails;

/// Build a connection pool for the database described by `details`.
///
/// The pool connects lazily, so this succeeds even while the server is
/// still starting; the first statement pays the connection cost. An
/// empty `database` selects no default schema, which is what the
/// provider itself uses for server-level DDL.
pub fn connect(details: &ConnectionDetails) -> MySqlPool {
    let mut options = MySqlConnectOptions::new()
        .host(&details.address)
        .port(details.port as u16)
        .username(&details.user)
        .password(&details.password);
    if !details.database.is_empty() {
        options = options.database(&details.database);
    }
    MySqlPoolOptions::new().connect_lazy_with(options)
}
