//! The collaborator contract for the physical database engine.

use async_trait::async_trait;

use dblease_proto::ConnectionInfo;

/// Creates, destroys, and describes the databases backing the pool.
///
/// The lessor treats the provider as the only source of truth for
/// database state; it never caches schema or row data.
#[async_trait]
pub trait DatabaseProvider: Send + Sync + 'static {
    /// Creates the named database on the server. Fails if the database
    /// already exists. After this succeeds the database can be described
    /// with [`connection_info`](Self::connection_info).
    async fn create_database(&self, name: &str) -> anyhow::Result<()>;

    /// Drops the named database if it exists, otherwise does nothing.
    async fn drop_database(&self, name: &str) -> anyhow::Result<()>;

    /// How to connect to the named database, as root and as the app user.
    fn connection_info(&self, database: &str) -> ConnectionInfo;
}
