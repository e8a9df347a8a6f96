//! MySQL implementation of the pool's provider contract.

use async_trait::async_trait;
use sqlx::MySqlPool;

use dblease_lessor::DatabaseProvider;
use dblease_proto::{ConnectionDetails, ConnectionInfo};

/// How to reach the MySQL server backing the pool.
#[derive(Debug, Clone)]
pub struct MysqlConnParams {
    /// App user handed out with every lease; limited to row operations.
    pub user: String,
    pub user_password: String,

    /// Root password, used for DDL and handed out as the root identity.
    pub root_password: String,

    /// Address and port of the MySQL server as clients reach it.
    pub address: String,
    pub port: u16,
}

impl MysqlConnParams {
    /// Connection details for the server itself, as root, with no
    /// default schema selected.
    pub fn root_details(&self) -> ConnectionDetails {
        ConnectionDetails {
            user: "root".to_string(),
            password: self.root_password.clone(),
            address: self.address.clone(),
            port: i32::from(self.port),
            database: String::new(),
        }
    }
}

/// [`DatabaseProvider`] backed by a MySQL server.
pub struct MysqlProvider {
    conn: MysqlConnParams,
    pool: MySqlPool,
}

impl MysqlProvider {
    pub fn new(conn: MysqlConnParams, pool: MySqlPool) -> Self {
        Self { conn, pool }
    }
}

#[async_trait]
impl DatabaseProvider for MysqlProvider {
    async fn create_database(&self, name: &str) -> anyhow::Result<()> {
        // Identifiers cannot be bound as parameters; names come from the
        // pool's fixed membership, never from callers.
        sqlx::query(&format!("CREATE DATABASE `{name}`"))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn drop_database(&self, name: &str) -> anyhow::Result<()> {
        sqlx::query(&format!("DROP DATABASE IF EXISTS `{name}`"))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn connection_info(&self, database: &str) -> ConnectionInfo {
        let mut root = self.conn.root_details();
        root.database = database.to_string();

        ConnectionInfo {
            root_conn: Some(root),
            app_conn: Some(ConnectionDetails {
                user: self.conn.user.clone(),
                password: self.conn.user_password.clone(),
                address: self.conn.address.clone(),
                port: i32::from(self.conn.port),
                database: database.to_string(),
            }),
        }
    }
}
