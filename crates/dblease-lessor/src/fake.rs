//! A fake database provider for tests.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use dblease_proto::{ConnectionDetails, ConnectionInfo};

use crate::DatabaseProvider;

/// An in-memory [`DatabaseProvider`] that records every call and fails
/// on demand.
///
/// Connection info is produced from a template whose `database` field is
/// replaced with the requested name, mirroring what a real provider does.
pub struct FakeProvider {
    info: ConnectionInfo,
    create_error: Option<String>,
    drop_error: Option<String>,
    drop_error_on: HashSet<String>,
    calls: Mutex<Calls>,
}

#[derive(Default)]
struct Calls {
    create: Vec<String>,
    drop: Vec<String>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            info: default_info(),
            create_error: None,
            drop_error: None,
            drop_error_on: HashSet::new(),
            calls: Mutex::new(Calls::default()),
        }
    }

    /// Replace the connection info template.
    pub fn with_info(mut self, info: ConnectionInfo) -> Self {
        self.info = info;
        self
    }

    /// Fail every `create_database` call with the given message.
    pub fn with_create_error(mut self, message: &str) -> Self {
        self.create_error = Some(message.to_string());
        self
    }

    /// Fail every `drop_database` call with the given message.
    pub fn with_drop_error(mut self, message: &str) -> Self {
        self.drop_error = Some(message.to_string());
        self
    }

    /// Fail `drop_database` for one specific database only.
    pub fn with_drop_error_for(mut self, database: &str) -> Self {
        self.drop_error_on.insert(database.to_string());
        self
    }

    /// All `create_database` calls so far, in order.
    pub fn create_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().create.clone()
    }

    /// All `drop_database` calls so far, in order.
    pub fn drop_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().drop.clone()
    }

    /// Forget the recorded calls.
    pub fn reset_calls(&self) {
        *self.calls.lock().unwrap() = Calls::default();
    }
}

impl Default for FakeProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseProvider for FakeProvider {
    async fn create_database(&self, name: &str) -> anyhow::Result<()> {
        self.calls.lock().unwrap().create.push(name.to_string());
        match &self.create_error {
            Some(message) => Err(anyhow::anyhow!("{message}")),
            None => Ok(()),
        }
    }

    async fn drop_database(&self, name: &str) -> anyhow::Result<()> {
        self.calls.lock().unwrap().drop.push(name.to_string());
        if self.drop_error_on.contains(name) {
            return Err(anyhow::anyhow!("drop failed for {name}"));
        }
        match &self.drop_error {
            Some(message) => Err(anyhow::anyhow!("{message}")),
            None => Ok(()),
        }
    }

    fn connection_info(&self, database: &str) -> ConnectionInfo {
        let mut info = self.info.clone();
        if let Some(root) = info.root_conn.as_mut() {
            root.database = database.to_string();
        }
        if let Some(app) = info.app_conn.as_mut() {
            app.database = database.to_string();
        }
        info
    }
}

fn default_info() -> ConnectionInfo {
    ConnectionInfo {
        root_conn: Some(ConnectionDetails {
            user: "root".to_string(),
            password: "root-password".to_string(),
            address: "localhost".to_string(),
            port: 3306,
            database: String::new(),
        }),
        app_conn: Some(ConnectionDetails {
            user: "app".to_string(),
            password: "app-password".to_string(),
            address: "localhost".to_string(),
            port: 3306,
            database: String::new(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_calls() {
        let provider = FakeProvider::new();
        provider.create_database("a").await.unwrap();
        provider.drop_database("b").await.unwrap();
        provider.drop_database("c").await.unwrap();

        assert_eq!(provider.create_calls(), vec!["a"]);
        assert_eq!(provider.drop_calls(), vec!["b", "c"]);
    }

    #[tokio::test]
    async fn per_database_drop_error() {
        let provider = FakeProvider::new().with_drop_error_for("bad");
        assert!(provider.drop_database("good").await.is_ok());
        assert!(provider.drop_database("bad").await.is_err());
    }

    #[test]
    fn info_follows_requested_database() {
        let provider = FakeProvider::new();
        let info = provider.connection_info("db_7");
        assert_eq!(info.root_conn.unwrap().database, "db_7");
        assert_eq!(info.app_conn.unwrap().database, "db_7");
    }
}
