//! Test-facing convenience wrapper around [`Lease`].
//!
//! Methods panic instead of returning errors to cut down on boilerplate
//! in tests; a failure here should rightfully abort the test anyway.

use std::env;

use tracing::debug;

use dblease_proto::ConnectionInfo;

use crate::Lease;

/// Where to find the provider service when the environment is silent.
/// Matches the default in the container's .env file.
pub const DEFAULT_PROVIDER_ADDRESS: &str = "172.17.0.1:58615";

const PROVIDER_ADDRESS_ENV: &str = "DB_INSTANCE_PROVIDER_ADDRESS";

/// The provider service address from `DB_INSTANCE_PROVIDER_ADDRESS`, or
/// the container default.
pub fn provider_address() -> String {
    env::var(PROVIDER_ADDRESS_ENV)
        .unwrap_or_else(|_| DEFAULT_PROVIDER_ADDRESS.to_string())
}

/// An exclusively-owned, freshly-reset database for one test.
pub struct TestDatabase {
    info: ConnectionInfo,
    lease: Option<Lease>,
}

impl TestDatabase {
    /// Lease a database from the provider named in the environment.
    /// This is how most tests get a database.
    ///
    /// You must [`close`](Self::close) it when done to release the
    /// database.
    pub async fn connect() -> Self {
        Self::connect_to(&provider_address()).await
    }

    /// Lease a database from the provider at `address`.
    pub async fn connect_to(address: &str) -> Self {
        let mut lease = Lease::acquire(address)
            .await
            .expect("failed to acquire a database lease");

        // Blocks until an instance is ready; the maintain loop keeps the
        // lease alive until close() is called.
        let info = lease
            .connection_info()
            .await
            .expect("lease stream ended prematurely");

        debug!(database = %database_name(&info), "lease acquired");
        Self {
            info,
            lease: Some(lease),
        }
    }

    /// How to connect to the leased database.
    pub fn info(&self) -> &ConnectionInfo {
        &self.info
    }

    /// Release the database. The connection info must not be used after
    /// this returns. Calling it again is a no-op.
    pub async fn close(&mut self) {
        if let Some(mut lease) = self.lease.take() {
            debug!(database = %database_name(&self.info), "returning lease");
            lease.release().await;
        }
    }
}

fn database_name(info: &ConnectionInfo) -> &str {
    info.root_conn
        .as_ref()
        .map(|details| details.database.as_str())
        .unwrap_or_default()
}
