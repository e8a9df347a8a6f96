//! One-time MySQL server preparation.
//!
//! Run once before the pool starts: provisions the app user that lease
//! holders connect with and restricts it to row operations. The server
//! may still be initializing when the daemon comes up, so every
//! statement retries until it succeeds or the deadline passes.

use std::time::Duration;

use sqlx::MySqlPool;
use tokio::time::Instant;
use tracing::debug;

use crate::MysqlConnParams;

const RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Prepare the server for leasing.
///
/// `allow_connections_from` is the MySQL host pattern the app user may
/// connect from (e.g. `172.%` for the docker bridge network).
pub async fn initialize(
    pool: &MySqlPool,
    params: &MysqlConnParams,
    allow_connections_from: &str,
    deadline: Duration,
) -> anyhow::Result<()> {
    let give_up = Instant::now() + deadline;

    run_with_retry(
        pool,
        &format!(
            "CREATE USER IF NOT EXISTS '{}'@'{}' IDENTIFIED BY '{}'",
            params.user, allow_connections_from, params.user_password
        ),
        give_up,
    )
    .await?;

    // The app user can only manipulate rows, not tables (or anything
    // else).
    run_with_retry(
        pool,
        &format!(
            "GRANT SELECT, INSERT, UPDATE, DELETE ON *.* TO '{}'@'{}'",
            params.user, allow_connections_from
        ),
        give_up,
    )
    .await?;

    // Force the settings to take effect.
    run_with_retry(pool, "FLUSH PRIVILEGES", give_up).await?;

    Ok(())
}

/// Run one statement, retrying until it succeeds or `give_up` passes.
async fn run_with_retry(
    pool: &MySqlPool,
    statement: &str,
    give_up: Instant,
) -> anyhow::Result<()> {
    debug!(%statement, "running mysql statement");
    loop {
        let error = match sqlx::query(statement).execute(pool).await {
            Ok(_) => return Ok(()),
            Err(error) => error,
        };

        if Instant::now() >= give_up {
            anyhow::bail!("gave up on {statement:?}, last error: {error}");
        }
        debug!(%error, "statement failed, retrying");
        tokio::time::sleep(RETRY_INTERVAL).await;
    }
}
