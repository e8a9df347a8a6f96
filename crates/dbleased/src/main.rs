//! dbleased — the database lease daemon.
//!
//! Runs inside the database container: provisions the MySQL app user,
//! seeds the pool of lease databases, and serves the lease service
//! until interrupted.

mod config;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use dblease_lessor::Lessor;
use dblease_mysql::{bootstrap, MysqlProvider};
use dblease_service::{LeaseService, Runner};

use crate::config::Config;

/// MySQL may still be starting when the daemon comes up; bootstrap
/// statements retry until this deadline.
const INIT_DEADLINE: Duration = Duration::from_secs(180);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".parse().unwrap()),
        )
        .init();

    let config = Config::from_env()?;
    info!(
        instances = config.instances,
        mysql = %config.mysql.address,
        "initializing mysql backend"
    );

    let pool = dblease_mysql::connect(&config.mysql.root_details());
    bootstrap::initialize(
        &pool,
        &config.mysql,
        &config.allow_connections_from,
        INIT_DEADLINE,
    )
    .await?;

    let provider = Arc::new(MysqlProvider::new(config.mysql.clone(), pool));
    let lessor = Arc::new(Lessor::new(provider, config.instances));

    let shutdown = CancellationToken::new();
    let pool_task = tokio::spawn(Arc::clone(&lessor).run(shutdown.clone()));

    let service = LeaseService::new();
    service.set_lessor(lessor);

    let runner = Arc::new(
        Runner::bind(service, &format!("0.0.0.0:{}", config.port)).await?,
    );
    info!(address = %runner.local_addr(), "starting service");

    let serving = tokio::spawn({
        let runner = Arc::clone(&runner);
        async move { runner.run().await }
    });

    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C handler");
    info!("shutdown signal received");

    runner.stop().await;
    shutdown.cancel();
    let _ = pool_task.await;
    serving.await??;

    info!("daemon stopped");
    Ok(())
}
