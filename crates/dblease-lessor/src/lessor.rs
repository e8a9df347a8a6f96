//! The pool manager: reset workers, lease handout, lease return.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use dblease_proto::ConnectionInfo;

use crate::{DatabaseProvider, LeaseError};

/// Databases are named `testserver_db_<i>` for `i` in `0..N`.
const DATABASE_NAME_PREFIX: &str = "testserver_db_";

/// An exclusive claim on one database in the pool.
///
/// Leases are issued only by [`Lessor::lease`] and consumed by
/// [`Lessor::return_lease`]; they cannot be cloned, so a lease can be
/// returned at most once.
#[derive(Debug)]
pub struct Lease {
    database: String,
}

impl Lease {
    /// The name of the leased database.
    pub fn database(&self) -> &str {
        &self.database
    }
}

/// Manages a fixed-size pool of databases.
///
/// Two bounded queues carry the pool: `ready` holds databases that have
/// been reset and are free to lease, `reset` holds databases waiting for
/// a drop-then-create cycle. Both are sized to the pool, and every
/// database lives in exactly one queue or is held by exactly one worker
/// or lease holder, so pushes never block.
pub struct Lessor {
    provider: Arc<dyn DatabaseProvider>,
    databases: Vec<String>,

    ready_tx: async_channel::Sender<String>,
    ready_rx: async_channel::Receiver<String>,
    reset_tx: async_channel::Sender<String>,
    reset_rx: async_channel::Receiver<String>,

    running: AtomicBool,
}

impl Lessor {
    /// Create a pool of `num_instances` databases backed by `provider`.
    ///
    /// Nothing is leased until [`run`](Self::run) has been started and
    /// the first reset cycles complete.
    pub fn new(provider: Arc<dyn DatabaseProvider>, num_instances: usize) -> Self {
        let databases: Vec<String> = (0..num_instances)
            .map(|i| format!("{DATABASE_NAME_PREFIX}{i}"))
            .collect();

        // A bounded queue must hold at least one element; with zero
        // instances nothing is ever enqueued, so the capacity is moot.
        let capacity = num_instances.max(1);
        let (ready_tx, ready_rx) = async_channel::bounded(capacity);
        let (reset_tx, reset_rx) = async_channel::bounded(capacity);

        Self {
            provider,
            databases,
            ready_tx,
            ready_rx,
            reset_tx,
            reset_rx,
            running: AtomicBool::new(false),
        }
    }

    /// Run the reset workers until `shutdown` is cancelled.
    ///
    /// Spawns one worker per database, queues every database for its
    /// initial reset, and returns once shutdown is observed and all
    /// workers have drained. Panics if called a second time.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        if self.running.swap(true, Ordering::SeqCst) {
            panic!("Lessor::run() may only be called once");
        }

        let mut workers = Vec::with_capacity(self.databases.len());
        for _ in 0..self.databases.len() {
            let lessor = Arc::clone(&self);
            let shutdown = shutdown.clone();
            workers.push(tokio::spawn(async move {
                lessor.reset_worker(&shutdown).await;
            }));
        }

        for database in &self.databases {
            // Capacity equals the pool size, so seeding cannot block.
            let _ = self.reset_tx.send(database.clone()).await;
        }

        for worker in workers {
            let _ = worker.await;
        }
    }

    /// Block until a reset database is available, or until `cancel`.
    ///
    /// Concurrent callers are served in queue order.
    pub async fn lease(&self, cancel: &CancellationToken) -> Result<Lease, LeaseError> {
        debug!("lease requested");
        tokio::select! {
            database = self.ready_rx.recv() => match database {
                Ok(database) => {
                    debug!(%database, "handing out lease");
                    Ok(Lease { database })
                }
                Err(_) => Err(LeaseError::Shutdown),
            },
            () = cancel.cancelled() => Err(LeaseError::Cancelled),
        }
    }

    /// Connection info for the leased database.
    pub fn connection_info(&self, lease: &Lease) -> ConnectionInfo {
        self.provider.connection_info(&lease.database)
    }

    /// Give a lease back, queueing its database for a reset.
    ///
    /// Panics if the lease was not issued by this pool; that is a caller
    /// bug, not a recoverable condition.
    pub fn return_lease(&self, lease: Lease) {
        debug!(database = %lease.database, "lease returned");
        if !self.databases.contains(&lease.database) {
            panic!("invalid lease: {:?} was not issued by this pool", lease.database);
        }
        // Every database lives in exactly one queue, so a valid lease
        // always has a slot to land in.
        self.reset_tx
            .try_send(lease.database)
            .expect("reset queue full");
    }

    async fn reset_worker(&self, shutdown: &CancellationToken) {
        loop {
            tokio::select! {
                () = shutdown.cancelled() => return,
                database = self.reset_rx.recv() => {
                    let Ok(database) = database else { return };
                    if let Err(error) = self.reset(&database).await {
                        // The database is not re-queued: effective pool
                        // capacity shrinks by one until restart.
                        error!(%database, %error, "removing database from rotation");
                    }
                }
            }
        }
    }

    /// Drop and recreate a database, then mark it ready.
    async fn reset(&self, database: &str) -> anyhow::Result<()> {
        self.provider.drop_database(database).await?;
        self.provider.create_database(database).await?;
        let _ = self.ready_tx.send(database.to_string()).await;
        Ok(())
    }
}
