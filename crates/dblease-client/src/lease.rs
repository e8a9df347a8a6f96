//! The client-side lease holder.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Status, Streaming};
use tracing::{debug, error};

use dblease_proto::database_lease_client::DatabaseLeaseClient;
use dblease_proto::{
    ConnectionInfo, GetDatabaseInstanceRequest, GetDatabaseInstanceResponse,
};

use crate::ClientError;

/// Invoked when the lease stream breaks while the lease is supposed to
/// be live. Overridable so tests can observe the event instead of dying.
pub type FatalHook = Arc<dyn Fn(&Status) + Send + Sync>;

/// Holds and maintains a lease on a database provided by the lease
/// service.
///
/// Create with [`acquire`](Self::acquire); it may take a while for the
/// lease to be granted, so call [`connection_info`](Self::connection_info)
/// to wait for it. When done with the database, call
/// [`release`](Self::release) to give it back — although the server also
/// reclaims it whenever the stream breaks for any reason.
pub struct Lease {
    /// Dropping this half-closes the stream, signalling release.
    requests: Option<mpsc::Sender<GetDatabaseInstanceRequest>>,
    info: mpsc::Receiver<ConnectionInfo>,
    cached: Option<ConnectionInfo>,
    maintain: Option<JoinHandle<()>>,
}

impl Lease {
    /// Request a new lease from the service at `address` (host:port).
    pub async fn acquire(address: &str) -> Result<Self, ClientError> {
        Self::acquire_with_hook(address, Arc::new(default_fatal_hook)).await
    }

    /// Like [`acquire`](Self::acquire), with an injectable fatal hook.
    pub async fn acquire_with_hook(
        address: &str,
        fatal: FatalHook,
    ) -> Result<Self, ClientError> {
        let mut client =
            DatabaseLeaseClient::connect(format!("http://{address}")).await?;

        // The initial request must be queued before the call is made:
        // the server does not answer until it arrives.
        let (requests_tx, requests_rx) = mpsc::channel(4);
        requests_tx
            .send(GetDatabaseInstanceRequest::default())
            .await
            .expect("fresh channel refused a message");

        let responses = client
            .get_database_instance(ReceiverStream::new(requests_rx))
            .await?
            .into_inner();

        let (info_tx, info_rx) = mpsc::channel(1);
        let maintain = tokio::spawn(maintain(responses, info_tx, fatal));

        Ok(Self {
            requests: Some(requests_tx),
            info: info_rx,
            cached: None,
            maintain: Some(maintain),
        })
    }

    /// Block until the lease is granted and return its connection info.
    ///
    /// The first call may wait indefinitely (bound it with
    /// `tokio::time::timeout` if needed); later calls return the cached
    /// info immediately.
    pub async fn connection_info(&mut self) -> Result<ConnectionInfo, ClientError> {
        if let Some(info) = &self.cached {
            return Ok(info.clone());
        }
        match self.info.recv().await {
            Some(info) => {
                self.cached = Some(info.clone());
                Ok(info)
            }
            None => Err(ClientError::StreamClosed),
        }
    }

    /// Give the lease back. The connection info must not be used after
    /// this returns. Calling it again is a no-op.
    pub async fn release(&mut self) {
        // Half-close the stream, then wait for the server to finish the
        // call so the maintain loop is not left dangling.
        self.requests.take();
        if let Some(maintain) = self.maintain.take() {
            let _ = maintain.await;
        }
    }
}

/// Receive loop: logs status updates, publishes the connection info,
/// and converts an unexpected stream loss into a fatal event.
async fn maintain(
    mut responses: Streaming<GetDatabaseInstanceResponse>,
    info: mpsc::Sender<ConnectionInfo>,
    fatal: FatalHook,
) {
    loop {
        match responses.message().await {
            Ok(Some(response)) => {
                if !response.status.is_empty() {
                    debug!(status = %response.status, "server status");
                }
                if let Some(connection_info) = response.connection_info {
                    debug!("received connection info");
                    let _ = info.send(connection_info).await;
                }
            }
            // The server closed the stream after we released the lease.
            Ok(None) => return,
            Err(status) => {
                // A sudden loss of the lease must halt the program:
                // continuing to use a database we no longer own would
                // corrupt other tests.
                fatal(&status);
                return;
            }
        }
    }
}

fn default_fatal_hook(status: &Status) {
    error!(error = %status, "halting: lost the database lease");
    std::process::exit(1);
}
