//! The per-stream lease session.
//!
//! One session runs for each `GetDatabaseInstance` call. It owns at most
//! one lease and guarantees that every exit path — graceful half-close,
//! client crash, send failure, pool shutdown — returns that lease to the
//! pool exactly once.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tonic::{Status, Streaming};
use tracing::{debug, warn};

use dblease_lessor::{Lease, LeaseError, Lessor};
use dblease_proto::{GetDatabaseInstanceRequest, GetDatabaseInstanceResponse};

type ResponseSender = mpsc::Sender<Result<GetDatabaseInstanceResponse, Status>>;

pub(crate) struct Session {
    lessor: Arc<Lessor>,
    heartbeat_period: Duration,
}

impl Session {
    pub(crate) fn new(lessor: Arc<Lessor>, heartbeat_period: Duration) -> Self {
        Self {
            lessor,
            heartbeat_period,
        }
    }

    /// Drive the session: acknowledge the request, acquire a lease,
    /// heartbeat, and reclaim on exit. The initial request has already
    /// been received by the caller.
    pub(crate) async fn run(
        self,
        requests: Streaming<GetDatabaseInstanceRequest>,
        responses: ResponseSender,
    ) {
        // The client relies on the first response being a status-only
        // acknowledgement, before any lease can become available.
        if send_status(&responses, "requesting lease").await.is_err() {
            return; // client already gone; no lease held
        }

        // Watch the request stream so the session notices when the
        // client is done, gracefully or otherwise.
        let (client_done_tx, mut client_done) = mpsc::channel(1);
        tokio::spawn(watch_client(requests, client_done_tx));

        // Ask for the lease from a separate task: acquisition can block
        // indefinitely and the session must keep heartbeating meanwhile.
        let cancel = CancellationToken::new();
        let (lease_tx, mut lease_rx) = oneshot::channel();
        tokio::spawn({
            let lessor = Arc::clone(&self.lessor);
            let cancel = cancel.clone();
            async move {
                let _ = lease_tx.send(lessor.lease(&cancel).await);
            }
        });

        let mut lease: Option<Lease> = None;
        let mut lease_pending = true;
        let mut status = "waiting for lease";

        let heartbeat = tokio::time::sleep(self.heartbeat_period);
        tokio::pin!(heartbeat);

        loop {
            tokio::select! {
                () = heartbeat.as_mut() => {
                    if send_status(&responses, status).await.is_err() {
                        break;
                    }
                    heartbeat
                        .as_mut()
                        .reset(Instant::now() + self.heartbeat_period);
                }

                outcome = &mut lease_rx, if lease_pending => {
                    lease_pending = false;
                    match outcome {
                        Ok(Ok(granted)) => {
                            let info = self.lessor.connection_info(&granted);
                            lease = Some(granted);
                            status = "lease active";
                            let response = GetDatabaseInstanceResponse {
                                status: String::new(),
                                connection_info: Some(info),
                            };
                            if responses.send(Ok(response)).await.is_err() {
                                break;
                            }
                        }
                        Ok(Err(error)) => {
                            fail(&responses, &error).await;
                            break;
                        }
                        // The requester task never drops its sender
                        // before publishing.
                        Err(_) => break,
                    }
                }

                done = client_done.recv() => {
                    match done {
                        // A half-close is the normal way to release.
                        Some(Ok(())) => debug!("client closed the stream"),
                        Some(Err(error)) => {
                            // Anything else is a failed call, and the
                            // failure is its terminal status.
                            debug!(%error, "client stream failed");
                            let _ = responses.send(Err(error)).await;
                        }
                        None => {}
                    }
                    break;
                }
            }
        }

        // Reclamation. Cancel the lease request and, if it was still in
        // flight, wait for its outcome: a lease granted in the race
        // window must not leak.
        cancel.cancel();
        if lease.is_none() && lease_pending {
            if let Ok(Ok(granted)) = lease_rx.await {
                lease = Some(granted);
            }
        }
        if let Some(granted) = lease.take() {
            self.lessor.return_lease(granted);
        }
    }
}

/// Drain the request stream, publishing the first close or error.
///
/// Messages past the initial request carry no meaning; they are logged
/// because they may indicate a client-side bug.
async fn watch_client(
    mut requests: Streaming<GetDatabaseInstanceRequest>,
    done: mpsc::Sender<Result<(), Status>>,
) {
    loop {
        match requests.message().await {
            Ok(Some(message)) => {
                warn!(?message, "ignoring unexpected message from the client");
            }
            Ok(None) => {
                let _ = done.send(Ok(())).await;
                return;
            }
            Err(status) => {
                let _ = done.send(Err(status)).await;
                return;
            }
        }
    }
}

async fn send_status(
    responses: &ResponseSender,
    status: &str,
) -> Result<(), mpsc::error::SendError<Result<GetDatabaseInstanceResponse, Status>>> {
    responses
        .send(Ok(GetDatabaseInstanceResponse {
            status: status.to_string(),
            connection_info: None,
        }))
        .await
}

async fn fail(responses: &ResponseSender, error: &LeaseError) {
    let status = match error {
        LeaseError::Cancelled => Status::cancelled(error.to_string()),
        LeaseError::Shutdown => Status::unavailable(error.to_string()),
    };
    let _ = responses.send(Err(status)).await;
}
