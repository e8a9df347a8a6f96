//! The `DatabaseLease` gRPC façade.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status, Streaming};
use tracing::{debug, error};

use dblease_lessor::Lessor;
use dblease_proto::database_lease_server::{DatabaseLease, DatabaseLeaseServer};
use dblease_proto::get_status_response::State;
use dblease_proto::{
    GetDatabaseInstanceRequest, GetDatabaseInstanceResponse, GetStatusRequest,
    GetStatusResponse,
};

use crate::session::Session;

/// How often a session reports its status to the client.
pub const DEFAULT_HEARTBEAT_PERIOD: Duration = Duration::from_secs(10);

/// Buffered responses per stream; sends block once the client falls
/// this far behind.
const RESPONSE_BUFFER: usize = 4;

/// gRPC implementation of the lease service.
///
/// The lessor is bound late via [`set_lessor`](Self::set_lessor): a
/// server can accept status probes while the pool behind it is still
/// initializing. Cloning yields another handle to the same service.
#[derive(Clone)]
pub struct LeaseService {
    inner: Arc<Inner>,
}

struct Inner {
    lessor: Mutex<Option<Arc<Lessor>>>,
    heartbeat_period: Duration,
}

impl LeaseService {
    pub fn new() -> Self {
        Self::with_heartbeat_period(DEFAULT_HEARTBEAT_PERIOD)
    }

    /// Create a service with a custom heartbeat period (tests use short
    /// periods to observe the cadence quickly).
    pub fn with_heartbeat_period(heartbeat_period: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                lessor: Mutex::new(None),
                heartbeat_period,
            }),
        }
    }

    /// Bind the lessor, flipping the reported status to `UP`.
    ///
    /// May be called at most once; a second call panics.
    pub fn set_lessor(&self, lessor: Arc<Lessor>) {
        let mut guard = self.inner.lessor.lock().unwrap();
        if guard.is_some() {
            panic!("set_lessor() may only be called once");
        }
        *guard = Some(lessor);
    }

    /// Get the tonic service for mounting on a gRPC server.
    pub fn into_service(self) -> DatabaseLeaseServer<LeaseService> {
        DatabaseLeaseServer::new(self)
    }

    fn lessor(&self) -> Option<Arc<Lessor>> {
        self.inner.lessor.lock().unwrap().clone()
    }
}

impl Default for LeaseService {
    fn default() -> Self {
        Self::new()
    }
}

#[tonic::async_trait]
impl DatabaseLease for LeaseService {
    async fn get_status(
        &self,
        _request: Request<GetStatusRequest>,
    ) -> Result<Response<GetStatusResponse>, Status> {
        let state = if self.lessor().is_some() {
            State::Up
        } else {
            State::Starting
        };
        Ok(Response::new(GetStatusResponse {
            state: state.into(),
        }))
    }

    type GetDatabaseInstanceStream =
        ReceiverStream<Result<GetDatabaseInstanceResponse, Status>>;

    async fn get_database_instance(
        &self,
        request: Request<Streaming<GetDatabaseInstanceRequest>>,
    ) -> Result<Response<Self::GetDatabaseInstanceStream>, Status> {
        debug!("handling database instance request");

        let Some(lessor) = self.lessor() else {
            return Err(Status::unavailable(
                "database provider is not ready yet - check the status RPC",
            ));
        };

        let mut requests = request.into_inner();

        // The first message initiates the lease request; no pool slot is
        // touched until it arrives.
        match requests.message().await {
            Ok(Some(_)) => {}
            Ok(None) => {
                return Err(Status::invalid_argument(
                    "stream closed before the initial request",
                ));
            }
            Err(status) => {
                error!(error = %status, "error receiving first message in stream");
                return Err(status);
            }
        }

        let (responses, stream) = mpsc::channel(RESPONSE_BUFFER);
        let session = Session::new(lessor, self.inner.heartbeat_period);
        tokio::spawn(session.run(requests, responses));

        Ok(Response::new(ReceiverStream::new(stream)))
    }
}
