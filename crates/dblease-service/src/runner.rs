//! Binds a listener and serves the lease service.

use std::net::SocketAddr;
use std::sync::Mutex;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tracing::info;

use crate::LeaseService;

/// Runs the gRPC server on a caller-supplied address.
///
/// The listener is bound eagerly so `host:0` callers can read the
/// chosen port from [`local_addr`](Self::local_addr) before serving.
pub struct Runner {
    local_addr: SocketAddr,
    inner: Mutex<Option<Inner>>,
    shutdown: watch::Sender<bool>,
    done: watch::Receiver<bool>,
}

struct Inner {
    listener: TcpListener,
    service: LeaseService,
    shutdown: watch::Receiver<bool>,
    done: watch::Sender<bool>,
}

impl Runner {
    /// Bind the listener. `"localhost:0"` grabs any available port.
    pub async fn bind(service: LeaseService, address: &str) -> std::io::Result<Self> {
        let listener = TcpListener::bind(address).await?;
        let local_addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (done_tx, done_rx) = watch::channel(false);

        Ok(Self {
            local_addr,
            inner: Mutex::new(Some(Inner {
                listener,
                service,
                shutdown: shutdown_rx,
                done: done_tx,
            })),
            shutdown: shutdown_tx,
            done: done_rx,
        })
    }

    /// The address the service is being provided on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until [`stop`](Self::stop) is called.
    ///
    /// Panics if called a second time.
    pub async fn run(&self) -> Result<(), tonic::transport::Error> {
        let Inner {
            listener,
            service,
            mut shutdown,
            done,
        } = self
            .inner
            .lock()
            .unwrap()
            .take()
            .expect("this runner has already been used - make a new one");

        info!(address = %self.local_addr, "serving lease service");

        let serve = Server::builder()
            .add_service(service.into_service())
            .serve_with_incoming(TcpListenerStream::new(listener));

        // Dropping the serve future tears down live connections, which
        // is what stop() wants: clients holding leases must observe the
        // loss immediately.
        let result = tokio::select! {
            result = serve => result,
            _ = shutdown.changed() => Ok(()),
        };

        let _ = done.send(true);
        result
    }

    /// Stop the service and wait for [`run`](Self::run) to wind down.
    /// Idempotent.
    pub async fn stop(&self) {
        let _ = self.shutdown.send(true);

        let mut done = self.done.clone();
        if *done.borrow_and_update() {
            return;
        }
        let _ = done.changed().await;
    }
}
