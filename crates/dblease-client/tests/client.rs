//! Integration tests for the client lease holder, against an
//! in-process lease service backed by a fake provider.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use dblease_client::{Lease, TestDatabase};
use dblease_lessor::fake::FakeProvider;
use dblease_lessor::Lessor;
use dblease_service::{LeaseService, Runner};

const DEADLINE: Duration = Duration::from_secs(2);

struct TestServer {
    lessor: Arc<Lessor>,
    runner: Arc<Runner>,
    address: String,
    shutdown: CancellationToken,
}

async fn start_server() -> TestServer {
    let lessor = Arc::new(Lessor::new(Arc::new(FakeProvider::new()), 1));
    let shutdown = CancellationToken::new();
    tokio::spawn(Arc::clone(&lessor).run(shutdown.clone()));

    let service = LeaseService::new();
    service.set_lessor(Arc::clone(&lessor));

    let runner = Arc::new(Runner::bind(service, "127.0.0.1:0").await.unwrap());
    let address = runner.local_addr().to_string();
    tokio::spawn({
        let runner = Arc::clone(&runner);
        async move {
            let _ = runner.run().await;
        }
    });

    TestServer {
        lessor,
        runner,
        address,
        shutdown,
    }
}

impl TestServer {
    async fn stop(&self) {
        self.runner.stop().await;
        self.shutdown.cancel();
    }
}

#[tokio::test]
async fn acquire_wait_release_round_trip() {
    let server = start_server().await;

    let mut lease = Lease::acquire(&server.address).await.unwrap();
    let info = timeout(DEADLINE, lease.connection_info())
        .await
        .expect("no lease granted")
        .unwrap();
    assert_eq!(info.root_conn.unwrap().database, "testserver_db_0");

    // Later calls return the cached info without waiting.
    let again = timeout(DEADLINE, lease.connection_info())
        .await
        .expect("cached info should be immediate")
        .unwrap();
    assert_eq!(again.app_conn.unwrap().database, "testserver_db_0");

    lease.release().await;

    // The database cycles back into the pool for the next holder.
    let cancel = CancellationToken::new();
    let reclaimed = timeout(DEADLINE, server.lessor.lease(&cancel))
        .await
        .expect("lease was not reclaimed")
        .unwrap();
    assert_eq!(reclaimed.database(), "testserver_db_0");

    server.stop().await;
}

#[tokio::test]
async fn release_twice_is_a_no_op() {
    let server = start_server().await;

    let mut lease = Lease::acquire(&server.address).await.unwrap();
    timeout(DEADLINE, lease.connection_info())
        .await
        .expect("no lease granted")
        .unwrap();

    lease.release().await;
    lease.release().await;

    server.stop().await;
}

#[tokio::test]
async fn unexpected_stream_loss_is_fatal() {
    let server = start_server().await;

    let (fatal_tx, mut fatal_rx) = mpsc::channel(1);
    let hook: dblease_client::FatalHook = Arc::new(move |status: &tonic::Status| {
        let _ = fatal_tx.try_send(status.to_string());
    });

    let mut lease = Lease::acquire_with_hook(&server.address, hook)
        .await
        .unwrap();
    timeout(DEADLINE, lease.connection_info())
        .await
        .expect("no lease granted")
        .unwrap();

    // The server dying mid-lease must trip the fatal hook, not a quiet
    // stream close.
    server.stop().await;
    timeout(DEADLINE, fatal_rx.recv())
        .await
        .expect("fatal hook was not invoked")
        .expect("fatal hook sender dropped");
}

#[tokio::test]
async fn test_database_round_trip() {
    let server = start_server().await;

    let mut db = TestDatabase::connect_to(&server.address).await;
    let app = db.info().app_conn.as_ref().expect("want app details");
    assert_eq!(app.database, "testserver_db_0");

    db.close().await;
    db.close().await; // no-op

    server.stop().await;
}
