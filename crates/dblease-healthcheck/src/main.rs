//! Reports the health of the database lease service in a container.
//!
//! Queries the status RPC and exits 0 if the service is ready for
//! requests, or 1 otherwise (still starting, or unreachable).

use clap::Parser;
use tracing::info;

use dblease_proto::database_lease_client::DatabaseLeaseClient;
use dblease_proto::get_status_response::State;
use dblease_proto::GetStatusRequest;

#[derive(Parser)]
#[command(name = "dblease-healthcheck")]
struct Cli {
    /// The provider service address.
    #[arg(long, default_value = "localhost:58615")]
    address: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().init();
    let cli = Cli::parse();
    std::process::exit(check(&cli.address).await);
}

async fn check(address: &str) -> i32 {
    let state = match get_state(address).await {
        Ok(state) => state,
        Err(error) => {
            info!(%error, "service unreachable");
            return 1;
        }
    };

    match state {
        State::Up => 0,
        other => {
            info!(state = ?other, "service not yet ready");
            1
        }
    }
}

async fn get_state(address: &str) -> anyhow::Result<State> {
    let mut client =
        DatabaseLeaseClient::connect(format!("http://{address}")).await?;
    let response = client.get_status(GetStatusRequest {}).await?;
    Ok(response.into_inner().state())
}
