//! Client error types.

use thiserror::Error;

/// Errors surfaced while acquiring or waiting on a lease.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to reach the provider service: {0}")]
    Connect(#[from] tonic::transport::Error),

    #[error("failed to open the lease stream: {0}")]
    Rpc(#[from] tonic::Status),

    #[error("the lease stream ended before connection info arrived")]
    StreamClosed,
}
