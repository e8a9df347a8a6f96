//! Lessor error types.

use thiserror::Error;

/// Errors returned by [`crate::Lessor::lease`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LeaseError {
    #[error("lease request cancelled")]
    Cancelled,

    #[error("the pool has shut down")]
    Shutdown,
}
