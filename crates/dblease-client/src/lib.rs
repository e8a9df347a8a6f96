//! dblease-client — lease a fresh database from a running provider.
//!
//! [`Lease`] is the low-level holder: it opens the stream, surfaces the
//! connection info, and keeps the stream alive until released. Losing
//! the stream unexpectedly is fatal for the whole process, because test
//! code keeps using the database long after acquiring it and has no way
//! to hear about an asynchronous loss.
//!
//! [`TestDatabase`] is the convenience wrapper most tests want:
//!
//! ```no_run
//! # async fn example() {
//! let mut db = dblease_client::TestDatabase::connect().await;
//! let info = db.info().clone();
//! // ... run the test against `info` ...
//! db.close().await;
//! # }
//! ```

mod error;
mod instance;
mod lease;

pub use error::ClientError;
pub use instance::{provider_address, TestDatabase, DEFAULT_PROVIDER_ADDRESS};
pub use lease::{FatalHook, Lease};
