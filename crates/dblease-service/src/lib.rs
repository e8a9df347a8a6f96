//! dblease-service — the gRPC lease service.
//!
//! Serves the `DatabaseLease` interface:
//!
//! ```text
//! Client                              Service
//!   │  GetDatabaseInstance (stream)     │
//!   ├──────────────────────────────────▶│  Session
//!   │◀── status: "requesting lease" ────┤    ├─ watches the request stream
//!   │◀── status: "waiting for lease" ───┤    ├─ asks the Lessor for a lease
//!   │◀── connection_info ───────────────┤    └─ heartbeats until the client
//!   │◀── status: "lease active" ────────┤       closes or the stream breaks
//!   │  (half-close releases the lease)  │
//!   │                                   │
//!   │  GetStatus ──────────────────────▶│  STARTING until a lessor is
//!   │◀── STARTING | UP ─────────────────┤  bound, UP afterwards
//! ```
//!
//! Every exit path of a session returns its lease to the pool exactly
//! once; the [`Runner`] binds a listener and serves until stopped.

mod runner;
mod service;
mod session;

pub use runner::Runner;
pub use service::{LeaseService, DEFAULT_HEARTBEAT_PERIOD};
