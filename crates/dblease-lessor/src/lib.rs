//! dblease-lessor — the database pool manager.
//!
//! Owns a fixed set of named databases and mediates exclusive leases on
//! them. Every database cycles through three states:
//!
//! ```text
//! ┌──────────┐  reset worker   ┌─────────┐  Lessor::lease   ┌────────┐
//! │ resetting │ ──────────────▶ │  ready  │ ───────────────▶ │ leased │
//! └──────────┘  drop + create  └─────────┘                  └────────┘
//!      ▲                                                         │
//!      └──────────────────── Lessor::return_lease ───────────────┘
//! ```
//!
//! A database is handed out only after a successful drop-then-create
//! cycle, so a lease always refers to an empty database owned by exactly
//! one holder. The physical create/drop work is delegated to a
//! [`DatabaseProvider`] implementation.

pub mod fake;

mod error;
mod lessor;
mod provider;

pub use error::LeaseError;
pub use lessor::{Lease, Lessor};
pub use provider::DatabaseProvider;
