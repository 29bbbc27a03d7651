//! Routing model consumed by the synthesis engine.
//!
//! # Data Flow
//! ```text
//! model acquisition (external)
//!     → Snapshot { global, servers, backends, resolvers }
//!     → server.rs (Server → Location → policies)
//!     → backend.rs (named endpoint pools, session affinity)
//!     → rate_limit.rs (per-location limiter policy)
//!     → handed to synthesis/* as an immutable borrow
//! ```
//!
//! # Design Decisions
//! - Every entity is read-only to the engine; nothing here is mutated while rendering
//! - All fields default so partial snapshots deserialize
//! - Backends are referenced by name, never owned by a location

pub mod backend;
pub mod rate_limit;
pub mod server;

pub use backend::{Backend, Endpoint, SessionAffinity};
pub use rate_limit::{RateLimitPolicy, Zone};
pub use server::{ExternalAuth, Location, Rewrite, Server};
