//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Renderer and builders produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters)
//!
//! Consumers:
//!     → stderr (human-readable or JSON lines)
//!     → whatever `metrics` recorder the host installs
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Logs go to stderr so rendered configuration on stdout stays clean
//! - Metrics are a facade: without a recorder they cost nothing

pub mod logging;
pub mod metrics;
