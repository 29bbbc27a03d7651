//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! snapshot file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → Snapshot (validated, immutable)
//!     → borrowed by the renderer for one pass
//! ```
//!
//! # Design Decisions
//! - Snapshots are immutable once loaded; a new model means a new render
//! - All fields have defaults to allow minimal snapshots
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::GlobalConfig;
pub use schema::ObservabilityConfig;
pub use schema::RenderSettings;
pub use schema::Snapshot;
pub use schema::TracingConfig;
