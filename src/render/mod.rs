//! Rendering subsystem.
//!
//! # Data Flow
//! ```text
//! Snapshot + RenderSettings
//!     → renderer.rs (walk the snapshot, call synthesis builders in template order)
//!     → postprocess.rs (squeeze blank lines; raw output on failure)
//!     → nginx.conf text
//!
//! Template engines:
//!     helper name + arguments
//!     → helpers.rs (tagged-variant dispatch to typed builders)
//! ```
//!
//! # Design Decisions
//! - A render either returns the whole configuration or an error, never a fragment
//! - Post-processing failure is not a render failure
//! - The deny slug cache belongs to the renderer, not to the process

pub mod helpers;
pub mod postprocess;
pub mod renderer;

use thiserror::Error;

pub use helpers::{Arg, HelperError, Helpers, Output};
pub use postprocess::{PostProcessError, PostProcessor, SqueezeBlankLines};
pub use renderer::Renderer;

/// Errors that abort a whole render.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A location reached the renderer without a path.
    #[error("server '{server}' has a location with an empty path")]
    EmptyLocationPath { server: String },

    /// Writing the output failed.
    #[error("failed to write configuration: {0}")]
    Format(#[from] std::fmt::Error),
}

/// Result type for render operations.
pub type RenderResult<T> = Result<T, RenderError>;
