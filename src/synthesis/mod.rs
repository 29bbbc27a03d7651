//! Directive synthesis engine.
//!
//! # Data Flow
//! ```text
//! Snapshot (immutable)
//!     → location.rs   (selector, rewrite + proxy target)
//!         → upstream.rs (backend lookup, sticky prefix)
//!     → rate_limit.rs (cluster-wide zones, per-location limits)
//!     → resolver.rs   (name servers, IP bracketing)
//!     → auth.rs       (auth_request location, header copies, sign-in URL)
//!     → opentracing.rs (module loads, collector params)
//!     → validators.rs / deny.rs (small formatters, deny slugs)
//!     → Directive values → directive.rs prints them
//! ```
//!
//! # Design Decisions
//! - Builders take concrete model types; no runtime shape checks
//! - Builders are pure except `DenySlugCache`, which is injected
//! - Output ordering inside every directive group is fixed

pub mod auth;
pub mod deny;
pub mod location;
pub mod opentracing;
pub mod rate_limit;
pub mod resolver;
pub mod upstream;
pub mod validators;

pub use deny::DenySlugCache;
