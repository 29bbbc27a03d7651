//! nginx directive synthesis for declarative routing models.

pub mod config;
pub mod directive;
pub mod model;
pub mod observability;
pub mod render;
pub mod synthesis;

pub use config::schema::Snapshot;
pub use directive::Directive;
pub use render::Renderer;
pub use synthesis::DenySlugCache;
