//! Edge layer for the multi-site content platform.

// Request handling
pub mod dispatch;
pub mod http;
pub mod upstream;

// Domain tables and collaborators
pub mod agent;
pub mod assets;
pub mod identity;
pub mod sites;

// Cross-cutting concerns
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod observability;

pub use config::schema::EdgeConfig;
pub use error::EdgeError;
pub use http::EdgeServer;
pub use lifecycle::Shutdown;
