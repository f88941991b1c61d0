//! Site registry subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     built-in table or [[sites]] from config
//!     → registry.rs (validate uniqueness, build hostname index, add aliases)
//!     → SiteRegistry shared via Arc
//!
//! Per request:
//!     Host header → SiteRegistry::resolve → Resolution { site, kind } | None
//! ```

pub mod language;
pub mod registry;

pub use language::Language;
pub use registry::{
    default_sites, EnvironmentClass, HostKind, RegistryError, Resolution, Site, SiteRegistry,
};
