//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + CLI/env overrides
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → EdgeConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the process restarts to change it
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{resolve_config, ConfigError};
pub use schema::{
    AssetConfig, CookieConfig, EdgeConfig, IdentityConfig, ListenerConfig, LogFormat,
    ObservabilityConfig, RoutingConfig, Stage, TimeoutConfig, UpstreamConfig,
};
pub use validation::{validate_config, ValidationError};
