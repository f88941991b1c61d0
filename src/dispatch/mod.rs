//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → context.rs (RequestContext: host, path, cookie token, passthrough headers)
//!     → pipeline.rs (stages 1..13, first decisive stage wins)
//!         uses sites (registry), agent (classifier), identity (tokens),
//!         legacy.rs (redirect table), paths.rs (path predicates)
//!     → action.rs (Action: health | redirect | forward | serve | blank)
//!     → executed by the HTTP layer
//! ```

pub mod action;
pub mod context;
pub mod legacy;
pub mod paths;
pub mod pipeline;

pub use action::{Action, Target};
pub use context::RequestContext;
pub use legacy::LegacyRedirects;
pub use pipeline::Dispatcher;
