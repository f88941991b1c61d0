//! Upstream forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! RequestContext + target (dynamic | mini)
//!     → client.rs (build URL, add identifying headers, pick pool by scheme)
//!     → backend response (status/headers/body relayed)
//!     → headers.rs (hop-by-hop headers stripped)
//! ```

pub mod client;
pub mod headers;

pub use client::{parse_target, ForwardError, ForwardingClient};
