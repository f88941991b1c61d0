//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, panic catching, timeout)
//!     → dispatch pipeline decides an Action
//!     → response.rs (redirect | forward | asset | stub, token cookie write-back)
//!     → Send to client
//! ```

pub mod response;
pub mod server;

pub use server::{AppState, EdgeServer};
