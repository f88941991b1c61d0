//! Access token subsystem.
//!
//! # Data Flow
//! ```text
//! RequestContext
//!     → token.rs (cookie token? reuse : ask identity endpoint)
//!     → client.rs (GET {identity}/accesstoken, parse `accessToken`)
//!     → token attached to context for forwarding
//!     → cookie.rs (Set-Cookie write-back on the final response)
//! ```

pub mod client;
pub mod cookie;
pub mod token;

pub use client::{IdentityClient, IdentityError};
pub use token::{AccessToken, TokenManager, TokenSource};
