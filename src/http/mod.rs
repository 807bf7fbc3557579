//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → pipeline.rs (HTTP/1.1 decode, one exchange, upgrades)
//!     → router.rs (identifier extraction, interception, dispatch)
//!     → intercept.rs (external allow/rewrite/deny hook)
//!     → module handler
//!     → response.rs (headers, compression, close semantics)
//!     → Send to client
//! ```

pub mod intercept;
pub mod pipeline;
pub mod response;
pub mod router;

pub use intercept::{AllowAll, InterceptDecision, InterceptRequest, Interceptor};
pub use router::Router;
