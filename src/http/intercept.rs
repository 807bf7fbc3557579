//! Request interception hook.
//!
//! An external authority gets one synchronous look at every request
//! before routing: it can allow it, rewrite the module identifier, or
//! deny it outright. The hook receives an immutable per-request value
//! and returns an explicit decision; nothing is mutated across
//! invocations and the context never outlives the request.

use std::net::SocketAddr;

/// The per-request value handed to the hook.
#[derive(Debug, Clone)]
pub struct InterceptRequest {
    /// Module identifier extracted from the URI (pre-rewrite).
    pub module_id: String,

    /// Remote address of the connection.
    pub remote_addr: SocketAddr,
}

/// Decision returned by the hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterceptDecision {
    /// Proceed with the extracted identifier.
    Allow,

    /// Proceed, but resolve and report this identifier instead.
    Rewrite(String),

    /// Reject the request with `403 Forbidden`.
    Deny,
}

/// External policy callback invoked once per request, before the
/// registry lookup. Must complete before routing proceeds.
pub trait Interceptor: Send + Sync {
    fn intercept(&self, request: &InterceptRequest) -> InterceptDecision;
}

/// Default hook: allows everything.
pub struct AllowAll;

impl Interceptor for AllowAll {
    fn intercept(&self, _request: &InterceptRequest) -> InterceptDecision {
        InterceptDecision::Allow
    }
}
