//! Module registry: identifier → handler lookup.
//!
//! # Design Decisions
//! - Exact string matching only; no wildcard or prefix routes
//! - Duplicate registration is an error; overwrite requires `replace`
//! - Read-mostly after startup; registration is expected to be
//!   serialized by the host before traffic begins

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::module::{Handler, HandlerKind};

/// Error type for registry operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// The identifier is already bound to a handler.
    #[error("module identifier already registered: {0:?}")]
    DuplicateIdentifier(String),
}

/// Maps module identifiers to registered handlers.
///
/// Identifiers are case-sensitive and may be empty (the root module,
/// serving requests to `/`).
#[derive(Default)]
pub struct ModuleRegistry {
    modules: DashMap<String, Handler>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a handler to an identifier.
    ///
    /// Fails if the identifier is already bound; use [`replace`] for an
    /// explicit overwrite.
    ///
    /// [`replace`]: ModuleRegistry::replace
    pub fn register(
        &self,
        identifier: impl Into<String>,
        handler: Handler,
    ) -> Result<(), RegistryError> {
        match self.modules.entry(identifier.into()) {
            Entry::Occupied(entry) => Err(RegistryError::DuplicateIdentifier(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(handler);
                Ok(())
            }
        }
    }

    /// Bind a handler, overwriting any existing binding.
    ///
    /// Returns the previous handler, if any.
    pub fn replace(&self, identifier: impl Into<String>, handler: Handler) -> Option<Handler> {
        self.modules.insert(identifier.into(), handler)
    }

    /// Remove a binding, returning the handler if one was bound.
    pub fn unregister(&self, identifier: &str) -> Option<Handler> {
        self.modules.remove(identifier).map(|(_, handler)| handler)
    }

    /// Resolve an identifier. Exact match only.
    pub fn lookup(&self, identifier: &str) -> Option<Handler> {
        self.modules.get(identifier).map(|entry| entry.value().clone())
    }

    /// Number of registered modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Number of registered request modules.
    pub fn request_module_count(&self) -> usize {
        self.count_kind(HandlerKind::Request)
    }

    /// Number of registered stream modules.
    pub fn stream_module_count(&self) -> usize {
        self.count_kind(HandlerKind::Stream)
    }

    fn count_kind(&self, kind: HandlerKind) -> usize {
        self.modules
            .iter()
            .filter(|entry| entry.value().kind() == kind)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use bytes::Bytes;
    use hyper::Response;

    use super::*;
    use crate::module::{BoxError, ModuleRequest, RequestModule};

    struct Noop;

    #[async_trait]
    impl RequestModule for Noop {
        async fn handle(
            &self,
            _request: ModuleRequest,
        ) -> Result<Option<Response<Bytes>>, BoxError> {
            Ok(None)
        }
    }

    fn noop_handler() -> Handler {
        Handler::Request(Arc::new(Noop))
    }

    #[test]
    fn register_and_lookup() {
        let registry = ModuleRegistry::new();
        registry.register("status", noop_handler()).unwrap();

        assert!(registry.lookup("status").is_some());
        assert!(registry.lookup("Status").is_none(), "case-sensitive");
        assert!(registry.lookup("other").is_none());
    }

    #[test]
    fn duplicate_registration_fails() {
        let registry = ModuleRegistry::new();
        registry.register("status", noop_handler()).unwrap();

        let err = registry.register("status", noop_handler()).unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateIdentifier("status".to_string())
        );
    }

    #[test]
    fn replace_overwrites() {
        let registry = ModuleRegistry::new();
        registry.register("status", noop_handler()).unwrap();

        assert!(registry.replace("status", noop_handler()).is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn empty_identifier_is_a_valid_binding() {
        let registry = ModuleRegistry::new();
        registry.register("", noop_handler()).unwrap();
        assert!(registry.lookup("").is_some());
    }

    #[test]
    fn counts_by_kind() {
        let registry = ModuleRegistry::new();
        registry.register("a", noop_handler()).unwrap();
        registry.register("b", noop_handler()).unwrap();

        assert_eq!(registry.request_module_count(), 2);
        assert_eq!(registry.stream_module_count(), 0);
    }
}
