//! Process-global component registry.

use std::sync::Arc;

use dashmap::DashMap;
use relay_core::ComponentId;

use crate::component::Component;
use crate::error::ComponentError;

/// Thread-safe registry of components, keyed by component id.
///
/// Components are registered once at process startup and looked up on every
/// action invocation. Uses `DashMap` for lock-free concurrent access.
#[derive(Default)]
pub struct ComponentRegistry {
    components: DashMap<ComponentId, Arc<dyn Component>>,
}

impl ComponentRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component.
    ///
    /// If a component with the same id already exists, it is replaced.
    pub fn register(&self, component: Arc<dyn Component>) {
        let id = component.id().clone();
        tracing::info!(component_id = %id, "registered component");
        self.components.insert(id, component);
    }

    /// Look up a component by id.
    pub fn get(&self, id: &ComponentId) -> Result<Arc<dyn Component>, ComponentError> {
        self.components
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ComponentError::not_found("component", id.as_str()))
    }

    /// Whether a component is registered under the given id.
    #[must_use]
    pub fn contains(&self, id: &ComponentId) -> bool {
        self.components.contains_key(id)
    }

    /// Number of registered components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Ids of all registered components.
    #[must_use]
    pub fn ids(&self) -> Vec<ComponentId> {
        self.components.iter().map(|e| e.key().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::PassthroughComponent;
    use pretty_assertions::assert_eq;

    #[test]
    fn register_and_lookup() {
        let registry = ComponentRegistry::new();
        registry.register(Arc::new(PassthroughComponent::new()));

        let id = ComponentId::new("core.util.passthrough");
        assert!(registry.contains(&id));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&id).unwrap().id(), &id);
    }

    #[test]
    fn lookup_missing_is_not_found() {
        let registry = ComponentRegistry::new();
        let err = registry.get(&ComponentId::new("ghost")).unwrap_err();
        assert!(matches!(err, ComponentError::NotFound { .. }));
        assert_eq!(err.to_string(), "component not found: ghost");
    }

    #[test]
    fn register_replaces_existing() {
        let registry = ComponentRegistry::new();
        registry.register(Arc::new(PassthroughComponent::new()));
        registry.register(Arc::new(PassthroughComponent::new()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn empty_registry() {
        let registry = ComponentRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.ids().is_empty());
    }
}
