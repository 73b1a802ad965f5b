//! Playbook registry
//!
//! Constructed explicitly and passed by reference; there is no global
//! instance. Iteration order is by playbook id.

use crate::playbook::Playbook;
use remedy_core::Category;
use std::collections::BTreeMap;

/// Playbooks by id
#[derive(Debug, Clone, Default)]
pub struct PlaybookRegistry {
    playbooks: BTreeMap<String, Playbook>,
}

impl PlaybookRegistry {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            playbooks: BTreeMap::new(),
        }
    }

    /// Create registry with the built-in playbooks
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Playbook::redispatch_workflow());
        registry.register(Playbook::verify_deployment());
        registry
    }

    /// Register a playbook, replacing one with the same id
    pub fn register(&mut self, playbook: Playbook) -> Option<Playbook> {
        self.playbooks.insert(playbook.id.clone(), playbook)
    }

    /// Playbook by id
    #[inline]
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Playbook> {
        self.playbooks.get(id)
    }

    /// Playbooks applicable to `category`, empty when none match
    #[must_use]
    pub fn for_category(&self, category: Category) -> Vec<&Playbook> {
        self.playbooks
            .values()
            .filter(|p| p.applies_to(category))
            .collect()
    }

    /// All playbooks ordered by id
    #[inline]
    #[must_use]
    pub fn all(&self) -> Vec<&Playbook> {
        self.playbooks.values().collect()
    }

    /// Check if a playbook id is registered
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.playbooks.contains_key(id)
    }

    /// Get number of registered playbooks
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.playbooks.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.playbooks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playbook::{REDISPATCH_WORKFLOW, VERIFY_DEPLOYMENT};

    #[test]
    fn defaults_cover_workflow_and_verification() {
        let registry = PlaybookRegistry::with_defaults();
        assert_eq!(registry.len(), 2);
        assert!(registry.contains(REDISPATCH_WORKFLOW));
        assert!(registry.contains(VERIFY_DEPLOYMENT));
        assert!(!registry.contains("nope"));
    }

    #[test]
    fn for_category_filters() {
        let registry = PlaybookRegistry::with_defaults();
        let ids: Vec<&str> = registry
            .for_category(Category::AlbTargetUnhealthy)
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(ids, vec![VERIFY_DEPLOYMENT]);
        assert!(registry.for_category(Category::Unknown).is_empty());
        assert!(registry.for_category(Category::IamPolicyValidationFailed).is_empty());
    }

    #[test]
    fn register_replaces_same_id() {
        let mut registry = PlaybookRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.register(Playbook::new("p", "1.0.0")).is_none());
        let previous = registry.register(Playbook::new("p", "2.0.0"));
        assert_eq!(previous.map(|p| p.version), Some("1.0.0".to_string()));
        assert_eq!(registry.get("p").map(|p| p.version.as_str()), Some("2.0.0"));
        assert_eq!(registry.all().len(), 1);
    }
}
