//! Alert rule storage.

use std::sync::Arc;

use parking_lot::RwLock;

use super::types::AlertRule;

/// Manages the set of configured alert rules.
///
/// Rules are identified by name for configuration purposes; their incident
/// identity is the content-derived key from
/// [`AlertRule::rule_key`](super::AlertRule::rule_key), so editing a rule's
/// name or severity never orphans an open incident.
#[derive(Clone, Default)]
pub struct AlertRuleStore {
    rules: Arc<RwLock<Vec<AlertRule>>>,
}

impl AlertRuleStore {
    /// Creates an empty rule store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a new alert rule.
    ///
    /// Returns `true` if the rule was added, `false` if a rule with the same
    /// name already exists.
    #[must_use]
    pub fn add_rule(&self, rule: AlertRule) -> bool {
        let mut rules = self.rules.write();
        if rules.iter().any(|r| r.name == rule.name) {
            return false;
        }
        rules.push(rule);
        true
    }

    /// Replaces the rule with the same name.
    ///
    /// Returns `true` if a rule was updated, `false` if no rule with the
    /// given name exists.
    #[must_use]
    pub fn update_rule(&self, rule: AlertRule) -> bool {
        let mut rules = self.rules.write();
        if let Some(existing) = rules.iter_mut().find(|r| r.name == rule.name) {
            *existing = rule;
            true
        } else {
            false
        }
    }

    /// Removes a rule by name.
    ///
    /// Returns `true` if the rule was removed.
    #[must_use]
    pub fn remove_rule(&self, name: &str) -> bool {
        let mut rules = self.rules.write();
        let initial_len = rules.len();
        rules.retain(|r| r.name != name);
        rules.len() != initial_len
    }

    /// Toggles a rule's enabled status.
    ///
    /// Returns the new enabled state, or `None` if the rule doesn't exist.
    #[must_use]
    pub fn toggle_rule(&self, name: &str) -> Option<bool> {
        let mut rules = self.rules.write();
        if let Some(rule) = rules.iter_mut().find(|r| r.name == name) {
            rule.enabled = !rule.enabled;
            Some(rule.enabled)
        } else {
            None
        }
    }

    /// Gets all rules.
    #[must_use]
    pub fn rules(&self) -> Vec<AlertRule> {
        self.rules.read().clone()
    }

    /// Gets all enabled rules.
    #[must_use]
    pub fn enabled_rules(&self) -> Vec<AlertRule> {
        self.rules.read().iter().filter(|r| r.enabled).cloned().collect()
    }

    /// Gets a specific rule by name.
    #[must_use]
    pub fn rule(&self, name: &str) -> Option<AlertRule> {
        self.rules.read().iter().find(|r| r.name == name).cloned()
    }
}
