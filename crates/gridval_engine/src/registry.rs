//! Thread-safe rule storage.
//!
//! The registry owns every registered rule and rule group and is the sole
//! authority for enumeration. Rules are stored in a flat map keyed by name
//! and additionally indexed by owning column for fast per-cell lookup.
//!
//! The flat map and the column index are guarded separately, so a reader
//! racing a writer may transiently see a rule in one but not the other.
//! The evaluator tolerates this: it re-reads both at the start of every
//! pass and never caches across calls.

use gridval_core::{EngineError, Result, Rule, RuleGroup, RuleType};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Thread-safe storage of rules and rule groups, indexed by owning column.
#[derive(Debug, Default)]
pub struct RuleRegistry {
    /// All rules by unique name
    rules: RwLock<HashMap<String, Arc<Rule>>>,

    /// All groups by unique name
    groups: RwLock<HashMap<String, Arc<RuleGroup>>>,

    /// Column name to rule names indexed under it
    column_rules: RwLock<HashMap<String, Vec<String>>>,

    /// Column name to group names attached to it
    column_groups: RwLock<HashMap<String, Vec<String>>>,

    /// Registered-rule counts by type
    type_counts: RwLock<HashMap<RuleType, usize>>,

    /// Source of generated names
    next_id: AtomicU64,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl RuleRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a rule, overwriting any rule with the same name.
    ///
    /// Rules without a name receive a generated one. Cell- and row-scope
    /// rules are indexed under every one of their columns; cross-row and
    /// dataset rules live in the flat map only.
    pub fn register(&self, rule: Rule) -> Result<bool> {
        if rule
            .indexed_columns()
            .iter()
            .any(|column| column.trim().is_empty())
        {
            return Err(EngineError::empty_column(
                rule.name.as_deref().unwrap_or("<unnamed>"),
            ));
        }

        let mut rule = rule;
        let name = match rule.name.clone() {
            Some(name) if !name.trim().is_empty() => name,
            _ => self.generate_name("rule"),
        };
        rule.name = Some(name.clone());

        // Overwrite semantics: drop every trace of the previous holder of
        // this name before inserting.
        self.unregister_rule(&name);

        let columns: Vec<String> = rule
            .indexed_columns()
            .iter()
            .map(|c| c.to_string())
            .collect();
        let rule_type = rule.rule_type;

        write(&self.rules).insert(name.clone(), Arc::new(rule));
        {
            let mut index = write(&self.column_rules);
            for column in columns {
                let entries = index.entry(column).or_default();
                if !entries.contains(&name) {
                    entries.push(name.clone());
                }
            }
        }
        *write(&self.type_counts).entry(rule_type).or_insert(0) += 1;

        debug!(rule = %name, ?rule_type, "registered rule");
        Ok(true)
    }

    /// Registers a rule group and, recursively, all of its descendants.
    ///
    /// Descendant rules are flattened into the flat map and column index;
    /// the group itself is indexed under its own column, and child groups
    /// are registered the same way. Inputs are validated up front so a
    /// rejected group is never partially registered.
    pub fn register_group(&self, group: RuleGroup) -> Result<bool> {
        validate_group(&group)?;
        self.register_group_unchecked(group)
    }

    fn register_group_unchecked(&self, group: RuleGroup) -> Result<bool> {
        let mut group = group;
        let name = match group.name.clone() {
            Some(name) if !name.trim().is_empty() => name,
            _ => self.generate_name("group"),
        };
        group.name = Some(name.clone());

        // Name unnamed children up front so the stored group and the
        // flattened registry entries agree on rule names.
        for rule in group.rules.iter_mut() {
            if rule.name.as_deref().is_none_or(|n| n.trim().is_empty()) {
                rule.name = Some(self.generate_name("rule"));
            }
        }

        for rule in group.rules.clone() {
            self.register(rule)?;
        }
        for child in group.groups.clone() {
            self.register_group_unchecked(child)?;
        }

        self.unregister_group(&name);
        {
            let mut index = write(&self.column_groups);
            let entries = index.entry(group.column.clone()).or_default();
            if !entries.contains(&name) {
                entries.push(name.clone());
            }
        }
        write(&self.groups).insert(name.clone(), Arc::new(group));

        debug!(group = %name, "registered rule group");
        Ok(true)
    }

    /// Removes every rule and group indexed under any of the given
    /// columns. Returns `Ok(false)` when nothing matched.
    pub fn remove_by_columns(&self, columns: &[&str]) -> Result<bool> {
        let mut removed = false;

        for column in columns {
            let rule_names = write(&self.column_rules).remove(*column).unwrap_or_default();
            for name in rule_names {
                removed |= self.unregister_rule(&name);
            }

            let group_names = write(&self.column_groups).remove(*column).unwrap_or_default();
            for name in group_names {
                removed |= self.unregister_group(&name);
            }
        }

        Ok(removed)
    }

    /// Removes a rule or group by exact name, scrubbing the column index.
    /// Returns `Ok(false)` when the name is unknown.
    pub fn remove_by_name(&self, name: &str) -> Result<bool> {
        let removed_rule = self.unregister_rule(name);
        let removed_group = self.unregister_group(name);
        Ok(removed_rule || removed_group)
    }

    /// Removes everything.
    pub fn clear(&self) {
        write(&self.rules).clear();
        write(&self.groups).clear();
        write(&self.column_rules).clear();
        write(&self.column_groups).clear();
        write(&self.type_counts).clear();
    }

    /// Enumerates all registered rules.
    pub fn list_all(&self) -> Result<Vec<Arc<Rule>>> {
        let mut rules: Vec<Arc<Rule>> = read(&self.rules).values().cloned().collect();
        rules.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rules)
    }

    /// Number of registered rules.
    pub fn rule_count(&self) -> usize {
        read(&self.rules).len()
    }

    /// Registered-rule counts by type.
    pub fn type_counts(&self) -> HashMap<RuleType, usize> {
        read(&self.type_counts).clone()
    }

    /// Rules indexed under a column, sorted by ascending priority.
    pub fn rules_for_column(&self, column: &str) -> Vec<Arc<Rule>> {
        let names = read(&self.column_rules)
            .get(column)
            .cloned()
            .unwrap_or_default();
        let rules = read(&self.rules);
        let mut found: Vec<Arc<Rule>> = names
            .iter()
            .filter_map(|name| rules.get(name).cloned())
            .collect();
        found.sort_by_key(|rule| rule.priority);
        found
    }

    /// Groups attached to a column, sorted by ascending priority.
    pub fn groups_for_column(&self, column: &str) -> Vec<Arc<RuleGroup>> {
        let names = read(&self.column_groups)
            .get(column)
            .cloned()
            .unwrap_or_default();
        let groups = read(&self.groups);
        let mut found: Vec<Arc<RuleGroup>> = names
            .iter()
            .filter_map(|name| groups.get(name).cloned())
            .collect();
        found.sort_by_key(|group| group.priority);
        found
    }

    /// All rules of one type, sorted by ascending priority.
    pub fn rules_of_type(&self, rule_type: RuleType) -> Vec<Arc<Rule>> {
        let mut found: Vec<Arc<Rule>> = read(&self.rules)
            .values()
            .filter(|rule| rule.rule_type == rule_type)
            .cloned()
            .collect();
        found.sort_by_key(|rule| rule.priority);
        found
    }

    fn generate_name(&self, prefix: &str) -> String {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{prefix}-{id}")
    }

    /// Drops a rule from the flat map, column index, and type counts.
    fn unregister_rule(&self, name: &str) -> bool {
        let Some(rule) = write(&self.rules).remove(name) else {
            return false;
        };

        let mut index = write(&self.column_rules);
        for column in rule.indexed_columns() {
            if let Some(entries) = index.get_mut(column) {
                entries.retain(|entry| entry != name);
                if entries.is_empty() {
                    index.remove(column);
                }
            }
        }
        drop(index);

        let mut counts = write(&self.type_counts);
        if let Some(count) = counts.get_mut(&rule.rule_type) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                counts.remove(&rule.rule_type);
            }
        }

        true
    }

    fn unregister_group(&self, name: &str) -> bool {
        let Some(group) = write(&self.groups).remove(name) else {
            return false;
        };

        let mut index = write(&self.column_groups);
        if let Some(entries) = index.get_mut(&group.column) {
            entries.retain(|entry| entry != name);
            if entries.is_empty() {
                index.remove(&group.column);
            }
        }

        true
    }
}

/// Rejects groups with empty column bindings anywhere in the tree.
fn validate_group(group: &RuleGroup) -> Result<()> {
    if group.column.trim().is_empty() {
        return Err(EngineError::empty_column(
            group.name.as_deref().unwrap_or("<unnamed>"),
        ));
    }
    for rule in &group.rules {
        if rule
            .indexed_columns()
            .iter()
            .any(|column| column.trim().is_empty())
        {
            return Err(EngineError::empty_column(
                rule.name.as_deref().unwrap_or("<unnamed>"),
            ));
        }
    }
    for child in &group.groups {
        validate_group(child)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridval_core::{rules, LogicalOperator, ValidationResult};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_registration_is_idempotent_by_name() {
        let registry = RuleRegistry::new();
        registry
            .register(rules::range("Age", 0.0, 120.0).named("age-range"))
            .unwrap();
        registry
            .register(rules::range("Age", 0.0, 150.0).named("age-range"))
            .unwrap();

        assert_eq!(registry.list_all().unwrap().len(), 1);
        assert_eq!(registry.rules_for_column("Age").len(), 1);
        assert_eq!(registry.type_counts().get(&RuleType::SingleCell), Some(&1));
    }

    #[test]
    fn test_generated_names_are_unique() {
        let registry = RuleRegistry::new();
        registry.register(rules::required("A")).unwrap();
        registry.register(rules::required("B")).unwrap();

        let names: Vec<_> = registry
            .list_all()
            .unwrap()
            .iter()
            .map(|rule| rule.name.clone().unwrap())
            .collect();
        assert_eq!(names.len(), 2);
        assert_ne!(names[0], names[1]);
    }

    #[test]
    fn test_cross_column_rule_indexed_under_every_column() {
        let registry = RuleRegistry::new();
        let rule = gridval_core::Rule::cross_column(
            vec!["Start".into(), "End".into()],
            |_| Ok(ValidationResult::success()),
        )
        .named("date-order");
        registry.register(rule).unwrap();

        assert_eq!(registry.rules_for_column("Start").len(), 1);
        assert_eq!(registry.rules_for_column("End").len(), 1);
    }

    #[test]
    fn test_remove_by_columns() {
        let registry = RuleRegistry::new();
        registry.register(rules::required("Name").named("name-req")).unwrap();
        registry.register(rules::range("Age", 0.0, 120.0).named("age-range")).unwrap();

        assert!(registry.remove_by_columns(&["Name"]).unwrap());
        assert_eq!(registry.rule_count(), 1);
        assert!(registry.rules_for_column("Name").is_empty());

        // Nothing left under that column; removal reports false.
        assert!(!registry.remove_by_columns(&["Name"]).unwrap());
    }

    #[test]
    fn test_remove_by_name_scrubs_index() {
        let registry = RuleRegistry::new();
        registry.register(rules::required("Name").named("name-req")).unwrap();

        assert!(registry.remove_by_name("name-req").unwrap());
        assert!(!registry.remove_by_name("name-req").unwrap());
        assert!(registry.rules_for_column("Name").is_empty());
        assert!(registry.type_counts().is_empty());
    }

    #[test]
    fn test_group_registration_flattens_descendants() {
        let registry = RuleRegistry::new();
        let group = gridval_core::RuleGroup::new("Code")
            .named("code-checks")
            .with_operator(LogicalOperator::Or)
            .rule(rules::equals("Code", "A".into()).named("is-a"))
            .group(
                gridval_core::RuleGroup::new("Code")
                    .named("code-fallbacks")
                    .rule(rules::equals("Code", "B".into()).named("is-b")),
            );

        registry.register_group(group).unwrap();

        assert_eq!(registry.rule_count(), 2);
        assert_eq!(registry.groups_for_column("Code").len(), 2);
        assert_eq!(registry.rules_for_column("Code").len(), 2);
    }

    #[test]
    fn test_empty_column_is_rejected() {
        let registry = RuleRegistry::new();
        let err = registry.register(rules::required("").named("broken")).unwrap_err();
        assert!(matches!(err, EngineError::EmptyColumnName { .. }));
        assert_eq!(registry.rule_count(), 0);
    }

    #[test]
    fn test_clear() {
        let registry = RuleRegistry::new();
        registry.register(rules::required("Name")).unwrap();
        registry
            .register_group(gridval_core::RuleGroup::new("Code").rule(rules::required("Code")))
            .unwrap();

        registry.clear();
        assert_eq!(registry.rule_count(), 0);
        assert!(registry.groups_for_column("Code").is_empty());
        assert!(registry.list_all().unwrap().is_empty());
    }

    #[test]
    fn test_rules_sorted_by_priority() {
        let registry = RuleRegistry::new();
        registry
            .register(rules::required("Age").named("late").with_priority(900))
            .unwrap();
        registry
            .register(rules::range("Age", 0.0, 120.0).named("early").with_priority(10))
            .unwrap();

        let rules = registry.rules_for_column("Age");
        assert_eq!(rules[0].name.as_deref(), Some("early"));
        assert_eq!(rules[1].name.as_deref(), Some("late"));
    }
}
