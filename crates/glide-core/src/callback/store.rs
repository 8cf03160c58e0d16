use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};

use serde_json::Value;

use super::Target;
use crate::layout::Layout;

/// Current attribute values of the identified layout nodes.
///
/// Writes of one callback invocation land under a single write lock, so
/// readers never observe a partially applied result.
#[derive(Debug, Default)]
pub struct AttributeStore {
    values: RwLock<HashMap<Target, Value>>,
}

impl AttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with the explicitly set attributes of every identified node.
    pub fn from_layout(layout: &Layout) -> Self {
        let mut values = HashMap::new();
        for node in layout.walk() {
            let Some(id) = node.id() else { continue };
            for (attribute, value) in node.initial_attributes() {
                values.insert(Target::new(id, attribute), value);
            }
        }
        Self { values: RwLock::new(values) }
    }

    pub fn get(&self, target: &Target) -> Option<Value> {
        self.read().get(target).cloned()
    }

    /// Every stored value, ordered by target.
    pub fn snapshot(&self) -> BTreeMap<Target, Value> {
        self.read().iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    pub fn set(&self, target: Target, value: Value) {
        self.write().insert(target, value);
    }

    /// Current values of `targets`, `null` for unset ones.
    pub fn gather(&self, targets: &[Target]) -> Vec<Value> {
        let values = self.read();
        targets.iter().map(|t| values.get(t).cloned().unwrap_or(Value::Null)).collect()
    }

    pub fn apply(&self, writes: &[(Target, Value)]) {
        let mut values = self.write();
        for (target, value) in writes {
            values.insert(target.clone(), value.clone());
        }
    }

    /// Apply `writes` only if `current()` still holds once the write lock
    /// is taken. Returns whether anything was written.
    pub fn apply_if(&self, writes: &[(Target, Value)], current: impl FnOnce() -> bool) -> bool {
        let mut values = self.write();
        if !current() {
            return false;
        }
        for (target, value) in writes {
            values.insert(target.clone(), value.clone());
        }
        true
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<Target, Value>> {
        self.values.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<Target, Value>> {
        self.values.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Container, Leaf};
    use serde_json::json;

    #[test]
    fn seeded_from_layout() {
        let layout = Layout::assemble(
            Container::new("div").id("page").class_name("wide").child(Leaf::new("p").id("label").text("hi")),
        )
        .unwrap();
        let store = AttributeStore::from_layout(&layout);
        assert_eq!(store.get(&Target::new("label", "text")), Some(json!("hi")));
        assert_eq!(store.get(&Target::new("page", "className")), Some(json!("wide")));
        assert_eq!(store.get(&Target::new("page", "style")), None);
    }

    #[test]
    fn gather_fills_unset_with_null() {
        let store = AttributeStore::new();
        store.set(Target::new("a", "x"), json!(1));
        let got = store.gather(&[Target::new("a", "x"), Target::new("a", "y")]);
        assert_eq!(got, [json!(1), Value::Null]);
    }

    #[test]
    fn conditional_apply() {
        let store = AttributeStore::new();
        let writes = [(Target::new("a", "x"), json!(1)), (Target::new("b", "y"), json!(2))];
        assert!(!store.apply_if(&writes, || false));
        assert!(store.snapshot().is_empty());
        assert!(store.apply_if(&writes, || true));
        assert_eq!(store.snapshot().len(), 2);
    }
}
