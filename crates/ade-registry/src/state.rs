//! Run-scoped key/value store shared by the extensions of one run.

use std::collections::BTreeMap;

use serde_json::Value;

/// Values keyed by extension namespace, then key.
///
/// Owned by exactly one run; detectors see it read-only, other callables get a
/// [`StateScope`] that can only write their own namespace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunState {
    namespaces: BTreeMap<String, BTreeMap<String, Value>>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, namespace: &str, key: &str) -> Option<&Value> {
        self.namespaces.get(namespace)?.get(key)
    }

    pub fn namespace(&self, namespace: &str) -> Option<&BTreeMap<String, Value>> {
        self.namespaces.get(namespace)
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.values().all(BTreeMap::is_empty)
    }

    /// Write handle bound to one namespace.
    pub fn scope<'a>(&'a mut self, namespace: &'a str) -> StateScope<'a> {
        StateScope {
            state: self,
            namespace,
        }
    }
}

#[derive(Debug)]
pub struct StateScope<'a> {
    state: &'a mut RunState,
    namespace: &'a str,
}

impl StateScope<'_> {
    pub fn namespace(&self) -> &str {
        self.namespace
    }

    /// Reads from the caller's own namespace.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.state.get(self.namespace, key)
    }

    /// Reads from any namespace.
    pub fn read(&self, namespace: &str, key: &str) -> Option<&Value> {
        self.state.get(namespace, key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.state
            .namespaces
            .entry(self.namespace.to_string())
            .or_default()
            .insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.state.namespaces.get_mut(self.namespace)?.remove(key)
    }

    /// Read-only view of the whole store.
    pub fn view(&self) -> &RunState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scopes_write_only_their_namespace() {
        let mut state = RunState::new();
        state.scope("counter").set("seen", json!(2));
        {
            let mut other = state.scope("other");
            assert_eq!(other.read("counter", "seen"), Some(&json!(2)));
            assert_eq!(other.get("seen"), None);
            other.set("seen", json!(5));
        }
        assert_eq!(state.get("counter", "seen"), Some(&json!(2)));
        assert_eq!(state.get("other", "seen"), Some(&json!(5)));
    }

    #[test]
    fn remove_from_own_namespace() {
        let mut state = RunState::new();
        let mut scope = state.scope("a");
        scope.set("k", json!("v"));
        assert_eq!(scope.remove("k"), Some(json!("v")));
        assert!(state.is_empty());
    }
}
