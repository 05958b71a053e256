//! In-memory remote backend
//!
//! Models realms as namespaces with an attribute bag each. Entities inside
//! a realm are not tracked; operations on them only require the realm.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;

use realmshift_core::{AttributeStore, Operation, OperationError, OperationExecutor};

type Attributes = HashMap<String, String>;

/// Remote target held entirely in memory, with failure injection
#[derive(Debug, Default)]
pub struct InMemoryTarget {
    namespaces: RwLock<HashMap<String, Attributes>>,
    applied: Mutex<Vec<String>>,
    failing_operations: Vec<String>,
    failing_writes: Vec<String>,
    failing_reads: Vec<String>,
}

impl InMemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an existing, empty namespace
    pub fn with_namespace(self, namespace: impl Into<String>) -> Self {
        self.namespaces
            .write()
            .insert(namespace.into(), Attributes::new());
        self
    }

    /// Reject every operation whose description contains `pattern`
    pub fn fail_operations_matching(mut self, pattern: impl Into<String>) -> Self {
        self.failing_operations.push(pattern.into());
        self
    }

    /// Reject writes of the given attribute key in every namespace
    pub fn fail_attribute_writes(mut self, key: impl Into<String>) -> Self {
        self.failing_writes.push(key.into());
        self
    }

    /// Reject attribute reads of the given namespace
    pub fn fail_attribute_reads(mut self, namespace: impl Into<String>) -> Self {
        self.failing_reads.push(namespace.into());
        self
    }

    /// Existing namespaces, sorted
    pub fn namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self.namespaces.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn attribute(&self, namespace: &str, key: &str) -> Option<String> {
        self.namespaces
            .read()
            .get(namespace)
            .and_then(|attributes| attributes.get(key).cloned())
    }

    /// Descriptions of successfully applied operations, in order
    pub fn applied_operations(&self) -> Vec<String> {
        self.applied.lock().clone()
    }

    fn missing_namespace(namespace: &str) -> OperationError {
        OperationError::new(format!("404 Not Found: realm '{}' does not exist", namespace))
    }
}

impl AttributeStore for InMemoryTarget {
    fn namespace_exists(&self, namespace: &str) -> bool {
        self.namespaces.read().contains_key(namespace)
    }

    fn attributes(&self, namespace: &str) -> Result<Attributes, OperationError> {
        if self.failing_reads.iter().any(|ns| ns == namespace) {
            return Err(OperationError::new("503 Service Unavailable"));
        }

        self.namespaces
            .read()
            .get(namespace)
            .cloned()
            .ok_or_else(|| Self::missing_namespace(namespace))
    }

    fn set_attribute(&self, namespace: &str, key: &str, value: &str) -> Result<(), OperationError> {
        if self.failing_writes.iter().any(|k| k == key) {
            return Err(OperationError::new("500 Internal Server Error"));
        }

        let mut namespaces = self.namespaces.write();
        let attributes = namespaces
            .get_mut(namespace)
            .ok_or_else(|| Self::missing_namespace(namespace))?;
        attributes.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl OperationExecutor for InMemoryTarget {
    fn apply(&self, operation: &Operation) -> Result<(), OperationError> {
        let description = operation.describe();

        if self
            .failing_operations
            .iter()
            .any(|pattern| description.contains(pattern.as_str()))
        {
            return Err(OperationError::new(format!("400 Bad Request: {}", description)));
        }

        {
            let mut namespaces = self.namespaces.write();
            match operation {
                Operation::CreateRealm(spec) => {
                    if namespaces.contains_key(&spec.name) {
                        return Err(OperationError::new(format!(
                            "409 Conflict: realm '{}' already exists",
                            spec.name
                        )));
                    }
                    namespaces.insert(spec.name.clone(), Attributes::new());
                }
                Operation::DeleteRealm(realm) => {
                    if namespaces.remove(&realm.name).is_none() {
                        return Err(Self::missing_namespace(&realm.name));
                    }
                }
                other => {
                    let namespace = other.target_namespace().unwrap_or_default();
                    if !namespaces.contains_key(namespace) {
                        return Err(Self::missing_namespace(namespace));
                    }
                }
            }
        }

        tracing::debug!("Applied operation: {}", description);
        self.applied.lock().push(description);
        Ok(())
    }
}
