//! Ports to the remote identity-management backend
//!
//! The migrator never talks to the backend directly. It only needs a
//! generic attribute bag per namespace for its ledger and a way to apply
//! operations; both are provided by implementations of these traits.

use std::collections::HashMap;

use crate::error::OperationError;
use crate::model::Operation;

/// Generic key-value attribute storage on remote namespaces
///
/// Backs the migration ledger. Calls are blocking and are issued one at a
/// time.
pub trait AttributeStore {
    /// Whether the namespace currently exists on the remote side
    fn namespace_exists(&self, namespace: &str) -> bool;

    /// All attributes of an existing namespace
    fn attributes(&self, namespace: &str) -> Result<HashMap<String, String>, OperationError>;

    /// Create or overwrite a single attribute
    fn set_attribute(&self, namespace: &str, key: &str, value: &str)
        -> Result<(), OperationError>;
}

/// Applies operations against the remote backend
pub trait OperationExecutor: AttributeStore {
    /// Apply one operation, returning once the remote side has answered
    fn apply(&self, operation: &Operation) -> Result<(), OperationError>;
}
