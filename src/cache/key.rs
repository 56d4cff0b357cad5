// Cache keys for bound GraphQL operations.
// A key is the operation name plus the exact variable values it was bound with.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde_json::Value;

/// Identity of a bound operation.
///
/// Two keys are equal exactly when the operation name and every variable
/// value match. Variables live in a BTreeMap, so equality and hashing do
/// not depend on the order values were supplied in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationKey {
    pub operation: String,
    pub variables: BTreeMap<String, Value>,
}

impl OperationKey {
    pub fn new(operation: &str, variables: BTreeMap<String, Value>) -> Self {
        Self {
            operation: operation.to_string(),
            variables,
        }
    }
}

impl Hash for OperationKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.operation.hash(state);
        // Values hash through their canonical JSON text; the sorted map
        // order keeps this consistent with equality.
        for (name, value) in &self.variables {
            name.hash(state);
            value.to_string().hash(state);
        }
    }
}
