// Cache module.
// In-memory read-through cache of GraphQL responses, keyed by operation.

pub mod key;
pub mod store;

pub use key::OperationKey;
pub use store::ResponseCache;
