use serde::{Deserialize, Serialize};

use super::storage::StoreError;

/// Rule set holding the ordered validation scripts.
pub const VALIDATION_RULE_SET: &str = "validation";
/// Rule set holding message-body scripts, looked up by id.
pub const NOTIFICATION_RULE_SET: &str = "notification";

/// A named script body kept in the rule store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub id: String,
    pub body: String,
}

impl RuleDefinition {
    pub fn new(id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            body: body.into(),
        }
    }
}

/// Source of active rule scripts.
pub trait RuleStore: Send + Sync {
    /// Active rules of a set, in evaluation order.
    fn active_rules(&self, rule_set: &str) -> Result<Vec<RuleDefinition>, StoreError>;
    /// A single active rule by id, regardless of set.
    fn find_active(&self, id: &str) -> Result<Option<RuleDefinition>, StoreError>;
}
