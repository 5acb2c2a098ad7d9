//! Persisted alert-rule schema.
//!
//! Rules arrive from the external CRUD collaborator (YAML documents in
//! the file-backed source). A rule matches through either a single
//! simple matcher or an arbitrarily nested condition tree.

mod conditions;
mod rule;
mod suppress;

pub use conditions::{
    Condition, ConditionGroup, ConditionNode, ConditionValue, Field, GroupLogic, Operator,
    RuleConditions,
};
pub use rule::{Rule, SimpleMatcher, Visibility};
pub use suppress::SuppressionWindow;

pub(crate) use suppress::any_active;

#[cfg(test)]
mod tests;
