//! Condition tree: closed field/operator enums and nested AND/OR groups.

use serde::{Deserialize, Serialize};

/// Snapshot fields a condition can reference.
///
/// A closed set: an unknown field name fails deserialization at the rule
/// source boundary instead of surfacing as a runtime surprise.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Altitude,
    GroundSpeed,
    VerticalRate,
    Track,
    Squawk,
    Callsign,
    Icao,
    Military,
    Latitude,
    Longitude,
    /// Derived: squawking 7500, 7600, or 7700.
    Emergency,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Altitude => "altitude",
            Field::GroundSpeed => "ground_speed",
            Field::VerticalRate => "vertical_rate",
            Field::Track => "track",
            Field::Squawk => "squawk",
            Field::Callsign => "callsign",
            Field::Icao => "icao",
            Field::Military => "military",
            Field::Latitude => "latitude",
            Field::Longitude => "longitude",
            Field::Emergency => "emergency",
        }
    }
}

/// Leaf comparison operators.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Contains,
    StartsWith,
    Regex,
    In,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Lt => "lt",
            Operator::Gt => "gt",
            Operator::Le => "le",
            Operator::Ge => "ge",
            Operator::Contains => "contains",
            Operator::StartsWith => "starts_with",
            Operator::Regex => "regex",
            Operator::In => "in",
        }
    }
}

/// Condition operand. Untagged: YAML scalars map naturally
/// (`true` → flag, `3000` → number, `"RCH"` → text, list → list).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ConditionValue {
    Flag(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl ConditionValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ConditionValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ConditionValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for ConditionValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConditionValue::Flag(b) => write!(f, "{}", b),
            ConditionValue::Number(n) => write!(f, "{}", n),
            ConditionValue::Text(s) => write!(f, "{}", s),
            ConditionValue::List(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}

/// One leaf check: `field operator value`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Condition {
    pub field: Field,
    pub operator: Operator,
    pub value: ConditionValue,
}

impl Condition {
    /// Short human-readable form used in matched-condition reporting.
    pub fn describe(&self) -> String {
        format!("{} {} {}", self.field.as_str(), self.operator.as_str(), self.value)
    }
}

/// How members of a group combine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GroupLogic {
    And,
    Or,
}

/// Group member: a leaf condition or a nested group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ConditionNode {
    Leaf(Condition),
    Group(ConditionGroup),
}

/// Conditions combined with AND/OR; groups nest arbitrarily.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConditionGroup {
    pub logic: GroupLogic,
    pub conditions: Vec<ConditionNode>,
}

/// Root of a complex rule's condition tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RuleConditions {
    pub logic: GroupLogic,
    pub groups: Vec<ConditionGroup>,
}

impl RuleConditions {
    /// Visit every leaf condition in the tree.
    pub fn for_each_leaf(&self, f: &mut impl FnMut(&Condition)) {
        for group in &self.groups {
            visit_group(group, f);
        }
    }
}

fn visit_group(group: &ConditionGroup, f: &mut impl FnMut(&Condition)) {
    for node in &group.conditions {
        match node {
            ConditionNode::Leaf(c) => f(c),
            ConditionNode::Group(g) => visit_group(g, f),
        }
    }
}
