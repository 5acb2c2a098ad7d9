//! Root rule document and its metadata fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use skywarden_core::Severity;

use super::conditions::{Field, Operator, ConditionValue, RuleConditions};
use super::suppress::SuppressionWindow;

/// A persisted alert rule as delivered by the rule-CRUD collaborator.
///
/// Exactly one of `simple` or `conditions` is expected; a rule carrying
/// neither never matches and is rejected by [`Rule::validate`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    pub id: u64,
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Single-field matcher for the common one-liner rules.
    #[serde(default)]
    pub simple: Option<SimpleMatcher>,

    /// Nested condition tree for everything else.
    #[serde(default)]
    pub conditions: Option<RuleConditions>,

    #[serde(default)]
    pub priority: Severity,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Rule is inert before this instant.
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,

    /// Rule is inert from this instant on.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,

    /// Minimum seconds between firings for the same aircraft.
    #[serde(default = "default_cooldown")]
    pub cooldown_seconds: u64,

    /// Recurring local-time windows during which the rule must not fire.
    #[serde(default)]
    pub suppression_windows: Vec<SuppressionWindow>,

    #[serde(default)]
    pub visibility: Visibility,

    #[serde(default)]
    pub owner: Option<String>,
}

fn default_enabled() -> bool {
    true
}

fn default_cooldown() -> u64 {
    300
}

impl Rule {
    /// Structural validation applied at the rule-source boundary.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err(format!("rule {} has an empty name", self.id));
        }
        if self.simple.is_none() && self.conditions.is_none() {
            return Err(format!("rule {} has no matcher", self.id));
        }
        if let (Some(starts), Some(expires)) = (self.starts_at, self.expires_at) {
            if expires <= starts {
                return Err(format!("rule {} expires before it starts", self.id));
            }
        }
        for window in &self.suppression_windows {
            window.validate().map_err(|e| format!("rule {}: {}", self.id, e))?;
        }
        Ok(())
    }

    /// Whether the rule is inside its optional schedule bounds.
    pub fn is_scheduled(&self, now: DateTime<Utc>) -> bool {
        if let Some(starts) = self.starts_at {
            if now < starts {
                return false;
            }
        }
        if let Some(expires) = self.expires_at {
            if now >= expires {
                return false;
            }
        }
        true
    }
}

/// The `{type, operator, value}` one-liner matcher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SimpleMatcher {
    #[serde(rename = "type")]
    pub field: Field,
    pub operator: Operator,
    pub value: ConditionValue,
}

/// Who sees a rule besides the engine itself.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Shared,
    Private,
}
