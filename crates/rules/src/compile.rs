//! Rule compilation: one static pass from a persisted [`Rule`] to an
//! optimized [`CompiledRule`].
//!
//! Compilation is pure and deterministic, does no I/O, and never fails:
//! an invalid regex pattern drops only that pattern from the table (the
//! leaf then evaluates false) and is logged, never the rule or the set.

use std::collections::HashMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use skywarden_core::AircraftSnapshot;

use crate::schema::{
    Condition, ConditionGroup, ConditionNode, ConditionValue, Field, GroupLogic, Operator, Rule,
};

/// Fast pre-filter hints derived from the parts of a rule that every
/// match path requires. A hint may only reject an aircraft that cannot
/// possibly satisfy the rule; uncertain trees produce no hints.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FastPathHints {
    pub requires_military: bool,
    pub requires_position: bool,
    pub requires_altitude: bool,
    pub requires_speed: bool,
    /// Exact ICAO the rule targets, lowercase.
    pub target_icao: Option<String>,
    /// Callsign prefix required by every match path.
    pub callsign_prefix: Option<String>,
    /// Exact squawk the rule targets.
    pub target_squawk: Option<String>,
}

impl FastPathHints {
    /// Cheap reject before full evaluation.
    pub fn accepts(&self, snapshot: &AircraftSnapshot) -> bool {
        if self.requires_military && !snapshot.military {
            return false;
        }
        if self.requires_position && !snapshot.has_position() {
            return false;
        }
        if self.requires_altitude && snapshot.altitude_baro.is_none() {
            return false;
        }
        if self.requires_speed && snapshot.ground_speed.is_none() {
            return false;
        }
        if let Some(target) = &self.target_icao {
            if !snapshot.icao_hex.eq_ignore_ascii_case(target) {
                return false;
            }
        }
        if let Some(prefix) = &self.callsign_prefix {
            match snapshot.trimmed_callsign() {
                Some(callsign) if callsign.starts_with(prefix.as_str()) => {}
                _ => return false,
            }
        }
        if let Some(squawk) = &self.target_squawk {
            if snapshot.squawk.as_deref() != Some(squawk.as_str()) {
                return false;
            }
        }
        true
    }
}

/// A rule pre-analyzed for evaluation: hints plus a pattern table of
/// compiled regexes. The table is rebuilt after a shared-cache load
/// ([`CompiledRule::rehydrate`]) since regexes do not serialize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledRule {
    pub rule: Rule,
    pub hints: FastPathHints,
    #[serde(skip)]
    patterns: HashMap<String, Regex>,
}

impl CompiledRule {
    /// Look up a pre-compiled regex by its pattern text.
    pub fn pattern(&self, source: &str) -> Option<&Regex> {
        self.patterns.get(source)
    }

    /// Rebuild the regex table after deserialization.
    pub fn rehydrate(&mut self) {
        self.patterns = compile_patterns(&self.rule);
    }
}

/// Compile one rule. Infallible by design: everything that can go wrong
/// degrades to a weaker (but still correct) compiled form.
pub fn compile(rule: Rule) -> CompiledRule {
    let hints = derive_hints(&rule);
    let patterns = compile_patterns(&rule);
    CompiledRule {
        rule,
        hints,
        patterns,
    }
}

/// Compile a whole set, sorted by ascending rule id for deterministic
/// evaluation order.
pub fn compile_set(rules: Vec<Rule>) -> Vec<CompiledRule> {
    let mut compiled: Vec<CompiledRule> = rules.into_iter().map(compile).collect();
    compiled.sort_by_key(|c| c.rule.id);
    compiled
}

// ── Hint derivation ─────────────────────────────────────────────────

/// Leaves that every match path must satisfy: the simple matcher, or
/// leaves reachable through AND-only logic from the tree root. An OR
/// anywhere above a leaf makes it optional, so it contributes nothing.
fn required_leaves(rule: &Rule) -> Vec<Condition> {
    let mut leaves = Vec::new();

    if let Some(simple) = &rule.simple {
        leaves.push(Condition {
            field: simple.field,
            operator: simple.operator,
            value: simple.value.clone(),
        });
    }

    if let Some(conditions) = &rule.conditions {
        if conditions.logic == GroupLogic::And {
            for group in &conditions.groups {
                collect_required(group, &mut leaves);
            }
        }
    }

    leaves
}

fn collect_required(group: &ConditionGroup, out: &mut Vec<Condition>) {
    if group.logic != GroupLogic::And {
        return;
    }
    for node in &group.conditions {
        match node {
            ConditionNode::Leaf(c) => out.push(c.clone()),
            ConditionNode::Group(g) => collect_required(g, out),
        }
    }
}

fn derive_hints(rule: &Rule) -> FastPathHints {
    let mut hints = FastPathHints::default();

    for leaf in required_leaves(rule) {
        match (leaf.field, leaf.operator, &leaf.value) {
            (Field::Military, Operator::Eq, ConditionValue::Flag(true)) => {
                hints.requires_military = true;
            }
            (Field::Icao, Operator::Eq, ConditionValue::Text(icao)) => {
                hints.target_icao = Some(icao.to_ascii_lowercase());
            }
            (Field::Callsign, Operator::StartsWith, ConditionValue::Text(prefix)) => {
                hints.callsign_prefix = Some(prefix.clone());
            }
            (Field::Squawk, Operator::Eq, ConditionValue::Text(squawk)) => {
                hints.target_squawk = Some(squawk.clone());
            }
            (Field::Altitude, _, _) => hints.requires_altitude = true,
            (Field::GroundSpeed, _, _) => hints.requires_speed = true,
            (Field::Latitude | Field::Longitude, _, _) => hints.requires_position = true,
            _ => {}
        }
    }

    hints
}

// ── Regex table ─────────────────────────────────────────────────────

fn compile_patterns(rule: &Rule) -> HashMap<String, Regex> {
    let mut patterns = HashMap::new();
    let mut add = |condition: &Condition| {
        if condition.operator != Operator::Regex {
            return;
        }
        let Some(source) = condition.value.as_text() else {
            warn!(
                rule_id = rule.id,
                field = condition.field.as_str(),
                "regex operator needs a text operand; leaf will not match"
            );
            return;
        };
        if patterns.contains_key(source) {
            return;
        }
        match Regex::new(source) {
            Ok(regex) => {
                patterns.insert(source.to_string(), regex);
            }
            Err(e) => {
                warn!(
                    rule_id = rule.id,
                    pattern = source,
                    error = %e,
                    "invalid regex dropped; leaf will not match"
                );
            }
        }
    };

    if let Some(simple) = &rule.simple {
        add(&Condition {
            field: simple.field,
            operator: simple.operator,
            value: simple.value.clone(),
        });
    }
    if let Some(conditions) = &rule.conditions {
        conditions.for_each_leaf(&mut add);
    }

    patterns
}
