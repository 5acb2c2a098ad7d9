//! Per-tick rule matching against aircraft snapshots.
//!
//! For each aircraft and each compiled rule (ascending rule id) the
//! evaluator checks, in order: schedule bounds, suppression windows,
//! fast-path hints, the full condition tree, and finally the
//! `(rule_id, icao)` cooldown. Matches from different rules against the
//! same aircraft are independent; there is no cross-rule dedup.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};

use skywarden_core::{AircraftSnapshot, AlertMatch, CooldownLedger};

use crate::compile::CompiledRule;
use crate::schema::{
    any_active, Condition, ConditionGroup, ConditionNode, ConditionValue, Field, GroupLogic,
    Operator,
};

/// Cooldown key: one rule against one airframe.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlertKey {
    pub rule_id: u64,
    pub icao_hex: String,
}

/// Stateful rule matcher; owns the per-(rule, aircraft) cooldown ledger.
pub struct RuleEvaluator {
    cooldowns: CooldownLedger<AlertKey>,
}

impl RuleEvaluator {
    pub fn new() -> Self {
        Self {
            cooldowns: CooldownLedger::new(),
        }
    }

    /// Match every aircraft against every rule for one tick.
    ///
    /// `rules` is expected in ascending rule-id order (the cache
    /// compiles it that way); `local_now` is deployment-local wall
    /// clock for suppression windows.
    pub fn scan<'a>(
        &mut self,
        aircraft: impl IntoIterator<Item = &'a AircraftSnapshot>,
        rules: &[CompiledRule],
        now: DateTime<Utc>,
        local_now: NaiveDateTime,
    ) -> Vec<AlertMatch> {
        let mut matches = Vec::new();

        for snapshot in aircraft {
            for compiled in rules {
                let rule = &compiled.rule;

                if !rule.is_scheduled(now) {
                    continue;
                }
                if any_active(&rule.suppression_windows, local_now) {
                    continue;
                }
                if !compiled.hints.accepts(snapshot) {
                    continue;
                }
                let Some(matched_conditions) = evaluate(compiled, snapshot) else {
                    continue;
                };

                let key = AlertKey {
                    rule_id: rule.id,
                    icao_hex: snapshot.icao_hex.clone(),
                };
                let window = Duration::seconds(rule.cooldown_seconds as i64);
                if !self.cooldowns.try_fire(key, window, now) {
                    continue;
                }

                matches.push(AlertMatch {
                    rule_id: rule.id,
                    rule_name: rule.name.clone(),
                    priority: rule.priority,
                    snapshot: snapshot.clone(),
                    matched_conditions,
                    timestamp: now,
                });
            }
        }

        // Dead keys cost memory forever on a busy feed; sweep anything
        // older than twice the longest configured cooldown.
        let longest = rules
            .iter()
            .map(|r| r.rule.cooldown_seconds)
            .max()
            .unwrap_or(0)
            .max(3_600);
        self.cooldowns
            .evict_expired(Duration::seconds(longest as i64 * 2), now);

        matches
    }

    /// Live cooldown entries, for status reporting.
    pub fn cooldown_entries(&self) -> usize {
        self.cooldowns.len()
    }
}

impl Default for RuleEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

// ── Condition evaluation ────────────────────────────────────────────

/// Full evaluation. Returns the descriptions of the leaves that held
/// when the rule matched, `None` otherwise.
fn evaluate(compiled: &CompiledRule, snapshot: &AircraftSnapshot) -> Option<Vec<String>> {
    let rule = &compiled.rule;

    if let Some(simple) = &rule.simple {
        let condition = Condition {
            field: simple.field,
            operator: simple.operator,
            value: simple.value.clone(),
        };
        if !eval_leaf(&condition, snapshot, compiled) {
            return None;
        }
        return Some(vec![condition.describe()]);
    }

    let conditions = rule.conditions.as_ref()?;
    let matched = combine(
        conditions.logic,
        conditions.groups.iter(),
        |group| eval_group(group, snapshot, compiled),
    );
    if !matched {
        return None;
    }

    // Report which leaves held; on an OR tree this may be a subset.
    let mut held = Vec::new();
    conditions.for_each_leaf(&mut |leaf| {
        if eval_leaf(leaf, snapshot, compiled) {
            held.push(leaf.describe());
        }
    });
    Some(held)
}

fn eval_group(group: &ConditionGroup, snapshot: &AircraftSnapshot, compiled: &CompiledRule) -> bool {
    combine(group.logic, group.conditions.iter(), |node| match node {
        ConditionNode::Leaf(c) => eval_leaf(c, snapshot, compiled),
        ConditionNode::Group(g) => eval_group(g, snapshot, compiled),
    })
}

/// Short-circuit AND/OR over any member list.
fn combine<T>(
    logic: GroupLogic,
    members: impl Iterator<Item = T>,
    mut check: impl FnMut(T) -> bool,
) -> bool {
    match logic {
        GroupLogic::And => {
            let mut any = false;
            for member in members {
                if !check(member) {
                    return false;
                }
                any = true;
            }
            // An empty AND group matches nothing rather than everything.
            any
        }
        GroupLogic::Or => {
            for member in members {
                if check(member) {
                    return true;
                }
            }
            false
        }
    }
}

/// Typed view of one snapshot field. Missing evaluates false under
/// every operator.
enum FieldValue<'a> {
    Number(f64),
    Text(&'a str),
    Flag(bool),
    Missing,
}

fn extract<'a>(field: Field, snapshot: &'a AircraftSnapshot) -> FieldValue<'a> {
    match field {
        Field::Altitude => snapshot
            .altitude_baro
            .map_or(FieldValue::Missing, |v| FieldValue::Number(v as f64)),
        Field::GroundSpeed => snapshot
            .ground_speed
            .map_or(FieldValue::Missing, FieldValue::Number),
        Field::VerticalRate => snapshot
            .vertical_rate
            .map_or(FieldValue::Missing, |v| FieldValue::Number(v as f64)),
        Field::Track => snapshot.track.map_or(FieldValue::Missing, FieldValue::Number),
        Field::Latitude => snapshot.lat.map_or(FieldValue::Missing, FieldValue::Number),
        Field::Longitude => snapshot.lon.map_or(FieldValue::Missing, FieldValue::Number),
        Field::Squawk => snapshot
            .squawk
            .as_deref()
            .map_or(FieldValue::Missing, FieldValue::Text),
        Field::Callsign => snapshot
            .trimmed_callsign()
            .map_or(FieldValue::Missing, FieldValue::Text),
        Field::Icao => FieldValue::Text(&snapshot.icao_hex),
        Field::Military => FieldValue::Flag(snapshot.military),
        Field::Emergency => FieldValue::Flag(matches!(
            snapshot.squawk.as_deref(),
            Some("7500" | "7600" | "7700")
        )),
    }
}

fn eval_leaf(condition: &Condition, snapshot: &AircraftSnapshot, compiled: &CompiledRule) -> bool {
    let field_value = extract(condition.field, snapshot);

    match (&field_value, condition.operator, &condition.value) {
        (FieldValue::Missing, _, _) => false,

        // Numeric comparisons.
        (FieldValue::Number(n), Operator::Eq, v) => v.as_number() == Some(*n),
        (FieldValue::Number(n), Operator::Ne, v) => {
            v.as_number().is_some_and(|expected| expected != *n)
        }
        (FieldValue::Number(n), Operator::Lt, v) => v.as_number().is_some_and(|t| *n < t),
        (FieldValue::Number(n), Operator::Gt, v) => v.as_number().is_some_and(|t| *n > t),
        (FieldValue::Number(n), Operator::Le, v) => v.as_number().is_some_and(|t| *n <= t),
        (FieldValue::Number(n), Operator::Ge, v) => v.as_number().is_some_and(|t| *n >= t),

        // Text comparisons. ICAO equality is case-insensitive since hex
        // addresses appear in either case upstream; everything else is
        // exact.
        (FieldValue::Text(s), Operator::Eq, ConditionValue::Text(t)) => {
            if condition.field == Field::Icao {
                s.eq_ignore_ascii_case(t)
            } else {
                *s == t.as_str()
            }
        }
        (FieldValue::Text(s), Operator::Ne, ConditionValue::Text(t)) => {
            if condition.field == Field::Icao {
                !s.eq_ignore_ascii_case(t)
            } else {
                *s != t.as_str()
            }
        }
        (FieldValue::Text(s), Operator::Contains, ConditionValue::Text(t)) => s.contains(t.as_str()),
        (FieldValue::Text(s), Operator::StartsWith, ConditionValue::Text(t)) => {
            s.starts_with(t.as_str())
        }
        (FieldValue::Text(s), Operator::Regex, ConditionValue::Text(pattern)) => compiled
            .pattern(pattern)
            .is_some_and(|regex| regex.is_match(s)),
        (FieldValue::Text(s), Operator::In, ConditionValue::List(items)) => {
            items.iter().any(|item| item.eq_ignore_ascii_case(s))
        }

        // Flag comparisons.
        (FieldValue::Flag(b), Operator::Eq, ConditionValue::Flag(expected)) => b == expected,
        (FieldValue::Flag(b), Operator::Ne, ConditionValue::Flag(expected)) => b != expected,

        // Type mismatch between field and operand never matches.
        _ => false,
    }
}
