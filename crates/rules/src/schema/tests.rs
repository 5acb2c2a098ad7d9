use super::*;

#[test]
fn parses_simple_rule_yaml() {
    let rule: Rule = serde_yaml::from_str(
        r#"
id: 12
name: Low altitude
simple:
  type: altitude
  operator: lt
  value: 3000
priority: warning
cooldown_seconds: 120
"#,
    )
    .unwrap();

    assert_eq!(rule.id, 12);
    assert!(rule.enabled, "enabled defaults to true");
    assert_eq!(rule.cooldown_seconds, 120);
    let simple = rule.simple.as_ref().unwrap();
    assert_eq!(simple.field, Field::Altitude);
    assert_eq!(simple.operator, Operator::Lt);
    assert_eq!(simple.value, ConditionValue::Number(3000.0));
    assert!(rule.validate().is_ok());
}

#[test]
fn parses_nested_condition_tree() {
    let rule: Rule = serde_yaml::from_str(
        r#"
id: 3
name: Military low and slow
conditions:
  logic: and
  groups:
    - logic: and
      conditions:
        - field: military
          operator: eq
          value: true
        - field: altitude
          operator: lt
          value: 5000
    - logic: or
      conditions:
        - field: ground_speed
          operator: lt
          value: 180
        - logic: and
          conditions:
            - field: callsign
              operator: starts_with
              value: "RCH"
priority: critical
"#,
    )
    .unwrap();

    let conditions = rule.conditions.as_ref().unwrap();
    assert_eq!(conditions.logic, GroupLogic::And);
    assert_eq!(conditions.groups.len(), 2);

    // Second group nests a group inside it.
    match &conditions.groups[1].conditions[1] {
        ConditionNode::Group(inner) => {
            assert_eq!(inner.logic, GroupLogic::And);
            assert_eq!(inner.conditions.len(), 1);
        }
        other => panic!("expected nested group, got {:?}", other),
    }

    let mut leaves = 0;
    conditions.for_each_leaf(&mut |_| leaves += 1);
    assert_eq!(leaves, 4);
}

#[test]
fn unknown_field_is_a_parse_error() {
    let result: std::result::Result<Rule, _> = serde_yaml::from_str(
        r#"
id: 9
name: Bad field
simple:
  type: wingspan
  operator: lt
  value: 100
"#,
    );
    assert!(result.is_err());
}

#[test]
fn unknown_operator_is_a_parse_error() {
    let result: std::result::Result<Rule, _> = serde_yaml::from_str(
        r#"
id: 9
name: Bad op
simple:
  type: altitude
  operator: within
  value: 100
"#,
    );
    assert!(result.is_err());
}

#[test]
fn rule_without_matcher_fails_validation() {
    let rule: Rule = serde_yaml::from_str(
        r#"
id: 4
name: Matches nothing
"#,
    )
    .unwrap();
    assert!(rule.validate().is_err());
}

#[test]
fn inverted_schedule_fails_validation() {
    let rule: Rule = serde_yaml::from_str(
        r#"
id: 5
name: Backwards
simple:
  type: military
  operator: eq
  value: true
starts_at: 2025-07-01T00:00:00Z
expires_at: 2025-06-01T00:00:00Z
"#,
    )
    .unwrap();
    assert!(rule.validate().is_err());
}

#[test]
fn schedule_bounds_are_optional_and_half_open() {
    use chrono::{TimeZone, Utc};

    let rule: Rule = serde_yaml::from_str(
        r#"
id: 6
name: Summer only
simple:
  type: military
  operator: eq
  value: true
starts_at: 2025-06-01T00:00:00Z
expires_at: 2025-09-01T00:00:00Z
"#,
    )
    .unwrap();

    let before = Utc.with_ymd_and_hms(2025, 5, 31, 23, 59, 59).unwrap();
    let inside = Utc.with_ymd_and_hms(2025, 7, 15, 12, 0, 0).unwrap();
    let at_expiry = Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap();

    assert!(!rule.is_scheduled(before));
    assert!(rule.is_scheduled(inside));
    assert!(!rule.is_scheduled(at_expiry));
}

#[test]
fn condition_value_untagged_forms() {
    let list: ConditionValue = serde_yaml::from_str(r#"["7500", "7600", "7700"]"#).unwrap();
    assert_eq!(
        list,
        ConditionValue::List(vec![
            "7500".to_string(),
            "7600".to_string(),
            "7700".to_string()
        ])
    );

    let flag: ConditionValue = serde_yaml::from_str("true").unwrap();
    assert_eq!(flag, ConditionValue::Flag(true));

    let number: ConditionValue = serde_yaml::from_str("2500").unwrap();
    assert_eq!(number, ConditionValue::Number(2500.0));
}

#[test]
fn visibility_defaults_to_public() {
    let rule: Rule = serde_yaml::from_str(
        r#"
id: 7
name: Plain
simple:
  type: altitude
  operator: gt
  value: 40000
"#,
    )
    .unwrap();
    assert_eq!(rule.visibility, Visibility::Public);
    assert!(rule.owner.is_none());
}
