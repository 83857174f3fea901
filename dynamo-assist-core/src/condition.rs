/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Key conditions built by [`Index::key`](crate::Index::key) for query operations.

use aws_sdk_dynamodb::types::AttributeValue;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::encoding::{to_wire_value, Item};
use crate::error::ConditionParseError;
use crate::reserved::Placeholders;

/// The comparison applied to the sort key of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortCondition {
    /// `sk = :v`
    Eq,
    /// `begins_with(sk, :v)`
    #[default]
    BeginsWith,
    /// `sk > :v`
    Gt,
    /// `sk >= :v`
    Gte,
    /// `sk < :v`
    Lt,
    /// `sk <= :v`
    Lte,
    /// `sk BETWEEN :low AND :high`
    Between,
}

impl SortCondition {
    /// The canonical lowercase name of this condition.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortCondition::Eq => "eq",
            SortCondition::BeginsWith => "begins_with",
            SortCondition::Gt => "gt",
            SortCondition::Gte => "gte",
            SortCondition::Lt => "lt",
            SortCondition::Lte => "lte",
            SortCondition::Between => "between",
        }
    }
}

impl fmt::Display for SortCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortCondition {
    type Err = ConditionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "eq" => SortCondition::Eq,
            "begins_with" => SortCondition::BeginsWith,
            "gt" => SortCondition::Gt,
            "gte" => SortCondition::Gte,
            "lt" => SortCondition::Lt,
            "lte" => SortCondition::Lte,
            "between" => SortCondition::Between,
            other => return Err(ConditionParseError(other.to_string())),
        })
    }
}

impl serde::Serialize for SortCondition {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A resolved comparison on a sort-key attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum SortKeyOperand {
    /// Single-value comparison.
    Value(Value),
    /// Inclusive range; both bounds are full sort-key values.
    Range {
        /// Lower bound.
        low: Value,
        /// Upper bound.
        high: Value,
    },
}

/// The sort-key half of a [`KeyCondition`].
#[derive(Debug, Clone, PartialEq)]
pub struct SortKeyCondition {
    /// Sort-key attribute name.
    pub attribute: String,
    /// The comparison.
    pub condition: SortCondition,
    /// The resolved comparison value(s).
    pub operand: SortKeyOperand,
}

/// Partition equality plus an optional sort-key comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyCondition {
    /// Partition-key attribute name.
    pub partition_attribute: String,
    /// Partition-key value.
    pub partition_value: Value,
    /// Optional sort-key comparison.
    pub sort: Option<SortKeyCondition>,
}

/// A rendered key condition ready to hand to a query call.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyConditionExpression {
    /// e.g. `#pk = :pk AND begins_with(#sk, :sk)`
    pub expression: String,
    /// `#placeholder -> attribute name`
    pub names: HashMap<String, String>,
    /// `:placeholder -> value`
    pub values: HashMap<String, AttributeValue>,
}

impl KeyCondition {
    /// Creates a partition-only condition.
    pub fn partition(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            partition_attribute: attribute.into(),
            partition_value: value.into(),
            sort: None,
        }
    }

    /// Returns the `(low, high)` bounds if this is a range condition.
    pub fn sort_range(&self) -> Option<(&Value, &Value)> {
        match self.sort.as_ref().map(|s| &s.operand) {
            Some(SortKeyOperand::Range { low, high }) => Some((low, high)),
            _ => None,
        }
    }

    /// Renders the condition with `#name` and `:value` placeholders.
    pub fn to_expression(&self) -> KeyConditionExpression {
        let mut names = HashMap::new();
        let mut values = HashMap::new();

        let mut tokens = Placeholders::new();
        let pk = tokens.token(&self.partition_attribute);
        names.insert(format!("#{pk}"), self.partition_attribute.clone());
        values.insert(format!(":{pk}"), to_wire_value(&self.partition_value));
        let mut expression = format!("#{pk} = :{pk}");

        if let Some(sort) = &self.sort {
            let sk = tokens.token(&sort.attribute);
            names.insert(format!("#{sk}"), sort.attribute.clone());
            let clause = match &sort.operand {
                SortKeyOperand::Range { low, high } => {
                    let low_token = tokens.token(&format!("{sk}_low"));
                    let high_token = tokens.token(&format!("{sk}_high"));
                    values.insert(format!(":{low_token}"), to_wire_value(low));
                    values.insert(format!(":{high_token}"), to_wire_value(high));
                    format!("#{sk} BETWEEN :{low_token} AND :{high_token}")
                }
                SortKeyOperand::Value(v) => {
                    values.insert(format!(":{sk}"), to_wire_value(v));
                    match sort.condition {
                        SortCondition::BeginsWith => format!("begins_with(#{sk}, :{sk})"),
                        SortCondition::Gt => format!("#{sk} > :{sk}"),
                        SortCondition::Gte => format!("#{sk} >= :{sk}"),
                        SortCondition::Lt => format!("#{sk} < :{sk}"),
                        SortCondition::Lte => format!("#{sk} <= :{sk}"),
                        SortCondition::Eq | SortCondition::Between => format!("#{sk} = :{sk}"),
                    }
                }
            };
            expression.push_str(" AND ");
            expression.push_str(&clause);
        }

        KeyConditionExpression {
            expression,
            names,
            values,
        }
    }

    /// Evaluates the condition against a native item.
    pub fn matches(&self, item: &Item) -> bool {
        if item.get(&self.partition_attribute) != Some(&self.partition_value) {
            return false;
        }
        let Some(sort) = &self.sort else {
            return true;
        };
        let Some(actual) = item.get(&sort.attribute) else {
            return false;
        };
        match (&sort.operand, sort.condition) {
            (SortKeyOperand::Range { low, high }, _) => {
                let above_low = compare_key_values(actual, low).is_some_and(Ordering::is_ge);
                let below_high = compare_key_values(actual, high).is_some_and(Ordering::is_le);
                above_low && below_high
            }
            (SortKeyOperand::Value(expected), SortCondition::BeginsWith) => {
                match (actual, expected) {
                    (Value::String(a), Value::String(e)) => a.starts_with(e.as_str()),
                    _ => false,
                }
            }
            (SortKeyOperand::Value(expected), condition) => {
                let ord = compare_key_values(actual, expected);
                match condition {
                    SortCondition::Gt => ord == Some(Ordering::Greater),
                    SortCondition::Gte => matches!(ord, Some(Ordering::Greater | Ordering::Equal)),
                    SortCondition::Lt => ord == Some(Ordering::Less),
                    SortCondition::Lte => matches!(ord, Some(Ordering::Less | Ordering::Equal)),
                    _ => ord == Some(Ordering::Equal),
                }
            }
        }
    }
}

/// Orders two key values the way the store does: strings by bytes, numbers numerically.
pub fn compare_key_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(a), Value::String(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn users_by_email(condition: SortCondition, value: &str) -> KeyCondition {
        KeyCondition {
            partition_attribute: "gsi0_pk".into(),
            partition_value: json!("users#"),
            sort: Some(SortKeyCondition {
                attribute: "gsi0_sk".into(),
                condition,
                operand: SortKeyOperand::Value(json!(value)),
            }),
        }
    }

    #[test]
    fn condition_names_parse_and_print() {
        for name in ["eq", "begins_with", "gt", "gte", "lt", "lte", "between"] {
            let parsed: SortCondition = name.parse().unwrap();
            assert_eq!(parsed.to_string(), name);
        }
        let err = "starts_with".parse::<SortCondition>().unwrap_err();
        assert!(err.to_string().contains("starts_with"));
    }

    #[test]
    fn begins_with_expression() {
        let expr = users_by_email(SortCondition::BeginsWith, "email#").to_expression();
        assert_eq!(
            expr.expression,
            "#gsi0_pk = :gsi0_pk AND begins_with(#gsi0_sk, :gsi0_sk)"
        );
        assert_eq!(expr.names["#gsi0_sk"], "gsi0_sk");
        assert_eq!(expr.values[":gsi0_pk"], AttributeValue::S("users#".into()));
        assert_eq!(expr.values[":gsi0_sk"], AttributeValue::S("email#".into()));
    }

    #[test]
    fn between_expression_uses_two_placeholders() {
        let condition = KeyCondition {
            partition_attribute: "pk".into(),
            partition_value: json!("users#"),
            sort: Some(SortKeyCondition {
                attribute: "sk".into(),
                condition: SortCondition::Between,
                operand: SortKeyOperand::Range {
                    low: json!("ts#100"),
                    high: json!("ts#200"),
                },
            }),
        };
        let expr = condition.to_expression();
        assert_eq!(expr.expression, "#pk = :pk AND #sk BETWEEN :sk_low AND :sk_high");
        assert_eq!(expr.values.len(), 3);
    }

    #[test]
    fn similar_attribute_names_keep_distinct_placeholders() {
        let condition = KeyCondition {
            partition_attribute: "tenant-id".into(),
            partition_value: json!("t1"),
            sort: Some(SortKeyCondition {
                attribute: "tenant_id".into(),
                condition: SortCondition::Eq,
                operand: SortKeyOperand::Value(json!("t2")),
            }),
        };
        let expr = condition.to_expression();
        assert_eq!(
            expr.expression,
            "#tenant_id = :tenant_id AND #tenant_id_1 = :tenant_id_1"
        );
        assert_eq!(expr.names["#tenant_id"], "tenant-id");
        assert_eq!(expr.names["#tenant_id_1"], "tenant_id");
        assert_eq!(expr.values[":tenant_id"], AttributeValue::S("t1".into()));
        assert_eq!(expr.values[":tenant_id_1"], AttributeValue::S("t2".into()));
    }

    #[test]
    fn partition_only_expression() {
        let expr = KeyCondition::partition("pk", "user#1").to_expression();
        assert_eq!(expr.expression, "#pk = :pk");
        assert_eq!(expr.names.len(), 1);
    }

    #[test]
    fn matches_evaluates_sort_comparisons() {
        let mut item = Item::new();
        item.insert("gsi0_pk".into(), json!("users#"));
        item.insert("gsi0_sk".into(), json!("email#b@x.com"));

        assert!(users_by_email(SortCondition::BeginsWith, "email#").matches(&item));
        assert!(users_by_email(SortCondition::Gt, "email#a").matches(&item));
        assert!(!users_by_email(SortCondition::Lt, "email#a").matches(&item));
        assert!(users_by_email(SortCondition::Eq, "email#b@x.com").matches(&item));
        assert!(!users_by_email(SortCondition::BeginsWith, "name#").matches(&item));
    }
}
