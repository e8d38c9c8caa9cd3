//! Filter tree to SQL WHERE rendering.
//!
//! Conditions read fields out of the `metadata` TEXT column with
//! `json_extract`; array-capable membership tests go through `json_each`.
//! String literals are escaped by doubling single quotes. Empty `$in`
//! renders always-false and empty `$nin` always-true.

use serde_json::Value;

use crate::domain::models::{CmpOp, FilterNode};

/// Render a parsed filter to a WHERE fragment.
///
/// The fragment is always non-empty and self-contained; a match-all
/// filter renders as `1`.
pub fn where_clause(node: &FilterNode) -> String {
    match node {
        FilterNode::And(children) => {
            if children.is_empty() {
                "1".to_string()
            } else {
                children
                    .iter()
                    .map(where_clause)
                    .collect::<Vec<_>>()
                    .join(" AND ")
            }
        }
        FilterNode::Cmp { path, op, value } => render_cmp(path, *op, value),
        FilterNode::In { path, values } => render_in(path, values),
        FilterNode::NotIn { path, values } => render_nin(path, values),
        FilterNode::Exists { path, expected } => {
            let suffix = if *expected { "IS NOT NULL" } else { "IS NULL" };
            format!("{} {}", extract(path), suffix)
        }
    }
}

fn render_cmp(path: &str, op: CmpOp, value: &Value) -> String {
    let ex = extract(path);
    // SQL comparison against NULL is never true; presence tests cover
    // the JSON-null case.
    if value.is_null() {
        return match op {
            CmpOp::Eq => format!("{ex} IS NULL"),
            CmpOp::Ne => format!("{ex} IS NOT NULL"),
            _ => "0".to_string(),
        };
    }
    format!("{ex} {} {}", op.sql_symbol(), literal(value))
}

fn render_in(path: &str, values: &[Value]) -> String {
    if values.is_empty() {
        return "0".to_string();
    }
    let terms: Vec<String> = values.iter().map(|v| membership_term(path, v)).collect();
    format!("({})", terms.join(" OR "))
}

fn render_nin(path: &str, values: &[Value]) -> String {
    if values.is_empty() {
        return "1".to_string();
    }
    let terms: Vec<String> = values
        .iter()
        .map(|v| negated_membership_term(path, v))
        .collect();
    format!("({})", terms.join(" AND "))
}

/// One `$in` term. String items compare the extracted value directly;
/// anything else walks `json_each` so array-valued fields match too.
fn membership_term(path: &str, value: &Value) -> String {
    let ex = extract(path);
    if value.is_string() {
        format!("{ex} = {}", literal(value))
    } else {
        format!(
            "EXISTS (SELECT 1 FROM json_each({ex}) WHERE json_each.value = {})",
            literal(value)
        )
    }
}

fn negated_membership_term(path: &str, value: &Value) -> String {
    let ex = extract(path);
    if value.is_string() {
        format!("{ex} != {}", literal(value))
    } else {
        format!(
            "NOT EXISTS (SELECT 1 FROM json_each({ex}) WHERE json_each.value = {})",
            literal(value)
        )
    }
}

fn extract(path: &str) -> String {
    format!("json_extract(metadata,'$.{}')", escape(path))
}

fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{}'", escape(s)),
        Value::Number(n) => n.to_string(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => "0".to_string(),
        // Parsing only admits scalars; anything else compares as NULL.
        _ => "NULL".to_string(),
    }
}

fn escape(s: &str) -> String {
    s.replace('\'', "''")
}
