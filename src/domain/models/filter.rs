//! Metadata filter model.
//!
//! Filters arrive as MongoDB-style JSON query documents and are parsed
//! into a typed tree before being rendered to SQL. Sibling conditions at
//! the same object level combine with AND; nested non-operator keys build
//! dotted field paths (`{"specs":{"ram":{"$gt":8}}}` filters on
//! `specs.ram`).

use serde_json::Value;

use crate::domain::errors::{Result, StoreError};

/// Comparison operators on a single extracted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CmpOp {
    pub fn sql_symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        match key {
            "$eq" => Some(Self::Eq),
            "$ne" => Some(Self::Ne),
            "$gt" => Some(Self::Gt),
            "$gte" => Some(Self::Gte),
            "$lt" => Some(Self::Lt),
            "$lte" => Some(Self::Lte),
            _ => None,
        }
    }
}

/// One node of a parsed filter.
///
/// Unknown operator keys and operands of the wrong shape are dropped
/// during parsing (the condition is simply not added), so a node tree
/// always renders to valid SQL.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    /// Conjunction of child conditions; empty means match-all.
    And(Vec<FilterNode>),
    /// `field <op> literal` over a scalar JSON value.
    Cmp {
        path: String,
        op: CmpOp,
        value: Value,
    },
    /// Field value (or any element of an array-valued field) equals one
    /// of the literals. Empty is always-false.
    In { path: String, values: Vec<Value> },
    /// Negation of `In`. Empty is always-true.
    NotIn { path: String, values: Vec<Value> },
    /// Field presence check.
    Exists { path: String, expected: bool },
}

impl FilterNode {
    /// Parse a MongoDB-style query document.
    ///
    /// The root must be a JSON object; `{}` parses to a match-all
    /// conjunction.
    pub fn parse(doc: &Value) -> Result<Self> {
        let map = doc
            .as_object()
            .ok_or_else(|| StoreError::InvalidFilter("filter must be a JSON object".into()))?;

        let mut conditions = Vec::new();
        for (key, value) in map {
            if key.starts_with('$') {
                // Operator with no field to apply to; drop it.
                continue;
            }
            Self::parse_field(key, value, &mut conditions);
        }
        Ok(Self::And(conditions))
    }

    /// Parse the value attached to a field key, descending through nested
    /// non-operator objects.
    fn parse_field(path: &str, value: &Value, out: &mut Vec<FilterNode>) {
        match value {
            Value::Object(map) => {
                for (key, inner) in map {
                    if let Some(op) = CmpOp::from_key(key) {
                        if is_scalar(inner) {
                            out.push(Self::Cmp {
                                path: path.to_string(),
                                op,
                                value: inner.clone(),
                            });
                        }
                    } else if key == "$in" || key == "$nin" {
                        if let Value::Array(items) = inner {
                            let values = items.clone();
                            let path = path.to_string();
                            out.push(if key == "$in" {
                                Self::In { path, values }
                            } else {
                                Self::NotIn { path, values }
                            });
                        }
                    } else if key == "$exists" {
                        if let Some(expected) = inner.as_bool() {
                            out.push(Self::Exists {
                                path: path.to_string(),
                                expected,
                            });
                        }
                    } else if key.starts_with('$') {
                        // Unknown operator: condition not added.
                    } else {
                        // Non-operator key nests the field path.
                        Self::parse_field(&format!("{path}.{key}"), inner, out);
                    }
                }
            }
            // Shorthand equality: {"f": 5} == {"f": {"$eq": 5}}.
            v if is_scalar(v) => out.push(Self::Cmp {
                path: path.to_string(),
                op: CmpOp::Eq,
                value: v.clone(),
            }),
            // Bare arrays have no defined translation; skip.
            _ => {}
        }
    }
}

fn is_scalar(v: &Value) -> bool {
    matches!(
        v,
        Value::String(_) | Value::Number(_) | Value::Bool(_) | Value::Null
    )
}
