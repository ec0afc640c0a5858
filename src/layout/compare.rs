use crate::layout::schema::{Expect, LayoutSpec};
use serde_json::Value;
use std::fmt;

/// Sections every payload must carry, whatever layout is in use.
const REQUIRED_SECTIONS: &[&str] = &[
    "data",
    "estabelecimentos",
    "clientes",
    "produtos",
    "vendas",
    "estoque",
];

/// A broken payload usually repeats the same mistake on every item, so list
/// traversal stops after this many entries.
const MAX_LIST_ITEMS: usize = 2000;

#[derive(Debug, Clone, PartialEq)]
pub struct Discrepancy {
    pub path: String,
    pub message: String,
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Checks a serialized payload against a layout. Purely advisory: the list
/// of discrepancies comes back and the payload is left alone.
pub fn validate_record(record: &Value, spec: &LayoutSpec) -> Vec<Discrepancy> {
    let mut discrepancies = Vec::new();

    for section in REQUIRED_SECTIONS {
        if record.get(section).is_none() {
            discrepancies.push(Discrepancy {
                path: format!("$.{}", section),
                message: "required section missing".to_string(),
            });
        }
    }

    check(record, spec.root(), "$", &mut discrepancies);
    discrepancies
}

fn check(value: &Value, expect: &Expect, path: &str, out: &mut Vec<Discrepancy>) {
    match expect {
        Expect::Object(fields) => match value.as_object() {
            Some(map) => {
                for (key, sub) in fields {
                    let child_path = format!("{}.{}", path, key);
                    match map.get(key) {
                        Some(child) => check(child, sub, &child_path, out),
                        None => out.push(Discrepancy {
                            path: child_path,
                            message: "required field missing".to_string(),
                        }),
                    }
                }
            }
            None => out.push(mismatch(path, "object", value)),
        },
        Expect::Items(template) => match value.as_array() {
            Some(items) => {
                for (index, item) in items.iter().take(MAX_LIST_ITEMS).enumerate() {
                    check(item, template, &format!("{}[{}]", path, index), out);
                }
            }
            None => out.push(mismatch(path, "list", value)),
        },
        Expect::List => {
            if !value.is_array() {
                out.push(mismatch(path, "list", value));
            }
        }
        Expect::Str => {
            if !value.is_string() {
                out.push(mismatch(path, "str", value));
            }
        }
        Expect::Int => {
            if !value.is_i64() && !value.is_u64() {
                out.push(mismatch(path, "int", value));
            }
        }
        Expect::Float => {
            if !value.is_number() {
                out.push(mismatch(path, "float", value));
            }
        }
    }
}

fn mismatch(path: &str, expected: &str, value: &Value) -> Discrepancy {
    Discrepancy {
        path: path.to_string(),
        message: format!("expected {}, got {}", expected, kind(value)),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
