//! Schema Parsing and Normalization
//!
//! Turns raw schema text into a canonical `SchemaNode` tree. Only the
//! structural keywords compatibility analysis needs are read: `type`,
//! `properties`, `items`, `required`, `enum`/`const`, numeric, string and
//! array bounds, `pattern` and `description`. Combinators are skipped and
//! `$ref` is rejected, so a tree can never contain a cycle.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Result, SchemaError};
use crate::path::ChangePath;
use crate::schema::{Constraints, Literal, SchemaDocument, SchemaKind, SchemaNode, TypeName};

/// Default maximum number of nested schema levels
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Message prefix serde_json uses when input nests past its recursion limit
const DECODER_RECURSION_LIMIT: &str = "recursion limit exceeded";

/// Keywords that are recognized but not analyzed
const IGNORED_COMBINATORS: &[&str] = &["allOf", "anyOf", "oneOf", "not", "if", "then", "else"];

/// Parse schema text with the default depth limit
pub fn parse(text: &str) -> Result<SchemaDocument> {
    Parser::new().parse(text)
}

/// Schema parser with a configurable nesting limit
#[derive(Debug, Clone)]
pub struct Parser {
    max_depth: usize,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Parse and normalize raw schema text
    pub fn parse(&self, text: &str) -> Result<SchemaDocument> {
        let value: Value = serde_json::from_str(text).map_err(|e| self.decode_error(&e))?;
        self.parse_value(&value)
    }

    /// serde_json stops at its own nesting limit before normalization runs;
    /// that is still a depth failure, not a syntax one.
    fn decode_error(&self, err: &serde_json::Error) -> SchemaError {
        if err.is_syntax() && err.to_string().starts_with(DECODER_RECURSION_LIMIT) {
            return SchemaError::DepthExceeded {
                max_depth: self.max_depth,
                path: ChangePath::root().to_string(),
            };
        }
        SchemaError::from_json(err)
    }

    /// Normalize an already-decoded JSON value
    pub fn parse_value(&self, value: &Value) -> Result<SchemaDocument> {
        let root = self.normalize(value, &ChangePath::root())?;
        SchemaDocument::new(root)
    }

    fn normalize(&self, value: &Value, path: &ChangePath) -> Result<SchemaNode> {
        if path.depth() + 1 > self.max_depth {
            return Err(SchemaError::DepthExceeded {
                max_depth: self.max_depth,
                path: path.to_string(),
            });
        }

        let obj = match value {
            Value::Object(obj) => obj,
            Value::Bool(true) => return Ok(SchemaNode::any()),
            _ => {
                return Err(SchemaError::invalid(
                    path.to_string(),
                    "schema must be a JSON object",
                ))
            }
        };

        if obj.contains_key("$ref") {
            return Err(SchemaError::invalid(
                path.keyword("$ref").to_string(),
                "`$ref` is not supported; inline the referenced schema",
            ));
        }
        for keyword in IGNORED_COMBINATORS {
            if obj.contains_key(*keyword) {
                debug!(path = %path, keyword = *keyword, "ignoring combinator");
            }
        }

        let enum_values = parse_enum(obj, path)?;
        let kind = match parse_types(obj, path)? {
            Some(types) => SchemaKind::from_types(types).ok_or_else(|| {
                SchemaError::invalid(
                    path.keyword("type").to_string(),
                    "`type` must name at least one type",
                )
            })?,
            None => infer_kind(obj, enum_values.as_ref()),
        };

        let mut node = SchemaNode::new(kind);
        node.enum_values = enum_values;
        node.description = obj
            .get("description")
            .and_then(Value::as_str)
            .map(String::from);
        node.constraints = parse_constraints(obj, path, &node.kind)?;

        if let Some(raw) = obj.get("properties") {
            let raw = raw.as_object().ok_or_else(|| {
                SchemaError::invalid(
                    path.keyword("properties").to_string(),
                    "`properties` must be an object",
                )
            })?;
            if node.kind.accepts(TypeName::Object) {
                node.properties = raw
                    .iter()
                    .map(|(name, child)| -> Result<(String, SchemaNode)> {
                        Ok((name.clone(), self.normalize(child, &path.property(name))?))
                    })
                    .collect::<Result<BTreeMap<_, _>>>()?;
            } else {
                debug!(path = %path, kind = %node.kind, "ignoring properties on non-object node");
            }
        }

        if let Some(required) = parse_required(obj, path)? {
            if node.kind.accepts(TypeName::Object) {
                node.required = required;
            } else {
                debug!(path = %path, kind = %node.kind, "ignoring required on non-object node");
            }
        }

        match obj.get("items") {
            Some(Value::Array(_)) => {
                return Err(SchemaError::invalid(
                    path.keyword("items").to_string(),
                    "tuple-form `items` is not supported",
                ))
            }
            Some(raw) if node.kind.accepts(TypeName::Array) => {
                node.items = Some(Box::new(self.normalize(raw, &path.items())?));
            }
            Some(_) => {
                debug!(path = %path, kind = %node.kind, "ignoring items on non-array node");
            }
            None => {}
        }

        Ok(node)
    }
}

// =============================================================================
// Keyword Extraction
// =============================================================================

fn parse_types(obj: &Map<String, Value>, path: &ChangePath) -> Result<Option<BTreeSet<TypeName>>> {
    let Some(raw) = obj.get("type") else {
        return Ok(None);
    };
    let names: Vec<&Value> = match raw {
        Value::String(_) => vec![raw],
        Value::Array(names) => names.iter().collect(),
        _ => {
            return Err(SchemaError::invalid(
                path.keyword("type").to_string(),
                "`type` must be a string or an array of strings",
            ))
        }
    };

    names
        .into_iter()
        .map(|name| {
            name.as_str()
                .and_then(TypeName::from_json_type)
                .ok_or_else(|| {
                    SchemaError::invalid(
                        path.keyword("type").to_string(),
                        format!("unknown type {}", name),
                    )
                })
        })
        .collect::<Result<BTreeSet<_>>>()
        .map(Some)
}

/// `const` is folded into a one-member enum
fn parse_enum(obj: &Map<String, Value>, path: &ChangePath) -> Result<Option<BTreeSet<Literal>>> {
    match (obj.get("enum"), obj.get("const")) {
        (Some(Value::Array(values)), _) => {
            Ok(Some(values.iter().cloned().map(Literal::new).collect()))
        }
        (Some(_), _) => Err(SchemaError::invalid(
            path.keyword("enum").to_string(),
            "`enum` must be an array",
        )),
        (None, Some(value)) => Ok(Some(BTreeSet::from([Literal::new(value.clone())]))),
        (None, None) => Ok(None),
    }
}

fn parse_required(obj: &Map<String, Value>, path: &ChangePath) -> Result<Option<BTreeSet<String>>> {
    let invalid = || {
        SchemaError::invalid(
            path.keyword("required").to_string(),
            "`required` must be an array of property names",
        )
    };
    match obj.get("required") {
        None => Ok(None),
        Some(Value::Array(names)) => names
            .iter()
            .map(|name| name.as_str().map(String::from).ok_or_else(invalid))
            .collect::<Result<BTreeSet<_>>>()
            .map(Some),
        Some(_) => Err(invalid()),
    }
}

/// Infer the kind of a schema without `type`
fn infer_kind(obj: &Map<String, Value>, enum_values: Option<&BTreeSet<Literal>>) -> SchemaKind {
    if obj.contains_key("properties") || obj.contains_key("required") {
        return SchemaKind::Object;
    }
    if obj.contains_key("items") {
        return SchemaKind::Array;
    }
    enum_values
        .map(|values| values.iter().map(Literal::type_name).collect())
        .and_then(SchemaKind::from_types)
        .unwrap_or_else(SchemaKind::any)
}

/// Read bounds, keeping only those that apply to the node's kind
fn parse_constraints(obj: &Map<String, Value>, path: &ChangePath, kind: &SchemaKind) -> Result<Constraints> {
    let numeric = kind.accepts(TypeName::Number) || kind.accepts(TypeName::Integer);
    let textual = kind.accepts(TypeName::String);
    let listy = kind.accepts(TypeName::Array);

    let mut constraints = Constraints::default();
    if numeric {
        constraints.minimum = number(obj, "minimum", path)?;
        constraints.maximum = number(obj, "maximum", path)?;
    }
    if textual {
        constraints.min_length = count(obj, "minLength", path)?;
        constraints.max_length = count(obj, "maxLength", path)?;
        constraints.pattern = match obj.get("pattern") {
            None => None,
            Some(Value::String(pattern)) => Some(pattern.clone()),
            Some(_) => {
                return Err(SchemaError::invalid(
                    path.keyword("pattern").to_string(),
                    "`pattern` must be a string",
                ))
            }
        };
    }
    if listy {
        constraints.min_items = count(obj, "minItems", path)?;
        constraints.max_items = count(obj, "maxItems", path)?;
    }
    Ok(constraints)
}

fn number(obj: &Map<String, Value>, key: &'static str, path: &ChangePath) -> Result<Option<f64>> {
    obj.get(key)
        .map(|value| {
            value.as_f64().ok_or_else(|| {
                SchemaError::invalid(path.keyword(key).to_string(), format!("`{}` must be a number", key))
            })
        })
        .transpose()
}

fn count(obj: &Map<String, Value>, key: &'static str, path: &ChangePath) -> Result<Option<u64>> {
    obj.get(key)
        .map(|value| {
            value.as_u64().ok_or_else(|| {
                SchemaError::invalid(
                    path.keyword(key).to_string(),
                    format!("`{}` must be a non-negative integer", key),
                )
            })
        })
        .transpose()
}
