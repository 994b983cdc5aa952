//! Normalized schema tree
//!
//! `SchemaNode` is the closed, canonical form every raw schema is reduced to
//! before diffing. Two schemas that differ only cosmetically (key order,
//! `"type": "string"` vs `"type": ["string"]`, duplicate type names) normalize
//! to equal trees and therefore to equal content hashes.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::checksum::Checksum;
use crate::error::{Result, SchemaError};
use crate::path::ChangePath;

// =============================================================================
// Type Names
// =============================================================================

/// A single JSON Schema primitive type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeName {
    Array,
    Boolean,
    Integer,
    Null,
    Number,
    Object,
    String,
}

impl TypeName {
    /// Every primitive type, in canonical order
    pub const ALL: [TypeName; 7] = [
        TypeName::Array,
        TypeName::Boolean,
        TypeName::Integer,
        TypeName::Null,
        TypeName::Number,
        TypeName::Object,
        TypeName::String,
    ];

    pub fn from_json_type(type_str: &str) -> Option<Self> {
        match type_str {
            "array" => Some(Self::Array),
            "boolean" => Some(Self::Boolean),
            "integer" => Some(Self::Integer),
            "null" => Some(Self::Null),
            "number" => Some(Self::Number),
            "object" => Some(Self::Object),
            "string" => Some(Self::String),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Array => "array",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Null => "null",
            Self::Number => "number",
            Self::Object => "object",
            Self::String => "string",
        }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Schema Kind
// =============================================================================

/// The structural kind of a node.
///
/// A type list with a single member collapses to that member, so `"string"`
/// and `["string"]` produce the same kind. Two or more members form a `Union`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaKind {
    Object,
    Array,
    String,
    Number,
    Integer,
    Boolean,
    Null,
    Union(BTreeSet<TypeName>),
}

impl SchemaKind {
    /// Canonicalize a set of type names. Returns `None` for an empty set.
    pub fn from_types(types: BTreeSet<TypeName>) -> Option<Self> {
        match types.len() {
            0 => None,
            1 => types.into_iter().next().map(Self::single),
            _ => Some(Self::Union(types)),
        }
    }

    /// The kind accepting exactly one type
    pub fn single(type_name: TypeName) -> Self {
        match type_name {
            TypeName::Object => Self::Object,
            TypeName::Array => Self::Array,
            TypeName::String => Self::String,
            TypeName::Number => Self::Number,
            TypeName::Integer => Self::Integer,
            TypeName::Boolean => Self::Boolean,
            TypeName::Null => Self::Null,
        }
    }

    /// The kind of an untyped schema, which accepts every type
    pub fn any() -> Self {
        Self::Union(TypeName::ALL.into_iter().collect())
    }

    /// Types accepted by this kind
    pub fn members(&self) -> BTreeSet<TypeName> {
        match self {
            Self::Object => BTreeSet::from([TypeName::Object]),
            Self::Array => BTreeSet::from([TypeName::Array]),
            Self::String => BTreeSet::from([TypeName::String]),
            Self::Number => BTreeSet::from([TypeName::Number]),
            Self::Integer => BTreeSet::from([TypeName::Integer]),
            Self::Boolean => BTreeSet::from([TypeName::Boolean]),
            Self::Null => BTreeSet::from([TypeName::Null]),
            Self::Union(types) => types.clone(),
        }
    }

    pub fn accepts(&self, type_name: TypeName) -> bool {
        match self {
            Self::Union(types) => types.contains(&type_name),
            other => *other == Self::single(type_name),
        }
    }

    /// Whether this kind accepts everything `other` accepts and more
    pub fn strictly_widens(&self, other: &SchemaKind) -> bool {
        let mine = self.members();
        let theirs = other.members();
        mine.len() > theirs.len() && theirs.is_subset(&mine)
    }

    /// Human-readable label, e.g. `string` or `null|string`
    pub fn label(&self) -> String {
        self.members()
            .iter()
            .map(TypeName::as_str)
            .collect::<Vec<_>>()
            .join("|")
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

// =============================================================================
// Enum Literals
// =============================================================================

/// An `enum` member.
///
/// Ordered and compared by its canonical JSON text (object keys sorted), so
/// enum sets iterate deterministically. Floats holding an exact integer are
/// stored as integers first, so `1` and `1.0` are the same member.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub struct Literal {
    canonical: String,
    value: Value,
}

impl Literal {
    pub fn new(value: Value) -> Self {
        let value = integral_numbers(value);
        let canonical = value.to_string();
        Self { canonical, value }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// The primitive type this literal belongs to
    pub fn type_name(&self) -> TypeName {
        match &self.value {
            Value::Null => TypeName::Null,
            Value::Bool(_) => TypeName::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => TypeName::Integer,
            Value::Number(_) => TypeName::Number,
            Value::String(_) => TypeName::String,
            Value::Array(_) => TypeName::Array,
            Value::Object(_) => TypeName::Object,
        }
    }
}

/// Largest magnitude at which every integer is exactly representable as f64
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

fn integral_numbers(value: Value) -> Value {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER => {
                Value::from(f as i64)
            }
            _ => Value::Number(n),
        },
        Value::Array(items) => Value::Array(items.into_iter().map(integral_numbers).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, item)| (key, integral_numbers(item)))
                .collect(),
        ),
        other => other,
    }
}

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for Literal {}

impl PartialOrd for Literal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Literal {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical.cmp(&other.canonical)
    }
}

impl From<Value> for Literal {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

impl From<Literal> for Value {
    fn from(literal: Literal) -> Self {
        literal.value
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

// =============================================================================
// Constraints
// =============================================================================

/// Numeric, string and array validation keywords
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl Constraints {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// =============================================================================
// Schema Node
// =============================================================================

/// A node of the normalized schema tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaNode {
    pub kind: SchemaKind,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, SchemaNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaNode>>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub required: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<BTreeSet<Literal>>,
    #[serde(default, skip_serializing_if = "Constraints::is_empty")]
    pub constraints: Constraints,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SchemaNode {
    /// A bare node of the given kind. Array nodes get an untyped item schema.
    pub fn new(kind: SchemaKind) -> Self {
        let items = (kind == SchemaKind::Array).then(|| Box::new(Self::any()));
        Self {
            kind,
            properties: BTreeMap::new(),
            items,
            required: BTreeSet::new(),
            enum_values: None,
            constraints: Constraints::default(),
            description: None,
        }
    }

    /// A node that accepts any value
    pub fn any() -> Self {
        Self::new(SchemaKind::any())
    }

    pub fn with_property(mut self, name: impl Into<String>, node: SchemaNode) -> Self {
        self.properties.insert(name.into(), node);
        self
    }

    pub fn with_items(mut self, node: SchemaNode) -> Self {
        self.items = Some(Box::new(node));
        self
    }

    pub fn with_required(mut self, name: impl Into<String>) -> Self {
        self.required.insert(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Whether the property is listed in this node's `required` set
    pub fn requires(&self, name: &str) -> bool {
        self.required.contains(name)
    }

    /// Number of node levels in this subtree, counting itself
    pub fn depth(&self) -> usize {
        let children = self
            .properties
            .values()
            .map(SchemaNode::depth)
            .chain(self.items.iter().map(|items| items.depth()))
            .max()
            .unwrap_or(0);
        children + 1
    }

    /// Check the structural invariants the differ relies on.
    ///
    /// Only properties may hang off kinds accepting `object`, only items off
    /// kinds accepting `array`, and an `array` node must carry an item schema.
    pub fn check_shape(&self, path: &ChangePath) -> Result<()> {
        if self.kind == SchemaKind::Array && self.items.is_none() {
            return Err(SchemaError::InternalInvariant {
                path: path.to_string(),
                message: "array node has no item schema".to_string(),
            });
        }
        if !self.properties.is_empty() && !self.kind.accepts(TypeName::Object) {
            return Err(SchemaError::InternalInvariant {
                path: path.to_string(),
                message: format!("{} node carries object properties", self.kind),
            });
        }
        if self.items.is_some() && !self.kind.accepts(TypeName::Array) {
            return Err(SchemaError::InternalInvariant {
                path: path.to_string(),
                message: format!("{} node carries an item schema", self.kind),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Schema Document
// =============================================================================

/// A normalized schema tree plus its content hash
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaDocument {
    root: SchemaNode,
    hash: Checksum,
}

impl SchemaDocument {
    pub fn new(root: SchemaNode) -> Result<Self> {
        let hash = Checksum::from_node(&root)?;
        Ok(Self { root, hash })
    }

    pub fn root(&self) -> &SchemaNode {
        &self.root
    }

    /// Stable digest of the normalized tree
    pub fn hash(&self) -> &Checksum {
        &self.hash
    }

    pub fn into_root(self) -> SchemaNode {
        self.root
    }
}
