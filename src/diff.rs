//! Structural Diffing
//!
//! Walks two normalized trees in lockstep, joined by `ChangePath`, and emits
//! raw `ChangeRecord`s. At every node the walk visits object properties in
//! lexical order, then the array item schema, then the node's own keywords
//! (`enum`, bounds, `pattern`, `description`). A kind change at a path is
//! reported once and nothing below it is compared, except in lenient mode
//! where one type set contains the other: then the walk continues in both
//! directions so added and removed fields stay mirror images.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use serde_json::Value;
use tracing::error;

use crate::error::Result;
use crate::path::ChangePath;
use crate::schema::{Literal, SchemaDocument, SchemaNode, TypeName};

/// Kind of structural change
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// A property exists only in the new schema
    FieldAdded,
    /// A property exists only in the old schema
    FieldRemoved,
    /// The accepted type set changed
    TypeChanged,
    /// An enum member was dropped
    EnumValueRemoved,
    /// An enum member was introduced
    EnumValueAdded,
    /// A bound, pattern or enum restriction now rejects more values
    ConstraintTightened,
    /// A bound, pattern, enum restriction or type set now accepts more values
    ConstraintRelaxed,
    /// A property became required
    RequiredAdded,
    /// A property is no longer required
    RequiredRemoved,
    /// Documentation text changed
    DescriptionChanged,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FieldAdded => "field_added",
            Self::FieldRemoved => "field_removed",
            Self::TypeChanged => "type_changed",
            Self::EnumValueRemoved => "enum_value_removed",
            Self::EnumValueAdded => "enum_value_added",
            Self::ConstraintTightened => "constraint_tightened",
            Self::ConstraintRelaxed => "constraint_relaxed",
            Self::RequiredAdded => "required_added",
            Self::RequiredRemoved => "required_removed",
            Self::DescriptionChanged => "description_changed",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single detected change between schema versions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeRecord {
    /// Location of the change
    pub path: ChangePath,
    /// What changed
    pub change_kind: ChangeKind,
    /// Value before the change (if applicable)
    pub old_value: Option<Value>,
    /// Value after the change (if applicable)
    pub new_value: Option<Value>,
}

impl ChangeRecord {
    pub fn new(
        path: ChangePath,
        change_kind: ChangeKind,
        old_value: Option<Value>,
        new_value: Option<Value>,
    ) -> Self {
        Self {
            path,
            change_kind,
            old_value,
            new_value,
        }
    }

    /// Human-readable one-line description
    pub fn describe(&self) -> String {
        let show = |value: &Option<Value>| {
            value
                .as_ref()
                .map(Value::to_string)
                .unwrap_or_else(|| "-".to_string())
        };
        match self.change_kind {
            ChangeKind::FieldAdded => format!("{} added", self.path),
            ChangeKind::FieldRemoved => format!("{} removed", self.path),
            ChangeKind::RequiredAdded => format!("{} is now required", self.path),
            ChangeKind::RequiredRemoved => format!("{} is no longer required", self.path),
            ChangeKind::EnumValueAdded => {
                format!("{} gained value {}", self.path, show(&self.new_value))
            }
            ChangeKind::EnumValueRemoved => {
                format!("{} lost value {}", self.path, show(&self.old_value))
            }
            _ => format!(
                "{} {}: {} -> {}",
                self.path,
                self.change_kind.as_str().replace('_', " "),
                show(&self.old_value),
                show(&self.new_value)
            ),
        }
    }
}

/// Diff two documents in strict mode
pub fn diff(old: &SchemaDocument, new: &SchemaDocument) -> Result<Vec<ChangeRecord>> {
    Differ::new().diff(old, new)
}

/// Structural differ
#[derive(Debug, Clone)]
pub struct Differ {
    /// Strict mode - every type change is a `TypeChanged`
    strict_mode: bool,
}

impl Default for Differ {
    fn default() -> Self {
        Self::new()
    }
}

impl Differ {
    /// Create a differ in strict mode
    pub fn new() -> Self {
        Self { strict_mode: true }
    }

    /// Report strict type-set widening as a relaxed constraint
    pub fn lenient(mut self) -> Self {
        self.strict_mode = false;
        self
    }

    pub fn with_strict_mode(mut self, strict_mode: bool) -> Self {
        self.strict_mode = strict_mode;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict_mode
    }

    /// Compute the ordered change list between two documents
    pub fn diff(&self, old: &SchemaDocument, new: &SchemaDocument) -> Result<Vec<ChangeRecord>> {
        let mut changes = Vec::new();
        if old.hash() == new.hash() {
            return Ok(changes);
        }
        self.compare_nodes(&ChangePath::root(), old.root(), new.root(), &mut changes)?;
        Ok(changes)
    }

    fn compare_nodes(
        &self,
        path: &ChangePath,
        old: &SchemaNode,
        new: &SchemaNode,
        changes: &mut Vec<ChangeRecord>,
    ) -> Result<()> {
        for node in [old, new] {
            if let Err(err) = node.check_shape(path) {
                error!(error = %err, "schema tree failed shape check");
                return Err(err);
            }
        }

        if old.kind != new.kind {
            let (old_label, new_label) = (Value::from(old.kind.label()), Value::from(new.kind.label()));
            let widened = new.kind.strictly_widens(&old.kind);
            let nested = widened || old.kind.strictly_widens(&new.kind);

            if self.strict_mode || !nested {
                changes.push(ChangeRecord::new(
                    path.clone(),
                    ChangeKind::TypeChanged,
                    Some(old_label),
                    Some(new_label),
                ));
                return Ok(());
            }
            let (at, kind) = if widened {
                (path.keyword("type"), ChangeKind::ConstraintRelaxed)
            } else {
                (path.clone(), ChangeKind::TypeChanged)
            };
            changes.push(ChangeRecord::new(at, kind, Some(old_label), Some(new_label)));
        }

        self.compare_properties(path, old, new, changes)?;
        self.compare_items(path, old, new, changes)?;

        compare_enums(path, old.enum_values.as_ref(), new.enum_values.as_ref(), changes);
        compare_constraints(path, old, new, changes);

        if old.description != new.description {
            changes.push(ChangeRecord::new(
                path.keyword("description"),
                ChangeKind::DescriptionChanged,
                old.description.clone().map(Value::from),
                new.description.clone().map(Value::from),
            ));
        }

        Ok(())
    }

    fn compare_properties(
        &self,
        path: &ChangePath,
        old: &SchemaNode,
        new: &SchemaNode,
        changes: &mut Vec<ChangeRecord>,
    ) -> Result<()> {
        let names: BTreeSet<&String> = old.properties.keys().chain(new.properties.keys()).collect();

        for name in names {
            let field_path = path.property(name);
            match (old.properties.get(name), new.properties.get(name)) {
                (Some(old_field), None) => {
                    changes.push(ChangeRecord::new(
                        field_path,
                        ChangeKind::FieldRemoved,
                        Some(serde_json::to_value(old_field)?),
                        None,
                    ));
                }
                (None, Some(new_field)) => {
                    changes.push(ChangeRecord::new(
                        field_path.clone(),
                        ChangeKind::FieldAdded,
                        None,
                        Some(serde_json::to_value(new_field)?),
                    ));
                    if new.requires(name) {
                        changes.push(required_change(field_path, false, true));
                    }
                }
                (Some(old_field), Some(new_field)) => {
                    let (was, is) = (old.requires(name), new.requires(name));
                    if was != is {
                        changes.push(required_change(field_path.clone(), was, is));
                    }
                    self.compare_nodes(&field_path, old_field, new_field, changes)?;
                }
                (None, None) => {}
            }
        }

        Ok(())
    }

    /// Items are only compared where both sides accept arrays; a missing
    /// item schema on such a side accepts anything.
    fn compare_items(
        &self,
        path: &ChangePath,
        old: &SchemaNode,
        new: &SchemaNode,
        changes: &mut Vec<ChangeRecord>,
    ) -> Result<()> {
        if !old.kind.accepts(TypeName::Array) || !new.kind.accepts(TypeName::Array) {
            return Ok(());
        }
        if old.items.is_none() && new.items.is_none() {
            return Ok(());
        }
        let any = SchemaNode::any();
        let old_items = old.items.as_deref().unwrap_or(&any);
        let new_items = new.items.as_deref().unwrap_or(&any);
        self.compare_nodes(&path.items(), old_items, new_items, changes)
    }
}

fn required_change(path: ChangePath, was: bool, is: bool) -> ChangeRecord {
    let kind = if is {
        ChangeKind::RequiredAdded
    } else {
        ChangeKind::RequiredRemoved
    };
    ChangeRecord::new(path, kind, Some(Value::Bool(was)), Some(Value::Bool(is)))
}

fn literal_array(values: &BTreeSet<Literal>) -> Value {
    Value::Array(values.iter().map(|v| v.value().clone()).collect())
}

fn compare_enums(
    path: &ChangePath,
    old: Option<&BTreeSet<Literal>>,
    new: Option<&BTreeSet<Literal>>,
    changes: &mut Vec<ChangeRecord>,
) {
    let enum_path = path.keyword("enum");
    match (old, new) {
        (None, None) => {}
        (None, Some(new_values)) => changes.push(ChangeRecord::new(
            enum_path,
            ChangeKind::ConstraintTightened,
            None,
            Some(literal_array(new_values)),
        )),
        (Some(old_values), None) => changes.push(ChangeRecord::new(
            enum_path,
            ChangeKind::ConstraintRelaxed,
            Some(literal_array(old_values)),
            None,
        )),
        (Some(old_values), Some(new_values)) => {
            for removed in old_values.difference(new_values) {
                changes.push(ChangeRecord::new(
                    enum_path.clone(),
                    ChangeKind::EnumValueRemoved,
                    Some(removed.value().clone()),
                    None,
                ));
            }
            for added in new_values.difference(old_values) {
                changes.push(ChangeRecord::new(
                    enum_path.clone(),
                    ChangeKind::EnumValueAdded,
                    None,
                    Some(added.value().clone()),
                ));
            }
        }
    }
}

/// Which direction of a bound narrows the accepted range
#[derive(Clone, Copy)]
enum Bound {
    Lower,
    Upper,
}

fn compare_bound<T>(
    path: &ChangePath,
    keyword: &'static str,
    bound: Bound,
    old: Option<T>,
    new: Option<T>,
    changes: &mut Vec<ChangeRecord>,
) where
    T: PartialOrd + Copy + Into<Value>,
{
    let tightened = match (old, new) {
        (None, None) => return,
        (None, Some(_)) => true,
        (Some(_), None) => false,
        (Some(o), Some(n)) if o == n => return,
        (Some(o), Some(n)) => match bound {
            Bound::Lower => n > o,
            Bound::Upper => n < o,
        },
    };
    let kind = if tightened {
        ChangeKind::ConstraintTightened
    } else {
        ChangeKind::ConstraintRelaxed
    };
    changes.push(ChangeRecord::new(
        path.keyword(keyword),
        kind,
        old.map(Into::into),
        new.map(Into::into),
    ));
}

fn compare_constraints(
    path: &ChangePath,
    old: &SchemaNode,
    new: &SchemaNode,
    changes: &mut Vec<ChangeRecord>,
) {
    let (o, n) = (&old.constraints, &new.constraints);
    compare_bound(path, "minimum", Bound::Lower, o.minimum, n.minimum, changes);
    compare_bound(path, "maximum", Bound::Upper, o.maximum, n.maximum, changes);
    compare_bound(path, "minLength", Bound::Lower, o.min_length, n.min_length, changes);
    compare_bound(path, "maxLength", Bound::Upper, o.max_length, n.max_length, changes);
    compare_bound(path, "minItems", Bound::Lower, o.min_items, n.min_items, changes);
    compare_bound(path, "maxItems", Bound::Upper, o.max_items, n.max_items, changes);

    // Pattern containment is undecidable here; any replacement counts as tightening.
    let kind = match (&o.pattern, &n.pattern) {
        (None, None) => return,
        (Some(a), Some(b)) if a == b => return,
        (Some(_), None) => ChangeKind::ConstraintRelaxed,
        _ => ChangeKind::ConstraintTightened,
    };
    changes.push(ChangeRecord::new(
        path.keyword("pattern"),
        kind,
        o.pattern.clone().map(Value::from),
        n.pattern.clone().map(Value::from),
    ));
}
