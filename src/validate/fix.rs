//! Fix actions
//!
//! Mutations a caller can apply to a data instance in response to
//! diagnostics: insert a placeholder for a missing field, or drop an extra
//! one. The validator itself never mutates anything; after fixing, run it
//! again from scratch.

use serde_json::{json, Map, Value};

use super::{ExtraField, MissingField, ValidationResult};
use crate::error::{Result, ShapeError};
use crate::graph::{TypeGraph, TypeKind, TypeRef};

/// A value satisfying `ty`.
///
/// Nullable types yield `null`. Non-null objects get every declared field:
/// nullable ones as `null`, non-null ones filled recursively. A type already
/// being filled higher up yields `{}`.
pub fn placeholder(graph: &TypeGraph, ty: &TypeRef) -> Value {
    match ty {
        TypeRef::NonNull(inner) => required_value(graph, inner, &mut Vec::new()),
        _ => Value::Null,
    }
}

fn required_value(graph: &TypeGraph, ty: &TypeRef, filling: &mut Vec<String>) -> Value {
    match ty {
        TypeRef::NonNull(inner) => required_value(graph, inner, filling),
        TypeRef::List(_) => Value::Array(Vec::new()),
        TypeRef::Named { name, kind, .. } => match kind {
            TypeKind::Scalar => match name.as_str() {
                "Int" => json!(0),
                "Float" => json!(0.0),
                "Boolean" => json!(false),
                _ => json!(""),
            },
            TypeKind::Enum => graph
                .resolve(ty)
                .and_then(|def| def.enum_values.first())
                .map(|v| json!(v))
                .unwrap_or_else(|| json!("")),
            _ => {
                let mut object = Map::new();
                if let Some(def) = graph.resolve(ty) {
                    if !filling.contains(name) {
                        filling.push(name.clone());
                        for field in &def.fields {
                            let value = if field.ty.is_non_null() {
                                required_value(graph, &field.ty, filling)
                            } else {
                                Value::Null
                            };
                            object.insert(field.name.clone(), value);
                        }
                        filling.pop();
                    }
                }
                Value::Object(object)
            }
        },
    }
}

// =============================================================================
// Paths
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
}

enum Target {
    Root,
    Child(Vec<Segment>, Segment),
}

/// Parse a diagnostic path (`posts[0].title`) into segments
fn parse_path(path: &str) -> Result<Vec<Segment>> {
    let invalid = || ShapeError::InvalidPath(path.to_string());
    let mut segments = Vec::new();
    if path.is_empty() {
        return Ok(segments);
    }

    for part in path.split('.') {
        let (key, mut rest) = match part.find('[') {
            Some(i) => (&part[..i], &part[i..]),
            None => (part, ""),
        };
        if key.is_empty() && rest.is_empty() {
            return Err(invalid());
        }
        if !key.is_empty() {
            segments.push(Segment::Key(key.to_string()));
        }
        while !rest.is_empty() {
            let close = rest.find(']').ok_or_else(invalid)?;
            let index = rest[1..close].parse::<usize>().map_err(|_| invalid())?;
            segments.push(Segment::Index(index));
            rest = &rest[close + 1..];
            if !rest.is_empty() && !rest.starts_with('[') {
                return Err(invalid());
            }
        }
    }
    Ok(segments)
}

/// Split a diagnostic path into the container and the slot inside it.
///
/// The field name is matched as a suffix first so keys containing `.` or `[`
/// still resolve.
fn split_target(path: &str, field_name: &str) -> Result<Target> {
    if path.is_empty() {
        return Ok(Target::Root);
    }
    if path == field_name {
        return Ok(Target::Child(Vec::new(), Segment::Key(field_name.to_string())));
    }
    if let Some(prefix) = path.strip_suffix(field_name).and_then(|p| p.strip_suffix('.')) {
        return Ok(Target::Child(parse_path(prefix)?, Segment::Key(field_name.to_string())));
    }
    let mut segments = parse_path(path)?;
    let last = segments
        .pop()
        .ok_or_else(|| ShapeError::InvalidPath(path.to_string()))?;
    Ok(Target::Child(segments, last))
}

fn navigate_mut<'v>(data: &'v mut Value, segments: &[Segment]) -> Option<&'v mut Value> {
    let mut current = data;
    for segment in segments {
        current = match segment {
            Segment::Key(key) => current.get_mut(key.as_str())?,
            Segment::Index(i) => current.get_mut(*i)?,
        };
    }
    Some(current)
}

// =============================================================================
// Fixes
// =============================================================================

/// Insert a placeholder for a missing field (or replace a required null).
///
/// The placeholder follows the declared reference carried by the diagnostic,
/// so a pinned definition is filled rather than the first one with its name.
/// Diagnostics read back from JSON only have the type string to go on.
pub fn add_missing_field(data: &mut Value, graph: &TypeGraph, missing: &MissingField) -> Result<()> {
    let value = match &missing.declared_type {
        Some(ty) => placeholder(graph, ty),
        None => placeholder(graph, &graph.parse_type(&missing.field_type)?),
    };
    let invalid = || ShapeError::InvalidPath(missing.path.clone());

    match split_target(&missing.path, &missing.field_name)? {
        Target::Root => *data = value,
        Target::Child(parents, last) => {
            let parent = navigate_mut(data, &parents).ok_or_else(invalid)?;
            match last {
                Segment::Key(key) => {
                    parent.as_object_mut().ok_or_else(invalid)?.insert(key, value);
                }
                Segment::Index(i) => {
                    *parent.get_mut(i).ok_or_else(invalid)? = value;
                }
            }
        }
    }
    Ok(())
}

/// Remove an extra field. Returns whether a key was removed.
pub fn remove_extra_field(data: &mut Value, extra: &ExtraField) -> Result<bool> {
    let invalid = || ShapeError::InvalidPath(extra.path.clone());
    match split_target(&extra.path, &extra.field_name)? {
        Target::Child(parents, Segment::Key(key)) => {
            let parent = navigate_mut(data, &parents).ok_or_else(invalid)?;
            Ok(parent
                .as_object_mut()
                .map(|object| object.remove(&key).is_some())
                .unwrap_or(false))
        }
        _ => Err(invalid()),
    }
}

/// Apply every missing/extra fix from a result. Returns the number applied.
pub fn apply_fixes(data: &mut Value, graph: &TypeGraph, result: &ValidationResult) -> Result<usize> {
    let mut applied = 0;
    for missing in &result.missing_fields {
        add_missing_field(data, graph, missing)?;
        applied += 1;
    }
    for extra in &result.extra_fields {
        if remove_extra_field(data, extra)? {
            applied += 1;
        }
    }
    Ok(applied)
}
