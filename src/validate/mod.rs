//! Structural Validation
//!
//! Diffs a JSON data instance against a type in the graph and reports every
//! missing field, extra field and type mismatch with its exact path
//! (`posts[0].title`). The walk never stops early: the result always holds
//! the complete diagnostic set for the instance, unless a configured cap was
//! hit, in which case the result is flagged `truncated`.
//!
//! Missing fields are reported whether or not the field is required;
//! `required` is a flag on the record so callers can pick the severity.
//! Extra fields never affect validity.

pub mod fix;

pub use fix::{add_missing_field, apply_fixes, placeholder, remove_extra_field};

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::{debug, trace, warn};

use crate::error::{Result, ShapeError};
use crate::graph::{TypeDefinition, TypeGraph, TypeKind, TypeRef};

/// Default bound on nesting depth of the data walk
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Meta field accepted on any object without being declared
const TYPENAME_FIELD: &str = "__typename";

// =============================================================================
// Diagnostics
// =============================================================================

/// A declared field absent from the data (or null where non-null is required)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingField {
    pub path: String,
    pub field_name: String,
    /// Declared type in GraphQL syntax
    pub field_type: String,
    pub required: bool,
    pub parent_type: String,
    /// Declared reference with any pinned definition kept; absent on
    /// diagnostics read back from JSON
    #[serde(skip)]
    pub declared_type: Option<TypeRef>,
}

/// A key in the data that the type does not declare
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraField {
    pub path: String,
    pub field_name: String,
    pub reason: String,
}

/// A value whose runtime type does not match the declared type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeError {
    pub path: String,
    pub field_name: String,
    pub expected_type: String,
    pub actual_type: String,
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = if self.required { "required" } else { "optional" };
        write!(
            f,
            "missing {} field {} ({}) on {} at {}",
            severity, self.field_name, self.field_type, self.parent_type, self.path
        )
    }
}

impl fmt::Display for ExtraField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "extra field at {}: {}", self.path, self.reason)
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "type mismatch at {}: expected {}, found {}",
            self.path, self.expected_type, self.actual_type
        )
    }
}

/// Complete diagnostic set for one data instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// No missing fields and no type errors
    pub valid: bool,
    pub missing_fields: Vec<MissingField>,
    pub extra_fields: Vec<ExtraField>,
    pub type_errors: Vec<TypeError>,
    /// A depth or diagnostic cap cut the walk short
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
}

impl ValidationResult {
    pub fn diagnostic_count(&self) -> usize {
        self.missing_fields.len() + self.extra_fields.len() + self.type_errors.len()
    }

    /// Missing fields flagged as required
    pub fn required_missing(&self) -> impl Iterator<Item = &MissingField> {
        self.missing_fields.iter().filter(|m| m.required)
    }

    /// One line per diagnostic
    pub fn format_all(&self) -> String {
        let mut output = String::new();
        for missing in &self.missing_fields {
            output.push_str(&format!("{}\n", missing));
        }
        for error in &self.type_errors {
            output.push_str(&format!("{}\n", error));
        }
        for extra in &self.extra_fields {
            output.push_str(&format!("{}\n", extra));
        }
        output
    }
}

// =============================================================================
// Validator
// =============================================================================

/// Knobs for a validation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Deeper data is not inspected
    pub max_depth: usize,
    /// Optional cap on the total number of diagnostics
    pub max_diagnostics: Option<usize>,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_diagnostics: None,
        }
    }
}

/// Validates data instances against a type graph
pub struct Validator<'g> {
    graph: &'g TypeGraph,
    options: ValidationOptions,
}

impl<'g> Validator<'g> {
    pub fn new(graph: &'g TypeGraph, options: ValidationOptions) -> Self {
        Self { graph, options }
    }

    /// Validate `data` against the object type `root_type_name`.
    ///
    /// Fails only when the root type is unknown or not an object type;
    /// everything wrong with the data is returned in the result.
    pub fn validate(&self, data: &Value, root_type_name: &str) -> Result<ValidationResult> {
        let root = self.root_type(root_type_name)?;

        let mut walk = Walk {
            graph: self.graph,
            options: self.options,
            result: ValidationResult::default(),
            has_errors: false,
            depth_cut: false,
        };
        let root_ref = TypeRef::named(root_type_name, root.kind).required();
        walk.diff(data, &root_ref, "", root_type_name, root_type_name, 0);

        // Diagnostics dropped by a cap and data left unvisited below the
        // depth bound still count against validity
        let mut result = walk.result;
        result.valid = !walk.has_errors && !walk.depth_cut;
        debug!(
            root = root_type_name,
            valid = result.valid,
            diagnostics = result.diagnostic_count(),
            "validation finished"
        );
        Ok(result)
    }

    fn root_type(&self, name: &str) -> Result<&'g TypeDefinition> {
        let graph = self.graph;
        let Some(root) = graph.lookup(name) else {
            return Err(ShapeError::RootTypeNotFound {
                name: name.to_string(),
                suggestions: suggest(graph, name),
            });
        };
        match root.kind {
            TypeKind::Object => Ok(root),
            kind => Err(ShapeError::RootTypeNotObject {
                name: name.to_string(),
                kind,
            }),
        }
    }
}

/// Validate `data` against `root_type_name` with default options
pub fn validate(graph: &TypeGraph, data: &Value, root_type_name: &str) -> Result<ValidationResult> {
    Validator::new(graph, ValidationOptions::default()).validate(data, root_type_name)
}

/// Closest known type names for an unknown one
fn suggest(graph: &TypeGraph, name: &str) -> Vec<String> {
    let matcher = SkimMatcherV2::default();
    let mut scored: Vec<(i64, &str)> = graph
        .names()
        .into_iter()
        .filter_map(|candidate| {
            matcher
                .fuzzy_match(candidate, name)
                .or_else(|| matcher.fuzzy_match(name, candidate))
                .map(|score| (score, candidate))
        })
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    scored.into_iter().take(3).map(|(_, n)| n.to_string()).collect()
}

/// JSON runtime type name of a value
pub fn runtime_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Expected runtime type for a leaf type. `None` accepts any value.
fn expected_runtime(name: &str, kind: TypeKind) -> Option<&'static str> {
    match name {
        "Int" | "Float" => Some("number"),
        "String" | "ID" => Some("string"),
        "Boolean" => Some("boolean"),
        // Enum membership is not checked, only that the value is a string
        _ if kind == TypeKind::Enum => Some("string"),
        _ => None,
    }
}

struct Walk<'g> {
    graph: &'g TypeGraph,
    options: ValidationOptions,
    result: ValidationResult,
    /// A missing field or type error was found, stored or not
    has_errors: bool,
    depth_cut: bool,
}

impl<'g> Walk<'g> {
    fn has_room(&mut self) -> bool {
        match self.options.max_diagnostics {
            Some(limit) if self.result.diagnostic_count() >= limit => {
                if !self.result.truncated {
                    warn!(limit, "diagnostic limit reached");
                }
                self.result.truncated = true;
                false
            }
            _ => true,
        }
    }

    fn missing(&mut self, missing: MissingField) {
        self.has_errors = true;
        if self.has_room() {
            self.result.missing_fields.push(missing);
        }
    }

    fn extra(&mut self, extra: ExtraField) {
        if self.has_room() {
            self.result.extra_fields.push(extra);
        }
    }

    fn type_error(&mut self, path: &str, field_name: &str, expected: String, actual: &Value) {
        self.has_errors = true;
        if self.has_room() {
            self.result.type_errors.push(TypeError {
                path: path.to_string(),
                field_name: field_name.to_string(),
                expected_type: expected,
                actual_type: runtime_type(actual).to_string(),
            });
        }
    }

    fn diff(&mut self, data: &Value, ty: &TypeRef, path: &str, field_name: &str, parent_type: &str, depth: usize) {
        if data.is_null() {
            if ty.is_non_null() {
                self.missing(MissingField {
                    path: path.to_string(),
                    field_name: field_name.to_string(),
                    field_type: ty.to_string(),
                    required: true,
                    parent_type: parent_type.to_string(),
                    declared_type: Some(ty.clone()),
                });
            }
            return;
        }

        if depth > self.options.max_depth {
            if !self.result.truncated {
                warn!(path, max_depth = self.options.max_depth, "validation depth limit reached");
            }
            self.result.truncated = true;
            self.depth_cut = true;
            return;
        }

        match ty.unwrap_non_null() {
            TypeRef::List(item) => {
                let Value::Array(items) = data else {
                    self.type_error(path, field_name, ty.unwrap_non_null().to_string(), data);
                    return;
                };
                for (i, element) in items.iter().enumerate() {
                    let element_path = format!("{}[{}]", path, i);
                    self.diff(element, item, &element_path, field_name, parent_type, depth + 1);
                }
            }
            named @ TypeRef::Named { name, kind, .. } => {
                if kind.is_leaf() {
                    if let Some(expected) = expected_runtime(name, *kind) {
                        if runtime_type(data) != expected {
                            self.type_error(path, field_name, name.clone(), data);
                        }
                    }
                    return;
                }
                let graph = self.graph;
                match graph.resolve(named) {
                    Some(def) => self.diff_object(data, def, path, field_name, depth),
                    None => trace!(path, type_name = %name, "unresolved type, not inspected"),
                }
            }
            TypeRef::NonNull(_) => unreachable!("non-null layers are stripped"),
        }
    }

    fn diff_object(&mut self, data: &Value, def: &TypeDefinition, path: &str, field_name: &str, depth: usize) {
        let Value::Object(object) = data else {
            self.type_error(path, field_name, def.name.clone(), data);
            return;
        };

        for field in &def.fields {
            let child_path = if path.is_empty() {
                field.name.clone()
            } else {
                format!("{}.{}", path, field.name)
            };
            match object.get(&field.name) {
                None => self.missing(MissingField {
                    path: child_path,
                    field_name: field.name.clone(),
                    field_type: field.ty.to_string(),
                    required: field.ty.is_non_null(),
                    parent_type: def.name.clone(),
                    declared_type: Some(field.ty.clone()),
                }),
                Some(value) => self.diff(value, &field.ty, &child_path, &field.name, &def.name, depth + 1),
            }
        }

        // Unions declare no fields, so their members cannot be diffed key by key
        if def.kind == TypeKind::Union {
            return;
        }

        for key in object.keys() {
            if key == TYPENAME_FIELD || def.has_field(key) {
                continue;
            }
            let child_path = if path.is_empty() {
                key.clone()
            } else {
                format!("{}.{}", path, key)
            };
            self.extra(ExtraField {
                path: child_path,
                field_name: key.clone(),
                reason: format!("Field '{}' is not defined on type '{}'", key, def.name),
            });
        }
    }
}
