//! Schema Loading
//!
//! Builds a [`TypeGraph`] from schema descriptions on disk or in memory.
//! Two formats are understood:
//!
//! - GraphQL introspection results (`{"data": {"__schema": ...}}` or a bare
//!   `{"__schema": ...}`)
//! - "plain" schema files: `{"types": [...]}` with fields written in GraphQL
//!   type syntax. Plain files may declare the same type name more than once,
//!   and a field may pin its named type to a definition index in the file.
//!
//! Directories are walked for `*.json` files in sorted path order and every
//! definition is kept, so merged modules that reuse a type name produce
//! duplicate-named definitions rather than silently overwriting each other.

use anyhow::{anyhow, Context};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use super::{
    ArgumentDefinition, FieldDefinition, RootTypes, TypeDefinition, TypeGraph, TypeId, TypeKind,
    TypeRef, BUILTIN_SCALARS,
};

// =============================================================================
// Introspection format
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntrospectionSchema {
    types: Vec<IntrospectionType>,
    #[serde(default)]
    query_type: Option<NamedTypeRef>,
    #[serde(default)]
    mutation_type: Option<NamedTypeRef>,
    #[serde(default)]
    subscription_type: Option<NamedTypeRef>,
}

#[derive(Debug, Deserialize)]
struct NamedTypeRef {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntrospectionType {
    kind: String,
    name: Option<String>,
    #[serde(default)]
    fields: Option<Vec<IntrospectionField>>,
    #[serde(default)]
    input_fields: Option<Vec<IntrospectionInputValue>>,
    #[serde(default)]
    enum_values: Option<Vec<NamedTypeRef>>,
}

#[derive(Debug, Deserialize)]
struct IntrospectionField {
    name: String,
    #[serde(default)]
    args: Vec<IntrospectionInputValue>,
    #[serde(rename = "type")]
    ty: IntrospectionTypeRef,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntrospectionInputValue {
    name: String,
    #[serde(rename = "type")]
    ty: IntrospectionTypeRef,
    #[serde(default)]
    default_value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntrospectionTypeRef {
    kind: String,
    name: Option<String>,
    #[serde(default)]
    of_type: Option<Box<IntrospectionTypeRef>>,
}

impl IntrospectionTypeRef {
    fn to_type_ref(&self) -> anyhow::Result<TypeRef> {
        let inner = || {
            self.of_type
                .as_deref()
                .ok_or_else(|| anyhow!("{} type reference without ofType", self.kind))
        };
        match self.kind.as_str() {
            "NON_NULL" => Ok(inner()?.to_type_ref()?.required()),
            "LIST" => Ok(inner()?.to_type_ref()?.list()),
            other => {
                let kind = TypeKind::from_introspection(other)
                    .ok_or_else(|| anyhow!("Unknown type kind: {}", other))?;
                let name = self
                    .name
                    .clone()
                    .ok_or_else(|| anyhow!("{} type reference without a name", other))?;
                Ok(TypeRef::named(name, kind))
            }
        }
    }
}

fn convert_input_value(value: &IntrospectionInputValue) -> anyhow::Result<ArgumentDefinition> {
    Ok(ArgumentDefinition {
        name: value.name.clone(),
        ty: value.ty.to_type_ref()?,
        default_value: value.default_value.clone(),
    })
}

fn convert_introspection(schema: IntrospectionSchema, graph: &mut TypeGraph) -> anyhow::Result<()> {
    for ty in &schema.types {
        let Some(name) = ty.name.clone() else {
            continue;
        };
        // Introspection meta types (__Schema, __Type, ...) are not part of the domain
        if name.starts_with("__") {
            continue;
        }
        let kind = TypeKind::from_introspection(&ty.kind)
            .ok_or_else(|| anyhow!("Unknown kind {} for type {}", ty.kind, name))?;

        let mut fields = Vec::new();
        for field in ty.fields.iter().flatten() {
            let arguments = field
                .args
                .iter()
                .map(convert_input_value)
                .collect::<anyhow::Result<Vec<_>>>()?;
            fields.push(FieldDefinition {
                name: field.name.clone(),
                ty: field
                    .ty
                    .to_type_ref()
                    .with_context(|| format!("field {}.{}", name, field.name))?,
                arguments,
            });
        }
        for input in ty.input_fields.iter().flatten() {
            let arg = convert_input_value(input)
                .with_context(|| format!("input field {}.{}", name, input.name))?;
            fields.push(FieldDefinition::new(arg.name, arg.ty));
        }

        graph.push(TypeDefinition {
            name,
            kind,
            fields,
            enum_values: ty
                .enum_values
                .iter()
                .flatten()
                .map(|v| v.name.clone())
                .collect(),
        });
    }

    merge_roots(
        &mut graph.roots,
        RootTypes {
            query: schema.query_type.map(|t| t.name),
            mutation: schema.mutation_type.map(|t| t.name),
            subscription: schema.subscription_type.map(|t| t.name),
        },
    );
    Ok(())
}

// =============================================================================
// Plain format
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlainSchema {
    types: Vec<PlainType>,
    #[serde(default)]
    query_type: Option<String>,
    #[serde(default)]
    mutation_type: Option<String>,
    #[serde(default)]
    subscription_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlainType {
    name: String,
    kind: TypeKind,
    #[serde(default)]
    fields: Vec<PlainField>,
    #[serde(default)]
    enum_values: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PlainField {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    /// Index into the same file's `types` list
    #[serde(default)]
    target: Option<usize>,
    #[serde(default)]
    args: Vec<PlainArgument>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlainArgument {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    default_value: Option<String>,
}

fn convert_plain(
    schema: PlainSchema,
    kinds: &HashMap<String, TypeKind>,
    graph: &mut TypeGraph,
) -> anyhow::Result<()> {
    let base = graph.type_count();
    let names: Vec<String> = schema.types.iter().map(|t| t.name.clone()).collect();
    let kind_of = |name: &str| {
        kinds.get(name).copied().unwrap_or(if BUILTIN_SCALARS.contains(&name) {
            TypeKind::Scalar
        } else {
            TypeKind::Object
        })
    };

    for ty in schema.types {
        let mut fields = Vec::with_capacity(ty.fields.len());
        for field in ty.fields {
            let mut field_ty = TypeRef::parse(&field.ty, kind_of)
                .with_context(|| format!("field {}.{}", ty.name, field.name))?;
            if let Some(index) = field.target {
                match names.get(index) {
                    Some(target) if target == field_ty.named_type() => {
                        pin(&mut field_ty, TypeId(base + index));
                    }
                    Some(target) => {
                        return Err(anyhow!(
                            "field {}.{}: target {} is {}, not {}",
                            ty.name,
                            field.name,
                            index,
                            target,
                            field_ty.named_type()
                        ))
                    }
                    None => {
                        return Err(anyhow!(
                            "field {}.{}: target {} is out of range ({} types in file)",
                            ty.name,
                            field.name,
                            index,
                            names.len()
                        ))
                    }
                }
            }
            let arguments = field
                .args
                .into_iter()
                .map(|arg| {
                    Ok(ArgumentDefinition {
                        ty: TypeRef::parse(&arg.ty, kind_of)
                            .with_context(|| format!("argument {}", arg.name))?,
                        name: arg.name,
                        default_value: arg.default_value,
                    })
                })
                .collect::<anyhow::Result<Vec<_>>>()?;
            fields.push(FieldDefinition {
                name: field.name,
                ty: field_ty,
                arguments,
            });
        }
        graph.push(TypeDefinition {
            name: ty.name,
            kind: ty.kind,
            fields,
            enum_values: ty.enum_values,
        });
    }

    merge_roots(
        &mut graph.roots,
        RootTypes {
            query: schema.query_type,
            mutation: schema.mutation_type,
            subscription: schema.subscription_type,
        },
    );
    Ok(())
}

fn pin(ty: &mut TypeRef, id: TypeId) {
    match ty {
        TypeRef::NonNull(inner) | TypeRef::List(inner) => pin(inner, id),
        TypeRef::Named { target, .. } => *target = Some(id),
    }
}

/// First declaration of each root wins
fn merge_roots(roots: &mut RootTypes, other: RootTypes) {
    roots.query = roots.query.take().or(other.query);
    roots.mutation = roots.mutation.take().or(other.mutation);
    roots.subscription = roots.subscription.take().or(other.subscription);
}

// =============================================================================
// Entry points
// =============================================================================

enum SchemaDocument {
    Introspection(IntrospectionSchema),
    Plain(PlainSchema),
}

fn parse_document(content: &str) -> anyhow::Result<SchemaDocument> {
    let mut json: Value = serde_json::from_str(content)?;

    if json.get("types").is_some() {
        return Ok(SchemaDocument::Plain(serde_json::from_value(json)?));
    }

    let schema = match json.get_mut("data").and_then(|d| d.get_mut("__schema")) {
        Some(schema) => schema.take(),
        None => json
            .get_mut("__schema")
            .map(Value::take)
            .ok_or_else(|| anyhow!("expected an introspection result or a plain `types` list"))?,
    };
    Ok(SchemaDocument::Introspection(serde_json::from_value(schema)?))
}

fn build_graph(documents: Vec<SchemaDocument>) -> anyhow::Result<TypeGraph> {
    // Kinds are collected across every document first so plain files can
    // reference types declared in other files.
    let mut kinds: HashMap<String, TypeKind> = HashMap::new();
    for doc in &documents {
        match doc {
            SchemaDocument::Plain(schema) => {
                for ty in &schema.types {
                    kinds.entry(ty.name.clone()).or_insert(ty.kind);
                }
            }
            SchemaDocument::Introspection(schema) => {
                for ty in &schema.types {
                    if let (Some(name), Some(kind)) =
                        (&ty.name, TypeKind::from_introspection(&ty.kind))
                    {
                        kinds.entry(name.clone()).or_insert(kind);
                    }
                }
            }
        }
    }

    let mut graph = TypeGraph::default();
    for doc in documents {
        match doc {
            SchemaDocument::Plain(schema) => convert_plain(schema, &kinds, &mut graph)?,
            SchemaDocument::Introspection(schema) => convert_introspection(schema, &mut graph)?,
        }
    }
    Ok(graph)
}

/// Build a graph from an introspection result
pub fn parse_introspection(content: &str) -> anyhow::Result<TypeGraph> {
    match parse_document(content)? {
        doc @ SchemaDocument::Introspection(_) => build_graph(vec![doc]),
        SchemaDocument::Plain(_) => Err(anyhow!("expected an introspection result, found a plain schema")),
    }
}

/// Build a graph from a plain schema file
pub fn parse_plain(content: &str) -> anyhow::Result<TypeGraph> {
    let schema: PlainSchema = serde_json::from_str(content)?;
    build_graph(vec![SchemaDocument::Plain(schema)])
}

/// Load a schema file (either format) or a directory of them
pub fn load_from_path(path: &Path) -> anyhow::Result<TypeGraph> {
    if path.is_dir() {
        return load_from_directory(path);
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let doc = parse_document(&content)
        .with_context(|| format!("Failed to parse schema in {}", path.display()))?;
    build_graph(vec![doc])
}

/// Load and merge every `*.json` schema under a directory, in sorted path order
pub fn load_from_directory(schema_dir: &Path) -> anyhow::Result<TypeGraph> {
    let mut documents = Vec::new();

    for entry in WalkDir::new(schema_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().map(|e| e != "json").unwrap_or(true) {
            continue;
        }

        let content = fs::read_to_string(path)?;
        let doc = parse_document(&content)
            .with_context(|| format!("Failed to parse schema in {}", path.display()))?;
        documents.push(doc);
    }

    if documents.is_empty() {
        return Err(anyhow!("No schema files found in {}", schema_dir.display()));
    }

    build_graph(documents)
}
