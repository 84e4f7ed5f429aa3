//! Type Graph Model
//!
//! Canonical in-memory representation of a schema's types and type references.
//! The graph is a flat arena of [`TypeDefinition`]s addressed by [`TypeId`];
//! names index into the arena but are NOT unique. Two definitions may share a
//! name and differ in fields, and every consumer must keep them apart.
//!
//! Cycles between types are expressed by name (and optionally by a pinned
//! [`TypeId`]), never by owned pointers, so recursive schemas need no special
//! representation.

pub mod analysis;
pub mod loader;

pub use analysis::{find_duplicate_names, reference_cycles, DuplicateName, DuplicateReport};
pub use loader::{load_from_directory, load_from_path, parse_introspection, parse_plain};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::{Result, ShapeError};

/// Built-in GraphQL scalars, recognised even when a schema does not declare them
pub const BUILTIN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

// =============================================================================
// Type Kind
// =============================================================================

/// Kind of a named type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypeKind {
    Scalar,
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
}

impl TypeKind {
    /// Scalars and enums terminate a selection
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Scalar | Self::Enum)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scalar => "SCALAR",
            Self::Object => "OBJECT",
            Self::Interface => "INTERFACE",
            Self::Union => "UNION",
            Self::Enum => "ENUM",
            Self::InputObject => "INPUT_OBJECT",
        }
    }

    /// Parse an introspection `kind` string. Wrapper kinds are not type kinds.
    pub fn from_introspection(kind: &str) -> Option<Self> {
        match kind {
            "SCALAR" => Some(Self::Scalar),
            "OBJECT" => Some(Self::Object),
            "INTERFACE" => Some(Self::Interface),
            "UNION" => Some(Self::Union),
            "ENUM" => Some(Self::Enum),
            "INPUT_OBJECT" => Some(Self::InputObject),
            _ => None,
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Type Id
// =============================================================================

/// Index of a definition instance in the [`TypeGraph`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(pub usize);

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// Type Reference
// =============================================================================

/// A possibly-wrapped reference to a named type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeRef {
    NonNull(Box<TypeRef>),
    List(Box<TypeRef>),
    Named {
        name: String,
        kind: TypeKind,
        /// Pins the reference to one definition instance when names collide
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<TypeId>,
    },
}

impl TypeRef {
    pub fn named(name: impl Into<String>, kind: TypeKind) -> Self {
        Self::Named {
            name: name.into(),
            kind,
            target: None,
        }
    }

    pub fn scalar(name: impl Into<String>) -> Self {
        Self::named(name, TypeKind::Scalar)
    }

    pub fn object(name: impl Into<String>) -> Self {
        Self::named(name, TypeKind::Object)
    }

    /// Same reference, pinned to a specific definition instance
    pub fn pinned(name: impl Into<String>, kind: TypeKind, target: TypeId) -> Self {
        Self::Named {
            name: name.into(),
            kind,
            target: Some(target),
        }
    }

    /// Wrap in a non-null modifier
    pub fn required(self) -> Self {
        Self::NonNull(Box::new(self))
    }

    /// Wrap in a list modifier
    pub fn list(self) -> Self {
        Self::List(Box::new(self))
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, Self::NonNull(_))
    }

    /// Strip every outer non-null layer
    pub fn unwrap_non_null(&self) -> &TypeRef {
        let mut current = self;
        while let Self::NonNull(inner) = current {
            current = inner;
        }
        current
    }

    /// The named reference under all list/non-null wrappers
    pub fn innermost(&self) -> &TypeRef {
        let mut current = self;
        loop {
            match current {
                Self::NonNull(inner) | Self::List(inner) => current = inner,
                Self::Named { .. } => return current,
            }
        }
    }

    /// Unwrapped named type name
    pub fn named_type(&self) -> &str {
        match self.innermost() {
            Self::Named { name, .. } => name,
            _ => unreachable!("innermost always yields a named reference"),
        }
    }

    /// Unwrapped named type kind
    pub fn named_kind(&self) -> TypeKind {
        match self.innermost() {
            Self::Named { kind, .. } => *kind,
            _ => unreachable!("innermost always yields a named reference"),
        }
    }

    pub fn target(&self) -> Option<TypeId> {
        match self.innermost() {
            Self::Named { target, .. } => *target,
            _ => None,
        }
    }

    /// Whether the unwrapped type is a scalar or enum
    pub fn is_leaf(&self) -> bool {
        self.named_kind().is_leaf()
    }

    /// Parse GraphQL type syntax (`[Post!]!`), asking `kind_of` for the kind
    /// of every named type encountered.
    pub fn parse(src: &str, kind_of: impl Fn(&str) -> TypeKind) -> Result<Self> {
        let (ty, rest) = parse_type(src, &kind_of)
            .ok_or_else(|| ShapeError::InvalidTypeReference(src.to_string()))?;
        if !rest.trim().is_empty() {
            return Err(ShapeError::InvalidTypeReference(src.to_string()));
        }
        Ok(ty)
    }
}

fn parse_type<'s>(src: &'s str, kind_of: &dyn Fn(&str) -> TypeKind) -> Option<(TypeRef, &'s str)> {
    let src = src.trim_start();
    let (base, rest) = if let Some(inner) = src.strip_prefix('[') {
        let (item, rest) = parse_type(inner, kind_of)?;
        let rest = rest.trim_start().strip_prefix(']')?;
        (item.list(), rest)
    } else {
        let end = src
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(src.len());
        if end == 0 {
            return None;
        }
        let name = &src[..end];
        (TypeRef::named(name, kind_of(name)), &src[end..])
    };

    match rest.trim_start().strip_prefix('!') {
        Some(after) => Some((base.required(), after)),
        None => Some((base, rest)),
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonNull(inner) => write!(f, "{}!", inner),
            Self::List(inner) => write!(f, "[{}]", inner),
            Self::Named { name, .. } => f.write_str(name),
        }
    }
}

// =============================================================================
// Definitions
// =============================================================================

/// An argument on a field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArgumentDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    /// Default value as a GraphQL literal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl ArgumentDefinition {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            default_value: None,
        }
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }
}

/// A field on an object or interface type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<ArgumentDefinition>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            arguments: Vec::new(),
        }
    }

    pub fn with_argument(mut self, argument: ArgumentDefinition) -> Self {
        self.arguments.push(argument);
        self
    }
}

/// One definition instance. Names are not unique across a graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDefinition {
    pub name: String,
    pub kind: TypeKind,
    /// Declared fields, in declaration order
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
}

impl TypeDefinition {
    pub fn new(name: impl Into<String>, kind: TypeKind, fields: Vec<FieldDefinition>) -> Self {
        Self {
            name: name.into(),
            kind,
            fields,
            enum_values: Vec::new(),
        }
    }

    pub fn object(name: impl Into<String>, fields: Vec<FieldDefinition>) -> Self {
        Self::new(name, TypeKind::Object, fields)
    }

    pub fn scalar(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Scalar, Vec::new())
    }

    pub fn enumeration(name: impl Into<String>, values: &[&str]) -> Self {
        Self {
            enum_values: values.iter().map(|v| v.to_string()).collect(),
            ..Self::new(name, TypeKind::Enum, Vec::new())
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }
}

// =============================================================================
// Root operation types
// =============================================================================

/// Names of the schema's root operation types
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootTypes {
    pub query: Option<String>,
    pub mutation: Option<String>,
    pub subscription: Option<String>,
}

// =============================================================================
// Type Graph
// =============================================================================

/// The schema's type graph: an arena of definitions plus a name index
#[derive(Debug, Clone, Default)]
pub struct TypeGraph {
    types: Vec<TypeDefinition>,

    /// Index: name -> definition ids (names can collide!)
    by_name: HashMap<String, Vec<TypeId>>,

    pub roots: RootTypes,
}

impl TypeGraph {
    pub fn new(types: Vec<TypeDefinition>) -> Self {
        let mut graph = Self::default();
        for def in types {
            graph.push(def);
        }
        graph
    }

    pub fn with_roots(mut self, roots: RootTypes) -> Self {
        self.roots = roots;
        self
    }

    /// Append a definition, returning its id. Existing same-named definitions
    /// are kept alongside it.
    pub fn push(&mut self, def: TypeDefinition) -> TypeId {
        let id = TypeId(self.types.len());
        self.by_name.entry(def.name.clone()).or_default().push(id);
        self.types.push(def);
        id
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn get(&self, id: TypeId) -> Option<&TypeDefinition> {
        self.types.get(id.0)
    }

    /// All definition instances, in arena order
    pub fn types(&self) -> &[TypeDefinition] {
        &self.types
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &TypeDefinition)> {
        self.types.iter().enumerate().map(|(i, def)| (TypeId(i), def))
    }

    /// First definition registered under `name`
    pub fn lookup(&self, name: &str) -> Option<&TypeDefinition> {
        let id = self.by_name.get(name)?.first()?;
        self.get(*id)
    }

    /// Every definition instance registered under `name`
    pub fn definitions_named<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a TypeDefinition> + 'a {
        self.by_name
            .get(name)
            .into_iter()
            .flatten()
            .filter_map(move |id| self.get(*id))
    }

    /// Distinct type names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_name.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Resolve a reference to the definition it points at, honouring a pinned
    /// target before falling back to the first definition with that name.
    pub fn resolve(&self, ty: &TypeRef) -> Option<&TypeDefinition> {
        let name = ty.named_type();
        if let Some(def) = ty.target().and_then(|id| self.get(id)) {
            if def.name == name {
                return Some(def);
            }
        }
        self.lookup(name)
    }

    /// Kind for a name: declared kind, built-in scalar, or `Object` for
    /// anything unknown (unknown names then fail to resolve downstream).
    pub fn kind_of(&self, name: &str) -> TypeKind {
        match self.lookup(name) {
            Some(def) => def.kind,
            None if BUILTIN_SCALARS.contains(&name) => TypeKind::Scalar,
            None => TypeKind::Object,
        }
    }

    /// Parse a GraphQL type string against this graph's kinds
    pub fn parse_type(&self, src: &str) -> Result<TypeRef> {
        TypeRef::parse(src, |name| self.kind_of(name))
    }
}
