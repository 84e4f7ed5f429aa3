//! Operation Assembly
//!
//! Builds one root-level operation per root field, spreading the fragments a
//! synthesis run already produced instead of rebuilding selections:
//!
//! ```text
//! query user($id: ID!) { user(id: $id) { ...UserFragment } }
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::Synthesis;
use crate::graph::{FieldDefinition, TypeGraph};

/// Operation name -> operation source, in root field order
pub type OperationMap = IndexMap<String, String>;

/// Root operation keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    pub const ALL: [OperationKind; 3] = [Self::Query, Self::Mutation, Self::Subscription];

    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
            Self::Subscription => "subscription",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl FromStr for OperationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "query" => Ok(Self::Query),
            "mutation" => Ok(Self::Mutation),
            "subscription" => Ok(Self::Subscription),
            other => Err(format!("unknown operation kind: {}", other)),
        }
    }
}

/// Assembles operations against the fragments of one synthesis run
pub struct OperationAssembler<'a> {
    graph: &'a TypeGraph,
    synthesis: &'a Synthesis,
}

impl<'a> OperationAssembler<'a> {
    pub fn new(graph: &'a TypeGraph, synthesis: &'a Synthesis) -> Self {
        Self { graph, synthesis }
    }

    /// One operation per root field
    pub fn assemble(&self, root_fields: &[FieldDefinition], kind: OperationKind) -> OperationMap {
        root_fields
            .iter()
            .map(|field| (field.name.clone(), self.operation(field, kind)))
            .collect()
    }

    /// Operations for the schema's declared root type of `kind`.
    /// Empty when the schema declares no such root.
    pub fn assemble_root(&self, kind: OperationKind) -> OperationMap {
        let root_name = match kind {
            OperationKind::Query => &self.graph.roots.query,
            OperationKind::Mutation => &self.graph.roots.mutation,
            OperationKind::Subscription => &self.graph.roots.subscription,
        };
        match root_name.as_deref().and_then(|name| self.graph.lookup(name)) {
            Some(root) => self.assemble(&root.fields, kind),
            None => OperationMap::new(),
        }
    }

    /// Operations for every declared root type
    pub fn assemble_all(&self) -> IndexMap<OperationKind, OperationMap> {
        OperationKind::ALL
            .into_iter()
            .map(|kind| (kind, self.assemble_root(kind)))
            .filter(|(_, ops)| !ops.is_empty())
            .collect()
    }

    /// An operation followed by every fragment it spreads
    pub fn document(&self, operation: &str) -> String {
        self.synthesis.fragments.document(operation)
    }

    fn operation(&self, field: &FieldDefinition, kind: OperationKind) -> String {
        let variables: Vec<String> = field
            .arguments
            .iter()
            .map(|arg| match &arg.default_value {
                Some(default) => format!("${}: {} = {}", arg.name, arg.ty, default),
                None => format!("${}: {}", arg.name, arg.ty),
            })
            .collect();
        let usages: Vec<String> = field
            .arguments
            .iter()
            .map(|arg| format!("{}: ${}", arg.name, arg.name))
            .collect();

        let header = if variables.is_empty() {
            format!("{} {}", kind, field.name)
        } else {
            format!("{} {}({})", kind, field.name, variables.join(", "))
        };
        let call = if usages.is_empty() {
            field.name.clone()
        } else {
            format!("{}({})", field.name, usages.join(", "))
        };

        match self.selection(field) {
            Some(selection) => format!("{} {{ {} {} }}", header, call, selection),
            None => format!("{} {{ {} }}", header, call),
        }
    }

    /// Spread of the fragment built for the field's type; scalars select nothing.
    /// Composite types without a fragment (unions, field-less or unresolved
    /// types) fall back to `__typename` so the selection is never empty.
    fn selection(&self, field: &FieldDefinition) -> Option<String> {
        if field.ty.is_leaf() {
            return None;
        }
        let fragment = self
            .graph
            .resolve(&field.ty)
            .and_then(|def| self.synthesis.fragment_for(def));
        Some(match fragment {
            Some(name) => format!("{{ ...{} }}", name),
            None => "{ __typename }".to_string(),
        })
    }
}

/// Assemble operations for `root_fields` against a synthesis run
pub fn assemble(
    graph: &TypeGraph,
    synthesis: &Synthesis,
    root_fields: &[FieldDefinition],
    kind: OperationKind,
) -> OperationMap {
    OperationAssembler::new(graph, synthesis).assemble(root_fields, kind)
}
