//! Structural signatures
//!
//! A signature is a canonical, order-independent fingerprint of a type
//! definition's fields: `Name[field:Type,...]` with tokens sorted. Two
//! definitions sharing a name but producing different signatures are distinct
//! variants.
//!
//! - [`signature`] is bounded and recursive: object-typed fields contribute the
//!   nested signature, so differences deep in a shape still diverge.
//! - [`shallow_signature`] only looks at the direct field set. The fragment
//!   synthesizer uses it because nested differences are captured when the
//!   nested type gets its own variant.

use std::collections::HashSet;

use crate::graph::{TypeDefinition, TypeGraph};

/// Depth beyond which [`structural_signature`] stops expanding nested types
pub const MAX_SIGNATURE_DEPTH: usize = 3;

/// Bounded structural signature of a definition instance
pub fn signature(graph: &TypeGraph, type_def: &TypeDefinition) -> String {
    structural_signature(graph, type_def, 0, &HashSet::new())
}

/// Recursive form of [`signature`].
///
/// Returns the bare type name once `depth` exceeds [`MAX_SIGNATURE_DEPTH`] or
/// the type is already on the current path.
pub fn structural_signature(
    graph: &TypeGraph,
    type_def: &TypeDefinition,
    depth: usize,
    visited: &HashSet<String>,
) -> String {
    if depth > MAX_SIGNATURE_DEPTH || visited.contains(&type_def.name) {
        return type_def.name.clone();
    }

    let mut path = visited.clone();
    path.insert(type_def.name.clone());

    let tokens = type_def.fields.iter().map(|field| {
        let named = field.ty.named_type();
        if field.ty.is_leaf() {
            return format!("{}:{}", field.name, named);
        }
        match graph.resolve(&field.ty) {
            Some(nested) => format!(
                "{}:{}",
                field.name,
                structural_signature(graph, nested, depth + 1, &path)
            ),
            None => format!("{}:{}", field.name, named),
        }
    });

    wrap(&type_def.name, tokens)
}

/// Signature of the direct field set only
pub fn shallow_signature(type_def: &TypeDefinition) -> String {
    let tokens = type_def
        .fields
        .iter()
        .map(|field| format!("{}:{}", field.name, field.ty.named_type()));
    wrap(&type_def.name, tokens)
}

fn wrap(name: &str, tokens: impl Iterator<Item = String>) -> String {
    let mut tokens: Vec<String> = tokens.collect();
    tokens.sort();
    format!("{}[{}]", name, tokens.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{FieldDefinition, TypeRef};

    fn object(name: &str, fields: Vec<FieldDefinition>) -> TypeDefinition {
        TypeDefinition::object(name, fields)
    }

    fn string(name: &str) -> FieldDefinition {
        FieldDefinition::new(name, TypeRef::scalar("String"))
    }

    #[test]
    fn test_field_order_independent() {
        let graph = TypeGraph::default();
        let a = object("Address", vec![string("street"), string("city")]);
        let b = object("Address", vec![string("city"), string("street")]);

        assert_eq!(signature(&graph, &a), "Address[city:String,street:String]");
        assert_eq!(signature(&graph, &a), signature(&graph, &b));
        assert_eq!(shallow_signature(&a), shallow_signature(&b));
    }

    #[test]
    fn test_wrappers_are_ignored() {
        let def = object(
            "Post",
            vec![FieldDefinition::new(
                "tags",
                TypeRef::scalar("String").required().list().required(),
            )],
        );
        assert_eq!(shallow_signature(&def), "Post[tags:String]");
    }

    #[test]
    fn test_nested_shapes_diverge() {
        let mut graph = TypeGraph::new(vec![object("Geo", vec![string("lat")])]);
        let geo_b = graph.push(object("Geo", vec![string("lat"), string("lng")]));

        let a = object("Address", vec![FieldDefinition::new("geo", TypeRef::object("Geo"))]);
        let b = object(
            "Address",
            vec![FieldDefinition::new(
                "geo",
                TypeRef::pinned("Geo", crate::graph::TypeKind::Object, geo_b),
            )],
        );

        assert_eq!(signature(&graph, &a), "Address[geo:Geo[lat:String]]");
        assert_eq!(signature(&graph, &b), "Address[geo:Geo[lat:String,lng:String]]");
        // The shallow form cannot see the difference
        assert_eq!(shallow_signature(&a), shallow_signature(&b));
    }

    #[test]
    fn test_self_reference_terminates() {
        let node = object(
            "Node",
            vec![string("id"), FieldDefinition::new("parent", TypeRef::object("Node"))],
        );
        let graph = TypeGraph::new(vec![node.clone()]);
        assert_eq!(signature(&graph, &node), "Node[id:String,parent:Node]");
    }

    #[test]
    fn test_depth_bound() {
        // A -> B -> C -> D -> E: expansion stops after depth 3
        let graph = TypeGraph::new(vec![
            object("B", vec![FieldDefinition::new("c", TypeRef::object("C"))]),
            object("C", vec![FieldDefinition::new("d", TypeRef::object("D"))]),
            object("D", vec![FieldDefinition::new("e", TypeRef::object("E"))]),
            object("E", vec![FieldDefinition::new("f", TypeRef::object("F"))]),
            object("F", vec![string("x")]),
        ]);
        let a = object("A", vec![FieldDefinition::new("b", TypeRef::object("B"))]);
        assert_eq!(signature(&graph, &a), "A[b:B[c:C[d:D[e:E]]]]");
    }

    #[test]
    fn test_unresolved_nested_uses_name() {
        let graph = TypeGraph::default();
        let def = object("User", vec![FieldDefinition::new("avatar", TypeRef::object("Image"))]);
        assert_eq!(signature(&graph, &def), "User[avatar:Image]");
    }
}
