//! Golden Tests for Fragment Synthesis and Validation
//!
//! Runs the public entry points against schemas loaded from tests/fixtures.

use std::path::{Path, PathBuf};

use graphql_shapes::fragments::{synthesize, FragmentSynthesizer, OperationAssembler, OperationKind, SynthesisOptions};
use graphql_shapes::graph::{find_duplicate_names, load_from_path, reference_cycles, TypeGraph};
use graphql_shapes::signature::signature;
use graphql_shapes::validate::{add_missing_field, apply_fixes, validate, ValidationOptions, Validator};
use graphql_shapes::ShapeError;
use serde_json::json;

fn fixtures_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn blog() -> TypeGraph {
    load_from_path(&fixtures_path().join("blog.introspection.json")).unwrap()
}

fn modules() -> TypeGraph {
    load_from_path(&fixtures_path().join("modules")).unwrap()
}

// =============================================================================
// Loading
// =============================================================================

#[test]
fn test_introspection_fixture_loads() {
    let graph = blog();
    assert_eq!(graph.roots.query.as_deref(), Some("Query"));
    assert_eq!(graph.roots.mutation.as_deref(), Some("Mutation"));
    assert!(graph.roots.subscription.is_none());
    assert!(graph.lookup("__Schema").is_none());
    assert_eq!(graph.lookup("Role").unwrap().enum_values, vec!["ADMIN", "GUEST"]);
}

#[test]
fn test_module_directory_keeps_duplicates() {
    let graph = modules();
    assert_eq!(graph.definitions_named("Address").count(), 3);

    let report = find_duplicate_names(&graph);
    let address = report.get("Address").unwrap();
    assert_eq!(address.count, 3);
    assert_eq!(address.distinct_shapes, 2);
    assert!(address.is_conflicting());
}

// =============================================================================
// Fragment Synthesis
// =============================================================================

#[test]
fn test_blog_fragments() {
    let graph = blog();
    let fragments = synthesize(&graph, 5);

    assert_eq!(
        fragments.names().collect::<Vec<_>>(),
        vec![
            "UserFragment",
            "PostFragment",
            "FeedFragment",
            "CategoryFragment",
            "QueryFragment",
            "MutationFragment",
            "ProfileFragment",
        ]
    );
    assert_eq!(fragments.get("UserFragment"), Some("fragment UserFragment on User { id name }"));
    assert_eq!(
        fragments.get("PostFragment"),
        Some("fragment PostFragment on Post { title author { ...UserFragment } }")
    );
    assert_eq!(
        fragments.get("FeedFragment"),
        Some("fragment FeedFragment on Feed { posts { ...PostFragment } }")
    );
    assert_eq!(
        fragments.get("QueryFragment"),
        Some("fragment QueryFragment on Query { user { ...UserFragment } feed { ...FeedFragment } category { ...CategoryFragment } }")
    );
}

#[test]
fn test_synthesis_is_deterministic() {
    let graph = blog();
    let first = synthesize(&graph, 5);
    let second = synthesize(&graph, 5);

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    assert_eq!(first.digest(), second.digest());

    let reloaded = synthesize(&blog(), 5);
    assert_eq!(first.digest(), reloaded.digest());
}

#[test]
fn test_self_reference_terminates() {
    let graph = blog();
    let fragments = synthesize(&graph, 5);
    assert_eq!(
        fragments.get("CategoryFragment"),
        Some("fragment CategoryFragment on Category { name parent }")
    );
    assert_eq!(reference_cycles(&graph), vec![vec!["Category".to_string()]]);
}

#[test]
fn test_distinct_address_shapes() {
    let graph = modules();
    let synthesis = FragmentSynthesizer::new(&graph, SynthesisOptions::default()).run();
    let fragments = &synthesis.fragments;

    assert_eq!(
        fragments.names().collect::<Vec<_>>(),
        vec!["AddressFragment", "CustomerFragment", "AddressFragment_2", "ShipmentFragment"]
    );
    assert_eq!(
        fragments.get("AddressFragment"),
        Some("fragment AddressFragment on Address { street city }")
    );
    assert_eq!(
        fragments.get("AddressFragment_2"),
        Some("fragment AddressFragment_2 on Address { street city zip }")
    );

    // Pinned references follow their own definition instance
    assert_eq!(
        fragments.get("CustomerFragment"),
        Some("fragment CustomerFragment on Customer { name billing { ...AddressFragment } }")
    );
    assert_eq!(
        fragments.get("ShipmentFragment"),
        Some("fragment ShipmentFragment on Shipment { id destination { ...AddressFragment_2 } }")
    );

    let addresses: Vec<_> = graph.definitions_named("Address").collect();
    assert_ne!(signature(&graph, addresses[0]), signature(&graph, addresses[1]));
    assert_eq!(synthesis.duplicates.len(), 1);
}

#[test]
fn test_reordered_address_reuses_fragment() {
    let graph = modules();
    let synthesis = FragmentSynthesizer::new(&graph, SynthesisOptions::default()).run();

    let addresses: Vec<_> = graph.definitions_named("Address").collect();
    assert_eq!(signature(&graph, addresses[0]), signature(&graph, addresses[2]));
    assert_eq!(synthesis.fragment_for(addresses[2]), Some("AddressFragment"));
    assert_eq!(synthesis.registry.variants("Address").len(), 2);
}

#[test]
fn test_fragment_cap_truncates() {
    let graph = blog();
    let options = SynthesisOptions {
        max_fragments: Some(2),
        ..SynthesisOptions::default()
    };
    let synthesis = FragmentSynthesizer::new(&graph, options).run();
    assert!(synthesis.truncated);
    assert_eq!(synthesis.fragments.len(), 2);
    assert_eq!(
        synthesis.fragments.get("QueryFragment"),
        Some("fragment QueryFragment on Query { user { ...UserFragment } feed category }")
    );
}

// =============================================================================
// Operations
// =============================================================================

#[test]
fn test_blog_operations() {
    let graph = blog();
    let synthesis = FragmentSynthesizer::new(&graph, SynthesisOptions::default()).run();
    let assembler = OperationAssembler::new(&graph, &synthesis);
    let all = assembler.assemble_all();

    let queries = &all[&OperationKind::Query];
    assert_eq!(queries["user"], "query user($id: ID!) { user(id: $id) { ...UserFragment } }");
    assert_eq!(
        queries["feed"],
        "query feed($first: Int = 10) { feed(first: $first) { ...FeedFragment } }"
    );
    assert_eq!(
        all[&OperationKind::Mutation]["createPost"],
        "mutation createPost($title: String!) { createPost(title: $title) { ...PostFragment } }"
    );

    let document = assembler.document(&queries["feed"]);
    let parts: Vec<&str> = document.split("\n\n").collect();
    assert_eq!(parts.len(), 4);
    assert!(parts[1].starts_with("fragment FeedFragment"));
    assert!(parts[2].starts_with("fragment PostFragment"));
    assert!(parts[3].starts_with("fragment UserFragment"));
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn test_empty_user_reports_required_fields() {
    let graph = blog();
    let result = validate(&graph, &json!({}), "User").unwrap();

    assert!(!result.valid);
    let names: Vec<_> = result.missing_fields.iter().map(|m| m.field_name.as_str()).collect();
    assert_eq!(names, vec!["id", "name"]);
    assert!(result.missing_fields.iter().all(|m| m.required));
    assert!(result.extra_fields.is_empty());
    assert!(result.type_errors.is_empty());
}

#[test]
fn test_nested_list_path() {
    let graph = blog();
    let result = validate(&graph, &json!({ "posts": [ {} ] }), "Feed").unwrap();

    let title = result
        .missing_fields
        .iter()
        .find(|m| m.field_name == "title")
        .unwrap();
    assert_eq!(title.path, "posts[0].title");
    assert_eq!(title.parent_type, "Post");
    assert!(title.required);
}

#[test]
fn test_extra_field_keeps_valid() {
    let graph = blog();
    let result = validate(&graph, &json!({ "id": "1", "name": "Ada", "nickname": "ada" }), "User").unwrap();

    assert!(result.valid);
    assert_eq!(result.extra_fields.len(), 1);
    assert_eq!(result.extra_fields[0].field_name, "nickname");
}

#[test]
fn test_type_mismatch() {
    let graph = blog();
    let result = validate(&graph, &json!({ "age": "30", "bio": null }), "Profile").unwrap();

    assert!(!result.valid);
    assert_eq!(result.type_errors.len(), 1);
    let error = &result.type_errors[0];
    assert_eq!(error.expected_type, "Int");
    assert_eq!(error.actual_type, "string");

    let wire = serde_json::to_value(&result).unwrap();
    assert_eq!(wire["typeErrors"][0]["expectedType"], "Int");
    assert_eq!(wire["typeErrors"][0]["actualType"], "string");
}

#[test]
fn test_self_reference_validation_terminates() {
    let graph = blog();
    let data = json!({ "name": "a", "parent": { "name": "b", "parent": { "parent": null } } });
    let result = validate(&graph, &data, "Category").unwrap();

    assert_eq!(result.missing_fields.len(), 1);
    assert_eq!(result.missing_fields[0].path, "parent.parent.name");
}

#[test]
fn test_pinned_reference_validates_its_instance() {
    let graph = modules();
    let data = json!({ "id": "s1", "destination": { "street": "Main", "city": "Oslo" } });
    let result = validate(&graph, &data, "Shipment").unwrap();

    assert_eq!(result.missing_fields.len(), 1);
    assert_eq!(result.missing_fields[0].path, "destination.zip");
}

#[test]
fn test_pinned_reference_fix_round_trip() {
    let graph = modules();
    let mut data = json!({ "id": "s1" });
    let result = validate(&graph, &data, "Shipment").unwrap();
    assert_eq!(result.missing_fields.len(), 1);

    apply_fixes(&mut data, &graph, &result).unwrap();
    assert_eq!(
        data,
        json!({ "id": "s1", "destination": { "street": "", "city": "", "zip": "" } })
    );

    let again = validate(&graph, &data, "Shipment").unwrap();
    assert!(again.valid);
    assert!(again.missing_fields.is_empty());
}

#[test]
fn test_unknown_root_suggests() {
    let graph = blog();
    match validate(&graph, &json!({}), "Usr") {
        Err(ShapeError::RootTypeNotFound { name, suggestions }) => {
            assert_eq!(name, "Usr");
            assert!(suggestions.contains(&"User".to_string()));
        }
        other => panic!("Expected RootTypeNotFound, got {:?}", other),
    }
    assert!(matches!(
        validate(&graph, &json!({}), "Role"),
        Err(ShapeError::RootTypeNotObject { .. })
    ));
}

#[test]
fn test_diagnostic_cap() {
    let graph = blog();
    let options = ValidationOptions {
        max_diagnostics: Some(1),
        ..ValidationOptions::default()
    };
    let result = Validator::new(&graph, options).validate(&json!({}), "User").unwrap();
    assert_eq!(result.diagnostic_count(), 1);
    assert!(result.truncated);
    assert!(!result.valid);
}

#[test]
fn test_fix_round_trip() {
    let graph = blog();
    let mut data = json!({ "posts": [ {} ] });
    let result = validate(&graph, &data, "Feed").unwrap();
    let title = result
        .missing_fields
        .iter()
        .find(|m| m.path == "posts[0].title")
        .unwrap();

    add_missing_field(&mut data, &graph, title).unwrap();
    let again = validate(&graph, &data, "Feed").unwrap();
    assert!(!again.missing_fields.iter().any(|m| m.path == "posts[0].title"));
}

#[test]
fn test_apply_all_fixes() {
    let graph = blog();
    let mut data = json!({ "nickname": "ada" });
    let result = validate(&graph, &data, "User").unwrap();

    apply_fixes(&mut data, &graph, &result).unwrap();
    assert_eq!(data, json!({ "id": "", "name": "" }));

    let again = validate(&graph, &data, "User").unwrap();
    assert!(again.valid);
    assert_eq!(again.diagnostic_count(), 0);
}
