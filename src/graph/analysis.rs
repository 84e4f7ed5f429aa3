//! Type Graph Analysis
//!
//! Informational passes over a [`TypeGraph`]: duplicate-name detection and
//! reference-cycle detection. Neither pass changes how fragments are built.

use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::TypeGraph;
use crate::signature::signature;

// =============================================================================
// Duplicate names
// =============================================================================

/// A type name declared by more than one definition instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateName {
    pub name: String,
    /// Number of definition instances sharing the name
    pub count: usize,
    /// Number of structurally distinct shapes among them
    pub distinct_shapes: usize,
}

impl DuplicateName {
    /// Same name, but at least two different structures
    pub fn is_conflicting(&self) -> bool {
        self.distinct_shapes > 1
    }
}

/// Every duplicated name in a graph, sorted by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateReport {
    pub names: Vec<DuplicateName>,
}

impl DuplicateReport {
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn get(&self, name: &str) -> Option<&DuplicateName> {
        self.names.iter().find(|d| d.name == name)
    }

    /// Names whose instances differ in shape
    pub fn conflicting(&self) -> impl Iterator<Item = &DuplicateName> {
        self.names.iter().filter(|d| d.is_conflicting())
    }
}

/// Scan a graph for definition instances sharing a name
pub fn find_duplicate_names(graph: &TypeGraph) -> DuplicateReport {
    let mut by_name: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (id, def) in graph.iter() {
        by_name.entry(def.name.as_str()).or_default().push(id.0);
    }

    let names = by_name
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|(name, ids)| {
            let shapes: BTreeSet<String> = graph
                .definitions_named(name)
                .map(|def| signature(graph, def))
                .collect();
            DuplicateName {
                name: name.to_string(),
                count: ids.len(),
                distinct_shapes: shapes.len(),
            }
        })
        .collect();

    DuplicateReport { names }
}

// =============================================================================
// Reference cycles
// =============================================================================

/// Groups of type names that reference each other (directly or transitively).
///
/// Self-referencing types form single-member groups. Members and groups are
/// sorted for stable output.
pub fn reference_cycles(graph: &TypeGraph) -> Vec<Vec<String>> {
    let mut refs: DiGraph<&str, ()> = DiGraph::with_capacity(graph.type_count(), graph.type_count() * 2);
    let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();

    for name in graph.names() {
        nodes.insert(name, refs.add_node(name));
    }

    for (_, def) in graph.iter() {
        let from = nodes[def.name.as_str()];
        for field in &def.fields {
            if field.ty.is_leaf() {
                continue;
            }
            if let Some(&to) = nodes.get(field.ty.named_type()) {
                refs.update_edge(from, to, ());
            }
        }
    }

    let mut groups: Vec<Vec<String>> = kosaraju_scc(&refs)
        .into_iter()
        .filter(|scc| scc.len() > 1 || refs.contains_edge(scc[0], scc[0]))
        .map(|scc| {
            let mut members: Vec<String> = scc.iter().map(|idx| refs[*idx].to_string()).collect();
            members.sort();
            members
        })
        .collect();
    groups.sort();
    groups
}
