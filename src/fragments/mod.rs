//! Fragment Synthesis
//!
//! Walks the type graph and emits one named fragment per structurally distinct
//! object definition:
//!
//! ```text
//! fragment UserFragment on User { id name address { ...AddressFragment } }
//! ```
//!
//! Every definition instance is processed on its own. The [`FragmentRegistry`]
//! only decides whether an instance reuses an existing fragment (same name,
//! same shallow signature) or gets a new variant (`AddressFragment_2`, ...);
//! it is never used to pick which definition a name refers to.
//!
//! Recursion is bounded by `max_depth` and by a per-path `visited` set of type
//! names. When a nested fragment cannot be built (cycle, depth cutoff, missing
//! or field-less type) the field is emitted as a bare name. That fallback can
//! yield selections a strict server rejects for object-typed fields; it is
//! kept deliberately so synthesis always produces best-effort output.

pub mod operations;

pub use operations::{OperationAssembler, OperationKind, OperationMap};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace, warn};

use crate::graph::{find_duplicate_names, DuplicateReport, FieldDefinition, TypeDefinition, TypeGraph, TypeKind};
use crate::signature::shallow_signature;

/// Default recursion bound for fragment synthesis
pub const DEFAULT_MAX_DEPTH: usize = 5;

/// Fragment name for the `variant`-th distinct shape of `type_name` (1-based)
pub fn fragment_name(type_name: &str, variant: usize) -> String {
    if variant <= 1 {
        format!("{}Fragment", type_name)
    } else {
        format!("{}Fragment_{}", type_name, variant)
    }
}

// =============================================================================
// Fragment Registry
// =============================================================================

/// A registered shape for a type name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub signature: String,
    pub fragment_name: String,
}

/// Outcome of registering a signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// Signature already known under this fragment name
    Existing(String),
    /// First time this signature is seen for the type name
    New(String),
}

impl Registration {
    pub fn fragment_name(&self) -> &str {
        match self {
            Self::Existing(name) | Self::New(name) => name,
        }
    }

    pub fn into_name(self) -> String {
        match self {
            Self::Existing(name) | Self::New(name) => name,
        }
    }
}

/// Type name -> registered shapes, plus a per-name variant counter
#[derive(Debug, Clone, Default)]
pub struct FragmentRegistry {
    entries: HashMap<String, Vec<RegistryEntry>>,
    counters: HashMap<String, usize>,
}

impl FragmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reuse the fragment name for a known signature, or allocate the next
    /// variant name for a new one.
    pub fn register(&mut self, type_name: &str, signature: &str) -> Registration {
        if let Some(existing) = self.lookup(type_name, signature) {
            return Registration::Existing(existing.to_string());
        }

        let counter = self.counters.entry(type_name.to_string()).or_insert(0);
        *counter += 1;
        let name = fragment_name(type_name, *counter);

        self.entries
            .entry(type_name.to_string())
            .or_default()
            .push(RegistryEntry {
                signature: signature.to_string(),
                fragment_name: name.clone(),
            });
        Registration::New(name)
    }

    /// Fragment name registered for this exact shape
    pub fn lookup(&self, type_name: &str, signature: &str) -> Option<&str> {
        self.entries
            .get(type_name)?
            .iter()
            .find(|e| e.signature == signature)
            .map(|e| e.fragment_name.as_str())
    }

    /// All shapes registered for a type name, in registration order
    pub fn variants(&self, type_name: &str) -> &[RegistryEntry] {
        self.entries.get(type_name).map(Vec::as_slice).unwrap_or(&[])
    }
}

// =============================================================================
// Fragment Map
// =============================================================================

/// Fragment name -> fragment source, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FragmentMap(IndexMap<String, String>);

impl FragmentMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Append-only within a run: an existing name is never overwritten
    pub(crate) fn insert(&mut self, name: String, source: String) {
        self.0.entry(name).or_insert(source);
    }

    /// Fragments transitively spread by `source`, in first-reference order
    pub fn dependencies(&self, source: &str) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        let mut pending: Vec<String> = spreads(source);
        pending.reverse();

        while let Some(name) = pending.pop() {
            if seen.contains(&name) {
                continue;
            }
            if let Some(body) = self.get(&name) {
                let mut nested = spreads(body);
                nested.reverse();
                pending.extend(nested);
            }
            seen.push(name);
        }
        seen.retain(|name| self.contains(name));
        seen
    }

    /// `source` followed by every fragment it depends on
    pub fn document(&self, source: &str) -> String {
        let mut parts = vec![source.to_string()];
        for name in self.dependencies(source) {
            if let Some(body) = self.get(&name) {
                parts.push(body.to_string());
            }
        }
        parts.join("\n\n")
    }

    /// SHA-256 over every fragment, in order
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for (name, source) in &self.0 {
            hasher.update(name.as_bytes());
            hasher.update([0u8]);
            hasher.update(source.as_bytes());
            hasher.update([0u8]);
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Names spread with `...Name` in a selection source
fn spreads(source: &str) -> Vec<String> {
    source
        .match_indices("...")
        .filter(|(i, _)| {
            source[..*i]
                .chars()
                .next_back()
                .map_or(true, |c| c == '{' || c.is_whitespace())
        })
        .map(|(i, _)| {
            source[i + 3..]
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
                .collect::<String>()
        })
        .filter(|name| !name.is_empty())
        .collect()
}

// =============================================================================
// Synthesizer
// =============================================================================

/// Knobs for a synthesis run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynthesisOptions {
    /// Nested fragments deeper than this degrade to bare field names
    pub max_depth: usize,
    /// Optional cap on the number of fragments produced
    pub max_fragments: Option<usize>,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_fragments: None,
        }
    }
}

/// Everything a synthesis run produces
#[derive(Debug, Clone, Default)]
pub struct Synthesis {
    pub fragments: FragmentMap,
    pub registry: FragmentRegistry,
    /// Duplicate type names detected before synthesis (diagnostic only)
    pub duplicates: DuplicateReport,
    /// Set when `max_fragments` stopped new fragments from being built
    pub truncated: bool,
}

impl Synthesis {
    /// Fragment built for a specific definition instance, if any
    pub fn fragment_for(&self, type_def: &TypeDefinition) -> Option<&str> {
        let name = self
            .registry
            .lookup(&type_def.name, &shallow_signature(type_def))?;
        self.fragments.contains(name).then_some(name)
    }
}

/// Per-run synthesis state. Construct a fresh one for every run.
pub struct FragmentSynthesizer<'g> {
    graph: &'g TypeGraph,
    options: SynthesisOptions,
    registry: FragmentRegistry,
    fragments: FragmentMap,
    /// Fragments started but not yet inserted; they count against the cap
    in_progress: usize,
    truncated: bool,
}

impl<'g> FragmentSynthesizer<'g> {
    pub fn new(graph: &'g TypeGraph, options: SynthesisOptions) -> Self {
        Self {
            graph,
            options,
            registry: FragmentRegistry::new(),
            fragments: FragmentMap::new(),
            in_progress: 0,
            truncated: false,
        }
    }

    /// Build fragments for every object definition with at least one field
    pub fn run(mut self) -> Synthesis {
        let duplicates = find_duplicate_names(self.graph);
        for dup in &duplicates.names {
            warn!(
                type_name = %dup.name,
                count = dup.count,
                distinct_shapes = dup.distinct_shapes,
                "duplicate type definitions"
            );
        }

        let graph = self.graph;
        for type_def in graph.types() {
            if type_def.kind == TypeKind::Object && !type_def.fields.is_empty() {
                self.build_fragment(type_def, 0, &HashSet::new());
            }
        }

        debug!(
            fragments = self.fragments.len(),
            truncated = self.truncated,
            "fragment synthesis finished"
        );

        Synthesis {
            fragments: self.fragments,
            registry: self.registry,
            duplicates,
            truncated: self.truncated,
        }
    }

    /// Build (or reuse) the fragment for one definition instance.
    ///
    /// Returns `None` when the instance is past the depth bound, already on the
    /// current path, has no fields, or the fragment cap has been reached.
    fn build_fragment(
        &mut self,
        type_def: &'g TypeDefinition,
        depth: usize,
        visited: &HashSet<String>,
    ) -> Option<String> {
        if depth > self.options.max_depth || visited.contains(&type_def.name) {
            trace!(type_name = %type_def.name, depth, "fragment cutoff");
            return None;
        }
        if type_def.fields.is_empty() {
            return None;
        }

        let signature = shallow_signature(type_def);
        if let Some(existing) = self.registry.lookup(&type_def.name, &signature) {
            if self.fragments.contains(existing) {
                return Some(existing.to_string());
            }
        }

        // Checked before registering so a capped run leaves no variant
        // without a fragment
        if let Some(limit) = self.options.max_fragments {
            if self.fragments.len() + self.in_progress >= limit {
                if !self.truncated {
                    warn!(limit, "fragment limit reached, remaining selections degrade to bare fields");
                }
                self.truncated = true;
                return None;
            }
        }

        let name = match self.registry.register(&type_def.name, &signature) {
            Registration::New(name) => {
                if name != fragment_name(&type_def.name, 1) {
                    debug!(type_name = %type_def.name, fragment = %name, %signature, "registered fragment variant");
                }
                name
            }
            existing => existing.into_name(),
        };

        let mut path = visited.clone();
        path.insert(type_def.name.clone());

        self.in_progress += 1;
        let selections: Vec<String> = type_def
            .fields
            .iter()
            .map(|field| self.select_field(field, depth, &path))
            .collect();
        self.in_progress -= 1;

        let source = format!(
            "fragment {} on {} {{ {} }}",
            name,
            type_def.name,
            selections.join(" ")
        );
        self.fragments.insert(name.clone(), source);
        Some(name)
    }

    fn select_field(&mut self, field: &'g FieldDefinition, depth: usize, path: &HashSet<String>) -> String {
        if field.ty.is_leaf() {
            return field.name.clone();
        }

        let graph = self.graph;
        let Some(nested) = graph.resolve(&field.ty) else {
            trace!(field = %field.name, type_name = field.ty.named_type(), "unresolved nested type");
            return field.name.clone();
        };

        match self.build_fragment(nested, depth + 1, path) {
            Some(fragment) => format!("{} {{ ...{} }}", field.name, fragment),
            None => field.name.clone(),
        }
    }
}

/// Synthesize fragments for every object definition in `graph`
pub fn synthesize(graph: &TypeGraph, max_depth: usize) -> FragmentMap {
    let options = SynthesisOptions {
        max_depth,
        ..SynthesisOptions::default()
    };
    FragmentSynthesizer::new(graph, options).run().fragments
}
