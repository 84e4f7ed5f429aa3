//! GraphQL Shapes
//!
//! Structural tooling over a GraphQL type graph: fragment synthesis, operation
//! assembly and structural validation of JSON data.
//!
//! ## Features
//!
//! - **Duplicate-aware graph**: type names need not be unique; every definition
//!   instance keeps its own fields and references can be pinned to one instance
//! - **Fragment Synthesis**: one named fragment per structurally distinct shape,
//!   with `_2`, `_3` suffixes for same-named variants
//! - **Operation Assembly**: root-level operations that spread the synthesized
//!   fragments
//! - **Structural Validation**: missing, extra and mistyped fields of a JSON
//!   instance, with placeholder-based fix actions
//!
//! ## Architecture
//!
//! ```text
//! schema.json ──► graph::loader ──► TypeGraph
//!                                     │
//!                 ┌───────────────────┼────────────────────┐
//!                 ▼                   ▼                    ▼
//!         FragmentSynthesizer   graph::analysis        Validator
//!                 │            (duplicates, cycles)        │
//!                 ▼                                        ▼
//!        OperationAssembler                     ValidationResult ──► fix
//! ```

pub mod config;
pub mod error;
pub mod fragments;
pub mod graph;
pub mod signature;
pub mod validate;

pub use config::ShapesConfig;
pub use error::{Result, ShapeError};
pub use fragments::{
    synthesize, FragmentMap, FragmentSynthesizer, OperationAssembler, OperationKind, Synthesis,
    SynthesisOptions,
};
pub use graph::{FieldDefinition, TypeDefinition, TypeGraph, TypeKind, TypeRef};
pub use validate::{validate, ValidationOptions, ValidationResult, Validator};
